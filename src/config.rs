use crate::normalize::{Normalizer, PoseSizeMode};
use std::time::Duration;

const DEFAULT_INTERVAL_MS: &str = "100";
const DEFAULT_KEYPOINT_THRESHOLD: &str = "0.4";
const DEFAULT_POSE_THRESHOLD: &str = "0.97";
const DEFAULT_MAX_UNDETECTED: &str = "4";
const DEFAULT_TORSO_MULTIPLIER: &str = "2.5";
const DEFAULT_POSE_SIZE_MODE: &str = "landmark";

/// Tunables of the detection cycle.
#[derive(Debug, Clone, Copy, PartialEq, structopt::StructOpt)]
pub struct DetectionConfig {
    /// Milliseconds between detection cycles.
    #[structopt(long, default_value = DEFAULT_INTERVAL_MS)]
    pub interval_ms: u64,

    /// Minimum score for a keypoint to count as detected.
    #[structopt(short = "-k", long, default_value = DEFAULT_KEYPOINT_THRESHOLD)]
    pub keypoint_threshold: f32,

    /// Target pose confidence that must be exceeded to count as holding the pose.
    #[structopt(short = "-c", long, default_value = DEFAULT_POSE_THRESHOLD)]
    pub pose_threshold: f32,

    /// Skip classification when more keypoints than this are undetected.
    #[structopt(short = "-u", long, default_value = DEFAULT_MAX_UNDETECTED)]
    pub max_undetected: usize,

    /// Torso length multiplier used as the lower bound of the pose size.
    #[structopt(long, default_value = DEFAULT_TORSO_MULTIPLIER)]
    pub torso_multiplier: f32,

    /// How landmark spread is measured when sizing a pose: landmark or axis-norm.
    #[structopt(long, default_value = DEFAULT_POSE_SIZE_MODE)]
    pub pose_size_mode: PoseSizeMode,

    /// Draw the bounding box of the detected keypoints.
    #[structopt(short, long)]
    pub bounding_box: bool,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            interval_ms: 100,
            keypoint_threshold: 0.4,
            pose_threshold: 0.97,
            max_undetected: 4,
            torso_multiplier: 2.5,
            pose_size_mode: PoseSizeMode::Landmark,
            bounding_box: false,
        }
    }
}

impl DetectionConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn normalizer(&self) -> Normalizer {
        Normalizer::new(self.torso_multiplier, self.pose_size_mode)
    }
}

#[cfg(test)]
mod tests {
    use super::DetectionConfig;
    use crate::normalize::PoseSizeMode;
    use std::time::Duration;
    use structopt::StructOpt;

    #[test]
    fn defaults() {
        let config = DetectionConfig::default();
        assert_eq!(config.interval(), Duration::from_millis(100));
        assert_eq!(config.keypoint_threshold, 0.4);
        assert_eq!(config.pose_threshold, 0.97);
        assert_eq!(config.max_undetected, 4);
        assert_eq!(config.normalizer().torso_multiplier, 2.5);
        assert_eq!(config.pose_size_mode, PoseSizeMode::Landmark);
    }

    #[test]
    fn cli_defaults_match_default_impl() {
        let config = DetectionConfig::from_iter_safe(&["detect"]).unwrap();
        assert_eq!(config, DetectionConfig::default());
    }

    #[test]
    fn cli_overrides() {
        let config = DetectionConfig::from_iter_safe(&[
            "detect",
            "--pose-threshold",
            "0.9",
            "--max-undetected",
            "2",
            "--pose-size-mode",
            "axis-norm",
        ])
        .unwrap();
        assert_eq!(config.pose_threshold, 0.9);
        assert_eq!(config.max_undetected, 2);
        assert_eq!(config.pose_size_mode, PoseSizeMode::AxisNorm);
    }
}
