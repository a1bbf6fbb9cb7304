//! One detection cycle: capture, estimate, draw, classify, update the session.

use crate::{
    audio::AudioCue,
    classify::PoseClassifier,
    config::DetectionConfig,
    error::Error,
    geometry::{bounding_box, draw_point, draw_segment, Canvas, Color},
    normalize::Normalizer,
    pose::{Pose, NUM_KEYPOINTS},
    session::{HoldTransition, SessionHandle},
};
use std::time::Instant;
use tracing::{debug, info, warn};

mod polling;
pub use polling::{Cycle, DetectionLoop, LoopStats};

const KEYPOINT_RADIUS: u32 = 8;

/// A source of video frames.
pub trait FrameSource {
    type Frame;

    /// Grab the current frame, or `None` when the source is not ready yet.
    fn read(&mut self) -> Result<Option<Self::Frame>, Error>;
}

/// A single-frame pose estimation model.
pub trait PoseEstimator {
    type Frame;

    fn estimate(&mut self, frame: &Self::Frame) -> Result<Vec<Pose>, Error>;
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum CycleOutcome {
    /// The frame source had nothing to offer.
    NotReady,
    /// Too few confident keypoints (or no pose at all) to classify.
    NoReliablePose { undetected: usize },
    Classified {
        confidence: f32,
        transition: HoldTransition,
    },
    /// The cycle failed and was skipped.
    Failed,
}

pub struct Pipeline<S, E, K, C, A> {
    source: S,
    estimator: E,
    classifier: K,
    canvas: C,
    audio: A,
    config: DetectionConfig,
    normalizer: Normalizer,
    session: SessionHandle,
}

impl<S, E, K, C, A> Pipeline<S, E, K, C, A>
where
    S: FrameSource,
    E: PoseEstimator<Frame = S::Frame>,
    K: PoseClassifier,
    C: Canvas<Frame = S::Frame>,
    A: AudioCue,
{
    pub fn new(
        source: S,
        estimator: E,
        classifier: K,
        canvas: C,
        audio: A,
        config: DetectionConfig,
        session: SessionHandle,
    ) -> Self {
        Self {
            source,
            estimator,
            classifier,
            canvas,
            audio,
            normalizer: config.normalizer(),
            config,
            session,
        }
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    /// Run one cycle. Failures are logged and never escape the cycle.
    pub fn run_cycle(&mut self, now: Instant) -> CycleOutcome {
        match self.try_cycle(now) {
            Ok(outcome) => outcome,
            Err(error) => {
                warn!(message = "detection cycle failed", %error);
                if let Ok(mut session) = self.session.lock() {
                    session.set_neutral();
                }
                CycleOutcome::Failed
            }
        }
    }

    fn try_cycle(&mut self, now: Instant) -> Result<CycleOutcome, Error> {
        let frame = match self.source.read()? {
            Some(frame) => frame,
            None => return Ok(CycleOutcome::NotReady),
        };

        self.canvas.clear(&frame)?;
        let poses = self.estimator.estimate(&frame)?;

        let pose = match poses.first() {
            Some(pose) => pose,
            None => {
                self.session.lock()?.set_neutral();
                self.canvas.present()?;
                return Ok(CycleOutcome::NoReliablePose {
                    undetected: NUM_KEYPOINTS,
                });
            }
        };

        let undetected = pose.undetected(self.config.keypoint_threshold);
        let outcome = if undetected > self.config.max_undetected {
            self.session.lock()?.set_neutral();
            CycleOutcome::NoReliablePose { undetected }
        } else {
            match self.classify(pose, now) {
                Ok(outcome) => outcome,
                Err(error) => {
                    warn!(message = "pose classification failed", %error);
                    self.session.lock()?.set_neutral();
                    CycleOutcome::Failed
                }
            }
        };

        let color = self.session.lock()?.skeleton_color();
        draw_skeleton(&mut self.canvas, pose, self.config.keypoint_threshold, color)?;
        if self.config.bounding_box {
            if let Some(bbox) = bounding_box(&pose.keypoints, self.config.keypoint_threshold) {
                self.canvas.stroke_rect(bbox.min, bbox.max, Color::RED)?;
            }
        }
        self.canvas.present()?;

        Ok(outcome)
    }

    fn classify(&mut self, pose: &Pose, now: Instant) -> Result<CycleOutcome, Error> {
        let embedding = self.normalizer.embed(pose.landmarks().view())?;
        let scores = self.classifier.classify(&embedding)?;

        let (target, transition, confidence) = {
            let mut session = self.session.lock()?;
            let target = session.target();
            let confidence = scores.get(target.class());
            let transition = session.observe(confidence > self.config.pose_threshold, now);
            (target, transition, confidence)
        };
        debug!(pose = %target, confidence);

        match transition {
            HoldTransition::Started => {
                info!(message = "holding pose", pose = %target);
                self.audio.play()?;
            }
            HoldTransition::Continued => {}
            HoldTransition::Ended => {
                info!(message = "pose released", pose = %target);
                self.audio.pause_and_rewind()?;
            }
            HoldTransition::Idle => self.audio.pause_and_rewind()?,
        }

        Ok(CycleOutcome::Classified {
            confidence,
            transition,
        })
    }
}

/// Draw confident keypoints and the segments to their adjacent keypoints.
pub fn draw_skeleton<C>(
    canvas: &mut C,
    pose: &Pose,
    threshold: f32,
    color: Color,
) -> Result<(), Error>
where
    C: Canvas + ?Sized,
{
    for keypoint in pose
        .keypoints
        .iter()
        .filter(|keypoint| keypoint.score >= threshold && keypoint.kind.is_rendered())
    {
        draw_point(canvas, keypoint.point, KEYPOINT_RADIUS, Color::WHITE)?;
        for &adjacent in keypoint.kind.adjacent() {
            draw_segment(
                canvas,
                keypoint.point,
                pose.keypoint(adjacent).point,
                color,
                1.0,
            )?;
        }
    }
    Ok(())
}

impl<S, E, K, C, A> Cycle for Pipeline<S, E, K, C, A>
where
    S: FrameSource + Send + 'static,
    E: PoseEstimator<Frame = S::Frame> + Send + 'static,
    K: PoseClassifier + Send + 'static,
    C: Canvas<Frame = S::Frame> + Send + 'static,
    A: AudioCue + Send + 'static,
{
    fn run_cycle(&mut self, now: Instant) -> CycleOutcome {
        Pipeline::run_cycle(self, now)
    }
}
