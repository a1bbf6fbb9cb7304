use crate::error::Error;
use num_traits::FromPrimitive;
use ordered_float::NotNan;
use std::ops::{Add, Mul, Sub};

/// The MoveNet keypoint vocabulary, in model output order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, num_derive::FromPrimitive)]
pub enum KeypointKind {
    Nose,
    LeftEye,
    RightEye,
    LeftEar,
    RightEar,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
}

pub const NUM_KEYPOINTS: usize = 17;

impl KeypointKind {
    pub const ALL: [KeypointKind; NUM_KEYPOINTS] = [
        KeypointKind::Nose,
        KeypointKind::LeftEye,
        KeypointKind::RightEye,
        KeypointKind::LeftEar,
        KeypointKind::RightEar,
        KeypointKind::LeftShoulder,
        KeypointKind::RightShoulder,
        KeypointKind::LeftElbow,
        KeypointKind::RightElbow,
        KeypointKind::LeftWrist,
        KeypointKind::RightWrist,
        KeypointKind::LeftHip,
        KeypointKind::RightHip,
        KeypointKind::LeftKnee,
        KeypointKind::RightKnee,
        KeypointKind::LeftAnkle,
        KeypointKind::RightAnkle,
    ];

    pub fn idx(self) -> usize {
        self as usize
    }

    pub fn from_idx(index: usize) -> Result<Self, Error> {
        Self::from_usize(index).ok_or(Error::ConvertUSizeToKeypointKind(index))
    }

    /// Keypoints that are used for classification but never rendered.
    pub fn is_rendered(self) -> bool {
        !matches!(self, KeypointKind::LeftEye | KeypointKind::RightEye)
    }

    /// Keypoints this keypoint draws a segment to.
    pub fn adjacent(self) -> &'static [KeypointKind] {
        use KeypointKind::*;

        match self {
            Nose => &[LeftEar, RightEar],
            LeftEar => &[LeftShoulder],
            RightEar => &[RightShoulder],
            LeftShoulder => &[RightShoulder, LeftElbow, LeftHip],
            RightShoulder => &[RightElbow, RightHip],
            LeftElbow => &[LeftWrist],
            RightElbow => &[RightWrist],
            LeftHip => &[LeftKnee, RightHip],
            RightHip => &[RightKnee],
            LeftKnee => &[LeftAnkle],
            RightKnee => &[RightAnkle],
            LeftEye | RightEye | LeftWrist | RightWrist | LeftAnkle | RightAnkle => &[],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Construct a point from model output, rejecting NaN coordinates.
    pub fn try_new(x: f32, y: f32) -> Result<Self, Error> {
        Ok(Self {
            x: NotNan::new(x)
                .map_err(|e| Error::ConstructNotNan(e, x))?
                .into_inner(),
            y: NotNan::new(y)
                .map_err(|e| Error::ConstructNotNan(e, y))?
                .into_inner(),
        })
    }

    pub fn distance(self, other: Self) -> f32 {
        let delta = other - self;
        (delta.x * delta.x + delta.y * delta.y).sqrt()
    }
}

impl Sub for Point {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self::Output {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

impl Add for Point {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self::Output {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl Mul<f32> for Point {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self::Output {
        Self::Output {
            x: self.x * rhs,
            y: self.y * rhs,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Keypoint {
    pub kind: KeypointKind,
    pub point: Point,
    pub score: f32,
}

pub type Keypoints = [Keypoint; NUM_KEYPOINTS];

/// A single detected pose: all 17 keypoints in vocabulary order.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Pose {
    pub keypoints: Keypoints,
}

impl Pose {
    /// Build a pose from `(x, y, score)` triples given in vocabulary order.
    pub fn from_triples(triples: &[(f32, f32, f32); NUM_KEYPOINTS]) -> Result<Self, Error> {
        let mut keypoints = [Keypoint {
            kind: KeypointKind::Nose,
            point: Point::default(),
            score: 0.0,
        }; NUM_KEYPOINTS];

        for (i, (&(x, y, score), keypoint)) in triples.iter().zip(keypoints.iter_mut()).enumerate()
        {
            *keypoint = Keypoint {
                kind: KeypointKind::from_idx(i)?,
                point: Point::try_new(x, y)?,
                score: NotNan::new(score)
                    .map_err(|e| Error::ConstructNotNan(e, score))?
                    .into_inner(),
            };
        }

        Ok(Self { keypoints })
    }

    pub fn keypoint(&self, kind: KeypointKind) -> &Keypoint {
        &self.keypoints[kind.idx()]
    }

    /// Number of keypoints whose score does not reach `threshold`. A NaN score
    /// is undetected.
    #[allow(clippy::neg_cmp_op_on_partial_ord)]
    pub fn undetected(&self, threshold: f32) -> usize {
        self.keypoints
            .iter()
            .filter(|keypoint| !(keypoint.score >= threshold))
            .count()
    }

    /// Raw `17 x 2` landmark array of (x, y) rows.
    pub fn landmarks(&self) -> ndarray::Array2<f32> {
        ndarray::Array2::from_shape_fn((NUM_KEYPOINTS, 2), |(i, axis)| {
            let point = self.keypoints[i].point;
            if axis == 0 {
                point.x
            } else {
                point.y
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triples() -> [(f32, f32, f32); NUM_KEYPOINTS] {
        let mut triples = [(0.0, 0.0, 1.0); NUM_KEYPOINTS];
        for (i, triple) in triples.iter_mut().enumerate() {
            triple.0 = i as f32;
            triple.1 = 100.0 + i as f32;
        }
        triples
    }

    #[test]
    fn vocabulary_order_matches_indices() {
        for (i, kind) in KeypointKind::ALL.iter().enumerate() {
            assert_eq!(kind.idx(), i);
            assert_eq!(KeypointKind::from_idx(i).unwrap(), *kind);
        }
        assert!(KeypointKind::from_idx(NUM_KEYPOINTS).is_err());
    }

    #[test]
    fn eyes_are_not_rendered() {
        let hidden: Vec<_> = KeypointKind::ALL
            .iter()
            .filter(|kind| !kind.is_rendered())
            .collect();
        assert_eq!(hidden, vec![&KeypointKind::LeftEye, &KeypointKind::RightEye]);
    }

    #[test]
    fn adjacency_never_points_at_itself() {
        for kind in KeypointKind::ALL.iter() {
            assert!(!kind.adjacent().contains(kind));
        }
        let edges: usize = KeypointKind::ALL.iter().map(|k| k.adjacent().len()).sum();
        assert_eq!(edges, 16);
    }

    #[test]
    fn from_triples_keeps_order() {
        let pose = Pose::from_triples(&triples()).unwrap();
        let hip = pose.keypoint(KeypointKind::LeftHip);
        assert_eq!(hip.kind, KeypointKind::LeftHip);
        assert_eq!(hip.point, Point::new(11.0, 111.0));
    }

    #[test]
    fn from_triples_rejects_nan() {
        let mut triples = triples();
        triples[3].1 = f32::NAN;
        assert!(Pose::from_triples(&triples).is_err());
    }

    #[test]
    fn from_triples_rejects_nan_score() {
        let mut triples = triples();
        triples[7].2 = f32::NAN;
        assert!(matches!(
            Pose::from_triples(&triples),
            Err(Error::ConstructNotNan(..))
        ));
    }

    #[test]
    fn nan_score_is_undetected() {
        let mut pose = Pose::from_triples(&triples()).unwrap();
        pose.keypoints[4].score = f32::NAN;
        assert_eq!(pose.undetected(0.4), 1);
    }

    #[test]
    fn landmarks_are_rows_of_xy() {
        let landmarks = Pose::from_triples(&triples()).unwrap().landmarks();
        assert_eq!(landmarks.dim(), (NUM_KEYPOINTS, 2));
        assert_eq!(landmarks[(5, 0)], 5.0);
        assert_eq!(landmarks[(5, 1)], 105.0);
    }

    #[test]
    fn undetected_counts_low_scores() {
        let mut triples = triples();
        triples[0].2 = 0.1;
        triples[1].2 = 0.39;
        triples[2].2 = 0.4;
        let pose = Pose::from_triples(&triples).unwrap();
        assert_eq!(pose.undetected(0.4), 2);
    }

    #[test]
    fn distance() {
        assert_eq!(Point::new(0.0, 0.0).distance(Point::new(3.0, 4.0)), 5.0);
    }
}
