use crate::{error::Error, normalize::Embedding};
use num_traits::FromPrimitive;
use ordered_float::OrderedFloat;
use std::{fmt, str::FromStr};

pub const NUM_CLASSES: usize = 8;

/// Classifier labels, in classifier output order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, num_derive::FromPrimitive)]
pub enum PoseClass {
    Chair,
    Cobra,
    Dog,
    NoPose,
    Shoulderstand,
    Triangle,
    Tree,
    Warrior,
}

impl PoseClass {
    pub const ALL: [PoseClass; NUM_CLASSES] = [
        PoseClass::Chair,
        PoseClass::Cobra,
        PoseClass::Dog,
        PoseClass::NoPose,
        PoseClass::Shoulderstand,
        PoseClass::Triangle,
        PoseClass::Tree,
        PoseClass::Warrior,
    ];

    /// Poses a user can pick as a target, in menu order.
    pub const TARGETS: [PoseClass; NUM_CLASSES - 1] = [
        PoseClass::Tree,
        PoseClass::Chair,
        PoseClass::Cobra,
        PoseClass::Warrior,
        PoseClass::Dog,
        PoseClass::Shoulderstand,
        PoseClass::Triangle,
    ];

    pub fn idx(self) -> usize {
        self as usize
    }

    pub fn from_idx(index: usize) -> Option<Self> {
        Self::from_usize(index)
    }

    pub fn is_target(self) -> bool {
        self != PoseClass::NoPose
    }

    pub fn name(self) -> &'static str {
        match self {
            PoseClass::Chair => "Chair",
            PoseClass::Cobra => "Cobra",
            PoseClass::Dog => "Dog",
            PoseClass::NoPose => "No_Pose",
            PoseClass::Shoulderstand => "Shoulderstand",
            PoseClass::Triangle => "Triangle",
            PoseClass::Tree => "Tree",
            PoseClass::Warrior => "Warrior",
        }
    }
}

impl Default for PoseClass {
    fn default() -> Self {
        PoseClass::Tree
    }
}

impl fmt::Display for PoseClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

impl FromStr for PoseClass {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        match lower.as_str() {
            "chair" => Ok(PoseClass::Chair),
            "cobra" => Ok(PoseClass::Cobra),
            "dog" => Ok(PoseClass::Dog),
            "no_pose" | "no-pose" | "nopose" => Ok(PoseClass::NoPose),
            "shoulderstand" => Ok(PoseClass::Shoulderstand),
            "triangle" | "traingle" => Ok(PoseClass::Triangle),
            "tree" => Ok(PoseClass::Tree),
            "warrior" => Ok(PoseClass::Warrior),
            _ => Err(Error::ParsePoseClass(s.to_owned())),
        }
    }
}

/// A selectable target pose; never `NoPose`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct TargetPose(PoseClass);

impl TargetPose {
    pub fn new(class: PoseClass) -> Result<Self, Error> {
        if class.is_target() {
            Ok(Self(class))
        } else {
            Err(Error::InvalidTargetPose(class))
        }
    }

    pub fn class(self) -> PoseClass {
        self.0
    }
}

impl fmt::Display for TargetPose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for TargetPose {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.parse()?)
    }
}

/// One confidence per pose class.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ClassScores([f32; NUM_CLASSES]);

impl ClassScores {
    pub fn new(scores: [f32; NUM_CLASSES]) -> Self {
        Self(scores)
    }

    pub fn from_slice(scores: &[f32]) -> Result<Self, Error> {
        if scores.len() != NUM_CLASSES {
            return Err(Error::GetExpectedNumScores(NUM_CLASSES, scores.len()));
        }
        let mut values = [0.0; NUM_CLASSES];
        values.copy_from_slice(scores);
        Ok(Self(values))
    }

    pub fn get(&self, class: PoseClass) -> f32 {
        self.0[class.idx()]
    }

    /// All classes paired with their score, highest first. NaN scores sort last.
    pub fn ranked(&self) -> Vec<(PoseClass, f32)> {
        let mut ranked: Vec<_> = PoseClass::ALL
            .iter()
            .map(|&class| (class, self.get(class)))
            .collect();
        ranked.sort_by_key(|&(_, score)| {
            std::cmp::Reverse(OrderedFloat(if score.is_nan() {
                f32::NEG_INFINITY
            } else {
                score
            }))
        });
        ranked
    }
}

/// A pose classification model.
pub trait PoseClassifier {
    fn classify(&mut self, embedding: &Embedding) -> Result<ClassScores, Error>;
}

impl<T: PoseClassifier + ?Sized> PoseClassifier for Box<T> {
    fn classify(&mut self, embedding: &Embedding) -> Result<ClassScores, Error> {
        (**self).classify(embedding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_order_matches_classifier() {
        assert_eq!(PoseClass::Chair.idx(), 0);
        assert_eq!(PoseClass::NoPose.idx(), 3);
        assert_eq!(PoseClass::Tree.idx(), 6);
        assert_eq!(PoseClass::Warrior.idx(), 7);
        for (i, class) in PoseClass::ALL.iter().enumerate() {
            assert_eq!(PoseClass::from_idx(i), Some(*class));
        }
    }

    #[test]
    fn parse_accepts_aliases() {
        assert_eq!("tree".parse::<PoseClass>().unwrap(), PoseClass::Tree);
        assert_eq!("Tree".parse::<PoseClass>().unwrap(), PoseClass::Tree);
        assert_eq!(
            "Traingle".parse::<PoseClass>().unwrap(),
            PoseClass::Triangle
        );
        assert!("lotus".parse::<PoseClass>().is_err());
    }

    #[test]
    fn no_pose_is_not_a_target() {
        assert!("no_pose".parse::<TargetPose>().is_err());
        assert_eq!(
            "dog".parse::<TargetPose>().unwrap().class(),
            PoseClass::Dog
        );
        assert!(!PoseClass::TARGETS.contains(&PoseClass::NoPose));
    }

    #[test]
    fn scores_from_slice_checks_len() {
        assert!(matches!(
            ClassScores::from_slice(&[0.5; 7]),
            Err(Error::GetExpectedNumScores(8, 7))
        ));
        let scores = ClassScores::from_slice(&[0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.98, 0.02]).unwrap();
        assert_eq!(scores.get(PoseClass::Tree), 0.98);
    }

    #[test]
    fn ranked_is_descending() {
        let scores = ClassScores::new([0.1, 0.0, 0.05, 0.2, 0.0, 0.0, 0.6, f32::NAN]);
        let ranked = scores.ranked();
        assert_eq!(ranked[0].0, PoseClass::Tree);
        assert_eq!(ranked[1].0, PoseClass::NoPose);
        assert_eq!(ranked[2].0, PoseClass::Chair);
    }
}
