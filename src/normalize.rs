//! Translation and scale invariant pose embeddings.
//!
//! The classifier consumes a flat vector of 34 values: the 17 landmarks
//! centered on the hip midpoint, divided by the pose size, flattened
//! row-major (point 0 x, point 0 y, point 1 x, ...).

use crate::{
    error::Error,
    geometry::center_point,
    pose::{KeypointKind, NUM_KEYPOINTS},
};
use ndarray::{Array1, Array2, ArrayView2, Axis};
use std::str::FromStr;

pub const DEFAULT_TORSO_MULTIPLIER: f32 = 2.5;
pub const EMBEDDING_LEN: usize = NUM_KEYPOINTS * 2;

/// How the landmark spread term of the pose size is measured.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PoseSizeMode {
    /// Largest distance from the hip midpoint to any single landmark.
    Landmark,
    /// Largest per-axis Euclidean norm taken across all landmarks, as computed
    /// by the classifier training pipeline.
    AxisNorm,
}

impl Default for PoseSizeMode {
    fn default() -> Self {
        Self::Landmark
    }
}

impl FromStr for PoseSizeMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "landmark" => Ok(Self::Landmark),
            "axis-norm" => Ok(Self::AxisNorm),
            _ => Err(Error::ParsePoseSizeMode(s.to_owned())),
        }
    }
}

/// A normalized, flattened landmark set.
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding(Array1<f32>);

impl Embedding {
    pub fn as_slice(&self) -> &[f32] {
        // arrays built by `embed` are always in standard layout
        self.0.as_slice().unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Normalizer {
    pub torso_multiplier: f32,
    pub mode: PoseSizeMode,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self {
            torso_multiplier: DEFAULT_TORSO_MULTIPLIER,
            mode: PoseSizeMode::default(),
        }
    }
}

fn check_shape(landmarks: &ArrayView2<'_, f32>) -> Result<(), Error> {
    if landmarks.dim() != (NUM_KEYPOINTS, 2) {
        return Err(Error::LandmarkShape(NUM_KEYPOINTS, landmarks.shape().to_vec()));
    }
    Ok(())
}

fn hips_center(landmarks: ArrayView2<'_, f32>) -> Array1<f32> {
    center_point(landmarks, KeypointKind::LeftHip, KeypointKind::RightHip)
}

impl Normalizer {
    pub fn new(torso_multiplier: f32, mode: PoseSizeMode) -> Self {
        Self {
            torso_multiplier,
            mode,
        }
    }

    pub fn pose_size(&self, landmarks: ArrayView2<'_, f32>) -> Result<f32, Error> {
        check_shape(&landmarks)?;

        let hips = hips_center(landmarks);
        let shoulders = center_point(
            landmarks,
            KeypointKind::LeftShoulder,
            KeypointKind::RightShoulder,
        );
        let torso_size = (&shoulders - &hips).mapv(|v| v * v).sum().sqrt();

        let offsets = &landmarks - &hips;
        let axis = match self.mode {
            PoseSizeMode::Landmark => Axis(1),
            PoseSizeMode::AxisNorm => Axis(0),
        };
        let max_distance = offsets
            .mapv(|v| v * v)
            .sum_axis(axis)
            .iter()
            .map(|squared| squared.sqrt())
            .fold(0.0_f32, f32::max);

        Ok((torso_size * self.torso_multiplier).max(max_distance))
    }

    pub fn normalize(&self, landmarks: ArrayView2<'_, f32>) -> Result<Array2<f32>, Error> {
        check_shape(&landmarks)?;

        let centered = &landmarks - &hips_center(landmarks);
        let pose_size = self.pose_size(centered.view())?;
        if !pose_size.is_normal() {
            return Err(Error::DegeneratePose);
        }
        Ok(centered / pose_size)
    }

    pub fn embed(&self, landmarks: ArrayView2<'_, f32>) -> Result<Embedding, Error> {
        self.normalize(landmarks)?
            .into_shape(EMBEDDING_LEN)
            .map(Embedding)
            .map_err(Error::ReshapeEmbedding)
    }
}

/// Pose size with the default spread measure.
pub fn pose_size(landmarks: ArrayView2<'_, f32>, torso_multiplier: f32) -> Result<f32, Error> {
    Normalizer::new(torso_multiplier, PoseSizeMode::default()).pose_size(landmarks)
}

pub fn normalize(landmarks: ArrayView2<'_, f32>) -> Result<Array2<f32>, Error> {
    Normalizer::default().normalize(landmarks)
}

pub fn embed(landmarks: ArrayView2<'_, f32>) -> Result<Embedding, Error> {
    Normalizer::default().embed(landmarks)
}
