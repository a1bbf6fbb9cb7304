//! Live yoga pose practice: webcam pose estimation, pose classification and
//! hold timing.

pub mod audio;
pub mod classify;
pub mod config;
pub mod detection;
pub mod error;
pub mod geometry;
pub mod normalize;
pub mod pose;
pub mod session;
pub mod view;

#[cfg(feature = "opencv")]
pub mod camera;
#[cfg(feature = "opencv")]
pub mod canvas;
#[cfg(feature = "opencv")]
pub mod reference;

#[cfg(feature = "tflite")]
pub mod engine;
#[cfg(feature = "tflite")]
mod tflite;
#[cfg(feature = "tflite")]
pub mod tflite_sys;

pub use error::Error;
