use crate::{
    classify::{PoseClass, TargetPose},
    error::Error,
    view::ReferenceDisplay,
};
use opencv::{
    core::{Mat, Size},
    imgcodecs, imgproc,
    prelude::*,
};
use std::{
    convert::TryFrom,
    path::Path,
    sync::{Arc, Mutex},
};
use tracing::{debug, info, warn};

const EXTENSIONS: &[&str] = &["jpg", "png"];

/// The reference picture currently shown next to the overlay, shared between
/// the view and the canvas on the detection worker.
pub type ReferenceSlot = Arc<Mutex<Option<Mat>>>;

/// Picture of each target pose, loaded once and published to a
/// [`ReferenceSlot`] whenever the target changes.
pub struct ReferenceImages {
    images: Vec<(TargetPose, Mat)>,
    slot: ReferenceSlot,
}

fn copy(image: &Mat) -> Result<Mat, Error> {
    let mut copy = Mat::default();
    image.copy_to(&mut copy).map_err(Error::CopyReference)?;
    Ok(copy)
}

/// Read `path` and scale it to `width` pixels wide, keeping its aspect ratio.
fn load_scaled(path: &Path, width: i32) -> Result<Mat, Error> {
    let image = imgcodecs::imread(&path.to_string_lossy(), imgcodecs::IMREAD_COLOR)
        .map_err(|e| Error::ReadImage(path.to_path_buf(), e))?;
    if image.empty().map_err(|e| Error::ReadImage(path.to_path_buf(), e))? {
        return Err(Error::EmptyImage(path.to_path_buf()));
    }

    let height = image.rows() * width / image.cols().max(1);
    let mut scaled = Mat::default();
    imgproc::resize(
        &image,
        &mut scaled,
        Size::new(width, height.max(1)),
        0.0,
        0.0,
        imgproc::INTER_AREA,
    )
    .map_err(Error::ResizeReference)?;
    Ok(scaled)
}

impl ReferenceImages {
    /// Load `<dir>/<pose>.jpg` (or `.png`) for every target pose, e.g. `tree.jpg`.
    /// Poses without a picture show nothing.
    pub fn load<P>(dir: P, width: u32) -> Result<Self, Error>
    where
        P: AsRef<Path>,
    {
        let dir = dir.as_ref();
        let width = i32::try_from(width).map_err(Error::ConvertReferenceWidth)?;

        let mut images = Vec::with_capacity(PoseClass::TARGETS.len());
        for &class in PoseClass::TARGETS.iter() {
            let stem = class.name().to_lowercase();
            let path = EXTENSIONS
                .iter()
                .map(|extension| dir.join(format!("{}.{}", stem, extension)))
                .find(|path| path.is_file());
            match path {
                Some(path) => {
                    images.push((TargetPose::new(class)?, load_scaled(&path, width)?));
                    debug!(message = "loaded reference image", path = %path.display());
                }
                None => warn!(
                    message = "no reference image for pose",
                    pose = %class,
                    dir = %dir.display()
                ),
            }
        }

        info!(
            message = "loaded reference images",
            dir = %dir.display(),
            count = images.len()
        );
        Ok(Self::from_images(images))
    }

    pub fn from_images(images: Vec<(TargetPose, Mat)>) -> Self {
        Self {
            images,
            slot: Arc::new(Mutex::new(None)),
        }
    }

    /// The slot a canvas reads the current picture from.
    pub fn slot(&self) -> ReferenceSlot {
        self.slot.clone()
    }
}

impl ReferenceDisplay for ReferenceImages {
    fn show(&mut self, target: TargetPose) -> Result<(), Error> {
        let image = self
            .images
            .iter()
            .find(|(pose, _)| *pose == target)
            .map(|(_, image)| copy(image))
            .transpose()?;
        if image.is_none() {
            debug!(message = "no reference image to show", pose = %target);
        }
        *self.slot.lock().map_err(|_| Error::LockReference)? = image;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opencv::core::{Scalar, CV_8UC1};

    fn filled(value: f64) -> Mat {
        Mat::new_rows_cols_with_default(2, 2, CV_8UC1, Scalar::all(value)).unwrap()
    }

    fn shown(slot: &ReferenceSlot) -> Option<u8> {
        slot.lock()
            .unwrap()
            .as_ref()
            .map(|image| *image.at_2d::<u8>(0, 0).unwrap())
    }

    #[test]
    fn show_publishes_the_target_picture() {
        let tree = TargetPose::new(PoseClass::Tree).unwrap();
        let chair = TargetPose::new(PoseClass::Chair).unwrap();
        let cobra = TargetPose::new(PoseClass::Cobra).unwrap();
        let mut images = ReferenceImages::from_images(vec![(tree, filled(10.0)), (chair, filled(20.0))]);
        let slot = images.slot();
        assert_eq!(shown(&slot), None);

        images.show(tree).unwrap();
        assert_eq!(shown(&slot), Some(10));

        images.show(chair).unwrap();
        assert_eq!(shown(&slot), Some(20));

        images.show(cobra).unwrap();
        assert_eq!(shown(&slot), None);
    }

    #[test]
    fn missing_directory_loads_nothing() {
        let images = ReferenceImages::load("/nonexistent/reference/images", 160).unwrap();
        assert!(images.images.is_empty());
    }
}
