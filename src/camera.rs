use crate::{detection::FrameSource, error::Error};
use num_traits::cast::ToPrimitive;
use opencv::{
    core::Mat,
    prelude::*,
    videoio::{VideoCapture, CAP_PROP_FRAME_HEIGHT, CAP_PROP_FRAME_WIDTH, CAP_V4L2},
};
use tracing::{info, trace};

/// A V4L2 webcam.
pub struct Camera {
    capture: VideoCapture,
    width: u32,
    height: u32,
}

impl Camera {
    /// Open `/dev/video{device}` and request a `width` x `height` frame size.
    pub fn open(device: i32, width: u32, height: u32) -> Result<Self, Error> {
        let mut capture =
            VideoCapture::new(device, CAP_V4L2).map_err(|e| Error::OpenCapture(e, device))?;
        if !capture
            .is_opened()
            .map_err(|e| Error::OpenCapture(e, device))?
        {
            return Err(Error::CaptureNotOpened(device));
        }

        capture
            .set(CAP_PROP_FRAME_WIDTH, f64::from(width))
            .map_err(Error::SetCaptureProperty)?;
        capture
            .set(CAP_PROP_FRAME_HEIGHT, f64::from(height))
            .map_err(Error::SetCaptureProperty)?;

        // the device may not support the requested size
        let width = capture
            .get(CAP_PROP_FRAME_WIDTH)
            .map_err(Error::GetCaptureProperty)?
            .to_u32()
            .unwrap_or(width);
        let height = capture
            .get(CAP_PROP_FRAME_HEIGHT)
            .map_err(Error::GetCaptureProperty)?
            .to_u32()
            .unwrap_or(height);

        info!(
            message = "got dimensions from video capture",
            device,
            width,
            height
        );

        Ok(Self {
            capture,
            width,
            height,
        })
    }

    pub fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

impl FrameSource for Camera {
    type Frame = Mat;

    fn read(&mut self) -> Result<Option<Mat>, Error> {
        let mut frame = Mat::default();
        let grabbed = self.capture.read(&mut frame).map_err(Error::ReadFrame)?;
        if !grabbed || frame.empty().map_err(Error::ReadFrame)? {
            trace!(message = "camera has no frame yet");
            return Ok(None);
        }
        Ok(Some(frame))
    }
}
