use crate::{
    classify::{ClassScores, PoseClassifier, NUM_CLASSES},
    detection::PoseEstimator,
    error::Error,
    normalize::{Embedding, EMBEDDING_LEN},
    pose::{Pose, NUM_KEYPOINTS},
    tflite, tflite_sys,
};
use opencv::{
    core::{Mat, Size},
    imgproc,
    prelude::*,
};
use std::{
    convert::TryFrom,
    path::Path,
    time::{Duration, Instant},
};
use tracing::{info, trace};

#[derive(Debug, Copy, Clone, Default)]
pub struct Timing {
    pub inference: Duration,
    pub frames: u32,
}

impl Timing {
    pub fn mean_inference(&self) -> Option<Duration> {
        if self.frames == 0 {
            None
        } else {
            Some(self.inference / self.frames)
        }
    }

    fn record(&mut self, start: Instant) {
        self.inference += start.elapsed();
        self.frames += 1;
    }
}

fn expect_single_output(interpreter: &tflite::Interpreter) -> Result<(), Error> {
    let num_outputs = interpreter.get_output_tensor_count()?;
    if num_outputs != 1 {
        return Err(Error::GetExpectedNumOutputs(1, num_outputs));
    }
    Ok(())
}

/// Bytes of a continuous 8-bit Mat.
fn mat_bytes(mat: &Mat) -> Result<&[u8], Error> {
    let num_bytes =
        mat.total().map_err(Error::GetMatData)? * mat.elem_size().map_err(Error::GetMatData)?;
    let data = mat.data().map_err(Error::GetMatData)? as *const u8;
    // SAFETY: `mat` is continuous (fresh output of cvt_color) and `data` points
    // to `num_bytes` bytes that live as long as `mat`
    Ok(unsafe { std::slice::from_raw_parts(data, num_bytes) })
}

/// Single-pose MoveNet running on the TFLite CPU interpreter.
pub struct MoveNet {
    interpreter: tflite::Interpreter,
    input_size: Size,
    resized: Mat,
    rgb: Mat,
    timing: Timing,
}

impl MoveNet {
    pub fn new<P>(path: P, num_threads: Option<i32>) -> Result<Self, Error>
    where
        P: AsRef<Path>,
    {
        let mut interpreter = tflite::Interpreter::new(path, num_threads)?;

        // NHWC, RGB
        let dims = interpreter.get_input_tensor(0)?.dims()?;
        let (height, width) = match *dims.as_slice() {
            [1, height, width, 3] => (height, width),
            _ => return Err(Error::InputTensorShape("movenet", dims.clone())),
        };
        expect_single_output(&interpreter)?;

        Ok(Self {
            interpreter,
            input_size: Size::new(
                i32::try_from(width).map_err(Error::GetFfiIndex)?,
                i32::try_from(height).map_err(Error::GetFfiIndex)?,
            ),
            resized: Mat::default(),
            rgb: Mat::default(),
            timing: Timing::default(),
        })
    }

    fn fill_input(&mut self, frame: &Mat) -> Result<(), Error> {
        imgproc::resize(
            frame,
            &mut self.resized,
            self.input_size,
            0.0,
            0.0,
            imgproc::INTER_LINEAR,
        )
        .map_err(Error::ResizeFrame)?;
        imgproc::cvt_color(&self.resized, &mut self.rgb, imgproc::COLOR_BGR2RGB, 0)
            .map_err(Error::ConvertColor)?;

        let bytes = mat_bytes(&self.rgb)?;
        let mut input = self.interpreter.get_input_tensor(0)?;
        match input.r#type() {
            tflite_sys::TfLiteType::kTfLiteUInt8 => input.copy_from_u8(bytes),
            tflite_sys::TfLiteType::kTfLiteFloat32 => {
                let values: Vec<f32> = bytes.iter().copied().map(f32::from).collect();
                input.copy_from_f32(&values)
            }
            other => Err(Error::GetTensorSlice(other)),
        }
    }
}

impl Drop for MoveNet {
    fn drop(&mut self) {
        info!(
            message = "pose estimator finished",
            frames = self.timing.frames,
            mean_inference = ?self.timing.mean_inference()
        );
    }
}

impl PoseEstimator for MoveNet {
    type Frame = Mat;

    fn estimate(&mut self, frame: &Mat) -> Result<Vec<Pose>, Error> {
        let frame_size = frame.size().map_err(Error::GetFrameSize)?;
        self.fill_input(frame)?;

        let start = Instant::now();
        self.interpreter.invoke()?;
        self.timing.record(start);
        trace!(message = "movenet inference", mean = ?self.timing.mean_inference());

        // [1, 1, 17, 3] of normalized (y, x, score)
        let output = self.interpreter.get_output_tensor(0)?.to_f32_vec()?;
        if output.len() != NUM_KEYPOINTS * 3 {
            return Err(Error::TensorSize(NUM_KEYPOINTS * 3, output.len()));
        }

        let width = frame_size.width as f32;
        let height = frame_size.height as f32;
        let mut triples = [(0.0, 0.0, 0.0); NUM_KEYPOINTS];
        for (triple, yxs) in triples.iter_mut().zip(output.chunks_exact(3)) {
            *triple = (yxs[1] * width, yxs[0] * height, yxs[2]);
        }
        Ok(vec![Pose::from_triples(&triples)?])
    }
}

/// The pose classifier: `[1, 34]` embedding in, 8 class confidences out.
pub struct TfLiteClassifier {
    interpreter: tflite::Interpreter,
}

impl TfLiteClassifier {
    pub fn new<P>(path: P, num_threads: Option<i32>) -> Result<Self, Error>
    where
        P: AsRef<Path>,
    {
        let mut interpreter = tflite::Interpreter::new(path, num_threads)?;

        let input_len = interpreter.get_input_tensor(0)?.len();
        if input_len != EMBEDDING_LEN {
            return Err(Error::TensorSize(EMBEDDING_LEN, input_len));
        }
        expect_single_output(&interpreter)?;
        let output_len = interpreter.get_output_tensor(0)?.len();
        if output_len != NUM_CLASSES {
            return Err(Error::GetExpectedNumScores(NUM_CLASSES, output_len));
        }

        Ok(Self { interpreter })
    }
}

impl PoseClassifier for TfLiteClassifier {
    fn classify(&mut self, embedding: &Embedding) -> Result<ClassScores, Error> {
        self.interpreter
            .get_input_tensor(0)?
            .copy_from_f32(embedding.as_slice())?;
        self.interpreter.invoke()?;
        ClassScores::from_slice(&self.interpreter.get_output_tensor(0)?.to_f32_vec()?)
    }
}

/// Load a still image as a BGR frame.
pub fn read_image<P>(path: P) -> Result<Mat, Error>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let image = opencv::imgcodecs::imread(&path.to_string_lossy(), opencv::imgcodecs::IMREAD_COLOR)
        .map_err(|e| Error::ReadImage(path.to_path_buf(), e))?;
    if image.empty().map_err(|e| Error::ReadImage(path.to_path_buf(), e))? {
        return Err(Error::EmptyImage(path.to_path_buf()));
    }
    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_inference() {
        let mut timing = Timing::default();
        assert_eq!(timing.mean_inference(), None);
        timing.inference = Duration::from_millis(30);
        timing.frames = 3;
        assert_eq!(timing.mean_inference(), Some(Duration::from_millis(10)));
    }
}
