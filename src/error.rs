#[cfg(feature = "tflite")]
use crate::tflite_sys;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to convert usize value to keypoint kind: {0}")]
    ConvertUSizeToKeypointKind(usize),

    #[error("failed to construct NotNan from f32: {1}")]
    ConstructNotNan(#[source] ordered_float::FloatIsNan, f32),

    #[error("cannot normalize a pose whose landmarks all coincide")]
    DegeneratePose,

    #[error("failed to reshape landmarks into an embedding")]
    ReshapeEmbedding(#[source] ndarray::ShapeError),

    #[error("expected {0} landmark rows with 2 coordinates, got shape {1:?}")]
    LandmarkShape(usize, Vec<usize>),

    #[error("expected {0} class scores, got {1}")]
    GetExpectedNumScores(usize, usize),

    #[error("unknown pose class: {0}")]
    ParsePoseClass(String),

    #[error("{0} is not a valid target pose")]
    InvalidTargetPose(crate::classify::PoseClass),

    #[error("unknown pose size mode: {0}")]
    ParsePoseSizeMode(String),

    #[error("detection loop is already active")]
    LoopAlreadyActive,

    #[error("detection loop is not active")]
    LoopNotActive,

    #[error("failed to spawn detection worker")]
    SpawnWorker(#[source] std::io::Error),

    #[error("detection worker panicked")]
    WorkerPanicked,

    #[error("detection loop lost its pipeline to an earlier failure")]
    LoopPoisoned,

    #[error("failed to lock session state: lock poisoned")]
    LockSession,

    #[error("failed to lock reference image: lock poisoned")]
    LockReference,

    #[error("pose estimator returned no poses")]
    NoPoseDetected,

    #[cfg(feature = "opencv")]
    #[error("failed to open video capture device {1}")]
    OpenCapture(#[source] opencv::Error, i32),

    #[cfg(feature = "opencv")]
    #[error("video capture device {0} could not be opened")]
    CaptureNotOpened(i32),

    #[cfg(feature = "opencv")]
    #[error("failed to set video capture property")]
    SetCaptureProperty(#[source] opencv::Error),

    #[cfg(feature = "opencv")]
    #[error("failed to get video capture property")]
    GetCaptureProperty(#[source] opencv::Error),

    #[cfg(feature = "opencv")]
    #[error("failed to read frame")]
    ReadFrame(#[source] opencv::Error),

    #[cfg(feature = "opencv")]
    #[error("failed to copy frame")]
    CopyFrame(#[source] opencv::Error),

    #[cfg(feature = "opencv")]
    #[error("failed to get frame size")]
    GetFrameSize(#[source] opencv::Error),

    #[cfg(feature = "opencv")]
    #[error("failed to draw line")]
    DrawLine(#[source] opencv::Error),

    #[cfg(feature = "opencv")]
    #[error("failed to draw circle")]
    DrawCircle(#[source] opencv::Error),

    #[cfg(feature = "opencv")]
    #[error("failed to draw rectangle")]
    DrawRectangle(#[source] opencv::Error),

    #[cfg(feature = "opencv")]
    #[error("failed to read image: {0:?}")]
    ReadImage(std::path::PathBuf, #[source] opencv::Error),

    #[cfg(feature = "opencv")]
    #[error("image is empty or could not be decoded: {0:?}")]
    EmptyImage(std::path::PathBuf),

    #[cfg(feature = "opencv")]
    #[error("failed to resize reference image")]
    ResizeReference(#[source] opencv::Error),

    #[cfg(feature = "opencv")]
    #[error("failed to copy reference image")]
    CopyReference(#[source] opencv::Error),

    #[cfg(feature = "opencv")]
    #[error("failed to draw reference image")]
    DrawReference(#[source] opencv::Error),

    #[cfg(feature = "opencv")]
    #[error("reference image width does not fit in i32")]
    ConvertReferenceWidth(#[source] std::num::TryFromIntError),

    #[cfg(feature = "gui")]
    #[error("failed to show image")]
    ImShow(#[source] opencv::Error),

    #[cfg(feature = "gui")]
    #[error("failed to wait for key press")]
    WaitKey(#[source] opencv::Error),

    #[cfg(feature = "tflite")]
    #[error("failed to resize frame")]
    ResizeFrame(#[source] opencv::Error),

    #[cfg(feature = "tflite")]
    #[error("failed to convert frame color")]
    ConvertColor(#[source] opencv::Error),

    #[cfg(feature = "tflite")]
    #[error("failed to get Mat data")]
    GetMatData(#[source] opencv::Error),

    #[cfg(feature = "tflite")]
    #[error("failed to convert Path to CString")]
    PathToCString(#[source] std::ffi::NulError),

    #[cfg(feature = "tflite")]
    #[error("failed to construct model from file: {0:?}")]
    GetModelFromFile(std::path::PathBuf),

    #[cfg(feature = "tflite")]
    #[error("failed to create TfLiteInterpreterOptions structure")]
    CreateOptions,

    #[cfg(feature = "tflite")]
    #[error("failed to create interpreter, got null pointer")]
    CreateInterpreter,

    #[cfg(feature = "tflite")]
    #[error("failed to get input tensor: got null pointer instead")]
    GetInputTensor,

    #[cfg(feature = "tflite")]
    #[error("failed to get output tensor: got null pointer instead")]
    GetOutputTensor,

    #[cfg(feature = "tflite")]
    #[error("got null pointer when constructing Tensor")]
    CreateTensor,

    #[cfg(feature = "tflite")]
    #[error("failed to convert usize to i32")]
    GetFfiIndex(#[source] std::num::TryFromIntError),

    #[cfg(feature = "tflite")]
    #[error("failed to convert tensor count i32 to usize")]
    GetTensorCount(#[source] std::num::TryFromIntError),

    #[cfg(feature = "tflite")]
    #[error("dimension index {0} is out of bounds for tensor with dimensions {1}")]
    GetDim(usize, usize),

    #[cfg(feature = "tflite")]
    #[error("failed to convert dim i32 to usize")]
    ConvertDimI32ToUSize(#[source] std::num::TryFromIntError),

    #[cfg(feature = "tflite")]
    #[error("failed to convert number of dims i32 to usize")]
    GetNumDims(#[source] std::num::TryFromIntError),

    #[cfg(feature = "tflite")]
    #[error("tensor type is not valid for this operation: {0:?}")]
    GetTensorSlice(tflite_sys::TfLiteType),

    #[cfg(feature = "tflite")]
    #[error("expected {0} elements for tensor, got {1}")]
    TensorSize(usize, usize),

    #[cfg(feature = "tflite")]
    #[error("expected {0} output tensors, got {1}")]
    GetExpectedNumOutputs(usize, usize),

    #[cfg(feature = "tflite")]
    #[error("unexpected input tensor shape for {0}: {1:?}")]
    InputTensorShape(&'static str, Vec<usize>),

    #[cfg(feature = "tflite")]
    #[error("tflite call failed: {0}")]
    TfLite(&'static str),

    #[cfg(feature = "audio")]
    #[error("failed to open audio cue: {0:?}")]
    OpenCue(std::path::PathBuf, #[source] hound::Error),

    #[cfg(feature = "audio")]
    #[error("failed to decode audio cue samples")]
    DecodeCue(#[source] hound::Error),

    #[cfg(feature = "audio")]
    #[error("audio cue contains no samples")]
    EmptyCue,

    #[cfg(feature = "audio")]
    #[error("no default audio output device")]
    GetOutputDevice,

    #[cfg(feature = "audio")]
    #[error("failed to get default output config")]
    GetOutputConfig(#[source] cpal::DefaultStreamConfigError),

    #[cfg(feature = "audio")]
    #[error("unsupported output sample format: {0:?}")]
    UnsupportedSampleFormat(cpal::SampleFormat),

    #[cfg(feature = "audio")]
    #[error("failed to build output stream")]
    BuildOutputStream(#[source] cpal::BuildStreamError),

    #[cfg(feature = "audio")]
    #[error("failed to start output stream")]
    PlayOutputStream(#[source] cpal::PlayStreamError),
}

/// Check whether a pointer to const T is null.
#[cfg(feature = "tflite")]
pub(crate) fn check_null<T>(ptr: *const T) -> Option<*const T> {
    if ptr.is_null() {
        None
    } else {
        Some(ptr)
    }
}

/// Check whether a pointer to mut T is null.
#[cfg(feature = "tflite")]
pub(crate) fn check_null_mut<T>(ptr: *mut T) -> Option<*mut T> {
    if ptr.is_null() {
        None
    } else {
        Some(ptr)
    }
}

#[cfg(feature = "tflite")]
pub(crate) fn tflite_status_to_result(
    status: tflite_sys::TfLiteStatus,
    msg: &'static str,
) -> Result<(), Error> {
    if status == tflite_sys::TfLiteStatus::kTfLiteOk {
        Ok(())
    } else {
        Err(Error::TfLite(msg))
    }
}
