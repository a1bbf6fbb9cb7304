use crate::{
    error::{check_null_mut, Error},
    tflite_sys,
};

/// Owned TfLiteInterpreterOptions.
pub(crate) struct Options {
    options: *mut tflite_sys::TfLiteInterpreterOptions,
}

impl Options {
    pub(super) fn new() -> Result<Self, Error> {
        Ok(Self {
            options: check_null_mut(
                // SAFETY: API is guaranteed to return a valid pointer or null
                unsafe { tflite_sys::TfLiteInterpreterOptionsCreate() },
            )
            .ok_or(Error::CreateOptions)?,
        })
    }

    /// Number of CPU threads used by the interpreter; `None` lets TFLite decide.
    pub(super) fn set_num_threads(&mut self, num_threads: Option<i32>) {
        // SAFETY: self.options is a valid pointer
        unsafe {
            tflite_sys::TfLiteInterpreterOptionsSetNumThreads(
                self.options,
                num_threads.unwrap_or(-1),
            );
        }
    }

    pub(super) fn as_ptr(&self) -> *const tflite_sys::TfLiteInterpreterOptions {
        self.options
    }
}

impl Drop for Options {
    fn drop(&mut self) {
        // SAFETY: self.options is guaranteed to be valid
        unsafe {
            tflite_sys::TfLiteInterpreterOptionsDelete(self.options);
        }
    }
}
