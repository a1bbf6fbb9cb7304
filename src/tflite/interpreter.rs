use crate::{
    error::{check_null, check_null_mut, tflite_status_to_result, Error},
    tflite::{Model, Options, Tensor},
    tflite_sys,
};
use std::{convert::TryFrom, path::Path};
use tracing::debug;

pub(crate) struct Interpreter {
    interpreter: *mut tflite_sys::TfLiteInterpreter,
    // These fields are never accessed.
    // They are here to ensure that resources created during interpreter construction
    // live as long as the interpreter.
    _options: Options,
    _model: Model,
}

// SAFETY: the interpreter exclusively owns its model, options and tensors, and
// every method that touches them takes `&self` or `&mut self`, so moving it to
// another thread can't introduce shared access.
unsafe impl Send for Interpreter {}

impl Interpreter {
    pub(crate) fn new<P>(path: P, num_threads: Option<i32>) -> Result<Self, Error>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let mut options = Options::new()?;
        options.set_num_threads(num_threads);

        let model = Model::new(path)?;
        let interpreter = check_null_mut(
            // SAFETY: model and options are both valid pointers
            unsafe { tflite_sys::TfLiteInterpreterCreate(model.as_ptr(), options.as_ptr()) },
        )
        .ok_or(Error::CreateInterpreter)?;

        let mut interpreter = Self {
            interpreter,
            _options: options,
            _model: model,
        };
        interpreter.allocate_tensors()?;

        debug!(
            message = "loaded model",
            path = %path.display(),
            inputs = interpreter.get_input_tensor_count()?,
            outputs = interpreter.get_output_tensor_count()?
        );

        Ok(interpreter)
    }

    fn allocate_tensors(&mut self) -> Result<(), Error> {
        tflite_status_to_result(
            unsafe { tflite_sys::TfLiteInterpreterAllocateTensors(self.interpreter) },
            "failed to allocate tensors",
        )
    }

    pub(crate) fn invoke(&mut self) -> Result<(), Error> {
        tflite_status_to_result(
            unsafe { tflite_sys::TfLiteInterpreterInvoke(self.interpreter) },
            "model invocation failed",
        )
    }

    pub(crate) fn get_input_tensor_count(&self) -> Result<usize, Error> {
        usize::try_from(unsafe { tflite_sys::TfLiteInterpreterGetInputTensorCount(self.interpreter) })
            .map_err(Error::GetTensorCount)
    }

    pub(crate) fn get_input_tensor(&mut self, index: usize) -> Result<Tensor<'_>, Error> {
        let index = i32::try_from(index).map_err(Error::GetFfiIndex)?;
        Tensor::new(
            check_null_mut(unsafe {
                tflite_sys::TfLiteInterpreterGetInputTensor(self.interpreter, index)
            })
            .ok_or(Error::GetInputTensor)?,
        )
    }

    pub(crate) fn get_output_tensor_count(&self) -> Result<usize, Error> {
        usize::try_from(unsafe {
            tflite_sys::TfLiteInterpreterGetOutputTensorCount(self.interpreter)
        })
        .map_err(Error::GetTensorCount)
    }

    pub(crate) fn get_output_tensor(&self, index: usize) -> Result<Tensor<'_>, Error> {
        let index = i32::try_from(index).map_err(Error::GetFfiIndex)?;
        Tensor::new(
            check_null(unsafe {
                tflite_sys::TfLiteInterpreterGetOutputTensor(self.interpreter, index)
            })
            .ok_or(Error::GetOutputTensor)? as _,
        )
    }
}

impl Drop for Interpreter {
    fn drop(&mut self) {
        // SAFETY: self.interpreter is guaranteed to be valid.
        unsafe {
            tflite_sys::TfLiteInterpreterDelete(self.interpreter);
        };
    }
}
