use crate::{
    error::{check_null_mut, tflite_status_to_result, Error},
    tflite_sys,
};
use std::{convert::TryFrom, marker::PhantomData, mem::size_of};

fn dim(tensor: *const tflite_sys::TfLiteTensor, index: usize) -> Result<usize, Error> {
    assert!(!tensor.is_null());
    let dims = num_dims(tensor)?;
    if index >= dims {
        return Err(Error::GetDim(index, dims));
    }

    let index = i32::try_from(index).map_err(Error::GetFfiIndex)?;
    // SAFETY: tensor is non-null and owned by a live interpreter
    usize::try_from(unsafe { tflite_sys::TfLiteTensorDim(tensor, index) })
        .map_err(Error::ConvertDimI32ToUSize)
}

fn num_dims(tensor: *const tflite_sys::TfLiteTensor) -> Result<usize, Error> {
    assert!(!tensor.is_null());
    // SAFETY: tensor is non-null and owned by a live interpreter
    usize::try_from(unsafe { tflite_sys::TfLiteTensorNumDims(tensor) }).map_err(Error::GetNumDims)
}

/// A safe wrapper around TfLiteTensor.
pub(crate) struct Tensor<'interp> {
    tensor: *mut tflite_sys::TfLiteTensor,
    len: usize,
    // Data are owned by the interpreter that allocated the tensor.
    _p: PhantomData<&'interp ()>,
}

impl<'interp> Tensor<'interp> {
    pub(super) fn new(tensor: *mut tflite_sys::TfLiteTensor) -> Result<Self, Error> {
        let tensor = check_null_mut(tensor).ok_or(Error::CreateTensor)?;
        Ok(Self {
            tensor,
            len: (0..num_dims(tensor)?).try_fold(1, |size, d| Ok(size * dim(tensor, d)?))?,
            _p: Default::default(),
        })
    }

    pub(crate) fn r#type(&self) -> tflite_sys::TfLiteType {
        unsafe { tflite_sys::TfLiteTensorType(self.tensor) }
    }

    pub(crate) fn dims(&self) -> Result<Vec<usize>, Error> {
        (0..num_dims(self.tensor)?)
            .map(|d| dim(self.tensor, d))
            .collect()
    }

    /// Number of elements.
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    fn quantization_params(&self) -> tflite_sys::TfLiteQuantizationParams {
        unsafe { tflite_sys::TfLiteTensorQuantizationParams(self.tensor) }
    }

    pub(crate) fn as_f32_slice(&self) -> Result<&[f32], Error> {
        let typ = self.r#type();
        if typ != tflite_sys::TfLiteType::kTfLiteFloat32 {
            return Err(Error::GetTensorSlice(typ));
        }
        // SAFETY: the tensor holds `len` f32 values, checked above
        Ok(unsafe {
            std::slice::from_raw_parts(tflite_sys::TfLiteTensorData(self.tensor) as _, self.len)
        })
    }

    fn as_u8_slice(&self) -> Result<&[u8], Error> {
        let typ = self.r#type();
        if typ != tflite_sys::TfLiteType::kTfLiteUInt8 {
            return Err(Error::GetTensorSlice(typ));
        }
        // SAFETY: the tensor holds `len` u8 values, checked above
        Ok(unsafe {
            std::slice::from_raw_parts(tflite_sys::TfLiteTensorData(self.tensor) as _, self.len)
        })
    }

    /// Tensor values as floats, dequantizing uint8 tensors.
    pub(crate) fn to_f32_vec(&self) -> Result<Vec<f32>, Error> {
        if self.r#type() == tflite_sys::TfLiteType::kTfLiteUInt8 {
            let tflite_sys::TfLiteQuantizationParams { zero_point, scale } =
                self.quantization_params();
            let zero_point = zero_point as f32;
            return Ok(self
                .as_u8_slice()?
                .iter()
                .map(|&value| (f32::from(value) - zero_point) * scale)
                .collect());
        }
        Ok(self.as_f32_slice()?.to_vec())
    }

    fn copy_from_raw(&mut self, data: *const std::os::raw::c_void, num_bytes: usize) -> Result<(), Error> {
        // SAFETY: data points to num_bytes readable bytes and the tensor is valid
        tflite_status_to_result(
            unsafe { tflite_sys::TfLiteTensorCopyFromBuffer(self.tensor, data, num_bytes) },
            "failed to copy from input buffer",
        )
    }

    pub(crate) fn copy_from_u8(&mut self, values: &[u8]) -> Result<(), Error> {
        let typ = self.r#type();
        if typ != tflite_sys::TfLiteType::kTfLiteUInt8 {
            return Err(Error::GetTensorSlice(typ));
        }
        if values.len() != self.len {
            return Err(Error::TensorSize(self.len, values.len()));
        }
        self.copy_from_raw(values.as_ptr().cast(), values.len())
    }

    pub(crate) fn copy_from_f32(&mut self, values: &[f32]) -> Result<(), Error> {
        let typ = self.r#type();
        if typ != tflite_sys::TfLiteType::kTfLiteFloat32 {
            return Err(Error::GetTensorSlice(typ));
        }
        if values.len() != self.len {
            return Err(Error::TensorSize(self.len, values.len()));
        }
        self.copy_from_raw(values.as_ptr().cast(), values.len() * size_of::<f32>())
    }
}
