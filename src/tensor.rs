//! Strided buffer descriptors for GEMM operands.
//!
//! `Tensor` owns its bytes; `TensorRef` / `TensorMut` borrow them with their own
//! shape and strides, so a transpose is a metadata swap. Storage is always host memory
//! tagged with the device it belongs to; a device library maps it to its own pointers.

use half::{bf16, f16};

use crate::error::{GemmError, Result};
use crate::types::{DType, Device};

fn contiguous_strides(shape: &[usize]) -> Vec<usize> {
    let mut strides = vec![1usize; shape.len()];
    for i in (0..shape.len().saturating_sub(1)).rev() {
        // Saturates only for empty shapes, which are never indexed.
        strides[i] = strides[i + 1].saturating_mul(shape[i + 1]);
    }
    strides
}

/// Product of `dims`, `None` on overflow. Any zero dim makes the product zero.
pub(crate) fn checked_product(dims: &[usize]) -> Option<usize> {
    if dims.contains(&0) {
        return Some(0);
    }
    dims.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d))
}

/// Element count of a shape already checked by `checked_numel`.
fn numel_of(shape: &[usize]) -> usize {
    if shape.contains(&0) {
        0
    } else {
        shape.iter().product()
    }
}

fn checked_numel(shape: &[usize]) -> Result<usize> {
    checked_product(shape)
        .ok_or_else(|| GemmError::ShapeMismatch(format!("numel overflow for shape {shape:?}")))
}

/// Number of bytes a strided view needs to be addressable.
fn required_bytes(shape: &[usize], strides: &[usize], dtype: DType) -> Result<usize> {
    if shape.contains(&0) {
        return Ok(0);
    }
    let overflow = || {
        GemmError::ShapeMismatch(format!(
            "view extent overflows for shape {shape:?} and strides {strides:?}"
        ))
    };
    let last = shape
        .iter()
        .zip(strides)
        .try_fold(0usize, |acc, (&d, &s)| (d - 1).checked_mul(s)?.checked_add(acc))
        .ok_or_else(overflow)?;
    last.checked_add(1)
        .and_then(|elems| elems.checked_mul(dtype.size_bytes()))
        .ok_or_else(overflow)
}

/// Checks shared by the borrowed view constructors.
fn check_view(len: usize, dtype: DType, shape: &[usize], strides: &[usize]) -> Result<()> {
    if shape.len() != strides.len() {
        return Err(GemmError::ShapeMismatch(format!(
            "shape {shape:?} and strides {strides:?} differ in rank"
        )));
    }
    checked_numel(shape)?;
    let needed = required_bytes(shape, strides, dtype)?;
    if len < needed {
        return Err(GemmError::ShapeMismatch(format!(
            "view needs {needed} bytes, buffer has {len}"
        )));
    }
    Ok(())
}

/// Element offsets of a strided view in logical row-major order.
fn logical_offsets(shape: &[usize], strides: &[usize]) -> Vec<usize> {
    let numel = numel_of(shape);
    let mut offsets = Vec::with_capacity(numel);
    if numel == 0 {
        return offsets;
    }
    let mut index = vec![0usize; shape.len()];
    for _ in 0..numel {
        offsets.push(index.iter().zip(strides).map(|(i, s)| i * s).sum());
        for axis in (0..shape.len()).rev() {
            index[axis] += 1;
            if index[axis] < shape[axis] {
                break;
            }
            index[axis] = 0;
        }
    }
    offsets
}

fn is_contiguous(shape: &[usize], strides: &[usize]) -> bool {
    let mut expected = 1usize;
    for (&d, &s) in shape.iter().zip(strides).rev() {
        // Size-1 axes place no constraint on their stride.
        if d != 1 && s != expected {
            return false;
        }
        expected = expected.saturating_mul(d);
    }
    true
}

fn read_f32(bytes: &[u8], offset: usize, dtype: DType) -> f32 {
    let size = dtype.size_bytes();
    let b = &bytes[offset * size..(offset + 1) * size];
    match dtype {
        DType::F32 => f32::from_le_bytes([b[0], b[1], b[2], b[3]]),
        DType::BF16 => bf16::from_le_bytes([b[0], b[1]]).to_f32(),
        DType::F16 => f16::from_le_bytes([b[0], b[1]]).to_f32(),
        DType::F8E4M3Fnuz | DType::F8E4M3Fn | DType::F8E5M2 => match dtype.fp8_format() {
            Some(format) => format.decode(b[0]),
            None => f32::NAN,
        },
    }
}

fn write_f32(bytes: &mut [u8], offset: usize, dtype: DType, value: f32) {
    let size = dtype.size_bytes();
    let b = &mut bytes[offset * size..(offset + 1) * size];
    match dtype {
        DType::F32 => b.copy_from_slice(&value.to_le_bytes()),
        DType::BF16 => b.copy_from_slice(&bf16::from_f32(value).to_le_bytes()),
        DType::F16 => b.copy_from_slice(&f16::from_f32(value).to_le_bytes()),
        DType::F8E4M3Fnuz | DType::F8E4M3Fn | DType::F8E5M2 => {
            if let Some(format) = dtype.fp8_format() {
                b[0] = format.encode(value);
            }
        }
    }
}

/// An owned, row-major buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    data: Vec<u8>,
    dtype: DType,
    device: Device,
    shape: Vec<usize>,
}

impl Tensor {
    /// Wrap raw little-endian element bytes.
    pub fn from_bytes(data: Vec<u8>, dtype: DType, shape: &[usize], device: Device) -> Result<Self> {
        let expected = checked_numel(shape)?
            .checked_mul(dtype.size_bytes())
            .ok_or_else(|| GemmError::ShapeMismatch("byte length overflow".into()))?;
        if data.len() != expected {
            return Err(GemmError::ShapeMismatch(format!(
                "{} bytes for {dtype} shape {shape:?}, expected {expected}",
                data.len()
            )));
        }
        Ok(Self {
            data,
            dtype,
            device,
            shape: shape.to_vec(),
        })
    }

    pub fn zeros(shape: &[usize], dtype: DType, device: Device) -> Result<Self> {
        let bytes = checked_numel(shape)?
            .checked_mul(dtype.size_bytes())
            .ok_or_else(|| GemmError::ShapeMismatch("byte length overflow".into()))?;
        Self::from_bytes(vec![0u8; bytes], dtype, shape, device)
    }

    pub fn from_f32(values: &[f32], shape: &[usize], device: Device) -> Result<Self> {
        Self::from_f32_as(values, shape, DType::F32, device)
    }

    /// Convert `values` into `dtype` (rounding as that dtype rounds).
    pub fn from_f32_as(values: &[f32], shape: &[usize], dtype: DType, device: Device) -> Result<Self> {
        let mut t = Self::zeros(shape, dtype, device)?;
        if values.len() != t.numel() {
            return Err(GemmError::ShapeMismatch(format!(
                "{} values for shape {shape:?}",
                values.len()
            )));
        }
        for (i, &v) in values.iter().enumerate() {
            write_f32(&mut t.data, i, dtype, v);
        }
        Ok(t)
    }

    #[inline]
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    #[inline]
    pub fn device(&self) -> Device {
        self.device
    }

    #[inline]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    #[inline]
    pub fn numel(&self) -> usize {
        numel_of(&self.shape)
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn view(&self) -> TensorRef<'_> {
        TensorRef {
            data: &self.data,
            dtype: self.dtype,
            device: self.device,
            strides: contiguous_strides(&self.shape),
            shape: self.shape.clone(),
        }
    }

    pub fn view_mut(&mut self) -> TensorMut<'_> {
        TensorMut {
            strides: contiguous_strides(&self.shape),
            shape: self.shape.clone(),
            data: &mut self.data,
            dtype: self.dtype,
            device: self.device,
        }
    }

    pub fn to_f32_vec(&self) -> Vec<f32> {
        (0..self.numel())
            .map(|i| read_f32(&self.data, i, self.dtype))
            .collect()
    }
}

/// A borrowed strided view.
#[derive(Debug, Clone)]
pub struct TensorRef<'a> {
    data: &'a [u8],
    dtype: DType,
    device: Device,
    shape: Vec<usize>,
    strides: Vec<usize>,
}

impl<'a> TensorRef<'a> {
    /// Build a view over `data` with explicit element strides.
    pub fn strided(
        data: &'a [u8],
        dtype: DType,
        device: Device,
        shape: &[usize],
        strides: &[usize],
    ) -> Result<Self> {
        check_view(data.len(), dtype, shape, strides)?;
        Ok(Self {
            data,
            dtype,
            device,
            shape: shape.to_vec(),
            strides: strides.to_vec(),
        })
    }

    #[inline]
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    #[inline]
    pub fn device(&self) -> Device {
        self.device
    }

    #[inline]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    #[inline]
    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.shape.len()
    }

    #[inline]
    pub fn numel(&self) -> usize {
        numel_of(&self.shape)
    }

    #[inline]
    pub fn as_bytes(&self) -> &'a [u8] {
        self.data
    }

    pub fn is_contiguous(&self) -> bool {
        is_contiguous(&self.shape, &self.strides)
    }

    /// Swap two dimensions without touching the data.
    pub fn transpose(&self, d0: usize, d1: usize) -> Result<Self> {
        if d0 >= self.dim() || d1 >= self.dim() {
            return Err(GemmError::ShapeMismatch(format!(
                "cannot transpose dims ({d0}, {d1}) of a {}-d view",
                self.dim()
            )));
        }
        let mut view = self.clone();
        view.shape.swap(d0, d1);
        view.strides.swap(d0, d1);
        Ok(view)
    }

    /// Transpose of a 2-d view.
    pub fn t(&self) -> Result<Self> {
        if self.dim() != 2 {
            return Err(GemmError::ShapeMismatch(format!(
                "t() expects a 2-d view, got shape {:?}",
                self.shape
            )));
        }
        self.transpose(0, 1)
    }

    /// All elements in logical row-major order, widened to f32.
    pub fn to_f32_vec(&self) -> Vec<f32> {
        logical_offsets(&self.shape, &self.strides)
            .into_iter()
            .map(|off| read_f32(self.data, off, self.dtype))
            .collect()
    }
}

/// A mutable borrowed strided view.
#[derive(Debug)]
pub struct TensorMut<'a> {
    data: &'a mut [u8],
    dtype: DType,
    device: Device,
    shape: Vec<usize>,
    strides: Vec<usize>,
}

impl<'a> TensorMut<'a> {
    pub fn strided(
        data: &'a mut [u8],
        dtype: DType,
        device: Device,
        shape: &[usize],
        strides: &[usize],
    ) -> Result<Self> {
        check_view(data.len(), dtype, shape, strides)?;
        Ok(Self {
            data,
            dtype,
            device,
            shape: shape.to_vec(),
            strides: strides.to_vec(),
        })
    }

    #[inline]
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    #[inline]
    pub fn device(&self) -> Device {
        self.device
    }

    #[inline]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    #[inline]
    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    #[inline]
    pub fn numel(&self) -> usize {
        numel_of(&self.shape)
    }

    pub fn is_contiguous(&self) -> bool {
        is_contiguous(&self.shape, &self.strides)
    }

    /// Store `values` (logical row-major order) converting to this view's dtype.
    pub fn store_f32(&mut self, values: &[f32]) -> Result<()> {
        if values.len() != self.numel() {
            return Err(GemmError::ShapeMismatch(format!(
                "storing {} values into shape {:?}",
                values.len(),
                self.shape
            )));
        }
        for (off, &v) in logical_offsets(&self.shape, &self.strides).into_iter().zip(values) {
            write_f32(&mut *self.data, off, self.dtype, v);
        }
        Ok(())
    }

    pub fn to_f32_vec(&self) -> Vec<f32> {
        logical_offsets(&self.shape, &self.strides)
            .into_iter()
            .map(|off| read_f32(&*self.data, off, self.dtype))
            .collect()
    }
}
