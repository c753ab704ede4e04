//! 8-bit floating-point encodings and rowwise quantization.
//!
//! Three layouts are supported:
//! - `E4M3Fnuz`: bias 8, no infinities, single NaN at `0x80`, no negative zero (max 240)
//! - `E4M3Fn`:   bias 7, no infinities, NaN at `S.1111.111` (max 448)
//! - `E5M2`:     bias 15, IEEE-style infinities and NaNs (max 57344)
//!
//! Encoding is round-to-nearest-even with saturation to the largest finite value.
//! Positive codes are monotone in magnitude for all three layouts, so encoding is a
//! binary search over the code space rather than bit manipulation.

use crate::error::{GemmError, Result};
use crate::tensor::Tensor;
use crate::types::{DType, Device};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fp8Format {
    E4M3Fnuz,
    E4M3Fn,
    E5M2,
}

impl Fp8Format {
    #[inline]
    const fn mantissa_bits(self) -> u32 {
        match self {
            Self::E4M3Fnuz | Self::E4M3Fn => 3,
            Self::E5M2 => 2,
        }
    }

    #[inline]
    const fn bias(self) -> i32 {
        match self {
            Self::E4M3Fnuz => 8,
            Self::E4M3Fn => 7,
            Self::E5M2 => 15,
        }
    }

    /// Largest positive finite code.
    #[inline]
    const fn max_code(self) -> u8 {
        match self {
            Self::E4M3Fnuz => 0x7F,
            Self::E4M3Fn => 0x7E,
            Self::E5M2 => 0x7B,
        }
    }

    /// Canonical NaN code.
    #[inline]
    pub const fn nan_code(self) -> u8 {
        match self {
            Self::E4M3Fnuz => 0x80,
            Self::E4M3Fn | Self::E5M2 => 0x7F,
        }
    }

    /// Largest finite magnitude.
    pub fn max(self) -> f32 {
        self.decode(self.max_code())
    }

    /// The buffer dtype carrying this encoding.
    pub const fn dtype(self) -> DType {
        match self {
            Self::E4M3Fnuz => DType::F8E4M3Fnuz,
            Self::E4M3Fn => DType::F8E4M3Fn,
            Self::E5M2 => DType::F8E5M2,
        }
    }

    #[inline]
    pub fn is_nan(self, bits: u8) -> bool {
        match self {
            Self::E4M3Fnuz => bits == 0x80,
            Self::E4M3Fn => bits & 0x7F == 0x7F,
            Self::E5M2 => bits & 0x7F > 0x7C,
        }
    }

    #[inline]
    pub fn decode(self, bits: u8) -> f32 {
        if self.is_nan(bits) {
            return f32::NAN;
        }
        let man_bits = self.mantissa_bits();
        let exp = ((bits & 0x7F) >> man_bits) as i32;
        let man = (bits & ((1u8 << man_bits) - 1)) as f32 / (1u32 << man_bits) as f32;

        let magnitude = if self == Self::E5M2 && exp == 0x1F {
            f32::INFINITY
        } else if exp == 0 {
            man * 2f32.powi(1 - self.bias())
        } else {
            (1.0 + man) * 2f32.powi(exp - self.bias())
        };

        if bits & 0x80 != 0 {
            -magnitude
        } else {
            magnitude
        }
    }

    pub fn encode(self, value: f32) -> u8 {
        if value.is_nan() {
            return self.nan_code();
        }
        let magnitude = value.abs();
        let code = if magnitude >= self.max() {
            self.max_code()
        } else {
            self.nearest_code(magnitude)
        };
        // Zero never carries a sign; for fnuz 0x80 would be NaN.
        if code == 0 || !value.is_sign_negative() {
            code
        } else {
            code | 0x80
        }
    }

    /// Nearest positive code for `0 <= magnitude < max()`, ties to even.
    fn nearest_code(self, magnitude: f32) -> u8 {
        let (mut lo, mut hi) = (0u8, self.max_code());
        // Invariant: decode(lo) <= magnitude < decode(hi)
        while hi - lo > 1 {
            let mid = lo + (hi - lo) / 2;
            if self.decode(mid) <= magnitude {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        let below = magnitude - self.decode(lo);
        let above = self.decode(hi) - magnitude;
        if below < above || (below == above && lo & 1 == 0) {
            lo
        } else {
            hi
        }
    }
}

/// An `[rows, cols]` matrix quantized with one f32 scale per row.
#[derive(Debug, Clone, PartialEq)]
pub struct RowwiseQuantized {
    pub data: Vec<u8>,
    pub scales: Vec<f32>,
    pub rows: usize,
    pub cols: usize,
    pub format: Fp8Format,
}

impl RowwiseQuantized {
    /// The quantized values as an `[rows, cols]` row-major tensor.
    pub fn values_tensor(&self, device: Device) -> Result<Tensor> {
        Tensor::from_bytes(self.data.clone(), self.format.dtype(), &[self.rows, self.cols], device)
    }

    /// The per-row scales as an `[rows]` f32 tensor.
    pub fn scales_tensor(&self, device: Device) -> Result<Tensor> {
        Tensor::from_f32(&self.scales, &[self.rows], device)
    }

    pub fn dequantize(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.rows * self.cols);
        for (row, scale) in self.data.chunks_exact(self.cols.max(1)).zip(&self.scales) {
            out.extend(row.iter().map(|&q| self.format.decode(q) * scale));
        }
        out
    }
}

/// Quantize a row-major `[rows, cols]` matrix with per-row absmax scaling.
///
/// Each row is scaled so its largest magnitude maps onto the format's max finite value.
/// All-zero rows get scale 1.0.
pub fn quantize_rowwise(
    values: &[f32],
    rows: usize,
    cols: usize,
    format: Fp8Format,
) -> Result<RowwiseQuantized> {
    let expected = rows
        .checked_mul(cols)
        .ok_or_else(|| GemmError::ShapeMismatch("rows * cols overflow".into()))?;
    if values.len() != expected {
        return Err(GemmError::ShapeMismatch(format!(
            "values len {} != rows {} * cols {}",
            values.len(),
            rows,
            cols
        )));
    }

    let fmax = format.max();
    let mut data = Vec::with_capacity(expected);
    let mut scales = Vec::with_capacity(rows);

    for r in 0..rows {
        let row = &values[r * cols..(r + 1) * cols];
        let amax = row.iter().fold(0.0f32, |acc, v| acc.max(v.abs()));
        if !amax.is_finite() || row.iter().any(|v| v.is_nan()) {
            return Err(GemmError::InvalidConfig(format!(
                "row {r} contains a non-finite value"
            )));
        }
        let scale = if amax == 0.0 { 1.0 } else { amax / fmax };
        data.extend(row.iter().map(|&v| format.encode(v / scale)));
        scales.push(scale);
    }

    Ok(RowwiseQuantized {
        data,
        scales,
        rows,
        cols,
        format,
    })
}
