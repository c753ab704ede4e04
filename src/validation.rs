//! Operand validation for the rowwise FP8 GEMM wrapper.
//!
//! Everything here runs before dispatch: a call that fails validation never selects
//! or launches a kernel. Checks run in a fixed order (bias, formats, devices, layouts,
//! shapes) so the reported error is stable for a given set of operands.
//!
//! # Operand contract
//!
//! | operand   | format          | layout                                    |
//! |-----------|-----------------|-------------------------------------------|
//! | `xq`      | `F8E4M3Fnuz`    | contiguous `[.., K]`                      |
//! | `wq`      | `F8E4M3Fnuz`    | 2-d `[K, N]` view of a row-major `[N, K]` |
//! | `x_scale` | `F32`           | `M` elements                              |
//! | `w_scale` | `F32`           | `N` elements                              |
//! | `out`     | `BF16`          | contiguous `[.., N]` with `M` leading rows |

use crate::error::{GemmError, Result};
use crate::tensor::{checked_product, TensorMut, TensorRef};
use crate::types::{DType, Device};

/// Designated 8-bit input format.
pub const INPUT_DTYPE: DType = DType::F8E4M3Fnuz;
/// Designated scale format.
pub const SCALE_DTYPE: DType = DType::F32;
/// Designated output format.
pub const OUTPUT_DTYPE: DType = DType::BF16;

/// Problem size derived from validated operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GemmDims {
    pub m: usize,
    pub n: usize,
    pub k: usize,
}

impl GemmDims {
    /// Zero-row or zero-column problems have nothing to compute.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.m == 0 || self.n == 0
    }
}

#[inline]
pub fn check_dtype(operand: &'static str, actual: DType, expected: DType) -> Result<()> {
    if actual != expected {
        return Err(GemmError::FormatMismatch {
            operand,
            expected,
            actual,
        });
    }
    Ok(())
}

/// All operands must share one device that `can_address` accepts.
fn check_devices(
    devices: &[(&'static str, Device)],
    can_address: impl Fn(Device) -> bool,
) -> Result<()> {
    let Some(&(_, home)) = devices.first() else {
        return Ok(());
    };
    for &(operand, device) in devices {
        if device != home || !can_address(device) {
            return Err(GemmError::DeviceMismatch { operand, device });
        }
    }
    Ok(())
}

fn leading_rows(operand: &str, shape: &[usize]) -> Result<usize> {
    checked_product(&shape[..shape.len().saturating_sub(1)]).ok_or_else(|| {
        GemmError::ShapeMismatch(format!("{operand} row count overflows for shape {shape:?}"))
    })
}

/// Validate the wrapper operands and derive `(M, N, K)`.
pub fn validate_operands(
    xq: &TensorRef<'_>,
    wq: &TensorRef<'_>,
    x_scale: &TensorRef<'_>,
    w_scale: &TensorRef<'_>,
    bias: Option<&TensorRef<'_>>,
    out: &TensorMut<'_>,
    can_address: impl Fn(Device) -> bool,
) -> Result<GemmDims> {
    if bias.is_some() {
        return Err(GemmError::UnsupportedBias);
    }

    check_dtype("xq", xq.dtype(), INPUT_DTYPE)?;
    check_dtype("wq", wq.dtype(), INPUT_DTYPE)?;
    check_dtype("x_scale", x_scale.dtype(), SCALE_DTYPE)?;
    check_dtype("w_scale", w_scale.dtype(), SCALE_DTYPE)?;
    check_dtype("out", out.dtype(), OUTPUT_DTYPE)?;

    check_devices(
        &[
            ("xq", xq.device()),
            ("wq", wq.device()),
            ("x_scale", x_scale.device()),
            ("w_scale", w_scale.device()),
            ("out", out.device()),
        ],
        can_address,
    )?;

    if xq.dim() == 0 {
        return Err(GemmError::ShapeMismatch("xq must have at least one dimension".into()));
    }
    if !xq.is_contiguous() {
        return Err(GemmError::LayoutMismatch {
            operand: "xq",
            reason: format!(
                "expected contiguous row-major storage, got strides {:?} for shape {:?}",
                xq.strides(),
                xq.shape()
            ),
        });
    }
    if wq.dim() != 2 {
        return Err(GemmError::ShapeMismatch(format!(
            "wq must be 2-d [K, N], got shape {:?}",
            wq.shape()
        )));
    }
    let wt = wq.t()?;
    if !wt.is_contiguous() {
        return Err(GemmError::LayoutMismatch {
            operand: "wq",
            reason: format!(
                "expected the transpose of a row-major [N, K] buffer, got strides {:?} for shape {:?}",
                wq.strides(),
                wq.shape()
            ),
        });
    }
    // Overlapping or padded output rows would lose results.
    if !out.is_contiguous() {
        return Err(GemmError::LayoutMismatch {
            operand: "out",
            reason: format!(
                "expected contiguous row-major storage, got strides {:?} for shape {:?}",
                out.strides(),
                out.shape()
            ),
        });
    }

    let n = wt.shape()[0];
    let k = wt.shape()[1];
    if k == 0 {
        return Err(GemmError::ShapeMismatch("K must be at least 1".into()));
    }

    let xq_k = xq.shape()[xq.dim() - 1];
    if xq_k != k {
        return Err(GemmError::ShapeMismatch(format!(
            "xq inner dimension {xq_k} does not match K = {k} from wq"
        )));
    }
    let m = leading_rows("xq", xq.shape())?;

    if x_scale.numel() != m {
        return Err(GemmError::ShapeMismatch(format!(
            "x_scale has {} elements, expected M = {m}",
            x_scale.numel()
        )));
    }
    if w_scale.numel() != n {
        return Err(GemmError::ShapeMismatch(format!(
            "w_scale has {} elements, expected N = {n}",
            w_scale.numel()
        )));
    }

    let out_shape = out.shape();
    let Some(&out_n) = out_shape.last() else {
        return Err(GemmError::ShapeMismatch("out must have at least one dimension".into()));
    };
    if out_n != n {
        return Err(GemmError::ShapeMismatch(format!(
            "out trailing dimension {out_n} does not match N = {n}"
        )));
    }
    let out_m = leading_rows("out", out_shape)?;
    if out_m != m {
        return Err(GemmError::ShapeMismatch(format!(
            "out has {out_m} rows, expected M = {m}"
        )));
    }

    Ok(GemmDims { m, n, k })
}
