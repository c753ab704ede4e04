use thiserror::Error;

use crate::types::{DType, Device};

#[derive(Debug, Error)]
pub enum GemmError {
    #[error("{operand} must be {expected}, got {actual}")]
    FormatMismatch {
        operand: &'static str,
        expected: DType,
        actual: DType,
    },
    #[error("{operand} has an unsupported layout: {reason}")]
    LayoutMismatch {
        operand: &'static str,
        reason: String,
    },
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),
    #[error("{operand} resides on {device}, which the kernel library cannot address")]
    DeviceMismatch {
        operand: &'static str,
        device: Device,
    },
    #[error("bias is not supported by rowwise fp8 kernels")]
    UnsupportedBias,
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("kernel error: {0}")]
    Kernel(String),
}

impl GemmError {
    /// True for every error raised by operand validation before dispatch.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(
            self,
            GemmError::FormatMismatch { .. }
                | GemmError::LayoutMismatch { .. }
                | GemmError::ShapeMismatch(_)
                | GemmError::DeviceMismatch { .. }
                | GemmError::UnsupportedBias
        )
    }
}

pub type Result<T> = std::result::Result<T, GemmError>;
