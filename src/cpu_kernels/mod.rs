//! Host reference kernels.
//!
//! Every `KernelId` has a CPU implementation with the same five-argument contract as
//! the device kernels. They exist for bring-up, testing and hosts without an
//! accelerator; tiling comes from the variant's `TileConfig` so each one walks the
//! problem in the order its device counterpart would.

pub mod rowwise;

pub use rowwise::HostRowwiseKernel;

use std::sync::OnceLock;

use crate::error::{GemmError, Result};
use crate::fp8::Fp8Format;
use crate::types::DType;

static E4M3FNUZ_TABLE: OnceLock<[f32; 256]> = OnceLock::new();
static E4M3FN_TABLE: OnceLock<[f32; 256]> = OnceLock::new();
static E5M2_TABLE: OnceLock<[f32; 256]> = OnceLock::new();

/// Code-to-value lookup table for an 8-bit float format, built on first use.
pub fn decode_table(format: Fp8Format) -> &'static [f32; 256] {
    let cell = match format {
        Fp8Format::E4M3Fnuz => &E4M3FNUZ_TABLE,
        Fp8Format::E4M3Fn => &E4M3FN_TABLE,
        Fp8Format::E5M2 => &E5M2_TABLE,
    };
    cell.get_or_init(|| std::array::from_fn(|code| format.decode(code as u8)))
}

/// Decode table for an operand, or a kernel error if it is not an 8-bit float.
pub(crate) fn operand_table(operand: &str, dtype: DType) -> Result<&'static [f32; 256]> {
    dtype
        .fp8_format()
        .map(decode_table)
        .ok_or_else(|| GemmError::Kernel(format!("{operand}: expected an 8-bit float, got {dtype}")))
}
