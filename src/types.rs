//! Element formats and device placement for GEMM operands.

use std::fmt;

use crate::fp8::Fp8Format;

/// Element format of a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    /// FP8 E4M3, finite-only, unsigned zero (MI300 native).
    F8E4M3Fnuz,
    /// FP8 E4M3, finite-only, OCP layout.
    F8E4M3Fn,
    /// FP8 E5M2, IEEE-like with infinities.
    F8E5M2,
    /// 16-bit Brain Float.
    BF16,
    /// 16-bit IEEE half.
    F16,
    /// 32-bit IEEE single.
    F32,
}

impl DType {
    /// Size in bytes per element.
    pub const fn size_bytes(self) -> usize {
        match self {
            Self::F8E4M3Fnuz | Self::F8E4M3Fn | Self::F8E5M2 => 1,
            Self::BF16 | Self::F16 => 2,
            Self::F32 => 4,
        }
    }

    /// The FP8 encoding behind this dtype, if it is an 8-bit float.
    pub const fn fp8_format(self) -> Option<Fp8Format> {
        match self {
            Self::F8E4M3Fnuz => Some(Fp8Format::E4M3Fnuz),
            Self::F8E4M3Fn => Some(Fp8Format::E4M3Fn),
            Self::F8E5M2 => Some(Fp8Format::E5M2),
            _ => None,
        }
    }

    pub const fn is_fp8(self) -> bool {
        self.fp8_format().is_some()
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::F8E4M3Fnuz => "float8_e4m3fnuz",
            Self::F8E4M3Fn => "float8_e4m3fn",
            Self::F8E5M2 => "float8_e5m2",
            Self::BF16 => "bf16",
            Self::F16 => "f16",
            Self::F32 => "f32",
        };
        write!(f, "{name}")
    }
}

/// Where a buffer lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Device {
    #[default]
    Cpu,
    Rocm(u32),
    Cuda(u32),
}

impl Device {
    pub fn is_cpu(&self) -> bool {
        matches!(self, Device::Cpu)
    }

    /// Whether this is a GPU device of any vendor.
    pub fn is_accelerator(&self) -> bool {
        matches!(self, Device::Rocm(_) | Device::Cuda(_))
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => write!(f, "cpu"),
            Device::Rocm(idx) => write!(f, "rocm:{idx}"),
            Device::Cuda(idx) => write!(f, "cuda:{idx}"),
        }
    }
}
