//! gllm-fp8-gemm: shape-driven kernel dispatch for rowwise-scaled FP8 GEMM.
//!
//! `out[M, N] = bf16((XQ[M, K] @ WQ[N, K]^T) * x_scale[M] * w_scale[N])`
//!
//! - **Curated Registry**: exact `(M, N, K)` matches for production LLM shapes
//! - **Bucketing**: small batches share the entry of the next tuned row tile
//! - **Heuristic Fallback**: ten ordered rules cover every other shape
//! - **Kernel Library**: `KernelId`-indexed handles behind one five-argument contract
//!
//! # Quick Start
//!
//! ```ignore
//! use gllm_fp8_gemm::{f8f8bf16_rowwise, quantize_rowwise, DType, Device, Fp8Format, Tensor};
//!
//! let x = quantize_rowwise(&activations, m, k, Fp8Format::E4M3Fnuz)?;
//! let w = quantize_rowwise(&weights, n, k, Fp8Format::E4M3Fnuz)?;
//! let (xq, wq) = (x.values_tensor(Device::Cpu)?, w.values_tensor(Device::Cpu)?);
//! let (xs, ws) = (x.scales_tensor(Device::Cpu)?, w.scales_tensor(Device::Cpu)?);
//! let mut out = Tensor::zeros(&[m, n], DType::BF16, Device::Cpu)?;
//! let wq = wq.view();
//! f8f8bf16_rowwise(&xq.view(), &wq.t()?, &xs.view(), &ws.view(), None, false, &mut out.view_mut())?;
//! ```

pub mod config;
pub mod cpu_kernels;
pub mod dispatch;
pub mod error;
pub mod fp8;
pub mod kernel_library;
pub mod kernel_types;
pub mod rowwise_gemm;
pub mod tensor;
pub mod types;
pub mod validation;

pub use config::DispatchConfig;
pub use dispatch::{
    bucket, dispatch, lookup, select, select_rule, DispatchDecision, DispatchSource, Dispatcher,
    HeuristicRule, KernelRegistry, ShapeKey,
};
pub use error::{GemmError, Result};
pub use fp8::{quantize_rowwise, Fp8Format, RowwiseQuantized};
pub use kernel_library::{KernelLibrary, RowwiseKernel};
pub use kernel_types::{KernelId, Pipeline, Scheduler, TileConfig};
pub use rowwise_gemm::{f8f8bf16_rowwise, RowwiseGemm};
pub use tensor::{Tensor, TensorMut, TensorRef};
pub use types::{DType, Device};
