//! Rowwise-scaled FP8 GEMM entry point.
//!
//! Validates operands, derives `(M, N, K)`, asks the dispatcher for a kernel and
//! launches it from the kernel library. Validation always completes before a kernel
//! is selected.

use crate::dispatch::{DispatchDecision, Dispatcher};
use crate::error::Result;
use crate::kernel_library::{KernelLibrary, RowwiseKernel};
use crate::tensor::{TensorMut, TensorRef};
use crate::validation::validate_operands;

/// A dispatcher paired with the library its decisions resolve against.
#[derive(Debug, Clone, Copy)]
pub struct RowwiseGemm<'a> {
    dispatcher: &'a Dispatcher,
    library: &'a KernelLibrary,
}

impl<'a> RowwiseGemm<'a> {
    pub fn new(dispatcher: &'a Dispatcher, library: &'a KernelLibrary) -> Self {
        Self {
            dispatcher,
            library,
        }
    }

    #[inline]
    pub fn dispatcher(&self) -> &'a Dispatcher {
        self.dispatcher
    }

    #[inline]
    pub fn library(&self) -> &'a KernelLibrary {
        self.library
    }

    /// Compute `out = (xq @ wq) * x_scale * w_scale` in bf16.
    ///
    /// `wq` is the `[K, N]` transposed view of a row-major `[N, K]` weight buffer.
    #[allow(clippy::too_many_arguments)]
    pub fn run(
        &self,
        xq: &TensorRef<'_>,
        wq: &TensorRef<'_>,
        x_scale: &TensorRef<'_>,
        w_scale: &TensorRef<'_>,
        bias: Option<&TensorRef<'_>>,
        use_fast_accum: bool,
        out: &mut TensorMut<'_>,
    ) -> Result<()> {
        self.run_traced(xq, wq, x_scale, w_scale, bias, use_fast_accum, out)
            .map(|_| ())
    }

    /// Like [`run`](Self::run), returning the dispatch decision.
    ///
    /// `None` means the problem had no rows or columns and nothing was launched.
    #[allow(clippy::too_many_arguments)]
    pub fn run_traced(
        &self,
        xq: &TensorRef<'_>,
        wq: &TensorRef<'_>,
        x_scale: &TensorRef<'_>,
        w_scale: &TensorRef<'_>,
        bias: Option<&TensorRef<'_>>,
        use_fast_accum: bool,
        out: &mut TensorMut<'_>,
    ) -> Result<Option<DispatchDecision>> {
        let dims = validate_operands(xq, wq, x_scale, w_scale, bias, out, |device| {
            self.library.can_address(device)
        })?;

        // Every variant accumulates in f32; the flag has no separate code path.
        log::trace!("f8f8bf16_rowwise use_fast_accum={use_fast_accum}");

        if dims.is_empty() {
            log::debug!("f8f8bf16_rowwise: empty problem {}x{}x{}, skipping", dims.m, dims.n, dims.k);
            return Ok(None);
        }

        let decision = self.dispatcher.decide(dims.m, dims.n, dims.k);
        self.library
            .resolve(decision.kernel)
            .launch(xq, wq, x_scale, w_scale, out)?;
        Ok(Some(decision))
    }
}

impl RowwiseGemm<'static> {
    /// Process-wide dispatcher and kernel library.
    pub fn global() -> Self {
        Self::new(Dispatcher::global(), KernelLibrary::global())
    }
}

/// `out = (xq @ wq) * x_scale * w_scale` in bf16 through the process-wide dispatcher.
///
/// - `xq`: `F8E4M3Fnuz`, contiguous `[.., K]`
/// - `wq`: `F8E4M3Fnuz`, the `[K, N]` transpose of a row-major `[N, K]` buffer
/// - `x_scale`: `F32`, `M` elements; `w_scale`: `F32`, `N` elements
/// - `bias`: must be `None`
/// - `out`: `BF16`, `[.., N]` with `M` leading rows, caller-allocated
pub fn f8f8bf16_rowwise(
    xq: &TensorRef<'_>,
    wq: &TensorRef<'_>,
    x_scale: &TensorRef<'_>,
    w_scale: &TensorRef<'_>,
    bias: Option<&TensorRef<'_>>,
    use_fast_accum: bool,
    out: &mut TensorMut<'_>,
) -> Result<()> {
    RowwiseGemm::global().run(xq, wq, x_scale, w_scale, bias, use_fast_accum, out)
}
