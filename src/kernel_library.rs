//! Kernel handle table.
//!
//! A `KernelLibrary` maps every `KernelId` to something that can launch it. The
//! dispatcher only ever produces ids; resolution to a launchable kernel happens here,
//! through a dense table indexed by `KernelId::index()`.
//!
//! The process-wide library is chosen once on first use. Device libraries plug in
//! through `KernelLibrary::new`; the built-in one is the host reference library.

use std::fmt;
use std::sync::OnceLock;

use crate::cpu_kernels::HostRowwiseKernel;
use crate::error::{GemmError, Result};
use crate::kernel_types::KernelId;
use crate::tensor::{TensorMut, TensorRef};
use crate::types::Device;

/// The fixed calling contract shared by every kernel variant.
///
/// `wq` is the `[K, N]` transposed view of a row-major `[N, K]` weight buffer.
/// Kernels are stateless and may be launched concurrently.
pub trait RowwiseKernel: Send + Sync {
    fn id(&self) -> KernelId;

    fn launch(
        &self,
        xq: &TensorRef<'_>,
        wq: &TensorRef<'_>,
        x_scale: &TensorRef<'_>,
        w_scale: &TensorRef<'_>,
        out: &mut TensorMut<'_>,
    ) -> Result<()>;
}

/// Dense `KernelId -> kernel` table plus the devices it can address.
pub struct KernelLibrary {
    name: &'static str,
    addressable: fn(Device) -> bool,
    kernels: Vec<Box<dyn RowwiseKernel>>,
}

impl fmt::Debug for KernelLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KernelLibrary")
            .field("name", &self.name)
            .field("kernels", &self.kernels.len())
            .finish()
    }
}

impl KernelLibrary {
    /// Build a library by asking `factory` for each variant.
    ///
    /// Fails if the factory returns a kernel whose `id()` differs from the one requested.
    pub fn new(
        name: &'static str,
        addressable: fn(Device) -> bool,
        factory: impl Fn(KernelId) -> Box<dyn RowwiseKernel>,
    ) -> Result<Self> {
        let mut kernels = Vec::with_capacity(KernelId::COUNT);
        for id in KernelId::ALL {
            let kernel = factory(id);
            if kernel.id() != id {
                return Err(GemmError::InvalidConfig(format!(
                    "library {name}: factory returned {} for {id}",
                    kernel.id()
                )));
            }
            kernels.push(kernel);
        }
        Ok(Self {
            name,
            addressable,
            kernels,
        })
    }

    /// CPU reference kernels for every variant.
    pub fn host() -> Self {
        Self {
            name: "host",
            addressable: |device| device.is_cpu(),
            kernels: KernelId::ALL
                .iter()
                .map(|&id| Box::new(HostRowwiseKernel::new(id)) as Box<dyn RowwiseKernel>)
                .collect(),
        }
    }

    /// Process-wide library.
    pub fn global() -> &'static KernelLibrary {
        static LIBRARY: OnceLock<KernelLibrary> = OnceLock::new();
        LIBRARY.get_or_init(|| {
            let library = KernelLibrary::host();
            log::info!(
                "FP8 rowwise kernel library: {} ({} variants)",
                library.name,
                library.len()
            );
            library
        })
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.kernels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.kernels.is_empty()
    }

    /// Whether buffers on `device` can be handed to this library's kernels.
    #[inline]
    pub fn can_address(&self, device: Device) -> bool {
        (self.addressable)(device)
    }

    /// O(1) handle lookup. Total over `KernelId::ALL`.
    #[inline]
    pub fn resolve(&self, id: KernelId) -> &dyn RowwiseKernel {
        self.kernels[id.index()].as_ref()
    }
}
