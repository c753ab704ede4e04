//! Shape-to-kernel dispatch.
//!
//! `bucket(M)` → exact registry probe on `(bucket(M), N, K)` → heuristic on the
//! original `(M, N, K)` when the probe misses. The heuristic always sees the true
//! problem size; bucketing only widens registry reuse.

pub mod bucket;
pub mod heuristic;
pub mod registry;

use std::fmt;
use std::sync::OnceLock;

use crate::config::DispatchConfig;
use crate::kernel_types::KernelId;

pub use bucket::{bucket, M_BUCKETS};
pub use heuristic::{select, select_rule, HeuristicRule};
pub use registry::{lookup, KernelRegistry, ShapeKey, CURATED_SHAPES};

/// Where a dispatch decision came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DispatchSource {
    Registry,
    Heuristic(HeuristicRule),
    /// `DispatchConfig::force_kernel` override
    Forced,
}

impl fmt::Display for DispatchSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Registry => write!(f, "registry"),
            Self::Heuristic(rule) => write!(f, "heuristic {rule}"),
            Self::Forced => write!(f, "forced"),
        }
    }
}

/// A kernel choice together with how it was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchDecision {
    /// The problem shape as requested
    pub shape: ShapeKey,
    /// `M` used for the registry probe
    pub bucketed_m: usize,
    pub kernel: KernelId,
    pub source: DispatchSource,
}

/// Registry + heuristic composition.
///
/// Stateless after construction; safe to share across threads.
#[derive(Debug, Clone, Copy)]
pub struct Dispatcher {
    registry: &'static KernelRegistry,
    config: DispatchConfig,
}

impl Dispatcher {
    pub fn new(registry: &'static KernelRegistry, config: DispatchConfig) -> Self {
        Self { registry, config }
    }

    /// Curated registry with default config.
    pub fn curated() -> Self {
        Self::new(KernelRegistry::global(), DispatchConfig::default())
    }

    /// Process-wide dispatcher; reads the environment once.
    pub fn global() -> &'static Dispatcher {
        static DISPATCHER: OnceLock<Dispatcher> = OnceLock::new();
        DISPATCHER.get_or_init(|| {
            let config = DispatchConfig::from_env();
            if config != DispatchConfig::default() {
                log::info!("FP8 rowwise dispatch overrides: {config:?}");
            }
            Dispatcher::new(KernelRegistry::global(), config)
        })
    }

    #[inline]
    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    #[inline]
    pub fn registry(&self) -> &'static KernelRegistry {
        self.registry
    }

    /// Choose a kernel and report the path taken. Never fails.
    ///
    /// Precondition: `m, n, k >= 1`.
    pub fn decide(&self, m: usize, n: usize, k: usize) -> DispatchDecision {
        debug_assert!(m > 0 && n > 0 && k > 0, "degenerate GEMM shape {m}x{n}x{k}");
        let shape = ShapeKey::new(m, n, k);
        let bucketed_m = bucket(m);

        let (kernel, source) = if let Some(forced) = self.config.force_kernel {
            (forced, DispatchSource::Forced)
        } else if let Some(hit) = self
            .config
            .registry_enabled
            .then(|| self.registry.lookup(ShapeKey::new(bucketed_m, n, k)))
            .flatten()
        {
            (hit, DispatchSource::Registry)
        } else {
            let rule = select_rule(m, n, k);
            (rule.kernel(), DispatchSource::Heuristic(rule))
        };

        log::trace!("fp8 rowwise {shape} (probe m={bucketed_m}) -> {kernel} via {source}");

        DispatchDecision {
            shape,
            bucketed_m,
            kernel,
            source,
        }
    }

    #[inline]
    pub fn dispatch(&self, m: usize, n: usize, k: usize) -> KernelId {
        self.decide(m, n, k).kernel
    }
}

/// Kernel for `(m, n, k)` through the process-wide dispatcher.
#[inline]
pub fn dispatch(m: usize, n: usize, k: usize) -> KernelId {
    Dispatcher::global().dispatch(m, n, k)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scenario_registry_hit() {
        let d = Dispatcher::curated();
        let decision = d.decide(16, 1280, 8192);
        assert_eq!(decision.source, DispatchSource::Registry);
        assert_eq!(decision.kernel, KernelId::DecodeNarrow);
        assert_eq!(decision.bucketed_m, 16);
    }

    #[test]
    fn test_scenario_unbucketed_miss_falls_back() {
        let d = Dispatcher::curated();
        let decision = d.decide(200, 1280, 8192);
        assert_eq!(decision.bucketed_m, 200);
        // N <= 2048 && K <= 8192 holds, so the mid-size rule fires before rule 8
        assert_eq!(decision.source, DispatchSource::Heuristic(HeuristicRule::MidSize));
        assert_eq!(decision.kernel, KernelId::MidSize);
    }

    #[test]
    fn test_scenario_small_k_miss() {
        let d = Dispatcher::curated();
        let decision = d.decide(10, 100, 500);
        assert_eq!(decision.bucketed_m, 16);
        assert_eq!(decision.source, DispatchSource::Heuristic(HeuristicRule::SmallK));
        assert_eq!(decision.kernel, KernelId::SmallK);
    }

    #[test]
    fn test_scenario_registry_overrides_large_rule() {
        let d = Dispatcher::curated();
        assert_eq!(select(2048, 7168, 8192), KernelId::Large);
        let decision = d.decide(2048, 7168, 8192);
        assert_eq!(decision.source, DispatchSource::Registry);
        assert_eq!(decision.kernel, KernelId::PrefillTall);
    }

    #[test]
    fn test_bucketing_shares_entries() {
        let d = Dispatcher::curated();
        for m in 1..=16 {
            assert_eq!(d.dispatch(m, 1280, 8192), KernelId::DecodeNarrow, "m={m}");
        }
        for m in 65..=128 {
            assert_eq!(d.dispatch(m, 1280, 8192), KernelId::Prefill128, "m={m}");
        }
    }

    #[test]
    fn test_heuristic_sees_unbucketed_m() {
        // bucket(40) = 64 misses the registry for this (N, K); the heuristic must use
        // m = 40 (< 64, small batch) rather than 64.
        let d = Dispatcher::curated();
        let decision = d.decide(40, 4096, 4096);
        assert_eq!(decision.bucketed_m, 64);
        assert_eq!(decision.source, DispatchSource::Heuristic(HeuristicRule::SmallBatchLargeNK));
    }

    #[test]
    fn test_registry_disabled() {
        let d = Dispatcher::new(
            KernelRegistry::global(),
            DispatchConfig {
                registry_enabled: false,
                force_kernel: None,
            },
        );
        let decision = d.decide(16, 1280, 8192);
        assert_eq!(decision.source, DispatchSource::Heuristic(HeuristicRule::SmallBatchSmallN));
    }

    #[test]
    fn test_forced_kernel() {
        let d = Dispatcher::new(
            KernelRegistry::global(),
            DispatchConfig {
                registry_enabled: true,
                force_kernel: Some(KernelId::SmallAll),
            },
        );
        let decision = d.decide(2048, 7168, 8192);
        assert_eq!(decision.source, DispatchSource::Forced);
        assert_eq!(decision.kernel, KernelId::SmallAll);
    }

    #[test]
    fn test_global_dispatch() {
        assert_eq!(dispatch(16, 1280, 8192), Dispatcher::global().dispatch(16, 1280, 8192));
    }

    #[test]
    fn test_source_display() {
        assert_eq!(DispatchSource::Registry.to_string(), "registry");
        assert_eq!(
            DispatchSource::Heuristic(HeuristicRule::SmallK).to_string(),
            "heuristic rule 1 (SmallK)"
        );
    }
}
