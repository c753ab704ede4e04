//! Exact-shape kernel registry.
//!
//! Curated `(M, N, K) -> kernel` entries for shapes that dominate production LLM
//! traffic (Llama 3 70B / 405B projections under 8-way tensor parallelism, decode
//! batches of 16..128 rows plus a handful of prefill sizes). Built once on first use,
//! read-only afterwards.

use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

use crate::kernel_types::KernelId;

/// Problem shape of `out[M, N] = XQ[M, K] * WQ[N, K]^T`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShapeKey {
    /// Rows of the left operand (tokens)
    pub m: usize,
    /// Output features
    pub n: usize,
    /// Reduction dimension
    pub k: usize,
}

impl ShapeKey {
    #[inline]
    pub const fn new(m: usize, n: usize, k: usize) -> Self {
        Self { m, n, k }
    }
}

impl fmt::Display for ShapeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.m, self.n, self.k)
    }
}

const fn entry(m: usize, n: usize, k: usize, kernel: KernelId) -> (ShapeKey, KernelId) {
    (ShapeKey::new(m, n, k), kernel)
}

use KernelId::{
    Decode64, DecodeNarrow, DecodeWide, MediumBatch, MidSize, Prefill128, PrefillTall,
    PrefillWide,
};

/// Tuned shapes. Only M values of 16/32/64/128 are reachable for small batches.
pub const CURATED_SHAPES: &[(ShapeKey, KernelId)] = &[
    // Llama 3 70B, TP8: fused QKV
    entry(16, 1280, 8192, DecodeNarrow),
    entry(32, 1280, 8192, DecodeNarrow),
    entry(64, 1280, 8192, Decode64),
    entry(128, 1280, 8192, Prefill128),
    // attention output
    entry(16, 8192, 1024, DecodeWide),
    entry(32, 8192, 1024, DecodeWide),
    entry(64, 8192, 1024, Decode64),
    entry(128, 8192, 1024, MidSize),
    // fused gate/up
    entry(16, 7168, 8192, DecodeWide),
    entry(32, 7168, 8192, DecodeWide),
    entry(64, 7168, 8192, Decode64),
    entry(128, 7168, 8192, Prefill128),
    // down
    entry(16, 8192, 3584, DecodeWide),
    entry(32, 8192, 3584, DecodeWide),
    entry(64, 8192, 3584, Decode64),
    entry(128, 8192, 3584, Prefill128),
    // Llama 3 405B, TP8: fused QKV
    entry(16, 2304, 16384, DecodeNarrow),
    entry(32, 2304, 16384, DecodeNarrow),
    entry(64, 2304, 16384, Decode64),
    entry(128, 2304, 16384, Prefill128),
    // attention output
    entry(16, 16384, 2048, DecodeWide),
    entry(32, 16384, 2048, DecodeWide),
    entry(64, 16384, 2048, Decode64),
    entry(128, 16384, 2048, MidSize),
    // fused gate/up
    entry(16, 13312, 16384, DecodeWide),
    entry(32, 13312, 16384, DecodeWide),
    entry(64, 13312, 16384, Decode64),
    entry(128, 13312, 16384, PrefillTall),
    // down
    entry(16, 16384, 6656, DecodeWide),
    entry(32, 16384, 6656, DecodeWide),
    entry(64, 16384, 6656, Decode64),
    entry(128, 16384, 6656, PrefillTall),
    // prefill
    entry(1024, 1280, 8192, MidSize),
    entry(2048, 1280, 8192, Prefill128),
    entry(4096, 1280, 8192, PrefillTall),
    entry(1024, 7168, 8192, PrefillTall),
    entry(2048, 7168, 8192, PrefillTall),
    entry(4096, 7168, 8192, PrefillWide),
    entry(2048, 8192, 1024, MediumBatch),
    entry(2048, 8192, 3584, PrefillTall),
    entry(4096, 8192, 3584, PrefillWide),
    entry(2048, 2304, 16384, PrefillTall),
    entry(2048, 13312, 16384, PrefillWide),
    entry(2048, 16384, 6656, PrefillWide),
];

/// Immutable exact-match map from problem shape to kernel.
#[derive(Debug, Clone)]
pub struct KernelRegistry {
    map: HashMap<ShapeKey, KernelId>,
    /// Entries in insertion order, duplicates removed.
    entries: Vec<(ShapeKey, KernelId)>,
}

impl KernelRegistry {
    /// Build a registry from an entry list. The first entry for a key wins.
    pub fn from_entries(entries: &[(ShapeKey, KernelId)]) -> Self {
        let mut map = HashMap::with_capacity(entries.len());
        let mut kept = Vec::with_capacity(entries.len());
        for &(key, kernel) in entries {
            if let Some(existing) = map.get(&key) {
                log::warn!(
                    "Duplicate registry entry for {key}: keeping {existing}, ignoring {kernel}"
                );
                continue;
            }
            map.insert(key, kernel);
            kept.push((key, kernel));
        }
        Self { map, entries: kept }
    }

    /// The curated production table.
    pub fn curated() -> Self {
        let registry = Self::from_entries(CURATED_SHAPES);
        debug_assert_eq!(registry.len(), CURATED_SHAPES.len(), "duplicate curated shape");
        registry
    }

    /// Process-wide curated registry, built on first access.
    pub fn global() -> &'static KernelRegistry {
        static REGISTRY: OnceLock<KernelRegistry> = OnceLock::new();
        REGISTRY.get_or_init(|| {
            let registry = KernelRegistry::curated();
            log::info!("FP8 rowwise kernel registry: {} curated shapes", registry.len());
            registry
        })
    }

    #[inline]
    pub fn lookup(&self, key: ShapeKey) -> Option<KernelId> {
        self.map.get(&key).copied()
    }

    #[inline]
    pub fn contains(&self, key: ShapeKey) -> bool {
        self.map.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ShapeKey, KernelId)> + '_ {
        self.entries.iter().copied()
    }
}

/// Probe the process-wide registry.
#[inline]
pub fn lookup(key: ShapeKey) -> Option<KernelId> {
    KernelRegistry::global().lookup(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_curated_has_no_duplicates() {
        let keys: HashSet<_> = CURATED_SHAPES.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys.len(), CURATED_SHAPES.len());
        assert_eq!(KernelRegistry::curated().len(), CURATED_SHAPES.len());
    }

    #[test]
    fn test_small_m_entries_are_bucketed() {
        for (key, _) in CURATED_SHAPES {
            assert!(
                key.m > 128 || crate::dispatch::bucket::M_BUCKETS.contains(&key.m),
                "unreachable registry key {key}"
            );
        }
    }

    #[test]
    fn test_known_entries() {
        let r = KernelRegistry::curated();
        assert_eq!(r.lookup(ShapeKey::new(16, 1280, 8192)), Some(KernelId::DecodeNarrow));
        assert_eq!(r.lookup(ShapeKey::new(2048, 7168, 8192)), Some(KernelId::PrefillTall));
        assert_eq!(r.lookup(ShapeKey::new(200, 1280, 8192)), None);
        assert_eq!(r.lookup(ShapeKey::new(16, 100, 500)), None);
        for m in [16, 32, 64, 128] {
            assert!(r.contains(ShapeKey::new(m, 1280, 8192)));
        }
    }

    #[test]
    fn test_n_and_k_are_exact() {
        let r = KernelRegistry::curated();
        assert_eq!(r.lookup(ShapeKey::new(16, 1281, 8192)), None);
        assert_eq!(r.lookup(ShapeKey::new(16, 1280, 8191)), None);
    }

    #[test]
    fn test_first_duplicate_wins() {
        let key = ShapeKey::new(16, 64, 64);
        let r = KernelRegistry::from_entries(&[
            (key, KernelId::Large),
            (key, KernelId::SmallK),
        ]);
        assert_eq!(r.len(), 1);
        assert_eq!(r.lookup(key), Some(KernelId::Large));
    }

    #[test]
    fn test_global_matches_curated() {
        let g = KernelRegistry::global();
        assert_eq!(g.len(), CURATED_SHAPES.len());
        assert!(g.iter().eq(CURATED_SHAPES.iter().copied()));
        assert_eq!(lookup(ShapeKey::new(64, 8192, 1024)), Some(KernelId::Decode64));
    }

    #[test]
    fn test_shape_key_display() {
        assert_eq!(ShapeKey::new(16, 1280, 8192).to_string(), "16x1280x8192");
    }
}
