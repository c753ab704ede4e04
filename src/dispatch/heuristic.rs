//! Fallback kernel selection for shapes missing from the registry.
//!
//! Rules are evaluated top to bottom and the first match wins; several rules overlap,
//! so the order is part of the contract. Boundaries (`<` vs `<=`) are exact.

use std::fmt;

use crate::kernel_types::KernelId;

/// Which heuristic rule picked the kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeuristicRule {
    /// `K < 1024`
    SmallK,
    /// `M < 64 && N < 2048 && K < 2048`
    SmallAll,
    /// `M < 64 && K < 2048`
    SmallBatchSmallK,
    /// `M < 64 && N < 2048`
    SmallBatchSmallN,
    /// `M < 64 && N > 2048 && K > 2048`
    SmallBatchLargeNK,
    /// `M < 64`
    SmallBatch,
    /// mid-sized problems with `K >= 1024`
    MidSize,
    /// `M < 1024`
    MediumBatch,
    /// `M, N, K >= 1024`
    Large,
    Fallback,
}

impl HeuristicRule {
    /// 1-based position in the rule list.
    pub const fn number(self) -> u8 {
        match self {
            Self::SmallK => 1,
            Self::SmallAll => 2,
            Self::SmallBatchSmallK => 3,
            Self::SmallBatchSmallN => 4,
            Self::SmallBatchLargeNK => 5,
            Self::SmallBatch => 6,
            Self::MidSize => 7,
            Self::MediumBatch => 8,
            Self::Large => 9,
            Self::Fallback => 10,
        }
    }

    pub const fn kernel(self) -> KernelId {
        match self {
            Self::SmallK => KernelId::SmallK,
            Self::SmallAll => KernelId::SmallAll,
            Self::SmallBatchSmallK => KernelId::SmallBatchSmallK,
            Self::SmallBatchSmallN => KernelId::SmallBatchSmallN,
            Self::SmallBatchLargeNK => KernelId::SmallBatchLargeNK,
            Self::SmallBatch => KernelId::SmallBatch,
            Self::MidSize => KernelId::MidSize,
            Self::MediumBatch => KernelId::MediumBatch,
            Self::Large => KernelId::Large,
            Self::Fallback => KernelId::LargeFallback,
        }
    }
}

impl fmt::Display for HeuristicRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rule {} ({:?})", self.number(), self)
    }
}

/// Pick the heuristic rule for a problem shape. Total and pure.
pub fn select_rule(m: usize, n: usize, k: usize) -> HeuristicRule {
    if k < 1024 {
        return HeuristicRule::SmallK;
    }
    if m < 64 && n < 2048 && k < 2048 {
        return HeuristicRule::SmallAll;
    }
    if m < 64 && k < 2048 {
        return HeuristicRule::SmallBatchSmallK;
    }
    if m < 64 && n < 2048 {
        return HeuristicRule::SmallBatchSmallN;
    }
    if m < 64 && n > 2048 && k > 2048 {
        return HeuristicRule::SmallBatchLargeNK;
    }
    if m < 64 {
        return HeuristicRule::SmallBatch;
    }
    if ((m < 512 && k < 8192) || (n <= 2048 && k <= 8192) || (k <= 2048 && n <= 8192))
        && k >= 1024
    {
        return HeuristicRule::MidSize;
    }
    if m < 1024 {
        return HeuristicRule::MediumBatch;
    }
    if m >= 1024 && n >= 1024 && k >= 1024 {
        return HeuristicRule::Large;
    }
    HeuristicRule::Fallback
}

/// Heuristic kernel for a problem shape, using the true (unbucketed) `m`.
#[inline]
pub fn select(m: usize, n: usize, k: usize) -> KernelId {
    select_rule(m, n, k).kernel()
}
