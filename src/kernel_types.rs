//! Kernel variant identifiers and their tile configurations.
//!
//! Every precompiled FP8 rowwise kernel is named after its tiling:
//! `fp8_rowwise_{block}x{m_per_block}x{n_per_block}x{k_per_block}_{m_per_xdl}x{n_per_xdl}_{m_xdl_per_wave}x{n_xdl_per_wave}_{scheduler}_v{pipeline}`.
//! `KernelId` is the closed set of variants this crate can dispatch to.

use std::fmt;
use std::str::FromStr;

use crate::error::GemmError;

/// Wave scheduling of the blockwise GEMM pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheduler {
    Intrawave,
    Interwave,
}

impl Scheduler {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Intrawave => "intrawave",
            Self::Interwave => "interwave",
        }
    }
}

/// Blockwise GEMM pipeline version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pipeline {
    V1,
    V2,
    V3,
    V4,
    V5,
}

impl Pipeline {
    pub const fn version(self) -> u32 {
        match self {
            Self::V1 => 1,
            Self::V2 => 2,
            Self::V3 => 3,
            Self::V4 => 4,
            Self::V5 => 5,
        }
    }
}

/// Static tiling of one kernel variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileConfig {
    /// Threads per workgroup
    pub block_size: usize,
    pub m_per_block: usize,
    pub n_per_block: usize,
    pub k_per_block: usize,
    /// XDL (matrix core) instruction tile
    pub m_per_xdl: usize,
    pub n_per_xdl: usize,
    pub m_xdl_per_wave: usize,
    pub n_xdl_per_wave: usize,
    pub scheduler: Scheduler,
    pub pipeline: Pipeline,
}

impl TileConfig {
    const fn new(
        tile: [usize; 8],
        scheduler: Scheduler,
        pipeline: Pipeline,
    ) -> Self {
        Self {
            block_size: tile[0],
            m_per_block: tile[1],
            n_per_block: tile[2],
            k_per_block: tile[3],
            m_per_xdl: tile[4],
            n_per_xdl: tile[5],
            m_xdl_per_wave: tile[6],
            n_xdl_per_wave: tile[7],
            scheduler,
            pipeline,
        }
    }

    /// Canonical kernel name for this tiling.
    pub fn kernel_name(&self) -> String {
        format!(
            "fp8_rowwise_{}x{}x{}x{}_{}x{}_{}x{}_{}_v{}",
            self.block_size,
            self.m_per_block,
            self.n_per_block,
            self.k_per_block,
            self.m_per_xdl,
            self.n_per_xdl,
            self.m_xdl_per_wave,
            self.n_xdl_per_wave,
            self.scheduler.name(),
            self.pipeline.version(),
        )
    }
}

/// Closed set of FP8 rowwise kernel variants.
///
/// The first ten back the heuristic rules; the rest are only reachable through
/// curated registry entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum KernelId {
    SmallK,
    SmallAll,
    SmallBatchSmallK,
    SmallBatchSmallN,
    SmallBatchLargeNK,
    SmallBatch,
    MidSize,
    MediumBatch,
    Large,
    LargeFallback,
    DecodeNarrow,
    DecodeWide,
    Decode64,
    Prefill128,
    PrefillTall,
    PrefillWide,
}

impl KernelId {
    /// Every variant, in declaration order (`ALL[id as usize] == id`).
    pub const ALL: [KernelId; 16] = [
        KernelId::SmallK,
        KernelId::SmallAll,
        KernelId::SmallBatchSmallK,
        KernelId::SmallBatchSmallN,
        KernelId::SmallBatchLargeNK,
        KernelId::SmallBatch,
        KernelId::MidSize,
        KernelId::MediumBatch,
        KernelId::Large,
        KernelId::LargeFallback,
        KernelId::DecodeNarrow,
        KernelId::DecodeWide,
        KernelId::Decode64,
        KernelId::Prefill128,
        KernelId::PrefillTall,
        KernelId::PrefillWide,
    ];

    pub const COUNT: usize = Self::ALL.len();

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::SmallK => "fp8_rowwise_256x128x128x64_32x32_2x2_intrawave_v3",
            Self::SmallAll => "fp8_rowwise_64x16x16x128_16x16_1x1_interwave_v2",
            Self::SmallBatchSmallK => "fp8_rowwise_128x16x32x128_16x16_1x1_interwave_v2",
            Self::SmallBatchSmallN => "fp8_rowwise_64x16x16x256_16x16_1x1_interwave_v1",
            Self::SmallBatchLargeNK => "fp8_rowwise_256x16x64x256_16x16_1x1_intrawave_v1",
            Self::SmallBatch => "fp8_rowwise_128x32x64x128_32x32_1x1_interwave_v2",
            Self::MidSize => "fp8_rowwise_256x128x128x128_32x32_2x2_intrawave_v3",
            Self::MediumBatch => "fp8_rowwise_256x128x256x64_32x32_2x4_intrawave_v3",
            Self::Large => "fp8_rowwise_256x256x256x64_32x32_4x4_intrawave_v4",
            Self::LargeFallback => "fp8_rowwise_256x256x128x64_32x32_4x2_intrawave_v3",
            Self::DecodeNarrow => "fp8_rowwise_128x16x32x512_16x16_1x1_interwave_v2",
            Self::DecodeWide => "fp8_rowwise_256x16x128x256_16x16_1x2_intrawave_v1",
            Self::Decode64 => "fp8_rowwise_256x64x64x256_32x32_1x1_interwave_v1",
            Self::Prefill128 => "fp8_rowwise_256x128x96x128_32x32_1x3_intrawave_v3",
            Self::PrefillTall => "fp8_rowwise_256x224x256x128_16x16_7x8_intrawave_v3",
            Self::PrefillWide => "fp8_rowwise_256x256x224x128_16x16_8x7_intrawave_v3",
        }
    }

    pub const fn tile(self) -> TileConfig {
        use Pipeline::*;
        use Scheduler::*;
        match self {
            Self::SmallK => TileConfig::new([256, 128, 128, 64, 32, 32, 2, 2], Intrawave, V3),
            Self::SmallAll => TileConfig::new([64, 16, 16, 128, 16, 16, 1, 1], Interwave, V2),
            Self::SmallBatchSmallK => TileConfig::new([128, 16, 32, 128, 16, 16, 1, 1], Interwave, V2),
            Self::SmallBatchSmallN => TileConfig::new([64, 16, 16, 256, 16, 16, 1, 1], Interwave, V1),
            Self::SmallBatchLargeNK => TileConfig::new([256, 16, 64, 256, 16, 16, 1, 1], Intrawave, V1),
            Self::SmallBatch => TileConfig::new([128, 32, 64, 128, 32, 32, 1, 1], Interwave, V2),
            Self::MidSize => TileConfig::new([256, 128, 128, 128, 32, 32, 2, 2], Intrawave, V3),
            Self::MediumBatch => TileConfig::new([256, 128, 256, 64, 32, 32, 2, 4], Intrawave, V3),
            Self::Large => TileConfig::new([256, 256, 256, 64, 32, 32, 4, 4], Intrawave, V4),
            Self::LargeFallback => TileConfig::new([256, 256, 128, 64, 32, 32, 4, 2], Intrawave, V3),
            Self::DecodeNarrow => TileConfig::new([128, 16, 32, 512, 16, 16, 1, 1], Interwave, V2),
            Self::DecodeWide => TileConfig::new([256, 16, 128, 256, 16, 16, 1, 2], Intrawave, V1),
            Self::Decode64 => TileConfig::new([256, 64, 64, 256, 32, 32, 1, 1], Interwave, V1),
            Self::Prefill128 => TileConfig::new([256, 128, 96, 128, 32, 32, 1, 3], Intrawave, V3),
            Self::PrefillTall => TileConfig::new([256, 224, 256, 128, 16, 16, 7, 8], Intrawave, V3),
            Self::PrefillWide => TileConfig::new([256, 256, 224, 128, 16, 16, 8, 7], Intrawave, V3),
        }
    }
}

impl fmt::Display for KernelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for KernelId {
    type Err = GemmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        KernelId::ALL
            .iter()
            .copied()
            .find(|id| id.name() == s)
            .ok_or_else(|| GemmError::InvalidConfig(format!("unknown kernel variant `{s}`")))
    }
}

impl TryFrom<String> for KernelId {
    type Error = GemmError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<KernelId> for &'static str {
    fn from(id: KernelId) -> Self {
        id.name()
    }
}
