//! 增量合并：rank 计算、gap array 聚合与重写。

pub mod engine;
pub mod gap;
pub mod rank;

pub use engine::{
    build_index, compute_gap_array, extend_index, merge_insertions, merge_removals, remove_from_index,
    update_gap_array, Rejected, RoundReport,
};
pub use gap::{analyze_gap_array, DenseGapArray, GapArray, GapKind, GapStats, SparseGapArray};
pub use rank::{Direction, RankAggregator, RankComputer, RankMode, RankVector};

use crate::index::occ::DEFAULT_SAMPLE_RATE;

/// 每轮合并的参数。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeOpt {
    /// Occ 采样间隔
    pub sample_rate: usize,
    /// 每个并行分块的序列数
    pub chunk_size: usize,
    pub direction: Direction,
    pub gap_kind: GapKind,
}

impl Default for MergeOpt {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            chunk_size: 4096,
            direction: Direction::Forward,
            gap_kind: GapKind::Dense,
        }
    }
}
