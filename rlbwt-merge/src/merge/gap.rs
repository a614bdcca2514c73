//! Gap array：BWT 每个插入位置一个计数器。
//!
//! 槽位 `r` 记录有多少个新后缀排在原 BWT 位置 `r - 1` 与 `r` 之间。
//! 两种实现共享 [`GapArray`] 接口：稠密的 `u32` 数组，以及把大计数转存到
//! 溢出表的字节数组。构造时选定其一，调用方不假设 O(1) 访问。

use std::collections::HashMap;

use log::info;

use crate::error::{Error, Result};

pub trait GapArray {
    /// 设置逻辑大小并清零所有槽位。
    fn resize(&mut self, n: usize);

    /// 槽位 `i` 加 `n`。
    fn increment_by(&mut self, i: usize, n: u32) -> Result<()>;

    fn get(&self, i: usize) -> usize;

    fn size(&self) -> usize;

    fn increment(&mut self, i: usize) -> Result<()> {
        self.increment_by(i, 1)
    }

    /// 所有槽位之和。
    fn total(&self) -> usize {
        (0..self.size()).map(|i| self.get(i)).sum()
    }
}

/// 一轮合并分配哪种实现。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GapKind {
    #[default]
    Dense,
    Sparse,
}

#[inline]
fn check_bounds(i: usize, size: usize) -> Result<()> {
    if i >= size {
        return Err(Error::IndexOutOfBounds { index: i, len: size });
    }
    Ok(())
}

/// 每个槽位一个 `u32`。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DenseGapArray {
    data: Vec<u32>,
}

impl DenseGapArray {
    pub fn new(n: usize) -> Self {
        Self { data: vec![0; n] }
    }
}

impl GapArray for DenseGapArray {
    fn resize(&mut self, n: usize) {
        self.data.clear();
        self.data.resize(n, 0);
    }

    fn increment_by(&mut self, i: usize, n: u32) -> Result<()> {
        check_bounds(i, self.data.len())?;
        let slot = &mut self.data[i];
        *slot = slot.checked_add(n).ok_or(Error::GapOverflow(i))?;
        Ok(())
    }

    #[inline]
    fn get(&self, i: usize) -> usize {
        self.data[i] as usize
    }

    fn size(&self) -> usize {
        self.data.len()
    }

    fn total(&self) -> usize {
        self.data.iter().map(|&c| c as usize).sum()
    }
}

/// 每个槽位一个字节；`u8::MAX` 表示该槽位的计数存放在 `overflow` 中。
///
/// read 集合的大多数槽位为 0 或 1，内存约为稠密实现的四分之一。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SparseGapArray {
    base: Vec<u8>,
    overflow: HashMap<usize, u32>,
}

const SPARSE_ESCAPE: u8 = u8::MAX;

impl SparseGapArray {
    pub fn new(n: usize) -> Self {
        Self { base: vec![0; n], overflow: HashMap::new() }
    }

    pub fn num_overflow(&self) -> usize {
        self.overflow.len()
    }
}

impl GapArray for SparseGapArray {
    fn resize(&mut self, n: usize) {
        self.base.clear();
        self.base.resize(n, 0);
        self.overflow.clear();
    }

    fn increment_by(&mut self, i: usize, n: u32) -> Result<()> {
        check_bounds(i, self.base.len())?;
        let cur = self.base[i];
        if cur == SPARSE_ESCAPE {
            let slot = self.overflow.entry(i).or_insert(0);
            *slot = slot.checked_add(n).ok_or(Error::GapOverflow(i))?;
            return Ok(());
        }
        let next = (cur as u32).checked_add(n).ok_or(Error::GapOverflow(i))?;
        if next < SPARSE_ESCAPE as u32 {
            self.base[i] = next as u8;
        } else {
            self.base[i] = SPARSE_ESCAPE;
            self.overflow.insert(i, next);
        }
        Ok(())
    }

    #[inline]
    fn get(&self, i: usize) -> usize {
        match self.base[i] {
            SPARSE_ESCAPE => self.overflow.get(&i).copied().unwrap_or(0) as usize,
            c => c as usize,
        }
    }

    fn size(&self) -> usize {
        self.base.len()
    }
}

/// gap 计数的分布。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GapStats {
    pub size: usize,
    pub total: usize,
    pub nonzero: usize,
    pub max: usize,
    /// histogram[c] = 计数恰为 c 的槽位数，最后一个桶收集所有更大的计数
    pub histogram: Vec<usize>,
}

const HISTOGRAM_BUCKETS: usize = 8;

pub fn analyze_gap_array<G: GapArray + ?Sized>(gaps: &G) -> GapStats {
    let mut stats = GapStats {
        size: gaps.size(),
        histogram: vec![0; HISTOGRAM_BUCKETS],
        ..Default::default()
    };
    for i in 0..gaps.size() {
        let c = gaps.get(i);
        stats.total += c;
        stats.max = stats.max.max(c);
        if c > 0 {
            stats.nonzero += 1;
        }
        stats.histogram[c.min(HISTOGRAM_BUCKETS - 1)] += 1;
    }
    info!(
        "gap array: {} slots, {} increments, {} non-zero, max {}",
        stats.size, stats.total, stats.nonzero, stats.max
    );
    stats
}
