use crate::error::{Error, Result};
use crate::index::rlbwt::RlBwt;
use crate::io::SequenceItem;
use crate::merge::gap::GapArray;
use crate::util::dna::{self, Symbol, SENTINEL};

/// 一条序列的 rank 轨迹：种子 rank，然后从最后一个碱基向前每个碱基一个 rank。
pub type RankVector = Vec<usize>;

/// 处理方向：`Reverse` 先把序列反转（用于构建反向索引）。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Direction {
    #[default]
    Forward,
    Reverse,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RankMode {
    /// 新序列：种子 rank 为 0
    #[default]
    Insert,
    /// 删除已有序列：种子 rank 为序列 id 中记录的序号
    Remove,
}

/// 对只读索引计算插入（或删除）位置；同一个快照可被多个线程同时使用。
#[derive(Debug, Clone, Copy)]
pub struct RankComputer<'a> {
    bwt: &'a RlBwt,
    direction: Direction,
    mode: RankMode,
}

impl<'a> RankComputer<'a> {
    pub fn new(bwt: &'a RlBwt, direction: Direction, mode: RankMode) -> Self {
        Self { bwt, direction, mode }
    }

    pub fn mode(&self) -> RankMode {
        self.mode
    }

    /// 计算 `item` 的 rank 轨迹，长度为序列长度 + 1。
    pub fn process(&self, item: &SequenceItem) -> Result<RankVector> {
        if let Some(&bad) = item.seq.iter().find(|&&a| a == SENTINEL || !dna::is_valid_symbol(a)) {
            return Err(Error::InvalidSequence {
                id: item.id.clone(),
                detail: format!("symbol rank {} cannot appear inside a read", bad),
            });
        }
        let seed = match self.mode {
            RankMode::Insert => 0,
            RankMode::Remove => self.parse_seed(&item.id)?,
        };
        // 从后往前处理；反向模式下序列先反转，所以正向遍历即可
        match self.direction {
            Direction::Forward => self.walk(item, seed, item.seq.iter().rev().copied()),
            Direction::Reverse => self.walk(item, seed, item.seq.iter().copied()),
        }
    }

    fn parse_seed(&self, id: &str) -> Result<usize> {
        let seed: usize = id.trim().parse().map_err(|_| Error::MalformedId(id.to_string()))?;
        if seed >= self.bwt.num_strings() {
            return Err(Error::StaleId {
                id: id.to_string(),
                detail: format!("index holds {} strings", self.bwt.num_strings()),
            });
        }
        Ok(seed)
    }

    fn walk<I>(&self, item: &SequenceItem, seed: usize, back_to_front: I) -> Result<RankVector>
    where
        I: Iterator<Item = Symbol>,
    {
        let remove = self.mode == RankMode::Remove;
        let mut out = Vec::with_capacity(item.seq.len() + 1);
        out.push(seed);
        let mut rank = seed;
        for a in back_to_front {
            // 删除模式下，轨迹上每个位置的 BWT 符号必须就是下一步要前移的碱基
            if remove {
                self.expect_symbol(item, rank, a)?;
            }
            // rank 为 0 时 occ(a, -1) 记为 0，只剩 C(a)
            rank = self.bwt.lf(a, rank);
            out.push(rank);
        }
        if remove {
            self.expect_symbol(item, rank, SENTINEL)?;
        }
        Ok(out)
    }

    fn expect_symbol(&self, item: &SequenceItem, rank: usize, expected: Symbol) -> Result<()> {
        let found = self.bwt.get_char(rank)?;
        if found != expected {
            return Err(Error::StaleId {
                id: item.id.clone(),
                detail: format!(
                    "BWT[{}] is '{}', expected '{}'",
                    rank,
                    dna::from_alphabet(found) as char,
                    dna::from_alphabet(expected) as char
                ),
            });
        }
        Ok(())
    }
}

/// 把 rank 轨迹累加进一个 gap array，并统计处理过的序列与符号数。
///
/// 每次 `process` 独占 `&mut self`，并发场景下由调用方串行化或为每个
/// worker 建一个局部聚合器，最后用 [`RankAggregator::absorb`] 求和。
#[derive(Debug, Clone)]
pub struct RankAggregator<G: GapArray> {
    gaps: G,
    num_strings: usize,
    num_symbols: usize,
}

impl<G: GapArray> RankAggregator<G> {
    pub fn new(gaps: G) -> Self {
        Self { gaps, num_strings: 0, num_symbols: 0 }
    }

    pub fn process(&mut self, ranks: &[usize]) -> Result<()> {
        for &r in ranks {
            self.gaps.increment(r)?;
        }
        self.num_strings += 1;
        self.num_symbols += ranks.len();
        Ok(())
    }

    /// 合并另一个（同尺寸的）局部聚合器。
    pub fn absorb<H: GapArray>(&mut self, other: &RankAggregator<H>) -> Result<()> {
        if other.gaps.size() != self.gaps.size() {
            return Err(Error::GapMismatch(format!(
                "cannot absorb a gap array of size {} into one of size {}",
                other.gaps.size(),
                self.gaps.size()
            )));
        }
        for i in 0..other.gaps.size() {
            let c = other.gaps.get(i);
            if c > 0 {
                let c = u32::try_from(c).map_err(|_| Error::GapOverflow(i))?;
                self.gaps.increment_by(i, c)?;
            }
        }
        self.num_strings += other.num_strings;
        self.num_symbols += other.num_symbols;
        Ok(())
    }

    pub fn gaps(&self) -> &G {
        &self.gaps
    }

    pub fn into_gaps(self) -> G {
        self.gaps
    }

    pub fn num_strings(&self) -> usize {
        self.num_strings
    }

    pub fn num_symbols(&self) -> usize {
        self.num_symbols
    }
}
