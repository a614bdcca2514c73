use std::ops::{Add, Index, Sub};

use crate::index::rle::RunLengthString;
use crate::util::dna::{Symbol, SIGMA};

pub const DEFAULT_SAMPLE_RATE: usize = 64;

/// 每个字母一个计数。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct AlphaCount([usize; SIGMA]);

impl AlphaCount {
    #[inline]
    pub fn get(&self, a: Symbol) -> usize {
        self.0[a as usize]
    }

    #[inline]
    pub fn add_n(&mut self, a: Symbol, n: usize) {
        self.0[a as usize] += n;
    }

    #[inline]
    pub fn increment(&mut self, a: Symbol) {
        self.add_n(a, 1);
    }

    pub fn sum(&self) -> usize {
        self.0.iter().sum()
    }

    pub fn as_array(&self) -> &[usize; SIGMA] {
        &self.0
    }

    /// 前缀和：`out[a]` = 所有 rank 小于 `a` 的计数之和（即 C 表）。
    pub fn exclusive_prefix(&self) -> AlphaCount {
        let mut out = [0usize; SIGMA];
        let mut acc = 0usize;
        for (o, &n) in out.iter_mut().zip(self.0.iter()) {
            *o = acc;
            acc += n;
        }
        AlphaCount(out)
    }
}

impl From<[usize; SIGMA]> for AlphaCount {
    fn from(counts: [usize; SIGMA]) -> Self {
        AlphaCount(counts)
    }
}

impl Index<Symbol> for AlphaCount {
    type Output = usize;

    fn index(&self, a: Symbol) -> &usize {
        &self.0[a as usize]
    }
}

impl Add for AlphaCount {
    type Output = AlphaCount;

    fn add(mut self, rhs: AlphaCount) -> AlphaCount {
        for (l, r) in self.0.iter_mut().zip(rhs.0.iter()) {
            *l += r;
        }
        self
    }
}

impl Sub for AlphaCount {
    type Output = AlphaCount;

    fn sub(mut self, rhs: AlphaCount) -> AlphaCount {
        for (l, r) in self.0.iter_mut().zip(rhs.0.iter()) {
            *l -= r;
        }
        self
    }
}

/// 采样点：位置 `k * rate` 之前（不含）的累计计数，以及该位置所在的游程。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Checkpoint {
    counts: AlphaCount,
    run: usize,
    offset: usize,
}

/// 定长采样的 Occ 表：查询代价不超过一个采样间隔内的游程数。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampledOccurrence {
    rate: usize,
    marks: Vec<Checkpoint>,
}

impl Default for SampledOccurrence {
    fn default() -> Self {
        Self { rate: DEFAULT_SAMPLE_RATE, marks: Vec::new() }
    }
}

/// 游程内的一个位置。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RunCursor {
    pub run: usize,
    pub offset: usize,
}

impl SampledOccurrence {
    /// 单次扫描构建采样点，同时返回全串各字母总数。
    pub fn build(s: &RunLengthString, rate: usize) -> (Self, AlphaCount) {
        assert!(rate > 0, "sample rate must be positive");
        let mut marks = Vec::with_capacity(s.len() / rate + 1);
        let mut running = AlphaCount::default();
        let mut start = 0usize;
        let mut next_mark = 0usize;
        for (ri, unit) in s.units().iter().enumerate() {
            let c = unit.count() as usize;
            let end = start + c;
            while next_mark < end {
                let offset = next_mark - start;
                let mut counts = running;
                counts.add_n(unit.symbol(), offset);
                marks.push(Checkpoint { counts, run: ri, offset });
                next_mark += rate;
            }
            running.add_n(unit.symbol(), c);
            start = end;
        }
        (Self { rate, marks }, running)
    }

    #[inline]
    pub fn rate(&self) -> usize {
        self.rate
    }

    pub fn num_marks(&self) -> usize {
        self.marks.len()
    }

    /// 定位 `pos` 所在的游程；调用方保证 `pos < s.len()`。
    pub(crate) fn locate(&self, s: &RunLengthString, pos: usize) -> RunCursor {
        let mark = &self.marks[pos / self.rate];
        let mut run = mark.run;
        let mut skip = mark.offset + pos % self.rate;
        loop {
            let c = s.unit(run).count() as usize;
            if skip < c {
                return RunCursor { run, offset: skip };
            }
            skip -= c;
            run += 1;
        }
    }

    /// `s[0..=pos]` 中符号 `a` 的个数。
    pub fn get(&self, s: &RunLengthString, a: Symbol, pos: usize) -> usize {
        let mark = &self.marks[pos / self.rate];
        let mut total = mark.counts.get(a);
        let mut remaining = pos % self.rate + 1;
        let mut run = mark.run;
        let mut offset = mark.offset;
        while remaining > 0 {
            let unit = s.unit(run);
            let take = (unit.count() as usize - offset).min(remaining);
            if unit.symbol() == a {
                total += take;
            }
            remaining -= take;
            run += 1;
            offset = 0;
        }
        total
    }

    /// `s[0..=pos]` 中所有符号的计数。
    pub fn get_full(&self, s: &RunLengthString, pos: usize) -> AlphaCount {
        let mark = &self.marks[pos / self.rate];
        let mut counts = mark.counts;
        count_from(s, RunCursor { run: mark.run, offset: mark.offset }, pos % self.rate + 1, &mut counts);
        counts
    }

    /// `s(pos0, pos1]` 中所有符号的计数。
    pub fn get_diff(&self, s: &RunLengthString, pos0: usize, pos1: usize) -> AlphaCount {
        debug_assert!(pos0 <= pos1);
        let span = pos1 - pos0;
        if span == 0 {
            return AlphaCount::default();
        }
        if span <= self.rate {
            let mut counts = AlphaCount::default();
            let mut cur = self.locate(s, pos0);
            cur.offset += 1;
            count_from(s, cur, span, &mut counts);
            counts
        } else {
            self.get_full(s, pos1) - self.get_full(s, pos0)
        }
    }
}

/// 从 `cur` 开始向后累计 `n` 个符号。`cur.offset` 可以等于游程长度。
fn count_from(s: &RunLengthString, mut cur: RunCursor, mut n: usize, counts: &mut AlphaCount) {
    while n > 0 {
        let unit = s.unit(cur.run);
        let avail = (unit.count() as usize).saturating_sub(cur.offset);
        let take = avail.min(n);
        counts.add_n(unit.symbol(), take);
        n -= take;
        cur.run += 1;
        cur.offset = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn naive_full(text: &[u8], pos: usize) -> AlphaCount {
        let mut c = AlphaCount::default();
        for &a in &text[..=pos] {
            c.increment(a);
        }
        c
    }

    fn make_text(len: usize) -> Vec<u8> {
        let mut x: u32 = 7;
        let mut v = Vec::with_capacity(len);
        for _ in 0..len {
            x = x.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            // 偏向长游程
            let a = if (x >> 20) % 4 == 0 { ((x >> 8) % 6) as u8 } else { v.last().copied().unwrap_or(1) };
            v.push(a);
        }
        v
    }

    #[test]
    fn occ_matches_naive_for_small_rates() {
        let text = make_text(300);
        let s: RunLengthString = text.iter().copied().collect();
        for rate in [1usize, 3, 8, 64] {
            let (occ, totals) = SampledOccurrence::build(&s, rate);
            assert_eq!(totals, naive_full(&text, text.len() - 1));
            for pos in 0..text.len() {
                let expected = naive_full(&text, pos);
                assert_eq!(occ.get_full(&s, pos), expected, "rate={} pos={}", rate, pos);
                for a in 0..6u8 {
                    assert_eq!(occ.get(&s, a, pos), expected.get(a));
                }
            }
        }
    }

    #[test]
    fn diff_matches_naive() {
        let text = make_text(200);
        let s: RunLengthString = text.iter().copied().collect();
        let (occ, _) = SampledOccurrence::build(&s, 16);
        for (p0, p1) in [(0, 0), (0, 5), (10, 11), (15, 16), (3, 40), (7, 199), (100, 180)] {
            let expected = naive_full(&text, p1) - naive_full(&text, p0);
            assert_eq!(occ.get_diff(&s, p0, p1), expected, "({}, {})", p0, p1);
        }
    }

    #[test]
    fn locate_finds_run() {
        let s: RunLengthString = std::iter::repeat(2u8).take(40).chain([3u8, 4]).collect();
        let (occ, _) = SampledOccurrence::build(&s, 8);
        assert_eq!(occ.locate(&s, 0), RunCursor { run: 0, offset: 0 });
        assert_eq!(occ.locate(&s, 33), RunCursor { run: 1, offset: 2 });
        assert_eq!(occ.locate(&s, 40), RunCursor { run: 2, offset: 0 });
        assert_eq!(occ.locate(&s, 41), RunCursor { run: 3, offset: 0 });
    }

    #[test]
    fn prefix_gives_c_table() {
        let c = AlphaCount::from([2, 3, 0, 1, 4, 0]).exclusive_prefix();
        assert_eq!(c.as_array(), &[0, 2, 5, 5, 6, 10]);
    }
}
