use std::io::Write;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::index::occ::{AlphaCount, SampledOccurrence, DEFAULT_SAMPLE_RATE};
use crate::index::rle::RunLengthString;
use crate::index::run::RunUnit;
use crate::util::dna::{self, Symbol, SENTINEL, SIGMA};

/// 索引元信息（来源、构建参数、时间戳）。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexMeta {
    pub source_files: Vec<String>,
    pub build_args: Option<String>,
    pub build_timestamp: Option<String>,
    /// 已执行的增量合并轮数
    pub merge_rounds: u32,
}

/// 游程编码的多串 BWT + FM 索引。
///
/// - 每条 read 以自己的 `$` 结尾，`$` 之间按 read 序号比较。
/// - C 表与 Occ 采样都是可由游程串重建的缓存：`append` 之后必须调用
///   [`RlBwt::initialize_fm_index`] 才能查询。
#[derive(Debug, Clone)]
pub struct RlBwt {
    /// BWT 串
    runs: RunLengthString,
    /// C(a)：BWT 中 rank 小于 a 的符号总数
    pred: AlphaCount,
    /// O(a, i) 采样
    occ: SampledOccurrence,
    num_strings: usize,
    stale: bool,
    meta: IndexMeta,
}

impl Default for RlBwt {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_RATE)
    }
}

/// 持久化布局：游程数 + 各游程 + 两个计数器 + 元信息。
#[derive(Serialize)]
struct PersistedRef<'a> {
    runs: &'a [RunUnit],
    num_strings: u64,
    num_symbols: u64,
    meta: &'a IndexMeta,
}

#[derive(Deserialize)]
struct Persisted {
    runs: Vec<RunUnit>,
    num_strings: u64,
    num_symbols: u64,
    meta: IndexMeta,
}

/// 索引概况，供 `stats` 子命令与日志使用。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexStats {
    pub num_strings: usize,
    pub num_symbols: usize,
    pub num_runs: usize,
    pub num_marks: usize,
    pub symbol_counts: AlphaCount,
}

impl IndexStats {
    /// 平均每个游程覆盖的符号数。
    pub fn mean_run_length(&self) -> f64 {
        if self.num_runs == 0 {
            0.0
        } else {
            self.num_symbols as f64 / self.num_runs as f64
        }
    }
}

impl RlBwt {
    /// # Panics
    /// `sample_rate == 0` 时 panic；来自外部的采样间隔应走 [`RlBwt::from_runs`]。
    pub fn new(sample_rate: usize) -> Self {
        let (occ, _) = SampledOccurrence::build(&RunLengthString::new(), sample_rate);
        Self {
            runs: RunLengthString::new(),
            pred: AlphaCount::default(),
            occ,
            num_strings: 0,
            stale: false,
            meta: IndexMeta::default(),
        }
    }

    /// 从游程序列批量构建（读取持久化数据、合并输出）。
    pub fn from_runs<I>(runs: I, num_strings: usize, sample_rate: usize) -> Result<Self>
    where
        I: IntoIterator<Item = RunUnit>,
    {
        if sample_rate == 0 {
            return Err(Error::InvalidSampleRate(sample_rate));
        }
        let mut bwt = Self::new(sample_rate);
        for unit in runs {
            bwt.runs.push_run(unit)?;
        }
        bwt.num_strings = num_strings;
        bwt.initialize_fm_index();
        let sentinels = bwt.pred.get(1);
        if sentinels != num_strings {
            return Err(Error::Format(format!(
                "{} sentinels in BWT but {} strings recorded",
                sentinels, num_strings
            )));
        }
        Ok(bwt)
    }

    /// 追加一个符号，使 C 表 / Occ 采样失效。
    pub fn append(&mut self, symbol: Symbol) {
        debug_assert!(dna::is_valid_symbol(symbol));
        self.runs.append(symbol);
        self.stale = true;
    }

    pub fn append_repeat(&mut self, symbol: Symbol, n: usize) {
        debug_assert!(dna::is_valid_symbol(symbol));
        self.runs.append_repeat(symbol, n);
        self.stale = true;
    }

    pub fn set_num_strings(&mut self, n: usize) {
        self.num_strings = n;
    }

    /// 单次扫描重建 C 表与 Occ 采样。
    pub fn initialize_fm_index(&mut self) {
        let (occ, totals) = SampledOccurrence::build(&self.runs, self.occ.rate());
        self.pred = totals.exclusive_prefix();
        self.occ = occ;
        self.stale = false;
    }

    #[inline]
    pub fn num_strings(&self) -> usize {
        self.num_strings
    }

    #[inline]
    pub fn num_symbols(&self) -> usize {
        self.runs.len()
    }

    #[inline]
    pub fn num_runs(&self) -> usize {
        self.runs.num_runs()
    }

    #[inline]
    pub fn sample_rate(&self) -> usize {
        self.occ.rate()
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        !self.stale
    }

    pub fn meta(&self) -> &IndexMeta {
        &self.meta
    }

    pub fn set_meta(&mut self, meta: IndexMeta) {
        self.meta = meta;
    }

    pub fn meta_mut(&mut self) -> &mut IndexMeta {
        &mut self.meta
    }

    /// 游程迭代器（序列化使用）。
    pub fn runs(&self) -> impl Iterator<Item = RunUnit> + '_ {
        self.runs.units().iter().copied()
    }

    /// 顺序解码整个 BWT。
    pub fn symbols(&self) -> impl Iterator<Item = Symbol> + '_ {
        self.runs.symbols()
    }

    /// BWT 位置 `pos` 的符号。
    pub fn get_char(&self, pos: usize) -> Result<Symbol> {
        if pos >= self.num_symbols() {
            return Err(Error::IndexOutOfBounds { index: pos, len: self.num_symbols() });
        }
        if self.stale {
            return self.runs.get(pos);
        }
        let cur = self.occ.locate(&self.runs, pos);
        Ok(self.runs.unit(cur.run).symbol())
    }

    /// C(a)
    #[inline]
    pub fn get_pc(&self, a: Symbol) -> usize {
        debug_assert!(!self.stale, "FM index queried before initialize_fm_index");
        self.pred.get(a)
    }

    /// BWT[0..=pos] 中 `a` 的出现次数。
    ///
    /// # Panics
    /// `pos >= num_symbols()` 时 panic。
    #[inline]
    pub fn get_occ(&self, a: Symbol, pos: usize) -> usize {
        debug_assert!(!self.stale, "FM index queried before initialize_fm_index");
        self.occ.get(&self.runs, a, pos)
    }

    /// `get_occ(a, rank - 1)`，其中 rank 为 0 时返回 0。
    #[inline]
    pub fn occ_before(&self, a: Symbol, rank: usize) -> usize {
        if rank == 0 {
            0
        } else {
            self.get_occ(a, rank - 1)
        }
    }

    /// BWT[0..=pos] 中各字母的出现次数。
    pub fn get_full_occ(&self, pos: usize) -> AlphaCount {
        debug_assert!(!self.stale, "FM index queried before initialize_fm_index");
        self.occ.get_full(&self.runs, pos)
    }

    /// BWT(pos0, pos1] 中各字母的出现次数。
    pub fn get_occ_diff(&self, pos0: usize, pos1: usize) -> AlphaCount {
        debug_assert!(!self.stale, "FM index queried before initialize_fm_index");
        self.occ.get_diff(&self.runs, pos0, pos1)
    }

    /// 第一列（F 列）位置 `pos` 的符号。
    pub fn get_f(&self, pos: usize) -> Result<Symbol> {
        if pos >= self.num_symbols() {
            return Err(Error::IndexOutOfBounds { index: pos, len: self.num_symbols() });
        }
        let mut ci = 0usize;
        while ci < SIGMA && self.get_pc(ci as Symbol) <= pos {
            ci += 1;
        }
        // C($) == 0，所以 ci 至少为 1
        Ok((ci - 1) as Symbol)
    }

    /// 后缀 `c·X` 的 rank，X 的 rank 为 `rank`（LF 映射）。
    #[inline]
    pub fn lf(&self, a: Symbol, rank: usize) -> usize {
        self.get_pc(a) + self.occ_before(a, rank)
    }

    #[inline]
    pub fn rank_range(&self, a: Symbol, l: usize, r: usize) -> (usize, usize) {
        // 返回在区间 [l, r) 上向前扩展字符 a 后的新区间
        (self.lf(a, l), self.lf(a, r))
    }

    /// 反向搜索精确匹配，pat 为编码后的字母表（不应包含 `$`）。
    pub fn backward_search(&self, pat: &[Symbol]) -> Option<(usize, usize)> {
        if self.num_symbols() == 0 {
            return None;
        }
        let mut l = 0usize;
        let mut r = self.num_symbols();
        for &a in pat.iter().rev() {
            let (nl, nr) = self.rank_range(a, l, r);
            if nl >= nr {
                return None;
            }
            l = nl;
            r = nr;
        }
        Some((l, r))
    }

    pub fn stats(&self) -> IndexStats {
        let n = self.num_symbols();
        let symbol_counts = if n == 0 { AlphaCount::default() } else { self.get_full_occ(n - 1) };
        IndexStats {
            num_strings: self.num_strings,
            num_symbols: n,
            num_runs: self.num_runs(),
            num_marks: self.occ.num_marks(),
            symbol_counts,
        }
    }

    /// 全量扫描自检：缓存的 C 表与 Occ 必须与重新计数一致。
    ///
    /// # Panics
    /// 任一不一致都会 panic，仅用于调试与测试。
    pub fn validate(&self) {
        assert!(!self.stale, "validate called on a stale FM index");

        let units = self.runs.units();
        let mut total = 0usize;
        for (i, unit) in units.iter().enumerate() {
            assert!(unit.is_initialized(), "run {} is empty", i);
            if i > 0 {
                let prev = units[i - 1];
                assert!(
                    prev.symbol() != unit.symbol() || prev.is_full(),
                    "runs {} and {} should have been merged",
                    i - 1,
                    i
                );
            }
            total += unit.count() as usize;
        }
        assert_eq!(total, self.num_symbols(), "run counts do not sum to the BWT length");

        let mut running = AlphaCount::default();
        for (pos, a) in self.runs.symbols().enumerate() {
            running.increment(a);
            assert_eq!(self.get_char(pos).ok(), Some(a), "symbol mismatch at {}", pos);
            assert_eq!(self.get_full_occ(pos), running, "occurrence mismatch at {}", pos);
        }
        assert_eq!(running.exclusive_prefix(), self.pred, "predecessor counts are stale");
        assert_eq!(running.get(SENTINEL), self.num_strings, "sentinel count != number of strings");
    }

    pub fn save_to_file(&self, path: &str) -> Result<()> {
        let f = std::fs::File::create(path)?;
        let mut w = std::io::BufWriter::new(f);
        self.write_to(&mut w)?;
        w.flush()?;
        Ok(())
    }

    pub fn load_from_file(path: &str, sample_rate: usize) -> Result<Self> {
        let f = std::fs::File::open(path)?;
        Self::read_from(std::io::BufReader::new(f), sample_rate)
    }

    pub fn write_to<W: std::io::Write>(&self, w: W) -> Result<()> {
        let rec = PersistedRef {
            runs: self.runs.units(),
            num_strings: self.num_strings as u64,
            num_symbols: self.num_symbols() as u64,
            meta: &self.meta,
        };
        bincode::serialize_into(w, &rec)?;
        Ok(())
    }

    pub fn read_from<R: std::io::Read>(r: R, sample_rate: usize) -> Result<Self> {
        let rec: Persisted = bincode::deserialize_from(r)?;
        let mut bwt = Self::from_runs(rec.runs, rec.num_strings as usize, sample_rate)?;
        if bwt.num_symbols() as u64 != rec.num_symbols {
            return Err(Error::Format(format!(
                "runs decode to {} symbols but header says {}",
                bwt.num_symbols(),
                rec.num_symbols
            )));
        }
        bwt.meta = rec.meta;
        Ok(bwt)
    }
}

impl PartialEq for RlBwt {
    /// 两个索引相等当且仅当 BWT 串与串数相同（缓存与元信息不参与比较）。
    fn eq(&self, other: &Self) -> bool {
        self.num_strings == other.num_strings && self.runs == other.runs
    }
}

impl Eq for RlBwt {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::run::RUN_CAPACITY;
    use crate::util::dna::{encode_seq, to_alphabet};

    fn from_text(text: &[u8], num_strings: usize, rate: usize) -> RlBwt {
        let mut bwt = RlBwt::new(rate);
        for &b in text {
            bwt.append(to_alphabet(b));
        }
        bwt.set_num_strings(num_strings);
        bwt.initialize_fm_index();
        bwt
    }

    #[test]
    fn pred_counts_and_occ() {
        // BWT 串来自 {ACGT, ACGA}
        let bwt = from_text(b"TAG$$AACCG", 2, 4);
        bwt.validate();
        let a = to_alphabet(b'A');
        assert_eq!(bwt.get_pc(0), 0);
        assert_eq!(bwt.get_pc(a), 2);
        assert_eq!(bwt.get_pc(to_alphabet(b'C')), 5);
        assert_eq!(bwt.get_occ(a, 0), 0);
        assert_eq!(bwt.get_occ(a, 1), 1);
        assert_eq!(bwt.get_occ(a, 9), 3);
        assert_eq!(bwt.occ_before(a, 0), 0);
        assert_eq!(bwt.occ_before(a, 2), 1);
    }

    #[test]
    fn get_char_out_of_range() {
        let bwt = from_text(b"AC$", 1, 64);
        assert_eq!(bwt.get_char(2).unwrap(), 0);
        assert!(matches!(bwt.get_char(3), Err(Error::IndexOutOfBounds { index: 3, len: 3 })));
        assert!(bwt.get_f(3).is_err());
    }

    #[test]
    fn get_char_before_initialization() {
        let mut bwt = RlBwt::new(2);
        for &a in &[1u8, 1, 2, 3] {
            bwt.append(a);
        }
        assert!(!bwt.is_initialized());
        assert_eq!(bwt.get_char(3).unwrap(), 3);
    }

    #[test]
    fn f_column_partition() {
        let bwt = from_text(b"TAG$$AACCG", 2, 4);
        let f: Vec<u8> = (0..bwt.num_symbols()).map(|i| bwt.get_f(i).unwrap()).collect();
        assert_eq!(dna::decode_seq(&f), "$$AAACCGGT");
    }

    #[test]
    fn occ_diff_short_and_long() {
        let text: Vec<u8> = b"ACGTTTTTGGA$CCAN".iter().cycle().take(200).copied().collect();
        let bwt = from_text(&text, 200 / 16, 8);
        let d = bwt.get_occ_diff(3, 9);
        assert_eq!(d, bwt.get_full_occ(9) - bwt.get_full_occ(3));
        let d = bwt.get_occ_diff(5, 150);
        assert_eq!(d.sum(), 145);
    }

    #[test]
    fn long_runs_split_at_capacity() {
        let mut bwt = RlBwt::new(16);
        bwt.append_repeat(1, RUN_CAPACITY as usize + 1);
        bwt.initialize_fm_index();
        assert_eq!(bwt.num_runs(), 2);
        assert_eq!(bwt.get_occ(1, 31), 32);
    }

    #[test]
    fn backward_search_counts_matches() {
        let bwt = from_text(b"TAG$$AACCG", 2, 4);
        let (l, r) = bwt.backward_search(&encode_seq(b"ACG")).unwrap();
        assert_eq!(r - l, 2);
        assert!(bwt.backward_search(&encode_seq(b"GGG")).is_none());
    }

    #[test]
    fn persistence_roundtrip() {
        let mut bwt = from_text(b"TAG$$AACCG", 2, 4);
        bwt.meta_mut().merge_rounds = 3;
        let mut buf = Vec::new();
        bwt.write_to(&mut buf).unwrap();
        let loaded = RlBwt::read_from(&buf[..], 4).unwrap();
        assert_eq!(loaded, bwt);
        assert_eq!(loaded.meta().merge_rounds, 3);
        loaded.validate();
    }

    #[test]
    fn from_runs_rejects_sentinel_mismatch() {
        let runs = vec![RunUnit::with_count(1, 3).unwrap(), RunUnit::with_count(0, 1).unwrap()];
        assert!(RlBwt::from_runs(runs.clone(), 1, 64).is_ok());
        assert!(matches!(RlBwt::from_runs(runs, 2, 64), Err(Error::Format(_))));
    }

    #[test]
    fn zero_sample_rate_is_an_error() {
        let bwt = from_text(b"AC$", 1, 64);
        let mut buf = Vec::new();
        bwt.write_to(&mut buf).unwrap();
        assert!(matches!(RlBwt::read_from(&buf[..], 0), Err(Error::InvalidSampleRate(0))));
        let runs: Vec<RunUnit> = bwt.runs().collect();
        assert!(matches!(RlBwt::from_runs(runs, 1, 0), Err(Error::InvalidSampleRate(0))));
    }

    #[test]
    fn corrupt_bytes_are_format_errors() {
        let bwt = from_text(b"AC$", 1, 64);
        let mut buf = Vec::new();
        bwt.write_to(&mut buf).unwrap();
        // 第一个游程字节（长度前缀 8 字节之后）改成计数 0
        buf[8] = 0b0010_0000;
        assert!(matches!(RlBwt::read_from(&buf[..], 64), Err(Error::Format(_))));
    }
}
