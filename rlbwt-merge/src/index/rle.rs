use crate::error::{Error, Result};
use crate::index::run::RunUnit;
use crate::util::dna::Symbol;

/// 游程编码的 BWT 串。
///
/// 不变式：相邻两个游程符号相同，当且仅当前一个已满。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunLengthString {
    units: Vec<RunUnit>,
    len: usize,
}

impl RunLengthString {
    pub fn new() -> Self {
        Self::default()
    }

    /// 逻辑长度（所有游程计数之和）。
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn num_runs(&self) -> usize {
        self.units.len()
    }

    #[inline]
    pub fn units(&self) -> &[RunUnit] {
        &self.units
    }

    #[inline]
    pub fn unit(&self, i: usize) -> RunUnit {
        self.units[i]
    }

    /// 追加一个符号：优先扩展最后一个游程，满了或符号不同才新开。
    pub fn append(&mut self, symbol: Symbol) {
        match self.units.last_mut() {
            Some(last) if last.symbol() == symbol && !last.is_full() => last.increment(),
            _ => self.units.push(RunUnit::new(symbol)),
        }
        self.len += 1;
    }

    /// 追加 `n` 个相同符号，结果与调用 `n` 次 `append` 相同。
    pub fn append_repeat(&mut self, symbol: Symbol, mut n: usize) {
        if n == 0 {
            return;
        }
        self.len += n;
        if let Some(last) = self.units.last_mut() {
            if last.symbol() == symbol {
                n -= last.extend_by(n);
            }
        }
        while n > 0 {
            let mut unit = RunUnit::new(symbol);
            n -= 1;
            n -= unit.extend_by(n);
            self.units.push(unit);
        }
    }

    /// 按原样压入一个游程（读取持久化数据时使用），并检查最大性。
    pub fn push_run(&mut self, unit: RunUnit) -> Result<()> {
        if !unit.is_initialized() {
            return Err(Error::InvalidRun("uninitialized run".to_string()));
        }
        if let Some(last) = self.units.last() {
            if last.symbol() == unit.symbol() && !last.is_full() {
                return Err(Error::InvalidRun(format!(
                    "run {} extends a non-full run of the same symbol",
                    self.units.len()
                )));
            }
        }
        self.len += unit.count() as usize;
        self.units.push(unit);
        Ok(())
    }

    /// 线性扫描解码位置 `pos` 的符号，无需 Occ 采样。
    pub fn get(&self, pos: usize) -> Result<Symbol> {
        if pos >= self.len {
            return Err(Error::IndexOutOfBounds { index: pos, len: self.len });
        }
        let mut remaining = pos;
        for unit in &self.units {
            let c = unit.count() as usize;
            if remaining < c {
                return Ok(unit.symbol());
            }
            remaining -= c;
        }
        unreachable!("run counts sum to len")
    }

    /// 顺序解码全部符号。
    pub fn symbols(&self) -> impl Iterator<Item = Symbol> + '_ {
        self.units
            .iter()
            .flat_map(|u| std::iter::repeat(u.symbol()).take(u.count() as usize))
    }
}

impl FromIterator<Symbol> for RunLengthString {
    fn from_iter<I: IntoIterator<Item = Symbol>>(iter: I) -> Self {
        let mut s = Self::new();
        for a in iter {
            s.append(a);
        }
        s
    }
}
