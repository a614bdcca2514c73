use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::util::dna::{self, Symbol};

/// 单个游程可记录的最大长度（计数字段 5 bit）。
pub const RUN_CAPACITY: u8 = 31;

const SYMBOL_SHIFT: u8 = 5;
const COUNT_MASK: u8 = 0x1F;

/// 一个游程单元：符号 + 重复次数。
///
/// 持久化时压成一个字节：高 3 bit 为符号 rank，低 5 bit 为计数。
/// `count == 0` 表示尚未初始化，只在构建过程中短暂出现。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct RunUnit {
    symbol: Symbol,
    count: u8,
}

impl RunUnit {
    /// 以单个符号开始一个新游程。
    #[inline]
    pub fn new(symbol: Symbol) -> Self {
        debug_assert!(dna::is_valid_symbol(symbol), "symbol rank {} out of alphabet", symbol);
        Self { symbol, count: 1 }
    }

    pub fn with_count(symbol: Symbol, count: u8) -> Result<Self> {
        if !dna::is_valid_symbol(symbol) {
            return Err(Error::InvalidSymbol(symbol));
        }
        if count == 0 || count > RUN_CAPACITY {
            return Err(Error::InvalidRun(format!(
                "count {} outside 1..={}",
                count, RUN_CAPACITY
            )));
        }
        Ok(Self { symbol, count })
    }

    #[inline]
    pub fn symbol(&self) -> Symbol {
        self.symbol
    }

    #[inline]
    pub fn count(&self) -> u8 {
        self.count
    }

    /// 计数已满，不能再扩展，只能开新游程。
    #[inline]
    pub fn is_full(&self) -> bool {
        self.count == RUN_CAPACITY
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.count > 0
    }

    /// # Panics
    /// 游程已满时调用属于逻辑错误。
    #[inline]
    pub fn increment(&mut self) {
        assert!(!self.is_full(), "run of symbol {} is already full", self.symbol);
        self.count += 1;
    }

    /// 增加 `n` 个计数，返回实际加入的数量（受容量限制）。
    #[inline]
    pub fn extend_by(&mut self, n: usize) -> usize {
        let room = (RUN_CAPACITY - self.count) as usize;
        let take = room.min(n);
        self.count += take as u8;
        take
    }

    #[inline]
    pub fn packed(&self) -> u8 {
        (self.symbol << SYMBOL_SHIFT) | self.count
    }

    pub fn from_packed(byte: u8) -> Result<Self> {
        Self::with_count(byte >> SYMBOL_SHIFT, byte & COUNT_MASK)
    }
}

impl TryFrom<u8> for RunUnit {
    type Error = Error;

    fn try_from(byte: u8) -> Result<Self> {
        Self::from_packed(byte)
    }
}

impl From<RunUnit> for u8 {
    fn from(unit: RunUnit) -> u8 {
        unit.packed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_run_has_count_one() {
        let u = RunUnit::new(3);
        assert_eq!(u.symbol(), 3);
        assert_eq!(u.count(), 1);
        assert!(u.is_initialized());
        assert!(!RunUnit::default().is_initialized());
    }

    #[test]
    fn increment_until_full() {
        let mut u = RunUnit::new(1);
        for _ in 1..RUN_CAPACITY {
            u.increment();
        }
        assert!(u.is_full());
        assert_eq!(u.count(), 31);
    }

    #[test]
    #[should_panic(expected = "already full")]
    fn increment_past_capacity_panics() {
        let mut u = RunUnit::with_count(2, RUN_CAPACITY).unwrap();
        u.increment();
    }

    #[test]
    fn extend_by_respects_capacity() {
        let mut u = RunUnit::with_count(4, 29).unwrap();
        assert_eq!(u.extend_by(5), 2);
        assert!(u.is_full());
        assert_eq!(u.extend_by(1), 0);
    }

    #[test]
    fn packed_byte_layout() {
        let u = RunUnit::with_count(5, 31).unwrap();
        assert_eq!(u.packed(), 0b1011_1111);
        assert_eq!(RunUnit::from_packed(0b1011_1111).unwrap(), u);
    }

    #[test]
    fn from_packed_rejects_bad_fields() {
        // 计数为 0
        assert!(RunUnit::from_packed(0b0010_0000).is_err());
        // 符号 7 不在字母表内
        assert!(matches!(RunUnit::from_packed(0b1110_0001), Err(Error::InvalidSymbol(7))));
        assert!(RunUnit::with_count(1, 32).is_err());
    }
}
