//! 字母表编码：`$ A C G T N` 映射为 rank `0..SIGMA`，rank 顺序即排序顺序。

pub const SIGMA: usize = 6; // {0:$, 1:A, 2:C, 3:G, 4:T, 5:N}

/// BWT 中的符号，取值为字母表 rank。
pub type Symbol = u8;

pub const SENTINEL: Symbol = 0;

/// 按 rank 排列的字符，`RANK_ALPHABET[r]` 为 rank `r` 的字符。
pub const RANK_ALPHABET: [u8; SIGMA] = [b'$', b'A', b'C', b'G', b'T', b'N'];

#[inline]
pub fn to_alphabet(b: u8) -> Symbol {
    match b.to_ascii_uppercase() {
        b'$' => 0,
        b'A' => 1,
        b'C' => 2,
        b'G' => 3,
        b'T' | b'U' => 4,
        _ => 5, // 其余一律视为 N
    }
}

#[inline]
pub fn from_alphabet(a: Symbol) -> u8 {
    RANK_ALPHABET.get(a as usize).copied().unwrap_or(b'N')
}

#[inline]
pub fn is_valid_symbol(a: Symbol) -> bool {
    (a as usize) < SIGMA
}

pub fn normalize_seq(seq: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(seq.len());
    for &b in seq {
        let up = b.to_ascii_uppercase();
        let nb = match up {
            b'A' | b'C' | b'G' | b'T' | b'N' => up,
            b'U' => b'T',
            _ => b'N',
        };
        out.push(nb);
    }
    out
}

/// 规范化后直接编码为 rank 序列（不含 `$`）。
pub fn encode_seq(seq: &[u8]) -> Vec<Symbol> {
    normalize_seq(seq).into_iter().map(to_alphabet).collect()
}

pub fn decode_seq(symbols: &[Symbol]) -> String {
    symbols.iter().map(|&a| from_alphabet(a) as char).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rank_order_matches_alphabet() {
        for (r, &c) in RANK_ALPHABET.iter().enumerate() {
            assert_eq!(to_alphabet(c) as usize, r);
            assert_eq!(from_alphabet(r as u8), c);
        }
        assert_eq!(to_alphabet(b'u'), 4);
        assert_eq!(to_alphabet(b'R'), 5);
    }

    #[test]
    fn encode_normalizes_case_and_unknowns() {
        let s = encode_seq(b"acgUx");
        assert_eq!(s, vec![1, 2, 3, 4, 5]);
        assert_eq!(decode_seq(&s), "ACGTN");
    }
}
