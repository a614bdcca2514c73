use crate::error::{Error, Result};
use crate::util::dna::{Symbol, SIGMA};

/// 拼接文本（碱基 + 每条 read 一个哨兵）的最大长度：位置与字符都存为 `u32`。
pub const MAX_TEXT_LEN: usize = u32::MAX as usize - SIGMA;

/// 一批 read 拼接后的文本长度。
pub fn text_len<S: AsRef<[Symbol]>>(reads: &[S]) -> usize {
    reads.iter().map(|r| r.as_ref().len() + 1).sum()
}

/// 检查拼接文本能否用 `u32` 表示。
pub fn check_text_len(len: usize) -> Result<()> {
    if len > MAX_TEXT_LEN {
        return Err(Error::CollectionTooLarge { len, max: MAX_TEXT_LEN });
    }
    Ok(())
}

/// 把一批 read 拼接成排序用的文本。
///
/// 第 i 条 read 的结尾写入哨兵 `i`，碱基 rank `a` 写成 `n + a`（n 为 read 数），
/// 所以所有哨兵互不相同、小于任何碱基，且按 read 序号排序。
///
/// # Panics
/// 文本长度超过 [`MAX_TEXT_LEN`] 时 panic；调用方应先用 [`check_text_len`] 检查。
pub fn collection_text<S: AsRef<[Symbol]>>(reads: &[S]) -> Vec<u32> {
    let total = text_len(reads);
    assert!(total <= MAX_TEXT_LEN, "collection of {} symbols does not fit in u32", total);
    let n = reads.len() as u32;
    let mut text = Vec::with_capacity(total);
    for (i, read) in reads.iter().enumerate() {
        text.extend(read.as_ref().iter().map(|&a| n + a as u32));
        text.push(i as u32);
    }
    text
}

/// 构建后缀数组（基于倍增法，O(n log² n)）。
/// 哨兵互不相同，因此比较永远不会越过某条 read 的末尾。
pub fn build_sa(text: &[u32]) -> Vec<u32> {
    let n = text.len();
    if n == 0 {
        return Vec::new();
    }
    let mut sa: Vec<usize> = (0..n).collect();
    let mut rank: Vec<i64> = text.iter().map(|&b| b as i64).collect();
    let mut tmp: Vec<i64> = vec![0; n];

    let mut k = 1usize;
    while k < n {
        let key = |i: usize| (rank[i], if i + k < n { rank[i + k] } else { -1 });
        sa.sort_unstable_by_key(|&i| key(i));

        tmp[sa[0]] = 0;
        for i in 1..n {
            let a = sa[i - 1];
            let b = sa[i];
            tmp[b] = tmp[a] + if key(b) != key(a) { 1 } else { 0 };
        }

        // 复制回 rank
        rank.copy_from_slice(&tmp);
        if rank[sa[n - 1]] as usize == n - 1 {
            break;
        }
        k <<= 1;
    }

    sa.into_iter().map(|x| x as u32).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn naive_sa(text: &[u32]) -> Vec<u32> {
        let n = text.len();
        let mut suffixes: Vec<(usize, &[u32])> = (0..n).map(|i| (i, &text[i..])).collect();
        suffixes.sort_by(|a, b| a.1.cmp(b.1));
        suffixes.into_iter().map(|(i, _)| i as u32).collect()
    }

    fn make_reads(count: usize, max_len: usize) -> Vec<Vec<u8>> {
        let mut x: u32 = 1_234_567;
        let mut next = || {
            x = x.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            x >> 16
        };
        (0..count)
            .map(|_| {
                let len = next() as usize % (max_len + 1);
                (0..len).map(|_| (next() % 4) as u8 + 1).collect()
            })
            .collect()
    }

    #[test]
    fn collection_text_layout() {
        let reads = vec![vec![1u8, 2], vec![], vec![4u8]];
        // n = 3：碱基编码为 3 + rank
        assert_eq!(collection_text(&reads), vec![4, 5, 0, 1, 7, 2]);
    }

    #[test]
    fn text_length_limit() {
        assert_eq!(text_len(&[vec![1u8, 2], vec![]]), 4);
        assert!(check_text_len(MAX_TEXT_LEN).is_ok());
        assert!(matches!(
            check_text_len(MAX_TEXT_LEN + 1),
            Err(Error::CollectionTooLarge { len, .. }) if len == MAX_TEXT_LEN + 1
        ));
    }

    #[test]
    fn sa_basic() {
        // 单条 read：A C G T $ -> 2 3 4 5 0
        let text = collection_text(&[vec![1u8, 2, 3, 4]]);
        let sa = build_sa(&text);
        // 期望：后缀按字典序：$, ACGT$, CGT$, GT$, T$
        assert_eq!(sa, vec![4, 0, 1, 2, 3]);
    }

    #[test]
    fn sa_matches_naive_on_random_collections() {
        for count in 1..=8 {
            let reads = make_reads(count, 12);
            let text = collection_text(&reads);
            assert_eq!(build_sa(&text), naive_sa(&text), "mismatch on count={}", count);
        }
    }
}
