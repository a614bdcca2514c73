use crate::index::rlbwt::RlBwt;
use crate::index::sa;
use crate::util::dna::{Symbol, SENTINEL};

/// 根据后缀数组构建多串 BWT 并写入游程编码索引。
/// text 为 [`sa::collection_text`] 的输出，`num_reads` 为其中的 read 数。
pub fn build_bwt(text: &[u32], sa: &[u32], num_reads: usize, sample_rate: usize) -> RlBwt {
    let n = num_reads as u32;
    let mut bwt = RlBwt::new(sample_rate);
    for &p in sa {
        let i = p as usize;
        // read 起点（位于文本开头或紧跟上一条 read 的哨兵）对应 `$`
        let prev = if i == 0 || text[i - 1] < n { SENTINEL } else { (text[i - 1] - n) as Symbol };
        bwt.append(prev);
    }
    bwt.set_num_strings(num_reads);
    bwt.initialize_fm_index();
    bwt
}

/// 从头构建一批 read 的 BWT：`$` 按 read 在批次中的顺序排序。
///
/// # Panics
/// 拼接文本超过 [`sa::MAX_TEXT_LEN`] 或 `sample_rate == 0` 时 panic。
pub fn build_rlbwt<S: AsRef<[Symbol]>>(reads: &[S], sample_rate: usize) -> RlBwt {
    let text = sa::collection_text(reads);
    let sa_arr = sa::build_sa(&text);
    build_bwt(&text, &sa_arr, reads.len(), sample_rate)
}
