//! 演示如何在 library 模式下增量扩展一个 BWT 索引。
//!
//! 运行方式：
//! ```bash
//! cargo run --example incremental_merge
//! ```

use rlbwt_merge::io::SequenceItem;
use rlbwt_merge::merge::{self, MergeOpt};
use rlbwt_merge::util::dna;

fn print_bwt(label: &str, bwt: &rlbwt_merge::index::RlBwt) {
    let s: Vec<u8> = bwt.symbols().collect();
    println!(
        "{}: BWT={} ({} 条序列, {} 个符号, {} 个游程)",
        label,
        dna::decode_seq(&s),
        bwt.num_strings(),
        bwt.num_symbols(),
        bwt.num_runs()
    );
}

fn main() -> rlbwt_merge::Result<()> {
    let opt = MergeOpt::default();

    // 1. 从头构建初始索引
    let reads = vec![
        SequenceItem::from_bases("0", b"ACGT"),
        SequenceItem::from_bases("1", b"ACGA"),
    ];
    let index = merge::build_index(&reads, &opt)?;
    print_bwt("初始索引", &index);

    // 2. 加入新的一批 read
    let batch = vec![SequenceItem::from_bases("new", b"ACGG")];
    let (index, report) = merge::extend_index(&index, &batch, &opt)?;
    print_bwt("合并之后", &index);
    println!("插入 {} 条序列，gap array 非零位置 {}", report.accepted, report.gap_stats.nonzero);

    // 3. 查询
    let a = dna::to_alphabet(b'A');
    println!("Occ(A, n-1) = {}", index.get_occ(a, index.num_symbols() - 1));
    if let Some((l, r)) = index.backward_search(&dna::encode_seq(b"ACG")) {
        println!("\"ACG\" 出现 {} 次", r - l);
    }

    // 4. 删除刚加入的序列（合并后序号为 0）
    let removal = vec![SequenceItem::from_bases("0", b"ACGG")];
    let (index, _) = merge::remove_from_index(&index, &removal, &opt)?;
    print_bwt("删除之后", &index);
    Ok(())
}
