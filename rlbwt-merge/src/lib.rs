//! # rlbwt-merge
//!
//! DNA read 集合上的游程编码 BWT / FM 索引，支持增量合并。
//!
//! 本 crate 提供：
//!
//! - **压缩 BWT**：游程单元（符号 + 5 bit 计数）、定长采样的 Occ 表、C 表
//! - **查询**：`get_char` / `get_occ` / `get_full_occ` / `get_occ_diff` / `get_f`
//! - **增量扩展**：并行计算新序列的插入 rank，聚合为 gap array，单次顺序重写
//! - **删除**：沿已有序列的 rank 轨迹标记并去除其符号
//!
//! ## 快速示例
//!
//! ```rust
//! use rlbwt_merge::io::SequenceItem;
//! use rlbwt_merge::merge::{self, MergeOpt};
//! use rlbwt_merge::util::dna;
//!
//! let opt = MergeOpt::default();
//! let reads = vec![
//!     SequenceItem::from_bases("0", b"ACGT"),
//!     SequenceItem::from_bases("1", b"ACGA"),
//! ];
//! let index = merge::build_index(&reads, &opt).unwrap();
//!
//! let batch = vec![SequenceItem::from_bases("new", b"ACGG")];
//! let (next, report) = merge::extend_index(&index, &batch, &opt).unwrap();
//! assert_eq!(report.accepted, 1);
//! assert_eq!(next.num_strings(), 3);
//!
//! let a = dna::to_alphabet(b'A');
//! assert_eq!(next.get_occ(a, next.num_symbols() - 1), 4);
//! ```
//!
//! ## 模块说明
//!
//! - [`index`] — 游程编码 BWT、Occ 采样、从头构建
//! - [`merge`] — rank 计算、gap array、合并引擎
//! - [`io`] — FASTA / FASTQ 序列来源
//! - [`util`] — 字母表编码

pub mod error;
pub mod index;
pub mod io;
pub mod logging;
pub mod merge;
pub mod util;

pub use error::{Error, Result};
