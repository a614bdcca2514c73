//! 序列来源：FASTA / FASTQ 读取，并编码为字母表 rank。

pub mod fasta;
pub mod fastq;

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::{Error, Result};
use crate::util::dna::{self, Symbol};

/// 文件中读出的原始记录（碱基未规范化）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRead {
    pub id: String,
    pub desc: Option<String>,
    pub seq: Vec<u8>,
}

/// 参与一轮合并的序列：id + rank 编码的碱基。
///
/// 删除模式下 id 必须是该序列在当前索引中的序号。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceItem {
    pub id: String,
    pub seq: Vec<Symbol>,
}

impl SequenceItem {
    pub fn from_bases(id: impl Into<String>, bases: &[u8]) -> Self {
        Self { id: id.into(), seq: dna::encode_seq(bases) }
    }
}

impl From<RawRead> for SequenceItem {
    fn from(r: RawRead) -> Self {
        Self::from_bases(r.id, &r.seq)
    }
}

pub(crate) fn split_header(header: &str) -> (String, Option<String>) {
    let mut parts = header.splitn(2, char::is_whitespace);
    let id = parts.next().unwrap_or("").to_string();
    let desc = parts.next().map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
    (id, desc)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeqFormat {
    Fasta,
    Fastq,
}

/// 根据第一个非空白字节判断格式。
pub fn sniff_format<R: BufRead>(reader: &mut R) -> Result<Option<SeqFormat>> {
    loop {
        let buf = reader.fill_buf()?;
        if buf.is_empty() {
            return Ok(None);
        }
        match buf.iter().position(|b| !b.is_ascii_whitespace()) {
            Some(i) => {
                return match buf[i] {
                    b'>' => Ok(Some(SeqFormat::Fasta)),
                    b'@' => Ok(Some(SeqFormat::Fastq)),
                    other => Err(Error::Format(format!(
                        "unrecognised sequence file: starts with byte 0x{:02x}",
                        other
                    ))),
                };
            }
            None => {
                let n = buf.len();
                reader.consume(n);
            }
        }
    }
}

/// 读取一个 FASTA / FASTQ 流中的全部序列。
pub fn read_sequences_from<R: BufRead>(mut reader: R) -> Result<Vec<SequenceItem>> {
    match sniff_format(&mut reader)? {
        None => Ok(Vec::new()),
        Some(SeqFormat::Fasta) => fasta::FastaReader::new(reader).map(|r| r.map(SequenceItem::from)).collect(),
        Some(SeqFormat::Fastq) => fastq::FastqReader::new(reader).map(|r| r.map(SequenceItem::from)).collect(),
    }
}

pub fn read_sequences<P: AsRef<Path>>(path: P) -> Result<Vec<SequenceItem>> {
    let f = File::open(path.as_ref())?;
    read_sequences_from(BufReader::new(f))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn sniffs_and_encodes_fasta() {
        let items = read_sequences_from(Cursor::new(&b"\n>a x\nacgu\n>b\nNRT\n"[..])).unwrap();
        assert_eq!(items, vec![
            SequenceItem { id: "a".to_string(), seq: vec![1, 2, 3, 4] },
            SequenceItem { id: "b".to_string(), seq: vec![5, 5, 4] },
        ]);
    }

    #[test]
    fn sniffs_fastq() {
        let items = read_sequences_from(Cursor::new(&b"@0\nAC\n+\nII\n"[..])).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "0");
    }

    #[test]
    fn empty_and_unknown_input() {
        assert!(read_sequences_from(Cursor::new(&b"  \n"[..])).unwrap().is_empty());
        assert!(matches!(read_sequences_from(Cursor::new(&b"ACGT\n"[..])), Err(Error::Format(_))));
    }
}
