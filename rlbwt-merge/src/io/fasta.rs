use std::io::BufRead;

use crate::error::{Error, Result};
use crate::io::{split_header, RawRead};

/// 多行 FASTA 读取器，每条记录产出一个 [`RawRead`]。
pub struct FastaReader<R: BufRead> {
    reader: R,
    buf: String,
    peek_header: Option<String>,
    done: bool,
}

impl<R: BufRead> FastaReader<R> {
    pub fn new(reader: R) -> Self {
        Self { reader, buf: String::new(), peek_header: None, done: false }
    }

    fn read_line(&mut self) -> Result<bool> {
        self.buf.clear();
        Ok(self.reader.read_line(&mut self.buf)? > 0)
    }

    pub fn next_record(&mut self) -> Result<Option<RawRead>> {
        if self.done {
            return Ok(None);
        }

        let header = match self.peek_header.take() {
            Some(h) => h,
            None => loop {
                if !self.read_line()? {
                    self.done = true;
                    return Ok(None);
                }
                let line = self.buf.trim();
                if line.is_empty() {
                    continue;
                }
                match line.strip_prefix('>') {
                    Some(h) => break h.trim().to_string(),
                    None => return Err(Error::Format(format!("FASTA line before first header: '{}'", line))),
                }
            },
        };

        let mut seq = Vec::new();
        while self.read_line()? {
            if let Some(h) = self.buf.strip_prefix('>') {
                self.peek_header = Some(h.trim().to_string());
                break;
            }
            seq.extend(self.buf.bytes().filter(|b| !b.is_ascii_whitespace()));
        }
        if self.peek_header.is_none() {
            self.done = true;
        }

        let (id, desc) = split_header(&header);
        Ok(Some(RawRead { id, desc, seq }))
    }
}

impl<R: BufRead> Iterator for FastaReader<R> {
    type Item = Result<RawRead>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn parse_multiline_records() {
        let data = b">r1 first\nACgT\nNN\n>r2\nAAA\n";
        let recs: Vec<RawRead> = FastaReader::new(Cursor::new(&data[..])).collect::<Result<_>>().unwrap();
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0].id, "r1");
        assert_eq!(recs[0].desc.as_deref(), Some("first"));
        assert_eq!(recs[0].seq, b"ACgTNN");
        assert_eq!(recs[1].id, "r2");
        assert_eq!(recs[1].desc, None);
        assert_eq!(recs[1].seq, b"AAA");
    }

    #[test]
    fn crlf_and_blank_lines() {
        let data = b"\n\n>r1 desc\r\nAC g t\r\n acgt\r\n>r2 \r\n";
        let recs: Vec<RawRead> = FastaReader::new(Cursor::new(&data[..])).collect::<Result<_>>().unwrap();
        assert_eq!(recs[0].seq, b"ACgtacgt");
        assert_eq!(recs[1].id, "r2");
        assert!(recs[1].seq.is_empty());
    }

    #[test]
    fn text_before_header_is_rejected() {
        let data = b"ACGT\n>r1\nA\n";
        let mut r = FastaReader::new(Cursor::new(&data[..]));
        assert!(matches!(r.next_record(), Err(Error::Format(_))));
    }
}
