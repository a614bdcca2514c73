use std::io::BufRead;

use crate::error::{Error, Result};
use crate::io::{split_header, RawRead};

/// 四行格式的 FASTQ 读取器；质量行只检查长度，不保留。
pub struct FastqReader<R: BufRead> {
    reader: R,
    buf: String,
    line_no: usize,
}

impl<R: BufRead> FastqReader<R> {
    pub fn new(reader: R) -> Self {
        Self { reader, buf: String::new(), line_no: 0 }
    }

    fn read_line(&mut self) -> Result<bool> {
        self.buf.clear();
        let n = self.reader.read_line(&mut self.buf)?;
        self.line_no += 1;
        Ok(n > 0)
    }

    fn malformed(&self, what: &str) -> Error {
        Error::Format(format!("FASTQ line {}: {}", self.line_no, what))
    }

    pub fn next_record(&mut self) -> Result<Option<RawRead>> {
        // 跳过记录之间的空行，然后读取 '@' 开头的标题行
        loop {
            if !self.read_line()? {
                return Ok(None);
            }
            if !self.buf.trim().is_empty() {
                break;
            }
        }
        let header = match self.buf.trim_end().strip_prefix('@') {
            Some(h) => h.to_string(),
            None => return Err(self.malformed("header not starting with '@'")),
        };
        let (id, desc) = split_header(&header);

        if !self.read_line()? {
            return Err(self.malformed("unexpected EOF after header"));
        }
        let seq = self.buf.trim_end().as_bytes().to_vec();

        if !self.read_line()? || !self.buf.starts_with('+') {
            return Err(self.malformed("missing '+' line"));
        }

        if !self.read_line()? {
            return Err(self.malformed("missing quality line"));
        }
        if self.buf.trim_end().len() != seq.len() {
            return Err(self.malformed("seq/qual length mismatch"));
        }

        Ok(Some(RawRead { id, desc, seq }))
    }
}

impl<R: BufRead> Iterator for FastqReader<R> {
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
    fn parse_two_records() {
        let data = b"@r1 lane1\nACGT\n+\nIIII\n\n@r2\nNN\n+r2\n##\n";
        let recs: Vec<RawRead> = FastqReader::new(Cursor::new(&data[..])).collect::<Result<_>>().unwrap();
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0].id, "r1");
        assert_eq!(recs[0].desc.as_deref(), Some("lane1"));
        assert_eq!(recs[0].seq, b"ACGT");
        assert_eq!(recs[1].id, "r2");
        assert_eq!(recs[1].seq, b"NN");
    }

    #[test]
    fn length_mismatch_is_an_error() {
        let data = b"@r1\nACGT\n+\nII\n";
        let mut r = FastqReader::new(Cursor::new(&data[..]));
        let err = r.next_record().unwrap_err();
        assert!(err.to_string().contains("length mismatch"));
    }

    #[test]
    fn missing_plus_line() {
        let data = b"@r1\nACGT\nIIII\n";
        let mut r = FastqReader::new(Cursor::new(&data[..]));
        assert!(matches!(r.next_record(), Err(Error::Format(_))));
    }
}
