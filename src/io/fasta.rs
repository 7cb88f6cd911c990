//! 最小的 FASTA 读取器，为索引构建提供原始序列。

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::{IoContext, Result};

#[derive(Debug, Clone)]
pub struct FastaRecord {
    pub id: String,
    pub desc: Option<String>,
    pub seq: Vec<u8>,
}

pub struct FastaReader<R: BufRead> {
    reader: R,
    name: String,
    buf: String,
    done: bool,
    peek_header: Option<String>,
    /// 已读入的字节数
    bytes_read: u64,
}

impl FastaReader<BufReader<File>> {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).io_context(|| format!("cannot open {}", path.display()))?;
        Ok(Self::new(BufReader::new(file), path.display().to_string()))
    }
}

impl<R: BufRead> FastaReader<R> {
    pub fn new(reader: R, name: impl Into<String>) -> Self {
        Self {
            reader,
            name: name.into(),
            buf: String::new(),
            done: false,
            peek_header: None,
            bytes_read: 0,
        }
    }

    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    fn read_line(&mut self) -> Result<usize> {
        self.buf.clear();
        let n = self
            .reader
            .read_line(&mut self.buf)
            .io_context(|| format!("cannot read {}", self.name))?;
        self.bytes_read += n as u64;
        Ok(n)
    }

    /// 下一条记录；文件结束时返回 `None`
    pub fn next_record(&mut self) -> Result<Option<FastaRecord>> {
        if self.done {
            return Ok(None);
        }

        let header = if let Some(h) = self.peek_header.take() {
            h
        } else {
            loop {
                if self.read_line()? == 0 {
                    self.done = true;
                    return Ok(None);
                }
                if let Some(rest) = self.buf.strip_prefix('>') {
                    break rest.trim().to_string();
                }
            }
        };

        let mut parts = header.splitn(2, char::is_whitespace);
        let id = parts.next().unwrap_or("").to_string();
        let desc = parts.next().map(|s| s.trim().to_string()).filter(|s| !s.is_empty());

        let mut seq: Vec<u8> = Vec::new();
        loop {
            if self.read_line()? == 0 {
                self.done = true;
                break;
            }
            if let Some(rest) = self.buf.strip_prefix('>') {
                self.peek_header = Some(rest.trim().to_string());
                break;
            }
            seq.extend(self.buf.bytes().filter(|b| !b.is_ascii_whitespace()));
        }

        Ok(Some(FastaRecord { id, desc, seq }))
    }
}

impl<R: BufRead> Iterator for FastaReader<R> {
    type Item = Result<FastaRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn parse_simple_fasta() {
        let data = b">chr1 first\nACgTNN\n>chr2\nAAA\n";
        let mut r = FastaReader::new(Cursor::new(&data[..]), "mem");

        let r1 = r.next_record().unwrap().unwrap();
        assert_eq!(r1.id, "chr1");
        assert_eq!(r1.desc.as_deref(), Some("first"));
        assert_eq!(r1.seq, b"ACgTNN");

        let r2 = r.next_record().unwrap().unwrap();
        assert_eq!(r2.id, "chr2");
        assert_eq!(r2.desc, None);
        assert_eq!(r2.seq, b"AAA");

        assert!(r.next_record().unwrap().is_none());
        assert_eq!(r.bytes_read(), data.len() as u64);
    }

    #[test]
    fn parse_fasta_with_crlf_and_whitespace() {
        let data = b"\n\n>chr1 desc\r\nAC g t n\r\n acgt\r\n>chr2 \r\n N N N \r\n";
        let records: Vec<FastaRecord> = FastaReader::new(Cursor::new(&data[..]), "mem").collect::<Result<_>>().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "chr1");
        assert_eq!(records[0].seq, b"ACgtnacgt");
        assert_eq!(records[1].desc, None);
        assert_eq!(records[1].seq, b"NNN");
    }
}
