//! 字母表：符号到小整数编码的映射，以及 `.al1` 文件的读写。
//!
//! 真实字符编码为 `0..numofchars`，通配符与分隔符使用两个保留值
//! [`WILDCARD`] 与 [`SEPARATOR`]，它们统称为 special 字符。

pub mod codes;

use std::io::Write;
use std::path::Path;

use crate::error::{ConfigError, IoContext, Result};

/// 通配符（如 DNA 中的 N）
pub const WILDCARD: u8 = u8::MAX - 1;
/// 序列分隔符
pub const SEPARATOR: u8 = u8::MAX;
/// 未映射的输入符号
pub const UNDEFCHAR: u8 = u8::MAX - 2;
/// 后缀 0 之前没有字符，`.bwt` 中以此值代替
pub const UNDEFBWTCHAR: u8 = UNDEFCHAR;
/// special 字符在比较时一律大于真实字符
pub const SPECIAL_OFFSET: usize = u8::MAX as usize + 1;

pub const DNA_NUM_OF_CHARS: u32 = 4;

const DNA_WILDCARDS: &str = "nsywrkvbdhmNSYWRKVBDHM";
const PROTEIN_UPPER_AMINO_ACIDS: &str = "LVIFKREDAGSTNQYWPHMC";
const PROTEIN_WILDCARDS: &str = "XUBZ*-";

#[inline]
pub fn is_special(cc: u8) -> bool {
    cc >= WILDCARD
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alphabet {
    symbolmap: [u8; 256],
    /// 字符类数目，含通配符类
    mapsize: u32,
    /// 每个真实字符的显示符号
    characters: Vec<u8>,
    wildcardshow: u8,
    /// 所有被映射的输入符号，按出现顺序
    mapdomain: Vec<u8>,
}

impl Alphabet {
    /// 默认 DNA 字母表：acgt（u 视为 t），IUPAC 多义碱基映射为通配符。
    pub fn dna() -> Self {
        let lines = ["aA", "cC", "gG", "tTuU", DNA_WILDCARDS];
        Self::from_class_lines(lines.iter().map(|s| s.as_bytes()), &[b'a', b'c', b'g', b't'], b'n')
    }

    /// 默认蛋白质字母表：20 种氨基酸，其余映射为通配符。
    pub fn protein() -> Self {
        let mut lines: Vec<Vec<u8>> = PROTEIN_UPPER_AMINO_ACIDS.bytes().map(|b| vec![b]).collect();
        lines.push(PROTEIN_WILDCARDS.as_bytes().to_vec());
        Self::from_class_lines(
            lines.iter().map(|v| v.as_slice()),
            PROTEIN_UPPER_AMINO_ACIDS.as_bytes(),
            PROTEIN_WILDCARDS.as_bytes()[0],
        )
    }

    fn from_class_lines<'a>(lines: impl Iterator<Item = &'a [u8]>, characters: &[u8], wildcardshow: u8) -> Self {
        let mut symbolmap = [UNDEFCHAR; 256];
        let mut mapdomain = Vec::new();
        let mut mapsize = 0u32;
        for line in lines {
            for &cc in line {
                symbolmap[cc as usize] = mapsize as u8;
                mapdomain.push(cc);
            }
            mapsize += 1;
        }
        let mut alpha = Self {
            symbolmap,
            mapsize,
            characters: characters.to_vec(),
            wildcardshow,
            mapdomain,
        };
        alpha.map_last_class_to_wildcard();
        alpha
    }

    fn map_last_class_to_wildcard(&mut self) {
        let last = (self.mapsize - 1) as u8;
        for code in self.symbolmap.iter_mut() {
            if *code == last {
                *code = WILDCARD;
            }
        }
    }

    /// 解析符号映射文件的内容。
    ///
    /// 开头以 `#` 起始的行是注释。其余每一行是一个字符类：行内所有符号映射到同一编码，
    /// 空格之后的一个字符用于显示（缺省取行首字符）。最后一行的符号映射为通配符。
    pub fn parse_symbol_map(content: &str) -> Result<Self> {
        let mut symbolmap = [UNDEFCHAR; 256];
        let mut mapdomain = Vec::new();
        let mut shows = Vec::new();
        let mut preamble = true;

        for (linenum, line) in content.lines().enumerate() {
            let bytes = line.as_bytes();
            if bytes.is_empty() {
                continue;
            }
            if preamble && bytes[0] == b'#' {
                continue;
            }
            preamble = false;

            let code = shows.len() as u8;
            let mut show = bytes[0];
            let mut column = 0;
            while column < bytes.len() {
                let cc = bytes[column];
                if cc.is_ascii_punctuation() || cc.is_ascii_alphanumeric() {
                    if symbolmap[cc as usize] != UNDEFCHAR {
                        return Err(ConfigError::DuplicateSymbol(cc as char).into());
                    }
                    symbolmap[cc as usize] = code;
                    mapdomain.push(cc);
                    column += 1;
                } else if cc == b' ' {
                    match bytes.get(column + 1) {
                        Some(&next) if !next.is_ascii_whitespace() => show = next,
                        _ => {
                            return Err(ConfigError::IllegalSymbolMapLine(linenum + 1, line.to_string()).into());
                        }
                    }
                    break;
                } else {
                    return Err(ConfigError::IllegalSymbolMapLine(linenum + 1, line.to_string()).into());
                }
            }
            shows.push(show);
        }

        if shows.len() < 2 {
            return Err(ConfigError::Other("symbol map needs at least one character line and one wildcard line".into()).into());
        }
        let wildcardshow = shows.pop().unwrap_or(b'*');
        let mut alpha = Self {
            symbolmap,
            mapsize: shows.len() as u32 + 1,
            characters: shows,
            wildcardshow,
            mapdomain,
        };
        alpha.map_last_class_to_wildcard();
        Ok(alpha)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).io_context(|| format!("cannot read alphabet file {}", path.display()))?;
        Self::parse_symbol_map(&content)
    }

    /// 写出 `.al1` 格式：每行一个字符类，最后一行为通配符类。
    pub fn write_to<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        for code in 0..self.num_of_chars() {
            let members: Vec<u8> = self
                .mapdomain
                .iter()
                .copied()
                .filter(|&cc| self.symbolmap[cc as usize] == code as u8)
                .collect();
            self.write_class_line(out, &members, self.characters[code as usize])?;
        }
        let wildcards: Vec<u8> = self
            .mapdomain
            .iter()
            .copied()
            .filter(|&cc| self.symbolmap[cc as usize] == WILDCARD)
            .collect();
        self.write_class_line(out, &wildcards, self.wildcardshow)
    }

    fn write_class_line<W: Write>(&self, out: &mut W, members: &[u8], show: u8) -> std::io::Result<()> {
        out.write_all(members)?;
        if members.first() != Some(&show) {
            write!(out, " {}", show as char)?;
        }
        writeln!(out)
    }

    /// 真实字符数（不含通配符类）
    #[inline]
    pub fn num_of_chars(&self) -> u32 {
        self.mapsize - 1
    }

    #[inline]
    pub fn map_size(&self) -> u32 {
        self.mapsize
    }

    pub fn is_dna(&self) -> bool {
        self.num_of_chars() == DNA_NUM_OF_CHARS && self.symbolmap[b'a' as usize] == 0 && self.symbolmap[b't' as usize] == 3
    }

    #[inline]
    pub fn encode(&self, symbol: u8) -> Option<u8> {
        match self.symbolmap[symbol as usize] {
            UNDEFCHAR => None,
            code => Some(code),
        }
    }

    /// 编码一段原始序列，遇到未知符号时报错
    pub fn encode_seq(&self, seq: &[u8]) -> Result<Vec<u8>> {
        seq.iter()
            .map(|&b| self.encode(b).ok_or_else(|| ConfigError::UnknownSymbol(b as char, b).into()))
            .collect()
    }

    /// 将多条序列编码为一个文本，序列之间插入 [`SEPARATOR`]。
    pub fn encode_multiseq<'a, I>(&self, seqs: I) -> Result<Vec<u8>>
    where
        I: IntoIterator<Item = &'a [u8]>,
    {
        let mut text = Vec::new();
        for (i, seq) in seqs.into_iter().enumerate() {
            if i > 0 {
                text.push(SEPARATOR);
            }
            for &b in seq {
                text.push(self.encode(b).ok_or(ConfigError::UnknownSymbol(b as char, b))?);
            }
        }
        Ok(text)
    }

    #[inline]
    pub fn decode(&self, code: u8) -> u8 {
        match code {
            SEPARATOR => b'|',
            WILDCARD => self.wildcardshow,
            c if (c as u32) < self.num_of_chars() => self.characters[c as usize],
            _ => b'?',
        }
    }

    pub fn decode_seq(&self, codes: &[u8]) -> String {
        codes.iter().map(|&c| self.decode(c) as char).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dna_alphabet_codes() {
        let alpha = Alphabet::dna();
        assert_eq!(alpha.num_of_chars(), 4);
        assert!(alpha.is_dna());
        assert_eq!(alpha.encode(b'A'), Some(0));
        assert_eq!(alpha.encode(b'c'), Some(1));
        assert_eq!(alpha.encode(b'G'), Some(2));
        assert_eq!(alpha.encode(b'u'), Some(3));
        assert_eq!(alpha.encode(b'N'), Some(WILDCARD));
        assert_eq!(alpha.encode(b'r'), Some(WILDCARD));
        assert_eq!(alpha.encode(b'$'), None);
        assert_eq!(alpha.decode_seq(&[0, 1, 2, 3, WILDCARD]), "acgtn");
    }

    #[test]
    fn protein_alphabet_codes() {
        let alpha = Alphabet::protein();
        assert_eq!(alpha.num_of_chars(), 20);
        assert!(!alpha.is_dna());
        assert_eq!(alpha.encode(b'L'), Some(0));
        assert_eq!(alpha.encode(b'C'), Some(19));
        assert_eq!(alpha.encode(b'X'), Some(WILDCARD));
    }

    #[test]
    fn encode_multiseq_inserts_separators() {
        let alpha = Alphabet::dna();
        let text = alpha.encode_multiseq([&b"AC"[..], &b"GT"[..]]).unwrap();
        assert_eq!(text, vec![0, 1, SEPARATOR, 2, 3]);
        assert!(alpha.encode_seq(b"AC#").is_err());
    }

    #[test]
    fn al1_roundtrip() {
        for alpha in [Alphabet::dna(), Alphabet::protein()] {
            let mut buf = Vec::new();
            alpha.write_to(&mut buf).unwrap();
            let text = String::from_utf8(buf).unwrap();
            let parsed = Alphabet::parse_symbol_map(&text).unwrap();
            assert_eq!(parsed, alpha, "al1 content:\n{}", text);
        }
    }

    #[test]
    fn parse_symbol_map_with_show_chars_and_comments() {
        let content = "# comment\nAa x\nBb\n*- ?\n";
        let alpha = Alphabet::parse_symbol_map(content).unwrap();
        assert_eq!(alpha.num_of_chars(), 2);
        assert_eq!(alpha.encode(b'a'), Some(0));
        assert_eq!(alpha.encode(b'b'), Some(1));
        assert_eq!(alpha.encode(b'-'), Some(WILDCARD));
        assert_eq!(alpha.decode(0), b'x');
        assert_eq!(alpha.decode(1), b'B');
        assert_eq!(alpha.decode(WILDCARD), b'?');
    }

    #[test]
    fn parse_symbol_map_rejects_duplicates() {
        assert!(Alphabet::parse_symbol_map("ab\nb\nn\n").is_err());
        assert!(Alphabet::parse_symbol_map("a\n").is_err());
    }
}
