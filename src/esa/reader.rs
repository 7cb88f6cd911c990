//! 读取磁盘上的增强后缀数组。
//!
//! [`SequentialSuffixArrayReader`] 顺序给出后缀与 lcp 值，可以来自文件
//! （带缓冲流式读取）或内存中的表；[`Suffixarray`] 映射各表供随机访问。

use std::borrow::Cow;
use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;

use byteorder::{NativeEndian, ReadBytesExt};

use crate::alphabet::Alphabet;
use crate::encseq::esq::ESQ_SUFFIX;
use crate::encseq::{EncodedSequence, Readmode};
use crate::error::{FormatError, IoContext, Result};
use crate::index::lcp::LCP_OVERFLOW;
use crate::io::prj::{ProjectInfo, PRJ_SUFFIX};
use crate::io::tables::{
    index_file, MappedByteTable, MappedLargeLcpTable, MappedUsizeTable, AL1_SUFFIX, BWT_SUFFIX, LCP_SUFFIX, LLV_SUFFIX,
    SUF_SUFFIX, USIZE_BYTES,
};

fn open_buffered(indexname: &str, suffix: &str) -> Result<BufReader<File>> {
    let path = index_file(indexname, suffix);
    let file = File::open(&path).io_context(|| format!("cannot open {}", path.display()))?;
    Ok(BufReader::new(file))
}

/// 读一个本机字节序的 `usize`；流结束返回 `None`
fn read_usize_or_end<R: Read>(input: &mut R, name: &str) -> Result<Option<usize>> {
    match input.read_uint::<NativeEndian>(USIZE_BYTES) {
        Ok(value) => Ok(Some(value as usize)),
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => Ok(None),
        Err(e) => Err(e).io_context(|| format!("cannot read {}", name)),
    }
}

pub(crate) enum TableStream<'a> {
    File {
        indexname: String,
        suftab: BufReader<File>,
        lcptab: BufReader<File>,
        llvtab: BufReader<File>,
    },
    Ram {
        suftab: &'a [usize],
        lcptab: &'a [usize],
    },
}

impl TableStream<'_> {
    fn next_suffix(&mut self, index: usize) -> Result<Option<usize>> {
        match self {
            TableStream::File { indexname, suftab, .. } => read_usize_or_end(suftab, &format!("{}.{}", indexname, SUF_SUFFIX)),
            TableStream::Ram { suftab, .. } => Ok(suftab.get(index).copied()),
        }
    }

    fn next_lcp(&mut self, index: usize) -> Result<Option<usize>> {
        match self {
            TableStream::File {
                indexname, lcptab, llvtab, ..
            } => {
                let value = match lcptab.read_u8() {
                    Ok(value) => value,
                    Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
                    Err(e) => return Err(e).io_context(|| format!("cannot read {}.{}", indexname, LCP_SUFFIX)),
                };
                if value < LCP_OVERFLOW {
                    return Ok(Some(value as usize));
                }
                let llvname = format!("{}.{}", indexname, LLV_SUFFIX);
                let position = read_usize_or_end(llvtab, &llvname)?.ok_or_else(|| FormatError::Truncated(llvname.clone()))?;
                let large = read_usize_or_end(llvtab, &llvname)?.ok_or_else(|| FormatError::Truncated(llvname.clone()))?;
                if position != index {
                    return Err(FormatError::Other(format!(
                        "{}: large lcp value at index {} found, index {} expected",
                        llvname, position, index
                    ))
                    .into());
                }
                Ok(Some(large))
            }
            TableStream::Ram { lcptab, .. } => Ok(lcptab.get(index).copied()),
        }
    }
}

/// 顺序读取 `suftab` 与 `lcptab`。
///
/// `next_lcp` 从下标 1 开始给出 `lcp[1..=totallength]`，`next_suffix`
/// 从下标 0 开始给出全部后缀。
pub struct SequentialSuffixArrayReader<'a> {
    pub(crate) encseq: Cow<'a, EncodedSequence>,
    readmode: Readmode,
    alphabet: Option<Alphabet>,
    pub(crate) cursor: TableCursor<'a>,
}

/// 两张表各自的读取位置
pub(crate) struct TableCursor<'a> {
    stream: TableStream<'a>,
    nextlcpindex: usize,
    nextsuffixindex: usize,
}

impl<'a> TableCursor<'a> {
    fn new(stream: TableStream<'a>) -> Self {
        Self {
            stream,
            nextlcpindex: 1,
            nextsuffixindex: 0,
        }
    }

    pub(crate) fn next_lcp(&mut self) -> Result<Option<usize>> {
        let value = self.stream.next_lcp(self.nextlcpindex)?;
        if value.is_some() {
            self.nextlcpindex += 1;
        }
        Ok(value)
    }

    pub(crate) fn next_suffix(&mut self) -> Result<Option<usize>> {
        let value = self.stream.next_suffix(self.nextsuffixindex)?;
        if value.is_some() {
            self.nextsuffixindex += 1;
        }
        Ok(value)
    }
}

impl SequentialSuffixArrayReader<'static> {
    /// 打开 `indexname` 的 `.prj` `.esq` `.suf` `.lcp` `.llv`
    pub fn from_file(indexname: &str) -> Result<Self> {
        let prj = ProjectInfo::read_file(index_file(indexname, PRJ_SUFFIX))?;
        let encseq = EncodedSequence::read_file(index_file(indexname, ESQ_SUFFIX))?;
        check_total_length(&prj, &encseq, indexname)?;
        let alphabet = read_alphabet_if_present(indexname)?;
        let mut lcptab = open_buffered(indexname, LCP_SUFFIX)?;
        // lcp[0] 恒为 0
        lcptab
            .read_u8()
            .io_context(|| format!("cannot read {}.{}", indexname, LCP_SUFFIX))?;
        log::debug!("sequential reader over {} ({} suffixes)", indexname, prj.totallength + 1);
        Ok(Self {
            encseq: Cow::Owned(encseq),
            readmode: prj.readmode,
            alphabet,
            cursor: TableCursor::new(TableStream::File {
                indexname: indexname.to_string(),
                suftab: open_buffered(indexname, SUF_SUFFIX)?,
                lcptab,
                llvtab: open_buffered(indexname, LLV_SUFFIX)?,
            }),
        })
    }
}

impl<'a> SequentialSuffixArrayReader<'a> {
    /// 基于内存中的表；`lcptab[0]` 被跳过
    pub fn from_ram(encseq: &'a EncodedSequence, readmode: Readmode, suftab: &'a [usize], lcptab: &'a [usize]) -> Self {
        debug_assert_eq!(suftab.len(), encseq.total_length() + 1);
        Self {
            encseq: Cow::Borrowed(encseq),
            readmode,
            alphabet: None,
            cursor: TableCursor::new(TableStream::Ram { suftab, lcptab }),
        }
    }

    pub fn encseq(&self) -> &EncodedSequence {
        &self.encseq
    }

    pub fn readmode(&self) -> Readmode {
        self.readmode
    }

    pub fn total_length(&self) -> usize {
        self.encseq.total_length()
    }

    pub fn alphabet(&self) -> Option<&Alphabet> {
        self.alphabet.as_ref()
    }

    pub fn next_lcp(&mut self) -> Result<Option<usize>> {
        self.cursor.next_lcp()
    }

    pub fn next_suffix(&mut self) -> Result<Option<usize>> {
        self.cursor.next_suffix()
    }
}

fn check_total_length(prj: &ProjectInfo, encseq: &EncodedSequence, indexname: &str) -> Result<()> {
    if prj.totallength != encseq.total_length() {
        return Err(FormatError::SizeMismatch {
            file: format!("{}.{}", indexname, ESQ_SUFFIX),
            found: encseq.total_length(),
            expected: prj.totallength,
        }
        .into());
    }
    Ok(())
}

fn read_alphabet_if_present(indexname: &str) -> Result<Option<Alphabet>> {
    let path = index_file(indexname, AL1_SUFFIX);
    if Path::new(&path).exists() {
        Alphabet::from_file(&path).map(Some)
    } else {
        Ok(None)
    }
}

/// 需要映射的表
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableDemand {
    pub suftab: bool,
    pub lcptab: bool,
    pub bwttab: bool,
}

impl TableDemand {
    pub const SUFTAB: Self = Self {
        suftab: true,
        lcptab: false,
        bwttab: false,
    };
    pub const ALL: Self = Self {
        suftab: true,
        lcptab: true,
        bwttab: true,
    };
}

/// 映射到内存的增强后缀数组
pub struct Suffixarray {
    pub prj: ProjectInfo,
    pub alphabet: Option<Alphabet>,
    pub encseq: EncodedSequence,
    pub suftab: Option<MappedUsizeTable>,
    pub lcptab: Option<MappedByteTable>,
    pub llvtab: Option<MappedLargeLcpTable>,
    pub bwttab: Option<MappedByteTable>,
}

impl Suffixarray {
    pub fn map(indexname: &str, demand: TableDemand) -> Result<Self> {
        let prj = ProjectInfo::read_file(index_file(indexname, PRJ_SUFFIX))?;
        let encseq = EncodedSequence::read_file(index_file(indexname, ESQ_SUFFIX))?;
        check_total_length(&prj, &encseq, indexname)?;
        let numofsuffixes = prj.totallength + 1;
        let alphabet = read_alphabet_if_present(indexname)?;

        let suftab = if demand.suftab {
            Some(MappedUsizeTable::open(&index_file(indexname, SUF_SUFFIX), numofsuffixes)?)
        } else {
            None
        };
        let (lcptab, llvtab) = if demand.lcptab {
            let largelcpvalues = prj.largelcpvalues.ok_or_else(|| {
                FormatError::MissingKey(format!("{}.{}", indexname, PRJ_SUFFIX), "largelcpvalues")
            })?;
            (
                Some(MappedByteTable::open(&index_file(indexname, LCP_SUFFIX), numofsuffixes)?),
                Some(MappedLargeLcpTable::open(&index_file(indexname, LLV_SUFFIX), largelcpvalues)?),
            )
        } else {
            (None, None)
        };
        let bwttab = if demand.bwttab {
            Some(MappedByteTable::open(&index_file(indexname, BWT_SUFFIX), numofsuffixes)?)
        } else {
            None
        };
        log::debug!("mapped suffix array {} with {} suffixes", indexname, numofsuffixes);
        Ok(Self {
            prj,
            alphabet,
            encseq,
            suftab,
            lcptab,
            llvtab,
            bwttab,
        })
    }

    pub fn readmode(&self) -> Readmode {
        self.prj.readmode
    }

    pub fn num_of_suffixes(&self) -> usize {
        self.prj.totallength + 1
    }

    /// `lcp[idx]`，溢出值从 `.llv` 中查出；未映射 lcp 表时为 `None`
    pub fn lcp(&self, idx: usize) -> Option<usize> {
        let value = self.lcptab.as_ref()?.as_slice()[idx];
        if value < LCP_OVERFLOW {
            Some(value as usize)
        } else {
            self.llvtab.as_ref()?.find(idx)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alphabet::SEPARATOR;
    use crate::index::lcp::lcp_table;
    use crate::index::options::SuffixeratorOptions;
    use crate::index::run::write_index;
    use crate::index::suffixer::build_suffix_array;
    use crate::util::timer::PhaseTimer;

    fn build(dir: &Path, codes: &[u8]) -> (String, EncodedSequence) {
        let indexname = dir.join("idx").display().to_string();
        let encseq = EncodedSequence::encode(codes, 4).unwrap();
        let opts = SuffixeratorOptions {
            indexname: indexname.clone(),
            prefixlength: Some(2),
            ..Default::default()
        };
        let mut timer = PhaseTimer::start("test");
        write_index(&encseq, &Alphabet::dna(), Vec::new(), &opts, &mut timer).unwrap();
        (indexname, encseq)
    }

    #[test]
    fn file_and_ram_readers_agree() {
        let dir = tempfile::tempdir().unwrap();
        // 长重复以产生大于 255 的 lcp
        let mut codes: Vec<u8> = (0..300).map(|i| (i % 4) as u8).collect();
        codes.push(SEPARATOR);
        codes.extend((0..300).map(|i| (i % 4) as u8));
        let (indexname, encseq) = build(dir.path(), &codes);

        let suftab = build_suffix_array(&encseq, Readmode::Forward, 2, 1, Default::default()).unwrap();
        let lcptab = lcp_table(&encseq, Readmode::Forward, &suftab);
        let mut ram = SequentialSuffixArrayReader::from_ram(&encseq, Readmode::Forward, &suftab, &lcptab);
        let mut file = SequentialSuffixArrayReader::from_file(&indexname).unwrap();
        assert_eq!(file.total_length(), codes.len());
        assert!(file.alphabet().unwrap().is_dna());
        loop {
            let a = ram.next_suffix().unwrap();
            assert_eq!(a, file.next_suffix().unwrap());
            if a.is_none() {
                break;
            }
        }
        let mut count = 0;
        while let Some(lcp) = file.next_lcp().unwrap() {
            assert_eq!(Some(lcp), ram.next_lcp().unwrap());
            count += 1;
        }
        assert_eq!(count, codes.len());
        assert!(lcptab.iter().any(|&v| v >= 255));

        let sa = Suffixarray::map(&indexname, TableDemand::ALL).unwrap();
        assert_eq!(sa.num_of_suffixes(), codes.len() + 1);
        for (idx, &expected) in lcptab.iter().enumerate() {
            assert_eq!(sa.lcp(idx), Some(expected));
        }
        let mapped: Vec<usize> = sa.suftab.as_ref().unwrap().iter().collect();
        assert_eq!(mapped, suftab);
    }

    #[test]
    fn map_detects_size_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let (indexname, _) = build(dir.path(), &[0, 1, 2, 3, 0, 1]);
        let bwtpath = index_file(&indexname, BWT_SUFFIX);
        std::fs::write(&bwtpath, [0u8; 3]).unwrap();
        assert!(Suffixarray::map(&indexname, TableDemand::SUFTAB).is_ok());
        let err = Suffixarray::map(&indexname, TableDemand::ALL).err().unwrap();
        assert!(matches!(
            err,
            crate::error::EsaError::Format(FormatError::SizeMismatch { found: 3, expected: 7, .. })
        ));
    }
}
