//! `.esq` 文件：编码序列的二进制表示（本机字节序）。
//!
//! ```text
//! u8   存储方案标记（0 direct, 1 bit, 2 uchar, 3 ushort, 4 uint32, 5 uint64）
//! u64  totallength
//! u32  numofchars
//! ...  方案相关内容
//! ```

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use byteorder::{NativeEndian, ReadBytesExt, WriteBytesExt};

use super::tables::{num_of_pages, PageIndex, SpecialTables};
use super::{AccessType, EncodedSequence, Storage};
use crate::alphabet::DNA_NUM_OF_CHARS;
use crate::error::{EsaError, FormatError, IoContext, Result};

pub const ESQ_SUFFIX: &str = "esq";

fn write_tables<W: Write, T: PageIndex>(out: &mut W, twobit: &[u8], tables: &SpecialTables<T>) -> io::Result<()> {
    out.write_all(twobit)?;
    out.write_u32::<NativeEndian>(tables.num_of_pieces() as u32)?;
    let width = (T::BITS / 8) as usize;
    for pos in &tables.positions {
        out.write_uint::<NativeEndian>(pos.to_offset() as u64, width)?;
    }
    out.write_all(&tables.rangelengths)?;
    for &sub in &tables.endspecialsubs {
        out.write_u64::<NativeEndian>(sub as u64)?;
    }
    Ok(())
}

/// 头部的字节数（u8 标记、u64 长度、u32 字符数）
const HEADER_SIZE: u64 = 1 + 8 + 4;

/// 按块读入，缓冲区随实际数据增长，不按头部声称的长度预先分配
fn read_bytes<R: Read>(input: &mut R, len: usize) -> io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    input.by_ref().take(len as u64).read_to_end(&mut buf)?;
    if buf.len() < len {
        return Err(io::ErrorKind::UnexpectedEof.into());
    }
    Ok(buf)
}

/// 给定方案和长度时 `.esq` 至少需要的字节数（special 表按空计）
fn min_file_size(accesstype: AccessType, totallength: u64) -> u64 {
    let twobit = totallength.div_ceil(4);
    let pages = |bits: u32| if bits >= 64 { 1 } else { (totallength >> bits) + 1 };
    let body = match accesstype {
        AccessType::Direct => totallength,
        AccessType::Bit => twobit.saturating_add(1),
        AccessType::Uchar => twobit.saturating_add(4).saturating_add(pages(8).saturating_mul(8)),
        AccessType::Ushort => twobit.saturating_add(4).saturating_add(pages(16).saturating_mul(8)),
        AccessType::Uint32 => twobit.saturating_add(4).saturating_add(pages(32).saturating_mul(8)),
        AccessType::Uint64 => twobit.saturating_add(4 + 8),
    };
    body.saturating_add(HEADER_SIZE)
}

fn read_tables<R: Read, T: PageIndex>(input: &mut R, totallength: usize) -> io::Result<(Vec<u8>, SpecialTables<T>)> {
    let twobit = read_bytes(input, totallength.div_ceil(4))?;
    let pieces = input.read_u32::<NativeEndian>()? as usize;
    let width = (T::BITS / 8) as usize;
    let mut positions = Vec::new();
    for _ in 0..pieces {
        positions.push(T::from_offset(input.read_uint::<NativeEndian>(width)? as usize));
    }
    let rangelengths = read_bytes(input, pieces)?;
    let numofpages = num_of_pages::<T>(totallength);
    let mut endspecialsubs = Vec::new();
    for _ in 0..numofpages {
        endspecialsubs.push(input.read_u64::<NativeEndian>()? as usize);
    }
    Ok((twobit, SpecialTables { positions, rangelengths, endspecialsubs }))
}

impl EncodedSequence {
    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        out.write_u8(self.access_type().tag())?;
        out.write_u64::<NativeEndian>(self.totallength as u64)?;
        out.write_u32::<NativeEndian>(self.numofchars)?;
        match &self.storage {
            Storage::Direct(bytes) => out.write_all(bytes),
            Storage::Bit { twobit, specialbits } => {
                out.write_all(twobit)?;
                match specialbits {
                    Some(bits) => {
                        out.write_u8(1)?;
                        for &word in bits {
                            out.write_u64::<NativeEndian>(word)?;
                        }
                        Ok(())
                    }
                    None => out.write_u8(0),
                }
            }
            Storage::Uchar { twobit, tables } => write_tables(out, twobit, tables),
            Storage::Ushort { twobit, tables } => write_tables(out, twobit, tables),
            Storage::Uint32 { twobit, tables } => write_tables(out, twobit, tables),
            Storage::Uint64 { twobit, tables } => write_tables(out, twobit, tables),
        }
    }

    /// 从 `.esq` 内容恢复；`name` 仅用于错误信息
    pub fn read_from<R: Read>(input: &mut R, name: &str) -> Result<Self> {
        Self::read_checked(input, name, None)
    }

    /// `available` 为已知的文件长度，头部声称的长度放不下时直接报错
    fn read_checked<R: Read>(input: &mut R, name: &str, available: Option<u64>) -> Result<Self> {
        let eof = |e: io::Error| -> EsaError {
            if e.kind() == io::ErrorKind::UnexpectedEof {
                FormatError::Truncated(name.to_string()).into()
            } else {
                EsaError::io(format!("cannot read {}", name), e)
            }
        };
        let tag = input.read_u8().map_err(eof)?;
        let accesstype = AccessType::from_tag(tag).ok_or_else(|| FormatError::InvalidAccessTag(tag, name.to_string()))?;
        let rawlength = input.read_u64::<NativeEndian>().map_err(eof)?;
        let numofchars = input.read_u32::<NativeEndian>().map_err(eof)?;
        if let Some(available) = available {
            let expected = min_file_size(accesstype, rawlength);
            if available < expected {
                return Err(FormatError::SizeMismatch {
                    file: name.to_string(),
                    found: usize::try_from(available).unwrap_or(usize::MAX),
                    expected: usize::try_from(expected).unwrap_or(usize::MAX),
                }
                .into());
            }
        }
        let totallength = usize::try_from(rawlength)
            .map_err(|_| FormatError::Other(format!("{}: total length {} does not fit this platform", name, rawlength)))?;
        if numofchars == 0 || (accesstype.is_two_bit() && numofchars > DNA_NUM_OF_CHARS) {
            return Err(FormatError::Other(format!("{}: {} characters cannot be stored as {}", name, numofchars, accesstype.name())).into());
        }
        let inconsistent = || -> EsaError { FormatError::Other(format!("{}: inconsistent special range tables", name)).into() };

        let storage = match accesstype {
            AccessType::Direct => Storage::Direct(read_bytes(input, totallength).map_err(eof)?),
            AccessType::Bit => {
                let twobit = read_bytes(input, totallength.div_ceil(4)).map_err(eof)?;
                let specialbits = match input.read_u8().map_err(eof)? {
                    0 => None,
                    _ => {
                        let mut bits = Vec::new();
                        for _ in 0..totallength.div_ceil(64) {
                            bits.push(input.read_u64::<NativeEndian>().map_err(eof)?);
                        }
                        Some(bits)
                    }
                };
                Storage::Bit { twobit, specialbits }
            }
            AccessType::Uchar => {
                let (twobit, tables) = read_tables::<_, u8>(input, totallength).map_err(eof)?;
                if !tables.is_consistent(totallength) {
                    return Err(inconsistent());
                }
                Storage::Uchar { twobit, tables }
            }
            AccessType::Ushort => {
                let (twobit, tables) = read_tables::<_, u16>(input, totallength).map_err(eof)?;
                if !tables.is_consistent(totallength) {
                    return Err(inconsistent());
                }
                Storage::Ushort { twobit, tables }
            }
            AccessType::Uint32 => {
                let (twobit, tables) = read_tables::<_, u32>(input, totallength).map_err(eof)?;
                if !tables.is_consistent(totallength) {
                    return Err(inconsistent());
                }
                Storage::Uint32 { twobit, tables }
            }
            AccessType::Uint64 => {
                let (twobit, tables) = read_tables::<_, u64>(input, totallength).map_err(eof)?;
                if !tables.is_consistent(totallength) {
                    return Err(inconsistent());
                }
                Storage::Uint64 { twobit, tables }
            }
        };
        Ok(Self::from_storage(totallength, numofchars, storage))
    }

    pub fn write_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path).io_context(|| format!("cannot create {}", path.display()))?;
        let mut out = BufWriter::new(file);
        self.write_to(&mut out)
            .and_then(|_| out.flush())
            .io_context(|| format!("cannot write {}", path.display()))
    }

    pub fn read_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).io_context(|| format!("cannot open {}", path.display()))?;
        let available = file.metadata().io_context(|| format!("cannot stat {}", path.display()))?.len();
        Self::read_checked(&mut BufReader::new(file), &path.display().to_string(), Some(available))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alphabet::{SEPARATOR, WILDCARD};
    use crate::encseq::Readmode;

    #[test]
    fn esq_roundtrip_all_strategies() {
        let mut codes: Vec<u8> = (0..900u32).map(|i| ((i * 7 + i / 5) % 4) as u8).collect();
        codes[0] = WILDCARD;
        codes[300] = SEPARATOR;
        for cc in codes.iter_mut().skip(400).take(300) {
            *cc = WILDCARD;
        }
        for accesstype in AccessType::ALL {
            let encseq = EncodedSequence::with_access_type(&codes, 4, accesstype).unwrap();
            let mut buf = Vec::new();
            encseq.write_to(&mut buf).unwrap();
            assert_eq!(buf[0], accesstype.tag());
            let loaded = EncodedSequence::read_from(&mut buf.as_slice(), "test.esq").unwrap();
            assert_eq!(loaded, encseq);
            assert_eq!(loaded.extract(0..codes.len(), Readmode::Forward), codes);
        }
    }

    #[test]
    fn esq_rejects_bad_tag_and_truncation() {
        let encseq = EncodedSequence::encode(&[0, 1, 2, 3, WILDCARD], 4).unwrap();
        let mut buf = Vec::new();
        encseq.write_to(&mut buf).unwrap();

        let mut bad = buf.clone();
        bad[0] = 9;
        let err = EncodedSequence::read_from(&mut bad.as_slice(), "bad.esq").unwrap_err();
        assert!(matches!(err, EsaError::Format(FormatError::InvalidAccessTag(9, _))));

        let short = &buf[..buf.len() - 1];
        let err = EncodedSequence::read_from(&mut &short[..], "short.esq").unwrap_err();
        assert!(matches!(err, EsaError::Format(FormatError::Truncated(_))));
    }

    fn set_total_length(buf: &mut [u8], totallength: u64) {
        let mut header = &mut buf[1..9];
        header.write_u64::<NativeEndian>(totallength).unwrap();
    }

    #[test]
    fn esq_rejects_huge_total_length() {
        let codes: Vec<u8> = (0..200u32).map(|i| (i % 4) as u8).collect();
        let dir = tempfile::tempdir().unwrap();
        for accesstype in AccessType::ALL {
            let encseq = EncodedSequence::with_access_type(&codes, 4, accesstype).unwrap();
            let mut buf = Vec::new();
            encseq.write_to(&mut buf).unwrap();
            set_total_length(&mut buf, u64::MAX / 2);

            let err = EncodedSequence::read_from(&mut buf.as_slice(), "huge.esq").unwrap_err();
            assert!(matches!(err, EsaError::Format(_)), "{}", accesstype.name());

            let path = dir.path().join(format!("huge_{}.esq", accesstype.name()));
            std::fs::write(&path, &buf).unwrap();
            let err = EncodedSequence::read_file(&path).unwrap_err();
            assert!(
                matches!(err, EsaError::Format(FormatError::SizeMismatch { found, .. }) if found == buf.len()),
                "{}",
                accesstype.name()
            );
        }
    }

    #[test]
    fn esq_rejects_inconsistent_special_tables() {
        let mut codes: Vec<u8> = (0..600u32).map(|i| (i % 4) as u8).collect();
        codes[10] = WILDCARD;
        codes[300] = SEPARATOR;
        let encseq = EncodedSequence::with_access_type(&codes, 4, AccessType::Uchar).unwrap();
        let mut buf = Vec::new();
        encseq.write_to(&mut buf).unwrap();

        // 第一段的页内起点改成 250，长度改成 200，越过页尾
        let tables = 13 + codes.len().div_ceil(4);
        assert_eq!(buf[tables..tables + 4], 2u32.to_ne_bytes());
        buf[tables + 4] = 250;
        buf[tables + 6] = 199;
        let err = EncodedSequence::read_from(&mut buf.as_slice(), "bad.esq").unwrap_err();
        assert!(matches!(err, EsaError::Format(FormatError::Other(_))));
    }

    #[test]
    fn esq_rejects_wide_alphabet_in_two_bit_storage() {
        let encseq = EncodedSequence::with_access_type(&[0, 1, 2, 3], 4, AccessType::Bit).unwrap();
        let mut buf = Vec::new();
        encseq.write_to(&mut buf).unwrap();
        buf[9..13].copy_from_slice(&20u32.to_ne_bytes());
        let err = EncodedSequence::read_from(&mut buf.as_slice(), "wide.esq").unwrap_err();
        assert!(matches!(err, EsaError::Format(FormatError::Other(_))));
    }
}
