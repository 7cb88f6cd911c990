//! 索引表文件（`.suf` `.lcp` `.llv` `.bwt` `.bck`）的命名、写出与内存映射。

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use byteorder::{ByteOrder, NativeEndian, WriteBytesExt};
use memmap2::Mmap;

use crate::error::{FormatError, IoContext, Result};

pub const SUF_SUFFIX: &str = "suf";
pub const LCP_SUFFIX: &str = "lcp";
pub const LLV_SUFFIX: &str = "llv";
pub const BWT_SUFFIX: &str = "bwt";
pub const BCK_SUFFIX: &str = "bck";
pub const AL1_SUFFIX: &str = "al1";

pub const USIZE_BYTES: usize = std::mem::size_of::<usize>();

/// `indexname.suffix`
pub fn index_file(indexname: &str, suffix: &str) -> PathBuf {
    PathBuf::from(format!("{}.{}", indexname, suffix))
}

pub fn create_writer(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path).io_context(|| format!("cannot create {}", path.display()))?;
    Ok(BufWriter::new(file))
}

#[inline]
pub fn write_usize<W: Write>(out: &mut W, value: usize) -> std::io::Result<()> {
    out.write_uint::<NativeEndian>(value as u64, USIZE_BYTES)
}

#[inline]
fn read_usize(bytes: &[u8]) -> usize {
    NativeEndian::read_uint(bytes, USIZE_BYTES) as usize
}

/// 只读映射整个文件
#[allow(unsafe_code)]
pub fn map_file(path: &Path) -> Result<Mmap> {
    let file = File::open(path).io_context(|| format!("cannot open {}", path.display()))?;
    // SAFETY: 索引文件在映射期间不会被本进程修改
    unsafe { Mmap::map(&file) }.io_context(|| format!("cannot map file \"{}\"", path.display()))
}

fn check_units(path: &Path, numofbytes: usize, unit: usize, expected: usize) -> Result<()> {
    if numofbytes % unit != 0 || numofbytes / unit != expected {
        return Err(FormatError::SizeMismatch {
            file: path.display().to_string(),
            found: numofbytes / unit,
            expected,
        }
        .into());
    }
    Ok(())
}

/// 映射的 `usize` 数组（`.suf`）
pub struct MappedUsizeTable {
    map: Mmap,
    len: usize,
}

impl MappedUsizeTable {
    pub fn open(path: &Path, expected: usize) -> Result<Self> {
        let map = map_file(path)?;
        check_units(path, map.len(), USIZE_BYTES, expected)?;
        Ok(Self { map, len: expected })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn get(&self, idx: usize) -> usize {
        let start = idx * USIZE_BYTES;
        read_usize(&self.map[start..start + USIZE_BYTES])
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.map.chunks_exact(USIZE_BYTES).map(read_usize)
    }
}

/// 映射的字节表（`.lcp`、`.bwt`）
pub struct MappedByteTable {
    map: Mmap,
}

impl MappedByteTable {
    pub fn open(path: &Path, expected: usize) -> Result<Self> {
        let map = map_file(path)?;
        check_units(path, map.len(), 1, expected)?;
        Ok(Self { map })
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.map
    }
}

/// 映射的 `.llv`：按位置升序的 `(位置, 值)` 对
pub struct MappedLargeLcpTable {
    map: Mmap,
    len: usize,
}

impl MappedLargeLcpTable {
    pub fn open(path: &Path, expected: usize) -> Result<Self> {
        let map = map_file(path)?;
        check_units(path, map.len(), 2 * USIZE_BYTES, expected)?;
        Ok(Self { map, len: expected })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    fn entry(&self, idx: usize) -> (usize, usize) {
        let start = idx * 2 * USIZE_BYTES;
        (
            read_usize(&self.map[start..start + USIZE_BYTES]),
            read_usize(&self.map[start + USIZE_BYTES..start + 2 * USIZE_BYTES]),
        )
    }

    /// 后缀表下标 `pos` 处的大 lcp 值
    pub fn find(&self, pos: usize) -> Option<usize> {
        let (mut lo, mut hi) = (0usize, self.len);
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let (p, value) = self.entry(mid);
            match p.cmp(&pos) {
                std::cmp::Ordering::Equal => return Some(value),
                std::cmp::Ordering::Less => lo = mid + 1,
                std::cmp::Ordering::Greater => hi = mid,
            }
        }
        None
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (0..self.len).map(|idx| self.entry(idx))
    }
}
