//! 编码序列（encseq）：以紧凑形式保存整条多序列文本。
//!
//! 字母表不超过 4 个字符时，每个符号占 2 bit（每字节 4 个，高位在前），
//! special 字符另行记录；否则每个符号直接占一个字节。2 bit 方案下
//! special 的记录方式有五种（bit 向量，以及 8/16/32/64 位页表），
//! 构建时按编码后大小选择最小者。无论哪种方案，逐位置解码结果完全一致。

use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::alphabet::{is_special, DNA_NUM_OF_CHARS, SEPARATOR, WILDCARD};
use crate::error::{ConfigError, Result};
use crate::util::dna::complement_code;

/// 对四种页表变体统一求值
macro_rules! dispatch_tables {
    ($storage:expr, $tables:ident => $body:expr, _ => $other:expr) => {
        match $storage {
            Storage::Uchar { tables: $tables, .. } => $body,
            Storage::Ushort { tables: $tables, .. } => $body,
            Storage::Uint32 { tables: $tables, .. } => $body,
            Storage::Uint64 { tables: $tables, .. } => $body,
            _ => $other,
        }
    };
}

pub mod esq;
mod ranges;
mod reader;
pub mod tables;

pub use ranges::SpecialRangeIterator;
pub use reader::EncseqReader;

use tables::{count_pieces, num_of_pages, PageIndex, SpecialTables};

// ── 读取方向 ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Readmode {
    #[default]
    Forward,
    Reverse,
    Complement,
    ReverseComplement,
}

impl Readmode {
    pub const ALL: [Readmode; 4] = [
        Readmode::Forward,
        Readmode::Reverse,
        Readmode::Complement,
        Readmode::ReverseComplement,
    ];

    pub fn from_u32(value: u32) -> Option<Self> {
        Self::ALL.get(value as usize).copied()
    }

    pub fn as_u32(self) -> u32 {
        self as u32
    }

    #[inline]
    pub fn is_reverse(self) -> bool {
        matches!(self, Readmode::Reverse | Readmode::ReverseComplement)
    }

    #[inline]
    pub fn is_complement(self) -> bool {
        matches!(self, Readmode::Complement | Readmode::ReverseComplement)
    }

    pub fn name(self) -> &'static str {
        match self {
            Readmode::Forward => "fwd",
            Readmode::Reverse => "rev",
            Readmode::Complement => "cpl",
            Readmode::ReverseComplement => "rcl",
        }
    }
}

impl fmt::Display for Readmode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Readmode {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|mode| mode.name() == s)
            .ok_or_else(|| ConfigError::Other(format!("unknown readmode \"{}\" (use fwd, rev, cpl or rcl)", s)))
    }
}

// ── 存储方案 ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessType {
    Direct,
    Bit,
    Uchar,
    Ushort,
    Uint32,
    Uint64,
}

impl AccessType {
    pub const ALL: [AccessType; 6] = [
        AccessType::Direct,
        AccessType::Bit,
        AccessType::Uchar,
        AccessType::Ushort,
        AccessType::Uint32,
        AccessType::Uint64,
    ];

    /// `.esq` 文件首字节
    pub fn tag(self) -> u8 {
        self as u8
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        Self::ALL.get(tag as usize).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            AccessType::Direct => "direct",
            AccessType::Bit => "bit",
            AccessType::Uchar => u8::NAME,
            AccessType::Ushort => u16::NAME,
            AccessType::Uint32 => u32::NAME,
            AccessType::Uint64 => u64::NAME,
        }
    }

    pub fn is_two_bit(self) -> bool {
        self != AccessType::Direct
    }
}

impl fmt::Display for AccessType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AccessType {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.name() == s)
            .ok_or_else(|| ConfigError::Other(format!("unknown access type \"{}\"", s)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Storage {
    Direct(Vec<u8>),
    Bit {
        twobit: Vec<u8>,
        /// 每个位置一个 bit（字内高位在前），没有 special 时不存
        specialbits: Option<Vec<u64>>,
    },
    Uchar { twobit: Vec<u8>, tables: SpecialTables<u8> },
    Ushort { twobit: Vec<u8>, tables: SpecialTables<u16> },
    Uint32 { twobit: Vec<u8>, tables: SpecialTables<u32> },
    Uint64 { twobit: Vec<u8>, tables: SpecialTables<u64> },
}

impl Storage {
    fn access_type(&self) -> AccessType {
        match self {
            Storage::Direct(_) => AccessType::Direct,
            Storage::Bit { .. } => AccessType::Bit,
            Storage::Uchar { .. } => AccessType::Uchar,
            Storage::Ushort { .. } => AccessType::Ushort,
            Storage::Uint32 { .. } => AccessType::Uint32,
            Storage::Uint64 { .. } => AccessType::Uint64,
        }
    }

    fn twobit(&self) -> Option<&[u8]> {
        match self {
            Storage::Direct(_) => None,
            Storage::Bit { twobit, .. }
            | Storage::Uchar { twobit, .. }
            | Storage::Ushort { twobit, .. }
            | Storage::Uint32 { twobit, .. }
            | Storage::Uint64 { twobit, .. } => Some(twobit),
        }
    }

    fn is_special_at(&self, pos: usize) -> bool {
        match self {
            Storage::Direct(bytes) => is_special(bytes[pos]),
            Storage::Bit { specialbits, .. } => specialbits.as_ref().is_some_and(|bits| bit_is_set(bits, pos)),
            other => dispatch_tables!(other, tables => tables.contains(pos), _ => false),
        }
    }
}

#[inline]
pub(crate) fn twobit_at(twobit: &[u8], pos: usize) -> u8 {
    (twobit[pos >> 2] >> (6 - 2 * (pos & 3))) & 3
}

/// 2 bit 槽位中 special 的占位值：分隔符存 1，通配符存 0
#[inline]
fn twobit_placeholder(cc: u8) -> u8 {
    match cc {
        SEPARATOR => 1,
        WILDCARD => 0,
        c => c,
    }
}

#[inline]
fn special_from_placeholder(slot: u8) -> u8 {
    if slot == 1 {
        SEPARATOR
    } else {
        WILDCARD
    }
}

#[inline]
pub(crate) fn bit_is_set(bits: &[u64], pos: usize) -> bool {
    bits[pos >> 6] & (1u64 << (63 - (pos & 63))) != 0
}

fn pack_twobit(codes: &[u8]) -> Vec<u8> {
    let mut twobit = vec![0u8; codes.len().div_ceil(4)];
    for (pos, &cc) in codes.iter().enumerate() {
        twobit[pos >> 2] |= twobit_placeholder(cc) << (6 - 2 * (pos & 3));
    }
    twobit
}

fn pack_specialbits(totallength: usize, ranges: &[Range<usize>]) -> Vec<u64> {
    let mut bits = vec![0u64; totallength.div_ceil(64)];
    for range in ranges {
        for pos in range.clone() {
            bits[pos >> 6] |= 1u64 << (63 - (pos & 63));
        }
    }
    bits
}

/// 扫描编码后的文本，得到所有极大 special 区间
fn collect_special_ranges(codes: &[u8]) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    let mut start: Option<usize> = None;
    for (pos, &cc) in codes.iter().enumerate() {
        match (is_special(cc), start) {
            (true, None) => start = Some(pos),
            (false, Some(s)) => {
                ranges.push(s..pos);
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        ranges.push(s..codes.len());
    }
    ranges
}

/// 给定方案下编码序列占用的字节数
pub fn size_in_bytes(accesstype: AccessType, totallength: usize, ranges: &[Range<usize>]) -> u64 {
    let n = totallength as u64;
    let twobit = n.div_ceil(4);
    let tablesize = |unit: u64, pieces: usize, pages: usize| twobit + unit * pieces as u64 + pieces as u64 + 8 * pages as u64;
    1 + match accesstype {
        AccessType::Direct => n,
        AccessType::Bit => {
            if ranges.is_empty() {
                twobit
            } else {
                twobit + 8 * n.div_ceil(64)
            }
        }
        AccessType::Uchar => tablesize(1, count_pieces::<u8>(ranges), num_of_pages::<u8>(totallength)),
        AccessType::Ushort => tablesize(2, count_pieces::<u16>(ranges), num_of_pages::<u16>(totallength)),
        AccessType::Uint32 => tablesize(4, count_pieces::<u32>(ranges), num_of_pages::<u32>(totallength)),
        AccessType::Uint64 => tablesize(8, count_pieces::<u64>(ranges), num_of_pages::<u64>(totallength)),
    }
}

/// 按编码后大小选择方案；字母表超过 4 个字符时只能直接存储。
pub fn determine_access_type(numofchars: u32, totallength: usize, ranges: &[Range<usize>]) -> AccessType {
    if numofchars > DNA_NUM_OF_CHARS {
        return AccessType::Direct;
    }
    let mut best = AccessType::Bit;
    let mut bestsize = size_in_bytes(best, totallength, ranges);
    for accesstype in [AccessType::Uchar, AccessType::Ushort, AccessType::Uint32, AccessType::Uint64] {
        let size = size_in_bytes(accesstype, totallength, ranges);
        if size < bestsize {
            best = accesstype;
            bestsize = size;
        }
    }
    best
}

/// 存储的区间段数上限（`.esq` 中以 32 位记录）
const MAX_STORED_PIECES: usize = u32::MAX as usize;

fn build_tables<T: PageIndex>(ranges: &[Range<usize>], totallength: usize, name: &'static str) -> Result<SpecialTables<T>> {
    let pieces = count_pieces::<T>(ranges);
    if pieces > MAX_STORED_PIECES {
        return Err(ConfigError::TooManySpecialRanges(pieces, name).into());
    }
    Ok(SpecialTables::build(ranges, totallength))
}

// ── 统计信息 ────────────────────────────────────────────────────

/// special 字符的汇总信息，写入 `.prj`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialCharInfo {
    pub specialcharacters: usize,
    pub specialranges: usize,
    pub lengthofspecialprefix: usize,
    pub lengthofspecialsuffix: usize,
}

// ── 编码序列 ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedSequence {
    totallength: usize,
    numofchars: u32,
    storage: Storage,
    specialcharinfo: SpecialCharInfo,
    /// 所有分隔符的位置，升序
    separators: Vec<usize>,
}

impl EncodedSequence {
    /// 编码一段符号码文本，自动选择存储方案。
    ///
    /// `codes` 中的真实字符必须小于 `numofchars`，其余只能是通配符或分隔符。
    pub fn encode(codes: &[u8], numofchars: u32) -> Result<Self> {
        let ranges = Self::validate(codes, numofchars)?;
        let accesstype = determine_access_type(numofchars, codes.len(), &ranges);
        Self::build(codes, numofchars, accesstype, ranges)
    }

    /// 以指定方案编码
    pub fn with_access_type(codes: &[u8], numofchars: u32, accesstype: AccessType) -> Result<Self> {
        let ranges = Self::validate(codes, numofchars)?;
        if accesstype.is_two_bit() && numofchars > DNA_NUM_OF_CHARS {
            return Err(ConfigError::TwoBitNeedsDna(accesstype.name()).into());
        }
        Self::build(codes, numofchars, accesstype, ranges)
    }

    fn validate(codes: &[u8], numofchars: u32) -> Result<Vec<Range<usize>>> {
        if codes.is_empty() {
            return Err(ConfigError::EmptySequence.into());
        }
        if let Some(pos) = codes.iter().position(|&cc| !is_special(cc) && u32::from(cc) >= numofchars) {
            return Err(ConfigError::Other(format!(
                "code {} at position {} exceeds alphabet size {}",
                codes[pos], pos, numofchars
            ))
            .into());
        }
        Ok(collect_special_ranges(codes))
    }

    fn build(codes: &[u8], numofchars: u32, accesstype: AccessType, ranges: Vec<Range<usize>>) -> Result<Self> {
        let totallength = codes.len();
        let storage = match accesstype {
            AccessType::Direct => Storage::Direct(codes.to_vec()),
            AccessType::Bit => Storage::Bit {
                twobit: pack_twobit(codes),
                specialbits: (!ranges.is_empty()).then(|| pack_specialbits(totallength, &ranges)),
            },
            AccessType::Uchar => Storage::Uchar {
                twobit: pack_twobit(codes),
                tables: build_tables(&ranges, totallength, u8::NAME)?,
            },
            AccessType::Ushort => Storage::Ushort {
                twobit: pack_twobit(codes),
                tables: build_tables(&ranges, totallength, u16::NAME)?,
            },
            AccessType::Uint32 => Storage::Uint32 {
                twobit: pack_twobit(codes),
                tables: build_tables(&ranges, totallength, u32::NAME)?,
            },
            AccessType::Uint64 => Storage::Uint64 {
                twobit: pack_twobit(codes),
                tables: build_tables(&ranges, totallength, u64::NAME)?,
            },
        };
        log::debug!(
            "encoded {} symbols with access type {} ({} bytes)",
            totallength,
            accesstype,
            size_in_bytes(accesstype, totallength, &ranges)
        );
        Ok(Self::from_storage(totallength, numofchars, storage))
    }

    /// 由存储体恢复完整对象（统计信息与分隔符表从 special 区间推出）
    pub(crate) fn from_storage(totallength: usize, numofchars: u32, storage: Storage) -> Self {
        let mut encseq = Self {
            totallength,
            numofchars,
            storage,
            specialcharinfo: SpecialCharInfo::default(),
            separators: Vec::new(),
        };
        let mut info = SpecialCharInfo::default();
        let mut separators = Vec::new();
        for range in encseq.special_ranges(true) {
            info.specialcharacters += range.len();
            info.specialranges += 1;
            if range.start == 0 {
                info.lengthofspecialprefix = range.len();
            }
            if range.end == totallength {
                info.lengthofspecialsuffix = range.len();
            }
            separators.extend(range.filter(|&pos| encseq.get_forward(pos) == SEPARATOR));
        }
        encseq.specialcharinfo = info;
        encseq.separators = separators;
        encseq
    }

    #[inline]
    pub fn total_length(&self) -> usize {
        self.totallength
    }

    #[inline]
    pub fn num_of_chars(&self) -> u32 {
        self.numofchars
    }

    pub fn is_dna(&self) -> bool {
        self.numofchars == DNA_NUM_OF_CHARS
    }

    pub fn access_type(&self) -> AccessType {
        self.storage.access_type()
    }

    pub(crate) fn storage(&self) -> &Storage {
        &self.storage
    }

    /// 当前存储方案的字节数
    pub fn size_in_bytes(&self) -> u64 {
        let ranges: Vec<Range<usize>> = self.special_ranges(true).collect();
        size_in_bytes(self.access_type(), self.totallength, &ranges)
    }

    pub fn special_char_info(&self) -> SpecialCharInfo {
        self.specialcharinfo
    }

    pub fn has_specials(&self) -> bool {
        self.specialcharinfo.specialcharacters > 0
    }

    /// 互补读取只对 DNA 字母表有意义
    pub fn check_readmode(&self, readmode: Readmode) -> Result<()> {
        if readmode.is_complement() && !self.is_dna() {
            return Err(ConfigError::ComplementNeedsDna(readmode.name()).into());
        }
        Ok(())
    }

    /// 正向坐标下的符号
    #[inline]
    pub(crate) fn get_forward(&self, pos: usize) -> u8 {
        debug_assert!(pos < self.totallength);
        match &self.storage {
            Storage::Direct(bytes) => bytes[pos],
            Storage::Bit { twobit, specialbits } => {
                let slot = twobit_at(twobit, pos);
                match specialbits {
                    Some(bits) if bit_is_set(bits, pos) => special_from_placeholder(slot),
                    _ => slot,
                }
            }
            other => {
                let slot = twobit_at(other.twobit().unwrap_or_default(), pos);
                if other.is_special_at(pos) {
                    special_from_placeholder(slot)
                } else {
                    slot
                }
            }
        }
    }

    /// 已知 `pos` 是否为 special 时的快速解码（供带区间缓存的读取器使用）
    #[inline]
    pub(crate) fn decode_known(&self, pos: usize, special: bool) -> u8 {
        match self.storage.twobit() {
            Some(twobit) => {
                let slot = twobit_at(twobit, pos);
                if special {
                    special_from_placeholder(slot)
                } else {
                    slot
                }
            }
            None => self.get_forward(pos),
        }
    }

    #[inline]
    pub(crate) fn apply_complement(&self, cc: u8, readmode: Readmode) -> u8 {
        if readmode.is_complement() {
            debug_assert!(self.is_dna());
            complement_code(cc)
        } else {
            cc
        }
    }

    #[inline]
    pub(crate) fn physical_position(&self, pos: usize, readmode: Readmode) -> usize {
        if readmode.is_reverse() {
            self.totallength - 1 - pos
        } else {
            pos
        }
    }

    /// 按读取方向取位置 `pos` 的符号
    #[inline]
    pub fn get(&self, pos: usize, readmode: Readmode) -> u8 {
        let cc = self.get_forward(self.physical_position(pos, readmode));
        self.apply_complement(cc, readmode)
    }

    /// 是否为 special（与读取方向的互补无关）
    #[inline]
    pub fn is_special_at(&self, pos: usize, readmode: Readmode) -> bool {
        self.storage.is_special_at(self.physical_position(pos, readmode))
    }

    /// 从 `startpos` 开始顺序读取的迭代器
    pub fn reader(&self, readmode: Readmode, startpos: usize) -> EncseqReader<'_> {
        EncseqReader::new(self, readmode, startpos)
    }

    /// 极大 special 区间（正向坐标），`forward == false` 时从后往前给出。
    pub fn special_ranges(&self, forward: bool) -> SpecialRangeIterator<'_> {
        SpecialRangeIterator::new(self, forward)
    }

    /// 读取 `[start, end)` 的符号
    pub fn extract(&self, range: Range<usize>, readmode: Readmode) -> Vec<u8> {
        let len = range.end.saturating_sub(range.start);
        self.reader(readmode, range.start).take(len).collect()
    }

    /// 每个真实字符的出现次数
    pub fn char_distribution(&self) -> Vec<usize> {
        let mut dist = vec![0usize; self.numofchars as usize];
        for cc in self.reader(Readmode::Forward, 0) {
            if !is_special(cc) {
                dist[cc as usize] += 1;
            }
        }
        dist
    }

    // ── 序列边界 ────────────────────────────────────────────────

    pub fn num_of_sequences(&self) -> usize {
        self.separators.len() + 1
    }

    pub fn separator_positions(&self) -> &[usize] {
        &self.separators
    }

    /// 正向位置 `pos` 所属序列的编号
    pub fn seqnum_of(&self, pos: usize) -> usize {
        self.separators.partition_point(|&sep| sep < pos)
    }

    pub fn seq_start(&self, seqnum: usize) -> usize {
        if seqnum == 0 {
            0
        } else {
            self.separators[seqnum - 1] + 1
        }
    }

    pub fn seq_length(&self, seqnum: usize) -> usize {
        let end = self.separators.get(seqnum).copied().unwrap_or(self.totallength);
        end - self.seq_start(seqnum)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_codes(len: usize, seed: u32, special_every: u32) -> Vec<u8> {
        let mut x = seed;
        let mut v = Vec::with_capacity(len);
        for _ in 0..len {
            x = x.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            let r = x >> 8;
            if special_every > 0 && r % special_every == 0 {
                v.push(if r % 3 == 0 { SEPARATOR } else { WILDCARD });
            } else {
                v.push((r % 4) as u8);
            }
        }
        v
    }

    fn texts() -> Vec<Vec<u8>> {
        let mut long_run = make_codes(2000, 5, 0);
        for cc in long_run.iter_mut().skip(100).take(700) {
            *cc = WILDCARD;
        }
        long_run[300] = SEPARATOR;
        vec![
            vec![0, 1, 2, 3, 0, 1, 2, 3, SEPARATOR],
            vec![WILDCARD, WILDCARD, 0, SEPARATOR, 1, WILDCARD],
            vec![2],
            vec![SEPARATOR],
            make_codes(1000, 7, 13),
            make_codes(700, 11, 0),
            long_run,
        ]
    }

    #[test]
    fn all_strategies_decode_identically() {
        for codes in texts() {
            for accesstype in AccessType::ALL {
                let encseq = EncodedSequence::with_access_type(&codes, 4, accesstype).unwrap();
                assert_eq!(encseq.access_type(), accesstype);
                for (pos, &cc) in codes.iter().enumerate() {
                    assert_eq!(encseq.get(pos, Readmode::Forward), cc, "{} pos {}", accesstype, pos);
                }
                let read: Vec<u8> = encseq.reader(Readmode::Forward, 0).collect();
                assert_eq!(read, codes, "{}", accesstype);
                let rev: Vec<u8> = encseq.reader(Readmode::Reverse, 0).collect();
                let expected: Vec<u8> = codes.iter().rev().copied().collect();
                assert_eq!(rev, expected, "{}", accesstype);
            }
        }
    }

    #[test]
    fn reader_from_start_position() {
        let codes = make_codes(600, 3, 7);
        let encseq = EncodedSequence::with_access_type(&codes, 4, AccessType::Uchar).unwrap();
        for start in [0, 1, 255, 256, 257, 599] {
            let read: Vec<u8> = encseq.reader(Readmode::Forward, start).collect();
            assert_eq!(read, codes[start..].to_vec());
            let rev: Vec<u8> = encseq.reader(Readmode::Reverse, start).collect();
            let expected: Vec<u8> = codes[..codes.len() - start].iter().rev().copied().collect();
            assert_eq!(rev, expected);
        }
    }

    #[test]
    fn complement_readmodes() {
        let codes = vec![0, 1, WILDCARD, 2, 3, SEPARATOR];
        let encseq = EncodedSequence::encode(&codes, 4).unwrap();
        let cpl: Vec<u8> = encseq.reader(Readmode::Complement, 0).collect();
        assert_eq!(cpl, vec![3, 2, WILDCARD, 1, 0, SEPARATOR]);
        let rcl: Vec<u8> = encseq.reader(Readmode::ReverseComplement, 0).collect();
        assert_eq!(rcl, vec![SEPARATOR, 0, 1, WILDCARD, 2, 3]);
        assert_eq!(rcl, crate::util::dna::revcomp_codes(&codes));
        assert_eq!(encseq.get(1, Readmode::ReverseComplement), 0);

        let protein = EncodedSequence::encode(&[0, 10, 19], 20).unwrap();
        assert_eq!(protein.access_type(), AccessType::Direct);
        assert!(protein.check_readmode(Readmode::Complement).is_err());
        assert!(protein.check_readmode(Readmode::Reverse).is_ok());
    }

    #[test]
    fn special_ranges_both_directions() {
        for codes in texts() {
            let expected = collect_special_ranges(&codes);
            for accesstype in AccessType::ALL {
                let encseq = EncodedSequence::with_access_type(&codes, 4, accesstype).unwrap();
                let fwd: Vec<_> = encseq.special_ranges(true).collect();
                assert_eq!(fwd, expected, "{}", accesstype);
                let mut bwd: Vec<_> = encseq.special_ranges(false).collect();
                bwd.reverse();
                assert_eq!(bwd, expected, "{}", accesstype);
            }
        }
    }

    #[test]
    fn special_char_info_and_sequences() {
        let codes = vec![WILDCARD, WILDCARD, 0, SEPARATOR, 1, 2, SEPARATOR, 3, WILDCARD];
        let encseq = EncodedSequence::encode(&codes, 4).unwrap();
        let info = encseq.special_char_info();
        assert_eq!(info.specialcharacters, 5);
        assert_eq!(info.specialranges, 4);
        assert_eq!(info.lengthofspecialprefix, 2);
        assert_eq!(info.lengthofspecialsuffix, 1);

        assert_eq!(encseq.num_of_sequences(), 3);
        assert_eq!(encseq.separator_positions(), &[3, 6]);
        assert_eq!(encseq.seqnum_of(0), 0);
        assert_eq!(encseq.seqnum_of(4), 1);
        assert_eq!(encseq.seqnum_of(8), 2);
        assert_eq!(encseq.seq_start(2), 7);
        assert_eq!(encseq.seq_length(1), 2);
        assert_eq!(encseq.seq_length(2), 2);
        assert_eq!(encseq.extract(4..6, Readmode::Forward), vec![1, 2]);
        assert_eq!(encseq.char_distribution(), vec![1, 1, 1, 1]);
    }

    #[test]
    fn strategy_choice_prefers_smallest() {
        let plain = make_codes(5000, 1, 0);
        let encseq = EncodedSequence::encode(&plain, 4).unwrap();
        assert_eq!(encseq.access_type(), AccessType::Bit);

        let mut sparse = plain.clone();
        sparse[2500] = WILDCARD;
        let encseq = EncodedSequence::encode(&sparse, 4).unwrap();
        let chosen = encseq.size_in_bytes();
        let ranges = collect_special_ranges(&sparse);
        for accesstype in AccessType::ALL.iter().skip(1) {
            assert!(chosen <= size_in_bytes(*accesstype, sparse.len(), &ranges));
        }
        assert_ne!(encseq.access_type(), AccessType::Direct);
    }

    #[test]
    fn rejects_bad_input() {
        assert!(EncodedSequence::encode(&[], 4).is_err());
        assert!(EncodedSequence::encode(&[0, 4], 4).is_err());
        assert!(EncodedSequence::with_access_type(&[0, 7], 20, AccessType::Bit).is_err());
        assert_eq!("rcl".parse::<Readmode>().unwrap(), Readmode::ReverseComplement);
        assert!("xyz".parse::<Readmode>().is_err());
        assert_eq!(AccessType::from_tag(4), Some(AccessType::Uint32));
        assert_eq!(AccessType::from_tag(6), None);
    }
}
