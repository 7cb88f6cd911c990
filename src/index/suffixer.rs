//! 后缀排序的驱动：按部分依次产出排好序的后缀表片段。
//!
//! 每个部分：扫描整条序列，把桶编码落在本部分内的后缀放入各自的桶
//! （前缀窗口内含 special 的后缀放在桶尾），再逐桶排序。所有部分之后，
//! 输出以 special 字符开头的后缀（按位置），最后是空后缀 `totallength`。

use std::cmp::Reverse;

use crate::alphabet::codes::{CodeAtPosition, Codetype, KmerScanner};
use crate::encseq::{EncodedSequence, Readmode};
use crate::error::Result;
use crate::index::bcktab::BucketTable;
use crate::index::bentsedg::{first_special_offset, BentSedgSorter};
use crate::index::options::SfxStrategy;
use crate::index::partssuf::SuftabParts;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Parts(usize),
    Done,
}

pub struct Suffixerator<'a> {
    encseq: &'a EncodedSequence,
    readmode: Readmode,
    prefixlength: u32,
    scanner: KmerScanner<'a>,
    bcktab: BucketTable,
    records: Vec<CodeAtPosition>,
    parts: SuftabParts,
    sorter: BentSedgSorter<'a>,
    suftab: Vec<usize>,
    stage: Stage,
}

impl<'a> Suffixerator<'a> {
    pub fn new(
        encseq: &'a EncodedSequence,
        readmode: Readmode,
        prefixlength: u32,
        numofparts: u32,
        strategy: SfxStrategy,
    ) -> Result<Self> {
        encseq.check_readmode(readmode)?;
        let scanner = KmerScanner::new(encseq, readmode, prefixlength)?;
        let (bcktab, records) = BucketTable::count_kmers(encseq, readmode, prefixlength)?;
        let parts = SuftabParts::new(numofparts, &bcktab, bcktab.num_of_suffixes())?;
        log::info!(
            "sorting {} suffixes with prefix length {} in {} part(s), largest part {}",
            encseq.total_length() + 1,
            prefixlength,
            parts.num_of_parts(),
            parts.largest_width()
        );
        let suftab = vec![0usize; parts.largest_width()];
        Ok(Self {
            encseq,
            readmode,
            prefixlength,
            scanner,
            bcktab,
            records,
            parts,
            sorter: BentSedgSorter::new(encseq, readmode, strategy),
            suftab,
            stage: Stage::Parts(0),
        })
    }

    pub fn bucket_table(&self) -> &BucketTable {
        &self.bcktab
    }

    pub fn num_of_parts(&self) -> usize {
        self.parts.num_of_parts()
    }

    /// 下一段排好序的后缀；全部输出后返回 `None`
    pub fn next_part(&mut self) -> Option<&[usize]> {
        match self.stage {
            Stage::Parts(idx) if idx < self.parts.num_of_parts() => {
                self.stage = Stage::Parts(idx + 1);
                let width = self.sort_part(idx);
                Some(&self.suftab[..width])
            }
            Stage::Parts(_) => {
                self.stage = Stage::Done;
                self.suftab = self.special_suffixes();
                Some(&self.suftab)
            }
            Stage::Done => None,
        }
    }

    fn sort_part(&mut self, idx: usize) -> usize {
        let part = self.parts.parts()[idx];
        let (mincode, maxcode, offset) = (part.mincode, part.maxcode, part.suftaboffset);
        let partend = self.bcktab.leftborder(maxcode);
        let inpart = |code: Codetype| code >= mincode && code <= maxcode;

        {
            let Self {
                scanner,
                bcktab,
                records,
                suftab,
                ..
            } = self;
            for record in records.iter() {
                scanner.derive_special_codes(record, |sc| {
                    if inpart(sc.code) {
                        let slot = bcktab.next_insert_slot(sc.code) - offset;
                        suftab[slot] = sc.position;
                    }
                });
            }
            scanner.scan(|pos, code| {
                if inpart(code) {
                    let slot = bcktab.next_insert_slot(code) - offset;
                    suftab[slot] = pos;
                }
            });
        }

        let p = self.prefixlength as usize;
        for code in mincode..=maxcode {
            let start = self.bcktab.leftborder(code);
            let end = if code < maxcode { self.bcktab.leftborder(code + 1) } else { partend };
            if start == end {
                continue;
            }
            let regularend = end - self.bcktab.count_special_codes(code);
            self.sorter.sort(&mut self.suftab[start - offset..regularend - offset], p);
            let (encseq, readmode) = (self.encseq, self.readmode);
            self.suftab[regularend - offset..end - offset]
                .sort_by_cached_key(|&pos| (Reverse(first_special_offset(encseq, readmode, pos, p)), pos));
        }
        log::debug!(
            "part {}: codes {}..={}, {} suffixes from index {}",
            idx,
            mincode,
            maxcode,
            part.widthofpart,
            offset
        );
        part.widthofpart
    }

    /// 以 special 开头的后缀按（读取方向上的）位置升序，最后是空后缀
    fn special_suffixes(&self) -> Vec<usize> {
        let n = self.encseq.total_length();
        let info = self.encseq.special_char_info();
        let mut out = Vec::with_capacity(info.specialcharacters + 1);
        if self.readmode.is_reverse() {
            for range in self.encseq.special_ranges(false) {
                out.extend((n - range.end)..(n - range.start));
            }
        } else {
            for range in self.encseq.special_ranges(true) {
                out.extend(range);
            }
        }
        out.push(n);
        out
    }
}

/// 一次得到完整后缀表（`totallength + 1` 项）
pub fn build_suffix_array(
    encseq: &EncodedSequence,
    readmode: Readmode,
    prefixlength: u32,
    numofparts: u32,
    strategy: SfxStrategy,
) -> Result<Vec<usize>> {
    let mut sfi = Suffixerator::new(encseq, readmode, prefixlength, numofparts, strategy)?;
    let mut suftab = Vec::with_capacity(encseq.total_length() + 1);
    while let Some(part) = sfi.next_part() {
        suftab.extend_from_slice(part);
    }
    Ok(suftab)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alphabet::{SEPARATOR, WILDCARD};
    use crate::index::bentsedg::compare_suffixes;

    fn make_codes(len: usize, seed: u32) -> Vec<u8> {
        let mut x = seed;
        (0..len)
            .map(|_| {
                x = x.wrapping_mul(1_103_515_245).wrapping_add(12_345);
                match (x >> 16) % 29 {
                    0 => WILDCARD,
                    1 => SEPARATOR,
                    r => (r % 4) as u8,
                }
            })
            .collect()
    }

    fn naive_suffix_array(encseq: &EncodedSequence, readmode: Readmode) -> Vec<usize> {
        let mut all: Vec<usize> = (0..=encseq.total_length()).collect();
        all.sort_by(|&a, &b| compare_suffixes(encseq, readmode, a, b, 0).0);
        all
    }

    #[test]
    fn acgtacgt_scenario() {
        // acgtacgt$
        let codes = vec![0, 1, 2, 3, 0, 1, 2, 3, SEPARATOR];
        let encseq = EncodedSequence::encode(&codes, 4).unwrap();
        let suftab = build_suffix_array(&encseq, Readmode::Forward, 2, 1, SfxStrategy::default()).unwrap();
        assert_eq!(suftab.len(), 10);
        let rank = |s: usize| suftab.iter().position(|&x| x == s).unwrap();
        assert!(rank(0) < rank(4));
        assert_eq!(rank(4), rank(0) + 1);
        assert_eq!(suftab[8], 8);
        assert_eq!(suftab[9], 9);
        assert_eq!(suftab, naive_suffix_array(&encseq, Readmode::Forward));
    }

    #[test]
    fn matches_naive_for_parts_prefixes_and_readmodes() {
        for seed in [3, 8, 21] {
            let codes = make_codes(700, seed);
            let encseq = EncodedSequence::encode(&codes, 4).unwrap();
            for readmode in Readmode::ALL {
                let expected = naive_suffix_array(&encseq, readmode);
                for (prefixlength, numofparts) in [(1, 1), (3, 1), (3, 4), (5, 3)] {
                    let suftab = build_suffix_array(&encseq, readmode, prefixlength, numofparts, SfxStrategy::default()).unwrap();
                    assert_eq!(suftab, expected, "seed {} {} p={} parts={}", seed, readmode, prefixlength, numofparts);
                }
            }
        }
    }

    #[test]
    fn all_special_text() {
        let codes = vec![WILDCARD, SEPARATOR, WILDCARD];
        let encseq = EncodedSequence::encode(&codes, 4).unwrap();
        let suftab = build_suffix_array(&encseq, Readmode::Forward, 2, 2, SfxStrategy::default()).unwrap();
        assert_eq!(suftab, vec![0, 1, 2, 3]);
    }
}
