//! 把非 special 后缀按桶编码切成若干连续的部分，每部分单独排序输出，
//! 从而限制同时驻留内存的后缀表大小。桶不会被拆开。

use crate::alphabet::codes::Codetype;
use crate::error::{ConfigError, Result};
use crate::index::bcktab::BucketTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuftabPart {
    pub mincode: Codetype,
    pub maxcode: Codetype,
    /// 本部分在完整后缀表中的起始下标
    pub suftaboffset: usize,
    pub widthofpart: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuftabParts {
    parts: Vec<SuftabPart>,
    largestwidth: usize,
}

impl SuftabParts {
    pub fn new(numofparts: u32, bcktab: &BucketTable, numofsuffixes: usize) -> Result<Self> {
        if numofparts == 0 {
            return Err(ConfigError::ZeroParts.into());
        }
        let leftborder = bcktab.leftborder_table();
        let numofallcodes = bcktab.num_of_all_codes();
        let lastcode = numofallcodes - 1;
        let mut parts = Vec::new();

        if numofsuffixes == 0 {
            return Ok(Self { parts, largestwidth: 0 });
        }
        if numofsuffixes < numofparts as usize || numofparts == 1 || bcktab.prefix_length() == 1 {
            parts.push(SuftabPart {
                mincode: 0,
                maxcode: lastcode as Codetype,
                suftaboffset: 0,
                widthofpart: numofsuffixes,
            });
            return Ok(Self {
                parts,
                largestwidth: numofsuffixes,
            });
        }

        let numofparts = numofparts as usize;
        let basewidth = numofsuffixes / numofparts;
        let mut remainder = numofsuffixes % numofparts;
        let mut target = 0usize;
        let mut mincode = 0usize;
        let mut suftaboffset = 0usize;
        for part in 0..numofparts {
            if mincode > lastcode {
                break;
            }
            target += basewidth;
            if remainder > 0 {
                target += 1;
                remainder -= 1;
            }
            let maxcode = if part == numofparts - 1 {
                lastcode
            } else {
                mincode + leftborder[mincode..=lastcode].partition_point(|&lb| lb < target)
            }
            .min(lastcode);
            let end = leftborder[maxcode];
            let widthofpart = end - suftaboffset;
            if widthofpart > 0 {
                parts.push(SuftabPart {
                    mincode: mincode as Codetype,
                    maxcode: maxcode as Codetype,
                    suftaboffset,
                    widthofpart,
                });
            }
            suftaboffset = end;
            mincode = maxcode + 1;
        }
        let largestwidth = parts.iter().map(|p| p.widthofpart).max().unwrap_or(0);
        debug_assert_eq!(parts.iter().map(|p| p.widthofpart).sum::<usize>(), numofsuffixes);
        Ok(Self { parts, largestwidth })
    }

    pub fn parts(&self) -> &[SuftabPart] {
        &self.parts
    }

    pub fn num_of_parts(&self) -> usize {
        self.parts.len()
    }

    /// 最大部分的宽度，决定后缀表缓冲区大小
    pub fn largest_width(&self) -> usize {
        self.largestwidth
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encseq::{EncodedSequence, Readmode};

    fn make_codes(len: usize, seed: u32) -> Vec<u8> {
        let mut x = seed;
        (0..len)
            .map(|_| {
                x = x.wrapping_mul(1_103_515_245).wrapping_add(12_345);
                ((x >> 16) % 4) as u8
            })
            .collect()
    }

    #[test]
    fn parts_cover_all_suffixes_without_splitting_buckets() {
        let codes = make_codes(2000, 17);
        let encseq = EncodedSequence::encode(&codes, 4).unwrap();
        let (bcktab, _) = BucketTable::count_kmers(&encseq, Readmode::Forward, 3).unwrap();
        let n = bcktab.num_of_suffixes();
        for numofparts in [1, 2, 3, 7, 64] {
            let parts = SuftabParts::new(numofparts, &bcktab, n).unwrap();
            assert!(parts.num_of_parts() <= numofparts as usize);
            let mut expected_offset = 0;
            let mut expected_mincode = 0;
            for part in parts.parts() {
                assert!(part.mincode >= expected_mincode);
                assert_eq!(part.suftaboffset, expected_offset);
                assert_eq!(bcktab.leftborder(part.maxcode), part.suftaboffset + part.widthofpart);
                expected_offset += part.widthofpart;
                expected_mincode = part.maxcode + 1;
            }
            assert_eq!(expected_offset, n);
            assert_eq!(parts.parts().last().map(|p| p.maxcode), Some(63));
        }
    }

    #[test]
    fn single_part_cases() {
        let encseq = EncodedSequence::encode(&[0, 1, 2], 4).unwrap();
        let (bcktab, _) = BucketTable::count_kmers(&encseq, Readmode::Forward, 2).unwrap();
        let parts = SuftabParts::new(5, &bcktab, bcktab.num_of_suffixes()).unwrap();
        assert_eq!(parts.num_of_parts(), 1);
        assert_eq!(parts.largest_width(), 3);
        assert!(SuftabParts::new(0, &bcktab, 3).is_err());
    }
}
