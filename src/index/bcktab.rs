//! 桶表：按长度为 `prefixlength` 的前缀编码统计后缀数目。

use std::io::Write;

use byteorder::{NativeEndian, WriteBytesExt};

use crate::alphabet::codes::{CodeAtPosition, Codetype, KmerScanner};
use crate::encseq::{EncodedSequence, Readmode};
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketTable {
    prefixlength: u32,
    numofchars: u32,
    /// 长度 `numofallcodes + 1`；计数后为各桶的右端（不含），插入时递减到左端
    leftborder: Vec<usize>,
    /// 每个桶中前缀窗口内含 special 的后缀数
    countspecialcodes: Vec<usize>,
}

impl BucketTable {
    /// 一次正向扫描完成计数，返回桶表和所有 special 区间前的编码记录
    pub fn count_kmers(encseq: &EncodedSequence, readmode: Readmode, prefixlength: u32) -> Result<(Self, Vec<CodeAtPosition>)> {
        let scanner = KmerScanner::new(encseq, readmode, prefixlength)?;
        let numofallcodes = scanner.basepower()[prefixlength as usize] as usize;
        let mut leftborder = vec![0usize; numofallcodes + 1];
        let mut countspecialcodes = vec![0usize; numofallcodes];

        let records = scanner.scan(|_, code| leftborder[code as usize] += 1);
        for record in &records {
            scanner.derive_special_codes(record, |sc| {
                leftborder[sc.code as usize] += 1;
                countspecialcodes[sc.code as usize] += 1;
            });
        }

        let mut sum = 0usize;
        for slot in leftborder.iter_mut().take(numofallcodes) {
            sum += *slot;
            *slot = sum;
        }
        leftborder[numofallcodes] = sum;
        debug_assert_eq!(
            sum,
            encseq.total_length() - encseq.special_char_info().specialcharacters
        );
        log::debug!(
            "counted {} non-special suffixes in {} buckets ({} code records)",
            sum,
            numofallcodes,
            records.len()
        );
        Ok((
            Self {
                prefixlength,
                numofchars: encseq.num_of_chars(),
                leftborder,
                countspecialcodes,
            },
            records,
        ))
    }

    #[inline]
    pub fn prefix_length(&self) -> u32 {
        self.prefixlength
    }

    #[inline]
    pub fn num_of_chars(&self) -> u32 {
        self.numofchars
    }

    #[inline]
    pub fn num_of_all_codes(&self) -> usize {
        self.countspecialcodes.len()
    }

    /// 所有非 special 后缀的数目
    #[inline]
    pub fn num_of_suffixes(&self) -> usize {
        self.leftborder[self.num_of_all_codes()]
    }

    #[inline]
    pub fn leftborder(&self, code: Codetype) -> usize {
        self.leftborder[code as usize]
    }

    pub fn leftborder_table(&self) -> &[usize] {
        &self.leftborder
    }

    #[inline]
    pub fn count_special_codes(&self, code: Codetype) -> usize {
        self.countspecialcodes[code as usize]
    }

    /// 取出后缀 `code` 的插入位置（递减 `leftborder[code]`）
    #[inline]
    pub(crate) fn next_insert_slot(&mut self, code: Codetype) -> usize {
        let slot = &mut self.leftborder[code as usize];
        *slot -= 1;
        *slot
    }

    /// `.bck`：leftborder 后接 countspecialcodes，均为本机字节序 `usize`
    pub fn write_to<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        for &value in self.leftborder.iter().chain(self.countspecialcodes.iter()) {
            out.write_uint::<NativeEndian>(value as u64, std::mem::size_of::<usize>())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alphabet::{SEPARATOR, WILDCARD};

    #[test]
    fn counts_match_direct_codes() {
        let text = vec![0, 1, 2, 3, 0, 1, 2, 3, SEPARATOR, 2, 2, WILDCARD, 1];
        let encseq = EncodedSequence::encode(&text, 4).unwrap();
        let (bcktab, _) = BucketTable::count_kmers(&encseq, Readmode::Forward, 2).unwrap();
        let scanner = KmerScanner::new(&encseq, Readmode::Forward, 2).unwrap();

        let mut counts = vec![0usize; 16];
        let mut specials = vec![0usize; 16];
        for (pos, &cc) in text.iter().enumerate() {
            if crate::alphabet::is_special(cc) {
                continue;
            }
            let (code, q) = scanner.code_at(pos);
            counts[code as usize] += 1;
            if q < 2 {
                specials[code as usize] += 1;
            }
        }
        let mut sum = 0;
        for code in 0..16 {
            sum += counts[code];
            assert_eq!(bcktab.leftborder(code as Codetype), sum);
            assert_eq!(bcktab.count_special_codes(code as Codetype), specials[code]);
        }
        assert_eq!(bcktab.num_of_suffixes(), text.len() - 2);
    }

    #[test]
    fn bck_output_layout() {
        let encseq = EncodedSequence::encode(&[0, 1, 0, 1], 4).unwrap();
        let (bcktab, _) = BucketTable::count_kmers(&encseq, Readmode::Forward, 1).unwrap();
        let mut buf = Vec::new();
        bcktab.write_to(&mut buf).unwrap();
        let width = std::mem::size_of::<usize>();
        assert_eq!(buf.len(), (5 + 4) * width);
    }
}
