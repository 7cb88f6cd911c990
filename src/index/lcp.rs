//! LCP 表的计算与输出。
//!
//! `.lcp` 每个后缀一个字节，首字节为 0；不小于 255 的值记为 255，
//! 真实值以 `(位置, 值)` 对的形式写入 `.llv`。

use std::io::{self, Write};

use byteorder::{NativeEndian, WriteBytesExt};

use crate::alphabet::is_special;
use crate::encseq::{EncodedSequence, Readmode};
use crate::index::bentsedg::compare_suffixes;

/// `.lcp` 中表示“见 `.llv`”的字节值
pub const LCP_OVERFLOW: u8 = u8::MAX;

/// 写出 `.lcp` 和 `.llv` 后的统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LcpStats {
    pub largelcpvalues: usize,
    pub maxbranchdepth: usize,
}

/// 相邻后缀的 lcp，逐个喂入后缀即可
pub struct LcpCalculator<'a> {
    encseq: &'a EncodedSequence,
    readmode: Readmode,
    previous: Option<usize>,
}

impl<'a> LcpCalculator<'a> {
    pub fn new(encseq: &'a EncodedSequence, readmode: Readmode) -> Self {
        Self {
            encseq,
            readmode,
            previous: None,
        }
    }

    /// 与上一个后缀的 lcp；第一个后缀返回 0
    pub fn next_lcp(&mut self, suffix: usize) -> usize {
        let value = match self.previous {
            None => 0,
            Some(prev) => compare_suffixes(self.encseq, self.readmode, prev, suffix, 0).1,
        };
        self.previous = Some(suffix);
        value
    }
}

/// 整个 lcp 表（内存中），`lcp[0] = 0`。
///
/// 完整的后缀表（`n + 1` 项）走线性时间的 Kasai 算法，
/// 其余情况逐对比较相邻后缀。
pub fn lcp_table(encseq: &EncodedSequence, readmode: Readmode, suftab: &[usize]) -> Vec<usize> {
    if suftab.len() == encseq.total_length() + 1 {
        lcp_table_linear(encseq, readmode, suftab)
    } else {
        lcp_table_direct(encseq, readmode, suftab)
    }
}

/// 逐对比较相邻后缀，代价为 O(n·lcp)
pub fn lcp_table_direct(encseq: &EncodedSequence, readmode: Readmode, suftab: &[usize]) -> Vec<usize> {
    let mut calc = LcpCalculator::new(encseq, readmode);
    suftab.iter().map(|&s| calc.next_lcp(s)).collect()
}

/// Kasai 算法：按文本位置顺序计算，借助逆后缀表把总比较次数限制在 O(n)。
///
/// `suftab` 必须是完整的后缀表（含末尾的空后缀 `n`）。
/// special 字符互不相等，所以与逐对比较的结果一致。
pub fn lcp_table_linear(encseq: &EncodedSequence, readmode: Readmode, suftab: &[usize]) -> Vec<usize> {
    let totallength = encseq.total_length();
    debug_assert_eq!(suftab.len(), totallength + 1);
    let mut rank = vec![0usize; totallength + 1];
    for (idx, &suffix) in suftab.iter().enumerate() {
        rank[suffix] = idx;
    }
    let same_char = |a: usize, b: usize| {
        let ca = encseq.get(a, readmode);
        !is_special(ca) && ca == encseq.get(b, readmode)
    };

    let mut lcptab = vec![0usize; totallength + 1];
    let mut h = 0usize;
    for (pos, &r) in rank.iter().enumerate() {
        if r == 0 {
            h = 0;
            continue;
        }
        let prev = suftab[r - 1];
        while pos + h < totallength && prev + h < totallength && same_char(pos + h, prev + h) {
            h += 1;
        }
        lcptab[r] = h;
        h = h.saturating_sub(1);
    }
    lcptab
}

pub struct LcpWriter<W: Write> {
    lcpout: W,
    llvout: W,
    nextpos: usize,
    stats: LcpStats,
}

impl<W: Write> LcpWriter<W> {
    pub fn new(lcpout: W, llvout: W) -> Self {
        Self {
            lcpout,
            llvout,
            nextpos: 0,
            stats: LcpStats::default(),
        }
    }

    pub fn push(&mut self, value: usize) -> io::Result<()> {
        debug_assert!(self.nextpos > 0 || value == 0);
        if value >= LCP_OVERFLOW as usize {
            self.lcpout.write_u8(LCP_OVERFLOW)?;
            let width = std::mem::size_of::<usize>();
            self.llvout.write_uint::<NativeEndian>(self.nextpos as u64, width)?;
            self.llvout.write_uint::<NativeEndian>(value as u64, width)?;
            self.stats.largelcpvalues += 1;
        } else {
            self.lcpout.write_u8(value as u8)?;
        }
        self.stats.maxbranchdepth = self.stats.maxbranchdepth.max(value);
        self.nextpos += 1;
        Ok(())
    }

    pub fn finish(mut self) -> io::Result<LcpStats> {
        self.lcpout.flush()?;
        self.llvout.flush()?;
        Ok(self.stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alphabet::{SEPARATOR, WILDCARD};

    #[test]
    fn lcp_of_repeat() {
        // acgtacgt
        let codes = vec![0, 1, 2, 3, 0, 1, 2, 3];
        let encseq = EncodedSequence::encode(&codes, 4).unwrap();
        let mut calc = LcpCalculator::new(&encseq, Readmode::Forward);
        assert_eq!(calc.next_lcp(4), 0);
        assert_eq!(calc.next_lcp(0), 4);
        assert_eq!(calc.next_lcp(5), 0);
        assert_eq!(calc.next_lcp(1), 3);
    }

    fn make_codes(len: usize, seed: u32) -> Vec<u8> {
        let mut x = seed;
        (0..len)
            .map(|_| {
                x = x.wrapping_mul(1_103_515_245).wrapping_add(12_345);
                match (x >> 16) % 23 {
                    0 => WILDCARD,
                    1 => SEPARATOR,
                    v => (v % 4) as u8,
                }
            })
            .collect()
    }

    fn full_suftab(encseq: &EncodedSequence, readmode: Readmode) -> Vec<usize> {
        let mut suftab: Vec<usize> = (0..=encseq.total_length()).collect();
        suftab.sort_by(|&a, &b| compare_suffixes(encseq, readmode, a, b, 0).0);
        suftab
    }

    #[test]
    fn linear_lcp_on_tandem_repeat() {
        // 600 个 acgt 后接通配符，再重复一段
        let mut codes: Vec<u8> = (0..2400).map(|i| (i % 4) as u8).collect();
        codes.push(WILDCARD);
        codes.extend((0..401).map(|i| (i % 4) as u8));
        codes.push(SEPARATOR);
        codes.extend([0, 0, 0, 0, 0, 0]);
        let encseq = EncodedSequence::encode(&codes, 4).unwrap();
        let suftab = full_suftab(&encseq, Readmode::Forward);
        let linear = lcp_table_linear(&encseq, Readmode::Forward, &suftab);
        assert_eq!(linear, lcp_table_direct(&encseq, Readmode::Forward, &suftab));
        assert_eq!(linear.iter().copied().max(), Some(2396));
        assert_eq!(linear[0], 0);
    }

    #[test]
    fn linear_lcp_matches_direct() {
        for seed in [3, 17, 99] {
            let codes = make_codes(700, seed);
            let encseq = EncodedSequence::encode(&codes, 4).unwrap();
            for readmode in [Readmode::Forward, Readmode::Reverse, Readmode::Complement, Readmode::ReverseComplement] {
                let suftab = full_suftab(&encseq, readmode);
                assert_eq!(
                    lcp_table_linear(&encseq, readmode, &suftab),
                    lcp_table_direct(&encseq, readmode, &suftab),
                    "seed {} readmode {:?}",
                    seed,
                    readmode
                );
            }
        }
    }

    #[test]
    fn partial_table_uses_direct_comparison() {
        let codes = vec![0, 1, 2, 3, 0, 1, 2, 3];
        let encseq = EncodedSequence::encode(&codes, 4).unwrap();
        assert_eq!(lcp_table(&encseq, Readmode::Forward, &[4, 0, 5, 1]), vec![0, 4, 0, 3]);
    }

    #[test]
    fn large_values_go_to_llv() {
        let mut lcpbuf = Vec::new();
        let mut llvbuf = Vec::new();
        let mut writer = LcpWriter::new(&mut lcpbuf, &mut llvbuf);
        for value in [0, 3, 254, 255, 1000, 7] {
            writer.push(value).unwrap();
        }
        let stats = writer.finish().unwrap();
        assert_eq!(stats.largelcpvalues, 2);
        assert_eq!(stats.maxbranchdepth, 1000);
        assert_eq!(lcpbuf, vec![0, 3, 254, 255, 255, 7]);
        assert_eq!(llvbuf.len(), 4 * std::mem::size_of::<usize>());
    }
}
