use std::ops::Range;

use super::{EncodedSequence, Readmode, SpecialRangeIterator, Storage};

/// 顺序读取编码序列的状态。
///
/// 页表方案下随机访问需要二分查找，因此读取器缓存当前（或下一个）special
/// 区间，按读取方向推进，每个位置只需一次比较。
pub struct EncseqReader<'a> {
    encseq: &'a EncodedSequence,
    readmode: Readmode,
    pos: usize,
    ranges: Option<SpecialRangeIterator<'a>>,
    current: Option<Range<usize>>,
}

impl<'a> EncseqReader<'a> {
    pub(crate) fn new(encseq: &'a EncodedSequence, readmode: Readmode, startpos: usize) -> Self {
        let mut ranges = match encseq.storage() {
            Storage::Direct(_) | Storage::Bit { .. } => None,
            _ => Some(encseq.special_ranges(!readmode.is_reverse())),
        };
        let current = ranges.as_mut().and_then(Iterator::next);
        Self {
            encseq,
            readmode,
            pos: startpos,
            ranges,
            current,
        }
    }

    /// 下一个要读取的位置（读取方向上的坐标）
    pub fn position(&self) -> usize {
        self.pos
    }

    fn cached_is_special(&mut self, physical: usize) -> bool {
        let Some(ranges) = self.ranges.as_mut() else {
            return false;
        };
        if self.readmode.is_reverse() {
            while matches!(&self.current, Some(r) if r.start > physical) {
                self.current = ranges.next();
            }
        } else {
            while matches!(&self.current, Some(r) if r.end <= physical) {
                self.current = ranges.next();
            }
        }
        self.current.as_ref().is_some_and(|r| r.contains(&physical))
    }
}

impl Iterator for EncseqReader<'_> {
    type Item = u8;

    fn next(&mut self) -> Option<u8> {
        if self.pos >= self.encseq.total_length() {
            return None;
        }
        let physical = self.encseq.physical_position(self.pos, self.readmode);
        let cc = if self.ranges.is_some() {
            let special = self.cached_is_special(physical);
            self.encseq.decode_known(physical, special)
        } else {
            self.encseq.get_forward(physical)
        };
        self.pos += 1;
        Some(self.encseq.apply_complement(cc, self.readmode))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let rest = self.encseq.total_length().saturating_sub(self.pos);
        (rest, Some(rest))
    }
}

impl ExactSizeIterator for EncseqReader<'_> {}
