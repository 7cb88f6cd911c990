use std::ops::Range;

use super::{bit_is_set, EncodedSequence, Storage};
use crate::alphabet::is_special;

/// 尚未访问的部分：直接/bit 方案按位置扫描，页表方案按存储段推进。
enum Cursor {
    Scan { lo: usize, hi: usize },
    Pieces { lo: usize, hi: usize, lopage: usize, hipage: usize },
}

/// 极大 special 区间的惰性迭代器（正向坐标的 `[start, end)`）。
///
/// 只能遍历一次；页表中被切开的相邻段会在这里重新合并。
pub struct SpecialRangeIterator<'a> {
    encseq: &'a EncodedSequence,
    forward: bool,
    cursor: Cursor,
}

impl<'a> SpecialRangeIterator<'a> {
    pub(crate) fn new(encseq: &'a EncodedSequence, forward: bool) -> Self {
        let storage = encseq.storage();
        let cursor = dispatch_tables!(storage, tables => Cursor::Pieces {
            lo: 0,
            hi: tables.num_of_pieces(),
            lopage: 0,
            hipage: tables.num_of_pages().saturating_sub(1),
        }, _ => Cursor::Scan { lo: 0, hi: encseq.total_length() });
        Self { encseq, forward, cursor }
    }

    fn scan_special(&self, pos: usize) -> bool {
        match self.encseq.storage() {
            Storage::Direct(bytes) => is_special(bytes[pos]),
            Storage::Bit { specialbits: Some(bits), .. } => bit_is_set(bits, pos),
            _ => false,
        }
    }

    /// `[lo, hi)` 中第一个 special 位置；bit 方案整字跳过全零的字
    fn first_special(&self, mut lo: usize, hi: usize) -> Option<usize> {
        if let Storage::Bit { specialbits, .. } = self.encseq.storage() {
            let bits = specialbits.as_ref()?;
            while lo < hi {
                if lo & 63 == 0 && bits[lo >> 6] == 0 {
                    lo += 64;
                    continue;
                }
                if bit_is_set(bits, lo) {
                    return Some(lo);
                }
                lo += 1;
            }
            return None;
        }
        (lo..hi).find(|&pos| self.scan_special(pos))
    }

    fn last_special(&self, lo: usize, mut hi: usize) -> Option<usize> {
        if let Storage::Bit { specialbits, .. } = self.encseq.storage() {
            let bits = specialbits.as_ref()?;
            while hi > lo {
                if hi & 63 == 0 && hi - 64 >= lo && bits[(hi - 1) >> 6] == 0 {
                    hi -= 64;
                    continue;
                }
                if bit_is_set(bits, hi - 1) {
                    return Some(hi - 1);
                }
                hi -= 1;
            }
            return None;
        }
        (lo..hi).rev().find(|&pos| self.scan_special(pos))
    }

    fn next_scanned(&mut self) -> Option<Range<usize>> {
        let Cursor::Scan { lo, hi } = self.cursor else {
            return None;
        };
        if self.forward {
            let Some(start) = self.first_special(lo, hi) else {
                self.cursor = Cursor::Scan { lo: hi, hi };
                return None;
            };
            let mut end = start + 1;
            while end < hi && self.scan_special(end) {
                end += 1;
            }
            self.cursor = Cursor::Scan { lo: end, hi };
            Some(start..end)
        } else {
            let Some(last) = self.last_special(lo, hi) else {
                self.cursor = Cursor::Scan { lo, hi: lo };
                return None;
            };
            let mut start = last;
            while start > lo && self.scan_special(start - 1) {
                start -= 1;
            }
            self.cursor = Cursor::Scan { lo, hi: start };
            Some(start..last + 1)
        }
    }

    fn next_piece(&mut self) -> Option<Range<usize>> {
        let Cursor::Pieces { mut lo, mut hi, mut lopage, mut hipage } = self.cursor else {
            return None;
        };
        if lo >= hi {
            return None;
        }
        let storage = self.encseq.storage();
        let merged = dispatch_tables!(storage, tables => {
            if self.forward {
                lopage = tables.page_of_piece(lo, lopage);
                let mut range = tables.piece(lo, lopage);
                lo += 1;
                while lo < hi {
                    let page = tables.page_of_piece(lo, lopage);
                    let next = tables.piece(lo, page);
                    if next.start != range.end {
                        break;
                    }
                    range.end = next.end;
                    lopage = page;
                    lo += 1;
                }
                range
            } else {
                hipage = tables.page_of_piece_rev(hi - 1, hipage);
                let mut range = tables.piece(hi - 1, hipage);
                hi -= 1;
                while hi > lo {
                    let page = tables.page_of_piece_rev(hi - 1, hipage);
                    let prev = tables.piece(hi - 1, page);
                    if prev.end != range.start {
                        break;
                    }
                    range.start = prev.start;
                    hipage = page;
                    hi -= 1;
                }
                range
            }
        }, _ => return None);
        self.cursor = Cursor::Pieces { lo, hi, lopage, hipage };
        Some(merged)
    }
}

impl Iterator for SpecialRangeIterator<'_> {
    type Item = Range<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.cursor {
            Cursor::Scan { .. } => self.next_scanned(),
            Cursor::Pieces { .. } => self.next_piece(),
        }
    }
}
