//! 按页组织的 special 区间表。
//!
//! 位置空间被划分为大小为 `2^BITS` 的页，每个区间记录页内起点（类型 `T`）
//! 与长度减一（一个字节）。跨页或长于 256 的区间被切分成多段。
//! `endspecialsubs[page]` 为截至该页末尾的累计段数。

use std::fmt;
use std::ops::Range;

/// 页内偏移的存储类型
pub trait PageIndex: Copy + Ord + Default + fmt::Debug {
    const BITS: u32;
    const NAME: &'static str;

    fn from_offset(offset: usize) -> Self;
    fn to_offset(self) -> usize;

    #[inline]
    fn page_of(pos: usize) -> usize {
        if Self::BITS >= usize::BITS {
            0
        } else {
            pos >> Self::BITS
        }
    }

    #[inline]
    fn page_start(page: usize) -> usize {
        if Self::BITS >= usize::BITS {
            0
        } else {
            page << Self::BITS
        }
    }

    /// 下一页的起点；单页时为 `usize::MAX`
    #[inline]
    fn next_page_start(pos: usize) -> usize {
        if Self::BITS >= usize::BITS {
            usize::MAX
        } else {
            (Self::page_of(pos) + 1).checked_shl(Self::BITS).unwrap_or(usize::MAX)
        }
    }
}

macro_rules! impl_page_index {
    ($t:ty, $name:expr) => {
        impl PageIndex for $t {
            const BITS: u32 = <$t>::BITS;
            const NAME: &'static str = $name;

            #[inline]
            fn from_offset(offset: usize) -> Self {
                offset as $t
            }

            #[inline]
            fn to_offset(self) -> usize {
                self as usize
            }
        }
    };
}

impl_page_index!(u8, "uchar");
impl_page_index!(u16, "ushort");
impl_page_index!(u32, "uint32");
impl_page_index!(u64, "uint64");

/// 每段最多覆盖的位置数（长度减一存放在一个字节中）
pub const MAX_PIECE_LENGTH: usize = u8::MAX as usize + 1;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpecialTables<T> {
    pub(crate) positions: Vec<T>,
    pub(crate) rangelengths: Vec<u8>,
    pub(crate) endspecialsubs: Vec<usize>,
}

/// 把极大区间按页与长度上限切段，对每段调用 `f(start, end)`
fn for_each_piece<T: PageIndex>(ranges: &[Range<usize>], mut f: impl FnMut(usize, usize)) {
    for range in ranges {
        let mut start = range.start;
        while start < range.end {
            let end = range
                .end
                .min(T::next_page_start(start))
                .min(start.saturating_add(MAX_PIECE_LENGTH));
            f(start, end);
            start = end;
        }
    }
}

/// 给定页大小时需要存储的段数
pub fn count_pieces<T: PageIndex>(ranges: &[Range<usize>]) -> usize {
    let mut count = 0;
    for_each_piece::<T>(ranges, |_, _| count += 1);
    count
}

pub fn num_of_pages<T: PageIndex>(totallength: usize) -> usize {
    T::page_of(totallength) + 1
}

impl<T: PageIndex> SpecialTables<T> {
    pub fn build(ranges: &[Range<usize>], totallength: usize) -> Self {
        let mut positions = Vec::new();
        let mut rangelengths = Vec::new();
        let mut pages = Vec::new();
        for_each_piece::<T>(ranges, |start, end| {
            let page = T::page_of(start);
            positions.push(T::from_offset(start - T::page_start(page)));
            rangelengths.push((end - start - 1) as u8);
            pages.push(page);
        });

        let numofpages = num_of_pages::<T>(totallength);
        let mut endspecialsubs = vec![0usize; numofpages];
        let mut idx = 0;
        for (page, slot) in endspecialsubs.iter_mut().enumerate() {
            while idx < pages.len() && pages[idx] <= page {
                idx += 1;
            }
            *slot = idx;
        }
        Self { positions, rangelengths, endspecialsubs }
    }

    #[inline]
    pub fn num_of_pieces(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    fn page_bounds(&self, page: usize) -> (usize, usize) {
        let lo = if page == 0 { 0 } else { self.endspecialsubs[page - 1] };
        (lo, self.endspecialsubs[page])
    }

    /// 第 `idx` 段的绝对区间，`page` 为该段所在页
    #[inline]
    pub(crate) fn piece(&self, idx: usize, page: usize) -> Range<usize> {
        let start = T::page_start(page) + self.positions[idx].to_offset();
        start..start + self.rangelengths[idx] as usize + 1
    }

    /// 第 `idx` 段所在的页（`hint` 为不大于结果的某一页）
    pub(crate) fn page_of_piece(&self, idx: usize, hint: usize) -> usize {
        let mut page = hint;
        while page < self.endspecialsubs.len() && self.endspecialsubs[page] <= idx {
            page += 1;
        }
        page
    }

    /// 同上，但 `hint` 为不小于结果的某一页
    pub(crate) fn page_of_piece_rev(&self, idx: usize, hint: usize) -> usize {
        let mut page = hint;
        while page > 0 && self.endspecialsubs[page - 1] > idx {
            page -= 1;
        }
        page
    }

    /// 读入的表是否自洽：累计段数单调且与段数一致，
    /// 每页内的段按起点递增、互不重叠，并且不越过页尾和序列末尾。
    pub(crate) fn is_consistent(&self, totallength: usize) -> bool {
        if self.rangelengths.len() != self.positions.len()
            || self.endspecialsubs.len() != num_of_pages::<T>(totallength)
            || self.endspecialsubs.last() != Some(&self.positions.len())
            || self.endspecialsubs.windows(2).any(|w| w[0] > w[1])
        {
            return false;
        }
        for page in 0..self.endspecialsubs.len() {
            let (lo, hi) = self.page_bounds(page);
            let pageend = T::next_page_start(T::page_start(page)).min(totallength);
            let mut nextfree = T::page_start(page);
            for idx in lo..hi {
                let end = T::page_start(page)
                    .checked_add(self.positions[idx].to_offset())
                    .filter(|&start| start >= nextfree)
                    .and_then(|start| start.checked_add(self.rangelengths[idx] as usize + 1));
                match end {
                    Some(end) if end <= pageend => nextfree = end,
                    _ => return false,
                }
            }
        }
        true
    }

    #[inline]
    pub(crate) fn num_of_pages(&self) -> usize {
        self.endspecialsubs.len()
    }

    /// `pos` 是否落在某个 special 区间内：在所在页的段中二分查找。
    pub fn contains(&self, pos: usize) -> bool {
        let page = T::page_of(pos);
        if page >= self.endspecialsubs.len() {
            return false;
        }
        let (lo, hi) = self.page_bounds(page);
        if lo == hi {
            return false;
        }
        let offset = pos - T::page_start(page);
        let found = self.positions[lo..hi].partition_point(|p| p.to_offset() <= offset);
        if found == 0 {
            return false;
        }
        let idx = lo + found - 1;
        offset <= self.positions[idx].to_offset() + self.rangelengths[idx] as usize
    }
}
