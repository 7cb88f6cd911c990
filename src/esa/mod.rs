//! 增强后缀数组上的查询：虚拟后缀树遍历、精确与近似匹配。

pub mod dfs;
pub mod limdfs;
pub mod maxpairs;
pub mod mmsearch;
pub mod myers;
pub mod reader;

use crate::io::tables::MappedUsizeTable;

/// 后缀表中的闭区间 `[left, right]`，其中所有后缀共享长度为 `offset` 的前缀
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LcpInterval {
    pub offset: usize,
    pub left: usize,
    pub right: usize,
}

impl LcpInterval {
    #[inline]
    pub fn width(&self) -> usize {
        self.right - self.left + 1
    }
}

/// 随机访问后缀表，内存中的数组与映射文件都可以
pub trait SuftabAccess {
    fn num_of_suffixes(&self) -> usize;
    fn suffix(&self, idx: usize) -> usize;
}

impl SuftabAccess for [usize] {
    #[inline]
    fn num_of_suffixes(&self) -> usize {
        self.len()
    }

    #[inline]
    fn suffix(&self, idx: usize) -> usize {
        self[idx]
    }
}

impl SuftabAccess for Vec<usize> {
    #[inline]
    fn num_of_suffixes(&self) -> usize {
        self.len()
    }

    #[inline]
    fn suffix(&self, idx: usize) -> usize {
        self[idx]
    }
}

impl SuftabAccess for MappedUsizeTable {
    #[inline]
    fn num_of_suffixes(&self) -> usize {
        self.len()
    }

    #[inline]
    fn suffix(&self, idx: usize) -> usize {
        self.get(idx)
    }
}
