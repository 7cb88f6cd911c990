//! 近似匹配：在 lcp 区间树上深度优先推进 Myers 列。
//!
//! 共享前缀的后缀共用同一列。列被剪枝时整棵子树跳过；整条模式在距离 `k`
//! 内时，区间内所有后缀都是匹配，长度为当前深度。子区间在需要时才按
//! 下一个字符二分切分，单个后缀则沿序列继续逐字符推进。

use crate::alphabet::{SEPARATOR, SPECIAL_OFFSET, WILDCARD};
use crate::encseq::{EncodedSequence, Readmode};
use crate::error::Result;
use crate::esa::myers::{ApproxPattern, Column};
use crate::esa::{LcpInterval, SuftabAccess};
use crate::index::bentsedg::{compare_suffixes, symbol_key};

struct LimdfsState<'a, S: ?Sized, F> {
    encseq: &'a EncodedSequence,
    suftab: &'a S,
    readmode: Readmode,
    pattern: ApproxPattern,
    nowildcards: bool,
    process: F,
}

/// 栈中的一项：`column` 已读入区间公共前缀的前 `depth` 个字符
struct PendingInterval {
    itv: LcpInterval,
    column: Column,
    depth: usize,
}

impl<S, F> LimdfsState<'_, S, F>
where
    S: SuftabAccess + ?Sized,
    F: FnMut(usize, usize) -> Result<()>,
{
    fn report_interval(&mut self, itv: &LcpInterval, matchlength: usize) -> Result<()> {
        for idx in itv.left..=itv.right {
            let dbstart = self.suftab.suffix(idx);
            (self.process)(dbstart, matchlength)?;
        }
        Ok(())
    }

    /// 单个后缀从 `depth` 起逐字符推进
    fn scan_singleton(&mut self, dbstart: usize, mut column: Column, mut depth: usize) -> Result<()> {
        let totallength = self.encseq.total_length();
        if dbstart + depth >= totallength {
            return Ok(());
        }
        for cc in self.encseq.reader(self.readmode, dbstart + depth) {
            if cc == SEPARATOR || (cc == WILDCARD && self.nowildcards) {
                break;
            }
            column = self.pattern.next_column(&column, cc);
            depth += 1;
            if self.pattern.is_pruned(&column) {
                break;
            }
            if self.pattern.is_match(&column) {
                return (self.process)(dbstart, depth);
            }
        }
        Ok(())
    }

    /// 区间在深度 `depth` 处按下一个字符切分，真实字符的子区间按序给出，
    /// 其后的 special 与序列末尾各自单独成为一项
    fn split_children(&self, itv: &LcpInterval, depth: usize) -> Vec<LcpInterval> {
        let key = |idx: usize| symbol_key(self.encseq, self.readmode, self.suftab.suffix(idx) + depth);
        let mut children = Vec::new();
        let mut left = itv.left;
        while left <= itv.right {
            let firstkey = key(left);
            if firstkey >= SPECIAL_OFFSET {
                children.push(LcpInterval {
                    offset: depth,
                    left,
                    right: left,
                });
                left += 1;
                continue;
            }
            // [left, itv.right] 内第一个键大于 firstkey 的位置
            let (mut lo, mut hi) = (left + 1, itv.right + 1);
            while lo < hi {
                let mid = lo + (hi - lo) / 2;
                if key(mid) <= firstkey {
                    lo = mid + 1;
                } else {
                    hi = mid;
                }
            }
            let right = lo - 1;
            let offset = if right == left {
                depth + 1
            } else {
                let first = self.suftab.suffix(left);
                let last = self.suftab.suffix(right);
                compare_suffixes(self.encseq, self.readmode, first, last, depth + 1).1
            };
            children.push(LcpInterval { offset, left, right });
            left = right + 1;
        }
        children
    }

    fn run(&mut self) -> Result<()> {
        let root = LcpInterval {
            offset: 0,
            left: 0,
            right: self.suftab.num_of_suffixes() - 1,
        };
        let mut stack = vec![PendingInterval {
            itv: root,
            column: self.pattern.initial_column(),
            depth: 0,
        }];
        while let Some(PendingInterval { itv, mut column, mut depth }) = stack.pop() {
            if itv.left == itv.right {
                let dbstart = self.suftab.suffix(itv.left);
                self.scan_singleton(dbstart, column, depth)?;
                continue;
            }
            debug_assert!(itv.left < itv.right);
            // 区间公共前缀中尚未读入的字符都是真实字符
            let dbstart = self.suftab.suffix(itv.left);
            let mut pruned = false;
            while depth < itv.offset {
                let cc = self.encseq.get(dbstart + depth, self.readmode);
                column = self.pattern.next_column(&column, cc);
                depth += 1;
                if self.pattern.is_pruned(&column) {
                    pruned = true;
                    break;
                }
                if self.pattern.is_match(&column) {
                    self.report_interval(&itv, depth)?;
                    pruned = true;
                    break;
                }
            }
            if pruned {
                continue;
            }
            for child in self.split_children(&itv, depth).into_iter().rev() {
                stack.push(PendingInterval {
                    itv: child,
                    column,
                    depth,
                });
            }
        }
        Ok(())
    }
}

/// 报告所有与 `pattern` 编辑距离不超过 `maxdistance` 的最短前缀，
/// `process(dbstart, matchlength)`。`nowildcards` 时匹配不跨过通配符。
pub fn esa_limited_dfs<S, F>(
    encseq: &EncodedSequence,
    suftab: &S,
    readmode: Readmode,
    pattern: &[u8],
    maxdistance: usize,
    nowildcards: bool,
    process: F,
) -> Result<()>
where
    S: SuftabAccess + ?Sized,
    F: FnMut(usize, usize) -> Result<()>,
{
    let pattern = ApproxPattern::new(pattern, maxdistance, encseq.num_of_chars())?;
    log::debug!(
        "limited dfs: pattern length {}, distance {}, {} suffixes",
        pattern.pattern_length(),
        maxdistance,
        suftab.num_of_suffixes()
    );
    LimdfsState {
        encseq,
        suftab,
        readmode,
        pattern,
        nowildcards,
        process,
    }
    .run()
}
