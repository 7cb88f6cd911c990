//! 后缀数组上的精确匹配：两次二分查找确定匹配区间的左右端，
//! 比较时记住已确认相等的前缀长度（`lpref`/`rpref`）以跳过重复比较。

use std::cmp::Ordering;

use crate::alphabet::{is_special, SEPARATOR};
use crate::encseq::{EncodedSequence, Readmode};
use crate::error::{ConfigError, Result};
use crate::esa::{LcpInterval, SuftabAccess};

/// 模式与后缀 `suffix` 从偏移 `lcplen` 起比较，返回模式相对后缀的顺序与新的公共长度。
/// 模式是后缀的前缀时视为相等；special 字符互不相等。
fn compare_with_suffix(encseq: &EncodedSequence, readmode: Readmode, suffix: usize, pattern: &[u8], mut lcplen: usize) -> (Ordering, usize) {
    let totallength = encseq.total_length();
    let mut sidx = suffix + lcplen;
    let mut reader = (sidx < totallength).then(|| encseq.reader(readmode, sidx));
    loop {
        if lcplen >= pattern.len() {
            return (Ordering::Equal, lcplen);
        }
        if sidx >= totallength {
            return (Ordering::Less, lcplen);
        }
        let currentchar = match reader.as_mut().and_then(Iterator::next) {
            Some(cc) => cc,
            None => return (Ordering::Less, lcplen),
        };
        let querychar = pattern[lcplen];
        match querychar.cmp(&currentchar) {
            Ordering::Equal if is_special(currentchar) => return (Ordering::Less, lcplen),
            Ordering::Equal => {}
            other => return (other, lcplen),
        }
        sidx += 1;
        lcplen += 1;
    }
}

/// 在 `itv` 内查找以 `pattern` 为前缀的后缀区间
fn mmsearch<S: SuftabAccess + ?Sized>(
    encseq: &EncodedSequence,
    suftab: &S,
    readmode: Readmode,
    itv: LcpInterval,
    pattern: &[u8],
) -> Option<(usize, usize)> {
    let compare = |idx: usize, lcplen: usize| compare_with_suffix(encseq, readmode, suftab.suffix(idx), pattern, lcplen);

    // 左端：第一个不小于模式的后缀
    let (mut left, mut right) = (itv.left, itv.right);
    let mut resultleft = itv.left;
    let (retcode, lpref) = compare(left, itv.offset);
    if retcode == Ordering::Greater {
        let (retcode, rpref) = compare(right, itv.offset);
        if retcode == Ordering::Greater {
            return None;
        }
        let (mut lpref, mut rpref) = (lpref, rpref);
        while right > left + 1 {
            let mid = left + (right - left) / 2;
            let (retcode, lcplen) = compare(mid, lpref.min(rpref));
            if retcode != Ordering::Greater {
                right = mid;
                rpref = lcplen;
            } else {
                left = mid;
                lpref = lcplen;
            }
        }
        resultleft = right;
    }

    // 右端：最后一个以模式为前缀的后缀
    let (mut left, mut right) = (itv.left, itv.right);
    let (retcode, lpref) = compare(left, itv.offset);
    if retcode == Ordering::Less {
        return None;
    }
    let (retcode, rpref) = compare(right, itv.offset);
    let resultright = if retcode != Ordering::Less {
        right
    } else {
        let (mut lpref, mut rpref) = (lpref, rpref);
        while right > left + 1 {
            let mid = left + (right - left) / 2;
            let (retcode, lcplen) = compare(mid, lpref.min(rpref));
            if retcode != Ordering::Less {
                left = mid;
                lpref = lcplen;
            } else {
                right = mid;
                rpref = lcplen;
            }
        }
        left
    };
    (resultleft <= resultright).then_some((resultleft, resultright))
}

/// 匹配区间内的后缀，按后缀表顺序给出起始位置
pub struct MMSearchIterator<'a, S: ?Sized> {
    suftab: &'a S,
    /// 空区间时为 `None`
    bounds: Option<(usize, usize)>,
    sufindex: usize,
}

impl<'a, S: SuftabAccess + ?Sized> MMSearchIterator<'a, S> {
    pub fn new(
        encseq: &EncodedSequence,
        suftab: &'a S,
        leftbound: usize,
        rightbound: usize,
        offset: usize,
        readmode: Readmode,
        pattern: &[u8],
    ) -> Self {
        let itv = LcpInterval {
            offset,
            left: leftbound,
            right: rightbound,
        };
        let bounds = mmsearch(encseq, suftab, readmode, itv, pattern);
        Self {
            suftab,
            bounds,
            sufindex: bounds.map_or(0, |(left, _)| left),
        }
    }

    /// 在整个后缀表中查找
    pub fn over_all(encseq: &EncodedSequence, suftab: &'a S, readmode: Readmode, pattern: &[u8]) -> Self {
        Self::new(encseq, suftab, 0, suftab.num_of_suffixes() - 1, 0, readmode, pattern)
    }

    pub fn num_of_matches(&self) -> usize {
        self.bounds.map_or(0, |(left, right)| right - left + 1)
    }

    pub fn is_empty(&self) -> bool {
        self.bounds.is_none()
    }

    /// 两个迭代器是否给出同一区间
    pub fn identical(&self, other: &Self) -> bool {
        self.bounds == other.bounds
    }

    pub fn bounds(&self) -> Option<(usize, usize)> {
        self.bounds
    }
}

impl<S: SuftabAccess + ?Sized> Iterator for MMSearchIterator<'_, S> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let (_, right) = self.bounds?;
        if self.sufindex > right {
            return None;
        }
        let dbstart = self.suftab.suffix(self.sufindex);
        self.sufindex += 1;
        Some(dbstart)
    }
}

/// 模式在索引序列中的全部出现位置（后缀表顺序）
pub fn mm_enum_pattern_positions<S: SuftabAccess + ?Sized>(
    encseq: &EncodedSequence,
    suftab: &S,
    readmode: Readmode,
    pattern: &[u8],
) -> Vec<usize> {
    MMSearchIterator::over_all(encseq, suftab, readmode, pattern).collect()
}

/// 查询序列与索引序列之间的一个极大精确匹配
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct QueryMatch {
    pub length: usize,
    pub dbstart: usize,
    /// 查询中以分隔符划分的序列编号
    pub querynum: usize,
    /// 在该查询序列中的起点
    pub querystart: usize,
}

fn is_left_maximal(encseq: &EncodedSequence, readmode: Readmode, dbstart: usize, query: &[u8], querystart: usize) -> bool {
    if dbstart == 0 || querystart == 0 {
        return true;
    }
    let dbleftchar = encseq.get(dbstart - 1, readmode);
    dbleftchar != query[querystart - 1] || is_special(dbleftchar)
}

fn extend_right(encseq: &EncodedSequence, readmode: Readmode, dbend: usize, query: &[u8], queryend: usize) -> usize {
    if dbend >= encseq.total_length() {
        return 0;
    }
    encseq
        .reader(readmode, dbend)
        .zip(&query[queryend..])
        .take_while(|&(dbchar, &querychar)| dbchar == querychar && !is_special(dbchar))
        .count()
}

/// 枚举查询序列中所有长度不小于 `minlength` 的左右极大精确匹配
pub fn query_substring_matches<S, F>(
    encseq: &EncodedSequence,
    suftab: &S,
    readmode: Readmode,
    query: &[u8],
    minlength: usize,
    mut process: F,
) -> Result<()>
where
    S: SuftabAccess + ?Sized,
    F: FnMut(QueryMatch) -> Result<()>,
{
    if minlength == 0 {
        return Err(ConfigError::Other("minimal match length must be positive".into()).into());
    }
    if query.len() < minlength {
        return Ok(());
    }
    let mut querynum = 0usize;
    let mut queryoffset = 0usize;
    for querystart in 0..=query.len() - minlength {
        let window = &query[querystart..querystart + minlength];
        for dbstart in MMSearchIterator::over_all(encseq, suftab, readmode, window) {
            if is_left_maximal(encseq, readmode, dbstart, query, querystart) {
                let extend = extend_right(encseq, readmode, dbstart + minlength, query, querystart + minlength);
                process(QueryMatch {
                    length: minlength + extend,
                    dbstart,
                    querynum,
                    querystart: queryoffset,
                })?;
            }
        }
        if query[querystart] == SEPARATOR {
            querynum += 1;
            queryoffset = 0;
        } else {
            queryoffset += 1;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alphabet::WILDCARD;
    use crate::index::suffixer::build_suffix_array;

    fn make_codes(len: usize, seed: u32) -> Vec<u8> {
        let mut x = seed;
        (0..len)
            .map(|_| {
                x = x.wrapping_mul(1_103_515_245).wrapping_add(12_345);
                match (x >> 16) % 31 {
                    0 => WILDCARD,
                    1 => SEPARATOR,
                    r => (r % 4) as u8,
                }
            })
            .collect()
    }

    fn naive_positions(codes: &[u8], pattern: &[u8]) -> Vec<usize> {
        (0..codes.len())
            .filter(|&i| {
                i + pattern.len() <= codes.len()
                    && codes[i..i + pattern.len()].iter().zip(pattern).all(|(&a, &b)| a == b && !is_special(a))
            })
            .collect()
    }

    #[test]
    fn cg_in_acgtacgt() {
        let codes = vec![0, 1, 2, 3, 0, 1, 2, 3, SEPARATOR];
        let encseq = EncodedSequence::encode(&codes, 4).unwrap();
        let suftab = build_suffix_array(&encseq, Readmode::Forward, 2, 1, Default::default()).unwrap();
        let mut positions = mm_enum_pattern_positions(&encseq, &suftab, Readmode::Forward, &[1, 2]);
        positions.sort_unstable();
        assert_eq!(positions, vec![1, 5]);

        let it = MMSearchIterator::over_all(&encseq, &suftab, Readmode::Forward, &[1, 2]);
        assert_eq!(it.num_of_matches(), 2);
        assert!(!it.is_empty());
        let again = MMSearchIterator::over_all(&encseq, &suftab, Readmode::Forward, &[1, 2, 3]);
        assert!(it.identical(&again));
        let missing = MMSearchIterator::over_all(&encseq, &suftab, Readmode::Forward, &[3, 3]);
        assert!(missing.is_empty());
        assert_eq!(missing.num_of_matches(), 0);
        assert!(mm_enum_pattern_positions(&encseq, &suftab, Readmode::Forward, &[3, SEPARATOR]).is_empty());
    }

    #[test]
    fn random_patterns_match_naive_scan() {
        let codes = make_codes(800, 99);
        let encseq = EncodedSequence::encode(&codes, 4).unwrap();
        for readmode in [Readmode::Forward, Readmode::Reverse] {
            let suftab = build_suffix_array(&encseq, readmode, 3, 1, Default::default()).unwrap();
            let text = encseq.extract(0..codes.len(), readmode);
            for start in (0..700).step_by(37) {
                for len in [1, 2, 5, 9] {
                    let pattern = &text[start..start + len];
                    let mut found = mm_enum_pattern_positions(&encseq, &suftab, readmode, pattern);
                    found.sort_unstable();
                    assert_eq!(found, naive_positions(&text, pattern), "{} {}..+{}", readmode, start, len);
                }
            }
        }
    }

    #[test]
    fn maximal_query_matches() {
        // 索引 acgtacgt，查询 tacgtt
        let codes = vec![0, 1, 2, 3, 0, 1, 2, 3];
        let encseq = EncodedSequence::encode(&codes, 4).unwrap();
        let suftab = build_suffix_array(&encseq, Readmode::Forward, 1, 1, Default::default()).unwrap();
        let query = vec![3, 0, 1, 2, 3, 3];
        let mut matches = Vec::new();
        query_substring_matches(&encseq, &suftab, Readmode::Forward, &query, 4, |m| {
            matches.push(m);
            Ok(())
        })
        .unwrap();
        matches.sort();
        assert_eq!(
            matches,
            vec![
                QueryMatch {
                    length: 4,
                    dbstart: 0,
                    querynum: 0,
                    querystart: 1
                },
                QueryMatch {
                    length: 5,
                    dbstart: 3,
                    querynum: 0,
                    querystart: 0
                },
            ]
        );
    }
}
