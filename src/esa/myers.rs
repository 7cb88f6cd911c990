//! Myers 位并行编辑距离。
//!
//! 模式长度不超过一个机器字（64）。`Column` 是前缀模式的列：模式前缀
//! 对已读文本的全局编辑距离，`maxleqk` 记录距离不超过 `k` 的最长前缀。
//! 在线搜索使用半全局的得分列，只跟踪整条模式的距离。

use crate::alphabet::{is_special, SEPARATOR};
use crate::encseq::{EncodedSequence, Readmode};
use crate::error::{ConfigError, Result};

pub const MAX_PATTERN_LENGTH: usize = u64::BITS as usize;

/// 前缀模式的一列
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub pv: u64,
    pub mv: u64,
    /// 编辑距离不超过 `k` 的最长模式前缀长度；`m + 1` 表示不存在
    pub maxleqk: usize,
}

/// 预处理后的模式：每个字符一个出现位置的位向量
#[derive(Debug, Clone)]
pub struct ApproxPattern {
    eqs: Vec<u64>,
    patternlength: usize,
    maxdistance: usize,
}

impl ApproxPattern {
    pub fn new(pattern: &[u8], maxdistance: usize, numofchars: u32) -> Result<Self> {
        if pattern.is_empty() {
            return Err(ConfigError::EmptyPattern.into());
        }
        if pattern.len() > MAX_PATTERN_LENGTH {
            return Err(ConfigError::PatternTooLong(pattern.len(), MAX_PATTERN_LENGTH).into());
        }
        if maxdistance >= pattern.len() {
            return Err(ConfigError::DistanceTooLarge(maxdistance, pattern.len()).into());
        }
        let mut eqs = vec![0u64; numofchars as usize];
        for (idx, &cc) in pattern.iter().enumerate() {
            let slot = eqs
                .get_mut(cc as usize)
                .ok_or_else(|| ConfigError::Other(format!("pattern symbol {} at offset {} is not a character of the alphabet", cc, idx)))?;
            *slot |= 1 << idx;
        }
        Ok(Self {
            eqs,
            patternlength: pattern.len(),
            maxdistance,
        })
    }

    pub fn pattern_length(&self) -> usize {
        self.patternlength
    }

    pub fn max_distance(&self) -> usize {
        self.maxdistance
    }

    #[inline]
    fn eq_of(&self, cc: u8) -> u64 {
        if is_special(cc) {
            0
        } else {
            self.eqs.get(cc as usize).copied().unwrap_or(0)
        }
    }

    pub fn initial_column(&self) -> Column {
        Column {
            pv: !0,
            mv: 0,
            maxleqk: self.maxdistance,
        }
    }

    #[inline]
    pub fn is_pruned(&self, column: &Column) -> bool {
        column.maxleqk > self.patternlength
    }

    #[inline]
    pub fn is_match(&self, column: &Column) -> bool {
        column.maxleqk == self.patternlength
    }

    /// 再读入一个字符。已匹配或已剪枝的列不再推进。
    pub fn next_column(&self, column: &Column, cc: u8) -> Column {
        if column.maxleqk >= self.patternlength {
            return *column;
        }
        let eq = self.eq_of(cc);
        let xv = eq | column.mv;
        let xh = ((eq & column.pv).wrapping_add(column.pv) ^ column.pv) | eq;
        let ph = ((column.mv | !(xh | column.pv)) << 1) | 1;
        let mh = (column.pv & xh) << 1;
        let pv = mh | !(xv | ph);
        let mv = ph & xv;

        // 上一列在 maxleqk 行的距离恰为 k
        let backmask = 1u64 << column.maxleqk;
        let maxleqk = if (eq | mh) & backmask != 0 {
            column.maxleqk + 1
        } else if ph & backmask != 0 {
            let mut score = self.maxdistance + 1;
            let mut found = self.patternlength + 1;
            for idx in (0..column.maxleqk).rev() {
                let mask = 1u64 << idx;
                if pv & mask != 0 {
                    score -= 1;
                    if score <= self.maxdistance {
                        found = idx;
                        break;
                    }
                } else if mv & mask != 0 {
                    score += 1;
                }
            }
            found
        } else {
            column.maxleqk
        };
        Column { pv, mv, maxleqk }
    }
}

/// 在线搜索得到的一次出现，`endpos` 含在内
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct OnlineMatch {
    pub startpos: usize,
    pub endpos: usize,
    /// 以 `endpos` 结尾的最小编辑距离
    pub distance: usize,
}

/// 半全局得分列
struct ScoreColumn {
    pv: u64,
    mv: u64,
    score: usize,
}

impl ScoreColumn {
    fn new(patternlength: usize) -> Self {
        Self {
            pv: !0,
            mv: 0,
            score: patternlength,
        }
    }

    #[inline]
    fn advance(&mut self, eq: u64, hibit: u64) {
        let xv = eq | self.mv;
        let xh = ((eq & self.pv).wrapping_add(self.pv) ^ self.pv) | eq;
        let mut ph = self.mv | !(xh | self.pv);
        let mut mh = self.pv & xh;
        if ph & hibit != 0 {
            self.score += 1;
        } else if mh & hibit != 0 {
            self.score -= 1;
        }
        ph <<= 1;
        mh <<= 1;
        self.pv = mh | !(xv | ph);
        self.mv = ph & xv;
    }
}

/// 从 `endpos` 向前用反向模式找最短的出现，返回起点。
/// 不越过 `seqstart`，遇到分隔符即停止。
pub fn find_shortest_match(
    encseq: &EncodedSequence,
    readmode: Readmode,
    reversed: &ApproxPattern,
    seqstart: usize,
    endpos: usize,
) -> Option<usize> {
    let mut column = reversed.initial_column();
    let mut pos = endpos + 1;
    while pos > seqstart {
        pos -= 1;
        let cc = encseq.get(pos, readmode);
        if cc == SEPARATOR {
            return None;
        }
        column = reversed.next_column(&column, cc);
        if reversed.is_match(&column) {
            return Some(pos);
        }
        if reversed.is_pruned(&column) {
            return None;
        }
    }
    None
}

/// 顺序扫描整个序列，报告所有编辑距离不超过 `maxdistance` 的出现。
/// 分隔符处重新开始；通配符与任何模式字符都不相等。
pub fn myers_online<F>(
    encseq: &EncodedSequence,
    readmode: Readmode,
    pattern: &[u8],
    maxdistance: usize,
    mut process: F,
) -> Result<()>
where
    F: FnMut(OnlineMatch) -> Result<()>,
{
    let numofchars = encseq.num_of_chars();
    let forward = ApproxPattern::new(pattern, maxdistance, numofchars)?;
    let reversedpattern: Vec<u8> = pattern.iter().rev().copied().collect();
    let reversed = ApproxPattern::new(&reversedpattern, maxdistance, numofchars)?;
    let patternlength = pattern.len();
    let hibit = 1u64 << (patternlength - 1);

    let mut column = ScoreColumn::new(patternlength);
    let mut seqstart = 0usize;
    for (pos, cc) in encseq.reader(readmode, 0).enumerate() {
        if cc == SEPARATOR {
            column = ScoreColumn::new(patternlength);
            seqstart = pos + 1;
            continue;
        }
        column.advance(forward.eq_of(cc), hibit);
        if column.score <= maxdistance {
            if let Some(startpos) = find_shortest_match(encseq, readmode, &reversed, seqstart, pos) {
                process(OnlineMatch {
                    startpos,
                    endpos: pos,
                    distance: column.score,
                })?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alphabet::WILDCARD;

    fn edit_distance(a: &[u8], b: &[u8]) -> usize {
        let mut prev: Vec<usize> = (0..=a.len()).collect();
        for (j, &cb) in b.iter().enumerate() {
            let mut cur = vec![j + 1; a.len() + 1];
            for (i, &ca) in a.iter().enumerate() {
                let subst = prev[i] + usize::from(ca != cb || is_special(cb));
                cur[i + 1] = subst.min(prev[i + 1] + 1).min(cur[i] + 1);
            }
            prev = cur;
        }
        prev[a.len()]
    }

    fn make_codes(len: usize, seed: u32) -> Vec<u8> {
        let mut x = seed;
        (0..len)
            .map(|_| {
                x = x.wrapping_mul(1_103_515_245).wrapping_add(12_345);
                match (x >> 16) % 53 {
                    0 => WILDCARD,
                    1 => SEPARATOR,
                    r => (r % 4) as u8,
                }
            })
            .collect()
    }

    /// 每个结尾位置的最小距离及最短出现的起点
    fn naive_online(codes: &[u8], pattern: &[u8], k: usize) -> Vec<OnlineMatch> {
        let mut out = Vec::new();
        let mut seqstart = 0;
        for end in 0..codes.len() {
            if codes[end] == SEPARATOR {
                seqstart = end + 1;
                continue;
            }
            let mut best = pattern.len();
            let mut shortest = None;
            for start in (seqstart..=end).rev() {
                let d = edit_distance(pattern, &codes[start..=end]);
                best = best.min(d);
                if d <= k && shortest.is_none() {
                    shortest = Some(start);
                }
            }
            if best <= k {
                out.push(OnlineMatch {
                    startpos: shortest.unwrap(),
                    endpos: end,
                    distance: best,
                });
            }
        }
        out
    }

    #[test]
    fn column_tracks_longest_prefix_within_distance() {
        let pattern = [0u8, 1, 2, 0];
        let text = [0u8, 1, 2, 3, 0, 1];
        let ap = ApproxPattern::new(&pattern, 1, 4).unwrap();
        let mut column = ap.initial_column();
        for len in 1..=text.len() {
            column = ap.next_column(&column, text[len - 1]);
            let expected = (0..=pattern.len()).filter(|&i| edit_distance(&pattern[..i], &text[..len]) <= 1).max();
            match expected {
                Some(i) => assert_eq!(column.maxleqk, i, "after {} symbols", len),
                None => assert!(ap.is_pruned(&column)),
            }
            if ap.is_match(&column) || ap.is_pruned(&column) {
                break;
            }
        }
        assert!(ap.is_match(&column));
    }

    #[test]
    fn random_columns_match_dynamic_programming() {
        let text = make_codes(400, 17);
        for (plen, k) in [(5, 1), (8, 2), (12, 3)] {
            let pattern: Vec<u8> = make_codes(plen * 3, plen as u32)
                .into_iter()
                .filter(|&c| !is_special(c))
                .take(plen)
                .collect();
            let ap = ApproxPattern::new(&pattern, k, 4).unwrap();
            for start in (0..380).step_by(13) {
                let mut column = ap.initial_column();
                let mut len = 0;
                while start + len < text.len() && !ap.is_match(&column) && !ap.is_pruned(&column) {
                    column = ap.next_column(&column, text[start + len]);
                    len += 1;
                    let segment = &text[start..start + len];
                    let expected = (0..=pattern.len()).filter(|&i| edit_distance(&pattern[..i], segment) <= k).max();
                    assert_eq!(column.maxleqk, expected.unwrap_or(pattern.len() + 1));
                }
            }
        }
    }

    #[test]
    fn online_search_matches_brute_force() {
        let codes = make_codes(300, 3);
        let encseq = EncodedSequence::encode(&codes, 4).unwrap();
        for (pattern, k) in [(vec![0u8, 1, 2, 3], 1), (vec![2u8, 2, 1, 0, 3, 1], 2), (vec![3u8, 3], 0)] {
            let mut found = Vec::new();
            myers_online(&encseq, Readmode::Forward, &pattern, k, |m| {
                found.push(m);
                Ok(())
            })
            .unwrap();
            assert_eq!(found, naive_online(&codes, &pattern, k), "{:?} k={}", pattern, k);
        }
    }

    #[test]
    fn rejects_bad_patterns() {
        assert!(ApproxPattern::new(&[], 0, 4).is_err());
        assert!(ApproxPattern::new(&[0; 65], 1, 4).is_err());
        assert!(ApproxPattern::new(&[0, 1], 2, 4).is_err());
        assert!(ApproxPattern::new(&[0, 7], 1, 4).is_err());
        assert!(ApproxPattern::new(&[0; 64], 3, 4).is_ok());
    }
}
