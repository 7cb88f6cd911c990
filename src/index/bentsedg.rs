//! 桶内后缀排序：Bentley–Sedgewick 三路快排，小区间改用插入排序或 blind trie。

use std::cmp::Ordering;

use crate::alphabet::{is_special, SPECIAL_OFFSET};
use crate::encseq::{EncodedSequence, Readmode};
use crate::index::blindtrie::BlindTrie;
use crate::index::options::SfxStrategy;

/// 位置 `pos` 处字符的排序键。
///
/// 真实字符取其编码；special 与序列末尾取 `pos + SPECIAL_OFFSET`，
/// 因此它们互不相等且大于任何真实字符，末尾最大。
#[inline]
pub fn symbol_key(encseq: &EncodedSequence, readmode: Readmode, pos: usize) -> usize {
    if pos >= encseq.total_length() {
        return encseq.total_length() + SPECIAL_OFFSET;
    }
    let cc = encseq.get(pos, readmode);
    if is_special(cc) {
        pos + SPECIAL_OFFSET
    } else {
        cc as usize
    }
}

/// 从偏移 `depth` 起比较两个后缀，返回顺序与最长公共前缀（含 `depth`）。
pub fn compare_suffixes(encseq: &EncodedSequence, readmode: Readmode, a: usize, b: usize, depth: usize) -> (Ordering, usize) {
    if a == b {
        return (Ordering::Equal, encseq.total_length() - a);
    }
    let mut offset = depth;
    loop {
        let ka = symbol_key(encseq, readmode, a + offset);
        let kb = symbol_key(encseq, readmode, b + offset);
        if ka != kb {
            return (ka.cmp(&kb), offset);
        }
        offset += 1;
    }
}

/// 后缀 `pos` 的前 `prefixlength` 个字符中第一个 special（或末尾）的偏移
pub fn first_special_offset(encseq: &EncodedSequence, readmode: Readmode, pos: usize, prefixlength: usize) -> usize {
    (0..prefixlength)
        .find(|&k| pos + k >= encseq.total_length() || encseq.is_special_at(pos + k, readmode))
        .unwrap_or(prefixlength)
}

struct Interval {
    left: usize,
    right: usize,
    depth: usize,
}

pub struct BentSedgSorter<'a> {
    encseq: &'a EncodedSequence,
    readmode: Readmode,
    strategy: SfxStrategy,
    stack: Vec<Interval>,
    trie: Option<BlindTrie<'a>>,
}

impl<'a> BentSedgSorter<'a> {
    pub fn new(encseq: &'a EncodedSequence, readmode: Readmode, strategy: SfxStrategy) -> Self {
        let trie = (strategy.max_bltrie_sort > 0).then(|| BlindTrie::new(encseq, readmode, strategy.max_bltrie_sort));
        Self {
            encseq,
            readmode,
            strategy,
            stack: Vec::new(),
            trie,
        }
    }

    #[inline]
    fn key(&self, suffixes: &[usize], idx: usize, depth: usize) -> usize {
        symbol_key(self.encseq, self.readmode, suffixes[idx] + depth)
    }

    fn insertion_sort(&self, suffixes: &mut [usize], depth: usize) {
        for i in 1..suffixes.len() {
            let mut j = i;
            while j > 0 && compare_suffixes(self.encseq, self.readmode, suffixes[j - 1], suffixes[j], depth).0 == Ordering::Greater {
                suffixes.swap(j - 1, j);
                j -= 1;
            }
        }
    }

    fn med3(&self, suffixes: &[usize], a: usize, b: usize, c: usize, depth: usize) -> usize {
        let (ka, kb, kc) = (self.key(suffixes, a, depth), self.key(suffixes, b, depth), self.key(suffixes, c, depth));
        if ka < kb {
            if kb < kc {
                b
            } else if ka < kc {
                c
            } else {
                a
            }
        } else if kb > kc {
            b
        } else if ka < kc {
            a
        } else {
            c
        }
    }

    fn select_pivot(&self, suffixes: &[usize], left: usize, right: usize, depth: usize) -> usize {
        let width = right - left;
        let last = right - 1;
        let mid = left + width / 2;
        if width > 30 {
            let step = width / 8;
            let pl = self.med3(suffixes, left, left + step, left + 2 * step, depth);
            let pm = self.med3(suffixes, mid - step, mid, mid + step, depth);
            let pr = self.med3(suffixes, last - 2 * step, last - step, last, depth);
            self.med3(suffixes, pl, pm, pr, depth)
        } else {
            self.med3(suffixes, left, mid, last, depth)
        }
    }

    fn vecswap(suffixes: &mut [usize], a: usize, b: usize, n: usize) {
        for i in 0..n {
            suffixes.swap(a + i, b + i);
        }
    }

    /// 对 `suffixes` 排序，已知它们的前 `depth` 个字符相同且都是真实字符。
    pub fn sort(&mut self, suffixes: &mut [usize], depth: usize) {
        self.stack.clear();
        self.stack.push(Interval {
            left: 0,
            right: suffixes.len(),
            depth,
        });
        while let Some(Interval { left, right, depth }) = self.stack.pop() {
            let width = right - left;
            if width <= 1 {
                continue;
            }
            if width <= self.strategy.max_insertion_sort {
                self.insertion_sort(&mut suffixes[left..right], depth);
                continue;
            }
            if width <= self.strategy.max_bltrie_sort {
                if let Some(trie) = self.trie.as_mut() {
                    trie.sort(&mut suffixes[left..right], depth, None);
                    continue;
                }
            }
            self.partition(suffixes, left, right, depth);
        }
    }

    /// 三路划分，把小于、等于（深度加一）、大于三部分压栈
    fn partition(&mut self, suffixes: &mut [usize], left: usize, right: usize, depth: usize) {
        let pivotidx = self.select_pivot(suffixes, left, right, depth);
        suffixes.swap(left, pivotidx);
        let pivot = self.key(suffixes, left, depth);

        let (mut a, mut b) = (left + 1, left + 1);
        let (mut c, mut d) = (right - 1, right - 1);
        loop {
            while b <= c {
                let k = self.key(suffixes, b, depth);
                if k > pivot {
                    break;
                }
                if k == pivot {
                    suffixes.swap(a, b);
                    a += 1;
                }
                b += 1;
            }
            while b <= c {
                let k = self.key(suffixes, c, depth);
                if k < pivot {
                    break;
                }
                if k == pivot {
                    suffixes.swap(c, d);
                    d -= 1;
                }
                c -= 1;
            }
            if b > c {
                break;
            }
            suffixes.swap(b, c);
            b += 1;
            c -= 1;
        }

        // 把两端的相等块换到中间
        let s = (a - left).min(b - a);
        Self::vecswap(suffixes, left, b - s, s);
        let s = (d - c).min(right - 1 - d);
        Self::vecswap(suffixes, b, right - s, s);

        let lesswidth = b - a;
        let greaterwidth = d - c;
        if greaterwidth > 1 {
            self.stack.push(Interval {
                left: right - greaterwidth,
                right,
                depth,
            });
        }
        if pivot < SPECIAL_OFFSET {
            self.stack.push(Interval {
                left: left + lesswidth,
                right: right - greaterwidth,
                depth: depth + 1,
            });
        }
        if lesswidth > 1 {
            self.stack.push(Interval {
                left,
                right: left + lesswidth,
                depth,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alphabet::{SEPARATOR, WILDCARD};

    fn make_codes(len: usize, seed: u32, alphabet: u32) -> Vec<u8> {
        let mut x = seed;
        let mut v = Vec::with_capacity(len);
        for _ in 0..len {
            x = x.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            let r = (x >> 16) % 41;
            v.push(match r {
                0 => WILDCARD,
                1 => SEPARATOR,
                _ => (r % alphabet) as u8,
            });
        }
        v
    }

    fn naive_order(encseq: &EncodedSequence, suffixes: &[usize]) -> Vec<usize> {
        let mut expected = suffixes.to_vec();
        expected.sort_by(|&a, &b| compare_suffixes(encseq, Readmode::Forward, a, b, 0).0);
        expected
    }

    #[test]
    fn symbol_keys_order_specials_last() {
        let codes = vec![3, WILDCARD, 0, SEPARATOR];
        let encseq = EncodedSequence::encode(&codes, 4).unwrap();
        let keys: Vec<usize> = (0..=4).map(|p| symbol_key(&encseq, Readmode::Forward, p)).collect();
        assert_eq!(keys, vec![3, 1 + SPECIAL_OFFSET, 0, 3 + SPECIAL_OFFSET, 4 + SPECIAL_OFFSET]);
        assert_eq!(compare_suffixes(&encseq, Readmode::Forward, 1, 3, 0), (Ordering::Less, 0));
        assert_eq!(first_special_offset(&encseq, Readmode::Forward, 0, 3), 1);
        assert_eq!(first_special_offset(&encseq, Readmode::Forward, 2, 3), 1);
    }

    #[test]
    fn quicksort_insertion_and_trie_agree() {
        let strategies = [
            SfxStrategy::default(),
            SfxStrategy {
                max_insertion_sort: 1,
                max_bltrie_sort: 0,
            },
            SfxStrategy {
                max_insertion_sort: 100_000,
                max_bltrie_sort: 0,
            },
            SfxStrategy {
                max_insertion_sort: 2,
                max_bltrie_sort: 100_000,
            },
        ];
        for seed in 1..4 {
            for alphabet in [2, 4] {
                let codes = make_codes(500, seed, alphabet);
                let encseq = EncodedSequence::encode(&codes, 4).unwrap();
                let all: Vec<usize> = (0..=codes.len()).collect();
                let expected = naive_order(&encseq, &all);
                for strategy in strategies {
                    let mut suffixes = all.clone();
                    BentSedgSorter::new(&encseq, Readmode::Forward, strategy).sort(&mut suffixes, 0);
                    assert_eq!(suffixes, expected, "seed {} alphabet {} {:?}", seed, alphabet, strategy);
                }
            }
        }
    }

    #[test]
    fn sort_from_depth_on_repetitive_text() {
        let codes: Vec<u8> = (0..400).map(|i| if i % 50 == 49 { WILDCARD } else { (i % 2) as u8 }).collect();
        let encseq = EncodedSequence::encode(&codes, 4).unwrap();
        // 以 "01" 开头的后缀
        let mut suffixes: Vec<usize> = (0..codes.len() - 1).filter(|&i| codes[i] == 0 && codes[i + 1] == 1).collect();
        let expected = naive_order(&encseq, &suffixes);
        let strategy = SfxStrategy {
            max_insertion_sort: 4,
            max_bltrie_sort: 0,
        };
        BentSedgSorter::new(&encseq, Readmode::Forward, strategy).sort(&mut suffixes, 2);
        assert_eq!(suffixes, expected);
    }
}
