//! Blind trie：对共享前缀的一小组后缀排序。
//!
//! 内部节点只记录分支深度和一个代表后缀，边上的字符在需要时从编码序列中
//! 随机读取。节点保存在预先分配的 arena 中，插入与遍历都不递归。

use std::cmp::Ordering;

use crate::alphabet::{is_special, SEPARATOR};
use crate::encseq::{EncodedSequence, Readmode};

#[derive(Debug, Clone, Copy, Default)]
struct Node {
    startpos: usize,
    depth: usize,
    firstchild: Option<usize>,
    rightsibling: Option<usize>,
}

impl Node {
    #[inline]
    fn is_leaf(&self) -> bool {
        self.firstchild.is_none()
    }
}

/// 两个边字符的比较：special 之间按所在后缀的起点比较
#[inline]
fn compare_characters(cc1: u8, idx1: usize, cc2: u8, idx2: usize) -> Ordering {
    match (is_special(cc1), is_special(cc2)) {
        (true, true) => {
            if idx1 <= idx2 {
                Ordering::Less
            } else {
                Ordering::Greater
            }
        }
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => cc1.cmp(&cc2),
    }
}

pub struct BlindTrie<'a> {
    encseq: &'a EncodedSequence,
    readmode: Readmode,
    totallength: usize,
    nodes: Vec<Node>,
    capacity: usize,
    root: Option<usize>,
    stack: Vec<usize>,
}

impl<'a> BlindTrie<'a> {
    /// 可容纳 `numofsuffixes` 个后缀的 trie
    pub fn new(encseq: &'a EncodedSequence, readmode: Readmode, numofsuffixes: usize) -> Self {
        let capacity = 2 * (numofsuffixes + 1) + 1;
        Self {
            encseq,
            readmode,
            totallength: encseq.total_length(),
            nodes: Vec::with_capacity(capacity),
            capacity,
            root: None,
            stack: Vec::new(),
        }
    }

    fn reset(&mut self, numofsuffixes: usize) {
        self.nodes.clear();
        self.root = None;
        let needed = 2 * (numofsuffixes + 1) + 1;
        if needed > self.capacity {
            self.nodes.reserve(needed);
            self.capacity = needed;
        }
    }

    fn new_node(&mut self, node: Node) -> usize {
        debug_assert!(self.nodes.len() < self.capacity);
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    fn new_leaf(&mut self, startpos: usize) -> usize {
        self.new_node(Node {
            startpos,
            ..Node::default()
        })
    }

    #[inline]
    fn char_at(&self, pos: usize) -> u8 {
        if pos >= self.totallength {
            SEPARATOR
        } else {
            self.encseq.get(pos, self.readmode)
        }
    }

    fn first_edge_char(&self, node: usize, prevdepth: usize) -> u8 {
        self.char_at(self.nodes[node].startpos + prevdepth)
    }

    /// 从 `start1`、`start2` 起的最长公共前缀，遇到 special 或越过 `end` 时停止
    fn lcp(&self, start1: usize, start2: usize, end2: usize) -> usize {
        let end1 = self.totallength;
        let (mut idx1, mut idx2) = (start1, start2);
        while idx1 < end1 && idx2 < end2 {
            let cc1 = self.encseq.get(idx1, self.readmode);
            if is_special(cc1) {
                break;
            }
            let cc2 = self.encseq.get(idx2, self.readmode);
            if is_special(cc2) || cc1 != cc2 {
                break;
            }
            idx1 += 1;
            idx2 += 1;
        }
        idx1 - start1
    }

    fn make_root(&mut self, startpos: usize) {
        let leaf = self.new_leaf(startpos);
        let root = self.new_node(Node {
            startpos,
            depth: 0,
            firstchild: Some(leaf),
            rightsibling: None,
        });
        self.root = Some(root);
    }

    /// 新建分支节点替代 `oldnode`，其两个孩子为 `oldnode` 和新叶子
    fn make_new_branch(&mut self, startpos: usize, currentdepth: usize, oldnode: usize) -> usize {
        let newleaf = self.new_leaf(startpos);
        let cc1 = self.first_edge_char(oldnode, currentdepth);
        let cc2 = self.char_at(startpos + currentdepth);
        let (first, second) = if compare_characters(cc1, self.nodes[oldnode].startpos, cc2, startpos) != Ordering::Greater {
            (oldnode, newleaf)
        } else {
            (newleaf, oldnode)
        };
        let rightsibling = self.nodes[oldnode].rightsibling;
        self.nodes[second].rightsibling = None;
        self.nodes[first].rightsibling = Some(second);
        self.new_node(Node {
            startpos,
            depth: currentdepth,
            firstchild: Some(first),
            rightsibling,
        })
    }

    /// 在 `node` 的孩子中查找首字符为 `cc2` 的一个；返回（前驱，当前）
    fn find_successor(&self, node: usize, cc2: u8, startpos2: usize) -> (Option<usize>, Option<usize>, bool) {
        let depth = self.nodes[node].depth;
        let mut previous = None;
        let mut current = self.nodes[node].firstchild;
        while let Some(child) = current {
            let cc1 = self.first_edge_char(child, depth);
            match compare_characters(cc1, self.nodes[child].startpos, cc2, startpos2) {
                Ordering::Greater => return (previous, current, false),
                Ordering::Equal => return (previous, current, true),
                Ordering::Less => {}
            }
            previous = current;
            current = self.nodes[child].rightsibling;
        }
        (previous, None, false)
    }

    fn link(&mut self, parent: usize, previous: Option<usize>, node: usize) {
        match previous {
            None => self.nodes[parent].firstchild = Some(node),
            Some(prev) => self.nodes[prev].rightsibling = Some(node),
        }
    }

    pub fn insert(&mut self, startpos: usize) {
        let Some(root) = self.root else {
            self.make_root(startpos);
            return;
        };
        let mut currentnode = root;
        loop {
            let depth = self.nodes[currentnode].depth;
            let cc = self.char_at(startpos + depth);
            debug_assert!(!self.nodes[currentnode].is_leaf());
            let (previous, current, found) = self.find_successor(currentnode, cc, startpos);
            let succ = match (found, current) {
                (true, Some(succ)) => succ,
                _ => {
                    let newleaf = self.new_leaf(startpos);
                    self.nodes[newleaf].rightsibling = current;
                    self.link(currentnode, previous, newleaf);
                    return;
                }
            };
            let succstart = self.nodes[succ].startpos;
            if self.nodes[succ].is_leaf() {
                let lcpvalue = self.lcp(startpos + depth + 1, succstart + depth + 1, self.totallength);
                let newbranch = self.make_new_branch(startpos, depth + lcpvalue + 1, succ);
                self.link(currentnode, previous, newbranch);
                return;
            }
            let succdepth = self.nodes[succ].depth;
            let lcpvalue = self.lcp(startpos + depth + 1, succstart + depth + 1, succstart + succdepth);
            if depth + lcpvalue + 1 < succdepth {
                let newbranch = self.make_new_branch(startpos, depth + lcpvalue + 1, succ);
                self.link(currentnode, previous, newbranch);
                return;
            }
            currentnode = succ;
        }
    }

    /// 按字典序输出叶子。`lcps[i]`（`i >= 1`）为第 `i-1` 与第 `i` 个后缀的 lcp。
    fn enumerate_leaves(&mut self, suffixes: &mut [usize], mut lcps: Option<&mut [usize]>, depth: usize) {
        let Some(root) = self.root else {
            return;
        };
        self.stack.clear();
        self.stack.push(root);
        let mut nextfree = 0usize;
        let mut readyforpop = false;
        let mut lcpnode = root;
        let mut current = self.nodes[root].firstchild;
        let mut currentisleaf = current.is_some_and(|c| self.nodes[c].is_leaf());

        loop {
            if currentisleaf {
                let Some(leaf) = current else { break };
                let node = self.nodes[leaf];
                debug_assert!(node.startpos >= depth);
                if nextfree > 0 {
                    if let Some(lcps) = lcps.as_deref_mut() {
                        lcps[nextfree] = self.nodes[lcpnode].depth + depth;
                    }
                }
                suffixes[nextfree] = node.startpos - depth;
                nextfree += 1;
                match node.rightsibling {
                    None => {
                        readyforpop = true;
                        currentisleaf = false;
                    }
                    Some(sibling) => {
                        current = Some(sibling);
                        currentisleaf = self.nodes[sibling].is_leaf();
                        lcpnode = self.stack[self.stack.len() - 1];
                    }
                }
            } else if readyforpop {
                if self.stack.len() == 1 {
                    break;
                }
                let Some(popped) = self.stack.pop() else { break };
                if let Some(sibling) = self.nodes[popped].rightsibling {
                    current = Some(sibling);
                    currentisleaf = self.nodes[sibling].is_leaf();
                    lcpnode = self.stack[self.stack.len() - 1];
                    readyforpop = false;
                }
            } else {
                let Some(node) = current else { break };
                self.stack.push(node);
                current = self.nodes[node].firstchild;
                currentisleaf = current.is_some_and(|c| self.nodes[c].is_leaf());
            }
        }
        debug_assert_eq!(nextfree, suffixes.len());
    }

    /// 对已知前 `depth` 个字符相同的后缀排序
    pub fn sort(&mut self, suffixes: &mut [usize], depth: usize, lcps: Option<&mut [usize]>) {
        self.reset(suffixes.len());
        for &suffix in suffixes.iter() {
            self.insert(suffix + depth);
        }
        self.enumerate_leaves(suffixes, lcps, depth);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alphabet::WILDCARD;
    use crate::index::bentsedg::compare_suffixes;

    fn make_codes(len: usize, seed: u32) -> Vec<u8> {
        let mut x = seed;
        let mut v = Vec::with_capacity(len);
        for _ in 0..len {
            x = x.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            let r = (x >> 16) % 23;
            v.push(match r {
                0 => WILDCARD,
                1 => SEPARATOR,
                _ => (r % 4) as u8,
            });
        }
        v
    }

    #[test]
    fn blindtrie_matches_comparison_sort() {
        for seed in 1..6 {
            let codes = make_codes(300, seed);
            let encseq = EncodedSequence::encode(&codes, 4).unwrap();
            let mut suffixes: Vec<usize> = (0..=codes.len()).collect();
            let mut expected = suffixes.clone();
            expected.sort_by(|&a, &b| compare_suffixes(&encseq, Readmode::Forward, a, b, 0).0);

            let mut trie = BlindTrie::new(&encseq, Readmode::Forward, suffixes.len());
            let mut lcps = vec![0usize; suffixes.len()];
            trie.sort(&mut suffixes, 0, Some(&mut lcps));
            assert_eq!(suffixes, expected, "seed {}", seed);
            for i in 1..suffixes.len() {
                let (_, lcp) = compare_suffixes(&encseq, Readmode::Forward, suffixes[i - 1], suffixes[i], 0);
                assert_eq!(lcps[i], lcp, "seed {} index {}", seed, i);
            }
        }
    }

    #[test]
    fn blindtrie_with_common_prefix_depth() {
        // 所有以 "ac" 开头的后缀
        let codes = vec![0, 1, 0, 1, 2, 0, 1, 3, 0, 1, 0, 1, 2, 0, 1];
        let encseq = EncodedSequence::encode(&codes, 4).unwrap();
        let mut suffixes: Vec<usize> = (0..codes.len() - 1).filter(|&i| codes[i] == 0 && codes[i + 1] == 1).collect();
        let mut expected = suffixes.clone();
        expected.sort_by(|&a, &b| compare_suffixes(&encseq, Readmode::Forward, a, b, 2).0);
        let mut trie = BlindTrie::new(&encseq, Readmode::Forward, suffixes.len());
        trie.sort(&mut suffixes, 2, None);
        assert_eq!(suffixes, expected);
    }
}
