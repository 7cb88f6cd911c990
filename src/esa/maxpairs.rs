//! 极大重复对：长度不小于 `searchlength`、左右都不能再延伸的重复 `(len, pos1, pos2)`。
//!
//! 在虚拟后缀树上自底向上合并，每个区间按左邻字符维护叶子位置列表。
//! 同一区间的不同子区间保证右极大，左邻字符不同（或为 special、序列开头）
//! 保证左极大。列表存放在按字符共享的数组中，一个子树的位置总是连续的一段。

use crate::alphabet::is_special;
use crate::encseq::{EncodedSequence, Readmode};
use crate::error::{ConfigError, Result};
use crate::esa::dfs::{traverse, DfsVisitor};
use crate::esa::reader::SequentialSuffixArrayReader;

/// 区间内所有叶子的左邻字符
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CommonChar {
    Real(u8),
    /// special 字符或序列开头，与任何位置都左极大
    Unique,
    Diverse,
}

impl CommonChar {
    fn merge(self, other: CommonChar) -> CommonChar {
        match (self, other) {
            (CommonChar::Real(a), CommonChar::Real(b)) if a == b => self,
            _ => CommonChar::Diverse,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct ListRange {
    start: usize,
    length: usize,
}

pub struct NodeInfo {
    commonchar: CommonChar,
    unique: ListRange,
    poslists: Vec<ListRange>,
}

struct Maxpairs<'a, F> {
    encseq: &'a EncodedSequence,
    readmode: Readmode,
    searchlength: usize,
    alphabetsize: usize,
    depth: usize,
    initialized: bool,
    uniquechar: Vec<usize>,
    poslist: Vec<Vec<usize>>,
    process: F,
}

impl<'a, F> Maxpairs<'a, F>
where
    F: FnMut(usize, usize, usize) -> Result<()>,
{
    fn left_char(&self, leafnumber: usize) -> CommonChar {
        if leafnumber == 0 {
            return CommonChar::Unique;
        }
        let cc = self.encseq.get(leafnumber - 1, self.readmode);
        if is_special(cc) {
            CommonChar::Unique
        } else {
            CommonChar::Real(cc)
        }
    }

    fn reset_lists(&mut self) {
        if !self.initialized {
            for list in self.poslist.iter_mut() {
                list.clear();
            }
            self.uniquechar.clear();
            self.initialized = true;
        }
    }

    fn add_to_lists(&mut self, info: &mut NodeInfo, leftchar: CommonChar, leafnumber: usize) {
        match leftchar {
            CommonChar::Real(base) => {
                self.poslist[base as usize].push(leafnumber);
                info.poslists[base as usize].length += 1;
            }
            _ => {
                self.uniquechar.push(leafnumber);
                info.unique.length += 1;
            }
        }
    }

    fn list(&self, info: &NodeInfo, base: usize) -> &[usize] {
        let range = info.poslists[base];
        &self.poslist[base][range.start..range.start + range.length]
    }

    fn unique_list(&self, info: &NodeInfo) -> &[usize] {
        &self.uniquechar[info.unique.start..info.unique.start + info.unique.length]
    }

    fn report(&mut self, pos1: usize, pos2: usize) -> Result<()> {
        (self.process)(self.depth, pos1, pos2)
    }

    fn cartesian_with_leaf(&mut self, info: &NodeInfo, base: usize, leafnumber: usize) -> Result<()> {
        let range = info.poslists[base];
        for idx in range.start..range.start + range.length {
            let pos = self.poslist[base][idx];
            self.report(leafnumber, pos)?;
        }
        Ok(())
    }
}

impl<'a, F> DfsVisitor for Maxpairs<'a, F>
where
    F: FnMut(usize, usize, usize) -> Result<()>,
{
    type Info = NodeInfo;

    fn alloc_info(&mut self) -> NodeInfo {
        NodeInfo {
            commonchar: CommonChar::Diverse,
            unique: ListRange::default(),
            poslists: vec![ListRange::default(); self.alphabetsize],
        }
    }

    fn process_leaf_edge(&mut self, firstsucc: bool, fatherdepth: usize, father: &mut NodeInfo, leafnumber: usize) -> Result<()> {
        if fatherdepth < self.searchlength {
            self.reset_lists();
            return Ok(());
        }
        let leftchar = self.left_char(leafnumber);
        self.initialized = false;
        self.depth = fatherdepth;
        if firstsucc {
            father.commonchar = leftchar;
            father.unique = ListRange {
                start: self.uniquechar.len(),
                length: 0,
            };
            for (base, range) in father.poslists.iter_mut().enumerate() {
                *range = ListRange {
                    start: self.poslist[base].len(),
                    length: 0,
                };
            }
            self.add_to_lists(father, leftchar, leafnumber);
            return Ok(());
        }
        if father.commonchar != CommonChar::Diverse {
            father.commonchar = father.commonchar.merge(leftchar);
        }
        if father.commonchar == CommonChar::Diverse {
            for base in 0..self.alphabetsize {
                if leftchar != CommonChar::Real(base as u8) {
                    self.cartesian_with_leaf(father, base, leafnumber)?;
                }
            }
            for idx in father.unique.start..father.unique.start + father.unique.length {
                let pos = self.uniquechar[idx];
                self.report(leafnumber, pos)?;
            }
        }
        self.add_to_lists(father, leftchar, leafnumber);
        Ok(())
    }

    fn process_branch_edge(&mut self, firstsucc: bool, fatherdepth: usize, father: &mut NodeInfo, son: Option<&NodeInfo>) -> Result<()> {
        if fatherdepth < self.searchlength {
            self.reset_lists();
            return Ok(());
        }
        self.initialized = false;
        self.depth = fatherdepth;
        let Some(son) = son else {
            return Ok(());
        };
        debug_assert!(!firstsucc);
        if father.commonchar != CommonChar::Diverse {
            father.commonchar = father.commonchar.merge(son.commonchar);
        }
        if father.commonchar == CommonChar::Diverse {
            let mut pairs = Vec::new();
            for chfather in 0..self.alphabetsize {
                let fatherlist = self.list(father, chfather);
                for chson in (0..self.alphabetsize).filter(|&c| c != chfather) {
                    for &p1 in fatherlist {
                        pairs.extend(self.list(son, chson).iter().map(|&p2| (p1, p2)));
                    }
                }
                for &p2 in self.unique_list(son) {
                    pairs.extend(fatherlist.iter().map(|&p1| (p2, p1)));
                }
            }
            for &p1 in self.unique_list(father) {
                for chson in 0..self.alphabetsize {
                    pairs.extend(self.list(son, chson).iter().map(|&p2| (p1, p2)));
                }
                pairs.extend(self.unique_list(son).iter().map(|&p2| (p1, p2)));
            }
            for (p1, p2) in pairs {
                self.report(p1, p2)?;
            }
        }
        for base in 0..self.alphabetsize {
            father.poslists[base].length += son.poslists[base].length;
        }
        father.unique.length += son.unique.length;
        Ok(())
    }
}

/// 枚举所有长度不小于 `searchlength` 的极大重复对，`process(len, pos1, pos2)`
pub fn enumerate_maxpairs<F>(ssar: &mut SequentialSuffixArrayReader<'_>, searchlength: usize, process: F) -> Result<()>
where
    F: FnMut(usize, usize, usize) -> Result<()>,
{
    if searchlength == 0 {
        return Err(ConfigError::Other("minimal length of maximal pairs must be positive".into()).into());
    }
    let readmode = ssar.readmode();
    let encseq: &EncodedSequence = &ssar.encseq;
    let alphabetsize = encseq.num_of_chars() as usize;
    let mut state = Maxpairs {
        encseq,
        readmode,
        searchlength,
        alphabetsize,
        depth: 0,
        initialized: false,
        uniquechar: Vec::new(),
        poslist: vec![Vec::new(); alphabetsize],
        process,
    };
    traverse(&mut ssar.cursor, &mut state)
}
