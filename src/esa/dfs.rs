//! 自底向上遍历虚拟后缀树。
//!
//! 只需顺序读取 `suftab` 与 `lcptab`：用显式栈维护当前路径上的 lcp 区间，
//! 每读入一对 `(后缀, 下一个 lcp)` 就把叶子挂到栈顶或新区间上，并弹出
//! 所有深度大于该 lcp 的区间。访问者通过 [`DfsVisitor`] 获得各事件。

use crate::error::{FormatError, Result};
use crate::esa::reader::{SequentialSuffixArrayReader, TableCursor};
use crate::esa::LcpInterval;

/// 遍历事件的接收者。
///
/// 每个区间有一个 `Info`；新区间若继承了刚弹出的子区间，会直接沿用该子区间的
/// `Info`，此时 `process_branch_edge` 以 `firstsucc == true` 且 `son == None` 调用。
/// 根的第一条边若是分支边，则 `firstsucc == true` 且 `son` 为该子区间。
pub trait DfsVisitor {
    type Info;

    fn alloc_info(&mut self) -> Self::Info;

    fn process_leaf_edge(&mut self, firstsucc: bool, fatherdepth: usize, father: &mut Self::Info, leafnumber: usize) -> Result<()>;

    fn process_branch_edge(
        &mut self,
        firstsucc: bool,
        fatherdepth: usize,
        father: &mut Self::Info,
        son: Option<&Self::Info>,
    ) -> Result<()>;

    fn process_complete_node(&mut self, _info: &mut Self::Info, _interval: LcpInterval) -> Result<()> {
        Ok(())
    }

    fn assign_leftmost_leaf(&mut self, _info: &mut Self::Info, _leftbound: usize) {}

    fn assign_rightmost_leaf(&mut self, _info: &mut Self::Info, _rightbound: usize, _lastsuffix: usize, _nextlcp: usize) {}
}

struct Frame<I> {
    depth: usize,
    leftbound: usize,
    info: I,
}

/// 深度优先遍历 `ssar` 的全部 lcp 区间
pub fn depth_first_esa<V: DfsVisitor>(ssar: &mut SequentialSuffixArrayReader<'_>, visitor: &mut V) -> Result<()> {
    traverse(&mut ssar.cursor, visitor)
}

pub(crate) fn traverse<V: DfsVisitor>(cursor: &mut TableCursor<'_>, visitor: &mut V) -> Result<()> {
    let mut pool: Vec<V::Info> = Vec::new();
    let mut root = visitor.alloc_info();
    visitor.assign_leftmost_leaf(&mut root, 0);
    let mut stack = vec![Frame {
        depth: 0,
        leftbound: 0,
        info: root,
    }];
    let mut firstrootedge = true;
    let mut index = 0usize;

    loop {
        let previoussuffix = cursor
            .next_suffix()?
            .ok_or_else(|| FormatError::Other(format!("suffix table ends at index {} before the lcp table", index)))?;
        let nextlcp = cursor.next_lcp()?;
        let currentlcp = nextlcp.unwrap_or(0);

        let top = stack.len() - 1;
        if currentlcp <= stack[top].depth {
            let firstsucc = top == 0 && firstrootedge;
            if top == 0 {
                firstrootedge = false;
            }
            let frame = &mut stack[top];
            visitor.process_leaf_edge(firstsucc, frame.depth, &mut frame.info, previoussuffix)?;
        }

        let mut lastinterval: Option<Frame<V::Info>> = None;
        while stack.len() > 1 && currentlcp < stack[stack.len() - 1].depth {
            let mut node = stack.pop().ok_or_else(|| FormatError::Other("empty traversal stack".into()))?;
            visitor.assign_rightmost_leaf(&mut node.info, index, previoussuffix, currentlcp);
            visitor.process_complete_node(
                &mut node.info,
                LcpInterval {
                    offset: node.depth,
                    left: node.leftbound,
                    right: index,
                },
            )?;
            let top = stack.len() - 1;
            if currentlcp <= stack[top].depth {
                let firstsucc = top == 0 && firstrootedge;
                if top == 0 {
                    firstrootedge = false;
                }
                let frame = &mut stack[top];
                visitor.process_branch_edge(firstsucc, frame.depth, &mut frame.info, Some(&node.info))?;
                pool.push(node.info);
            } else {
                lastinterval = Some(node);
            }
        }

        if currentlcp > stack[stack.len() - 1].depth {
            let frame = match lastinterval.take() {
                Some(node) => {
                    let mut frame = Frame {
                        depth: currentlcp,
                        leftbound: node.leftbound,
                        info: node.info,
                    };
                    visitor.process_branch_edge(true, currentlcp, &mut frame.info, None)?;
                    frame
                }
                None => {
                    let mut info = pool.pop().unwrap_or_else(|| visitor.alloc_info());
                    visitor.assign_leftmost_leaf(&mut info, index);
                    visitor.process_leaf_edge(true, currentlcp, &mut info, previoussuffix)?;
                    Frame {
                        depth: currentlcp,
                        leftbound: index,
                        info,
                    }
                }
            };
            stack.push(frame);
        }

        if nextlcp.is_none() {
            break;
        }
        index += 1;
    }

    if cursor.next_suffix()?.is_some() {
        return Err(FormatError::Other(format!("lcp table ends at index {} before the suffix table", index)).into());
    }
    debug_assert_eq!(stack.len(), 1);
    let mut root = stack.swap_remove(0);
    visitor.assign_rightmost_leaf(&mut root.info, index, 0, 0);
    visitor.process_complete_node(
        &mut root.info,
        LcpInterval {
            offset: 0,
            left: 0,
            right: index,
        },
    )
}
