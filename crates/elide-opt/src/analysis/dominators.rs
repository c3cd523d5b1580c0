//! Dominator Tree
//!
//! Immediate dominators are computed with the iterative algorithm of Cooper,
//! Harvey and Kennedy over reverse postorder. It converges on any CFG,
//! reducible or not, and yields the unique immediate dominator for every
//! reachable block.
//!
//! Dominance queries are answered in constant time from a preorder numbering
//! of the tree: `a` dominates `b` iff `b`'s preorder number falls inside the
//! interval spanned by `a`'s subtree.

use crate::error::{ElisionError, Result};
use elide_ir::{BlockId, IndexVec, MemoryOpGraph};

#[derive(Debug, Clone, Copy, Default)]
struct DomNode {
    /// Position in reverse postorder; `None` when unreachable.
    rpo: Option<u32>,
    idom: Option<BlockId>,
    depth: u32,
    pre_number: u32,
    /// Largest preorder number in this node's subtree.
    pre_max: u32,
}

/// Dominance relation over the reachable blocks of one graph.
#[derive(Debug, Clone)]
pub struct DominatorTree {
    nodes: IndexVec<BlockId, DomNode>,
    children: IndexVec<BlockId, Vec<BlockId>>,
    rpo: Vec<BlockId>,
}

impl DominatorTree {
    /// Build the tree from the graph's current edges.
    ///
    /// Blocks not reachable from entry are left outside the tree's domain;
    /// queries on them fail with `UnreachableBlock`.
    pub fn compute(graph: &MemoryOpGraph) -> Self {
        let block_count = graph.blocks().len();
        let mut nodes = IndexVec::from_elem_n(DomNode::default(), block_count);
        let mut children = IndexVec::from_elem_n(Vec::new(), block_count);
        let rpo = graph.reverse_postorder();

        let entry = match rpo.first() {
            Some(&entry) => entry,
            None => {
                return Self {
                    nodes,
                    children,
                    rpo,
                }
            },
        };

        for (i, &block) in rpo.iter().enumerate() {
            nodes[block].rpo = Some(i as u32);
        }

        // The entry temporarily names itself so `intersect` can stop there.
        nodes[entry].idom = Some(entry);

        let mut changed = true;
        let mut rounds = 0;
        while changed {
            changed = false;
            rounds += 1;

            for &block in rpo.iter().skip(1) {
                let mut new_idom: Option<BlockId> = None;

                for &pred in &graph.blocks()[block].preds {
                    if nodes[pred].idom.is_none() {
                        continue;
                    }
                    new_idom = Some(match new_idom {
                        None => pred,
                        Some(current) => intersect(&nodes, pred, current),
                    });
                }

                if new_idom.is_some() && nodes[block].idom != new_idom {
                    nodes[block].idom = new_idom;
                    changed = true;
                }
            }
        }
        log::trace!(
            "dominators for {} converged after {} rounds",
            graph.name(),
            rounds
        );

        nodes[entry].idom = None;

        for &block in rpo.iter().skip(1) {
            if let Some(idom) = nodes[block].idom {
                children[idom].push(block);
            }
        }

        let mut tree = Self {
            nodes,
            children,
            rpo,
        };
        tree.number_preorder(entry);
        tree
    }

    fn number_preorder(&mut self, entry: BlockId) {
        let mut counter = 0u32;
        // (block, whether its children have been pushed)
        let mut stack = vec![(entry, false)];

        while let Some((block, expanded)) = stack.pop() {
            if expanded {
                let pre_max = self.children[block]
                    .iter()
                    .map(|child| self.nodes[*child].pre_max)
                    .max()
                    .unwrap_or(self.nodes[block].pre_number);
                self.nodes[block].pre_max = pre_max;
                continue;
            }

            counter += 1;
            let depth = self.nodes[block]
                .idom
                .map(|idom| self.nodes[idom].depth + 1)
                .unwrap_or(0);
            let node = &mut self.nodes[block];
            node.pre_number = counter;
            node.pre_max = counter;
            node.depth = depth;

            stack.push((block, true));
            for &child in self.children[block].iter().rev() {
                stack.push((child, false));
            }
        }
    }

    fn node(&self, block: BlockId) -> Result<&DomNode> {
        match self.nodes.get(block) {
            Some(node) if node.rpo.is_some() => Ok(node),
            _ => Err(ElisionError::UnreachableBlock { block }),
        }
    }

    /// Whether `block` is inside the tree's domain.
    pub fn contains(&self, block: BlockId) -> bool {
        self.node(block).is_ok()
    }

    /// Immediate dominator; `None` for the entry block.
    pub fn idom(&self, block: BlockId) -> Result<Option<BlockId>> {
        Ok(self.node(block)?.idom)
    }

    /// Depth in the tree; the entry block has depth 0.
    pub fn depth(&self, block: BlockId) -> Result<u32> {
        Ok(self.node(block)?.depth)
    }

    /// Whether `a` dominates `b`. Every block dominates itself.
    pub fn dominates(&self, a: BlockId, b: BlockId) -> Result<bool> {
        let na = self.node(a)?;
        let nb = self.node(b)?;
        Ok(na.pre_number <= nb.pre_number && na.pre_max >= nb.pre_max)
    }

    /// Whether `a` dominates `b` and `a != b`.
    pub fn strictly_dominates(&self, a: BlockId, b: BlockId) -> Result<bool> {
        Ok(a != b && self.dominates(a, b)?)
    }

    /// Blocks immediately dominated by `block`.
    pub fn children(&self, block: BlockId) -> Result<&[BlockId]> {
        self.node(block)?;
        Ok(&self.children[block])
    }

    /// Chain of dominators from `block` up to the entry, `block` first.
    pub fn dominators(&self, block: BlockId) -> Result<Vec<BlockId>> {
        let mut chain = vec![block];
        let mut current = self.idom(block)?;
        while let Some(idom) = current {
            chain.push(idom);
            current = self.nodes[idom].idom;
        }
        Ok(chain)
    }

    /// Reachable blocks in reverse postorder.
    pub fn reverse_postorder(&self) -> &[BlockId] {
        &self.rpo
    }
}

/// Walk two fingers up the partially built tree until they meet.
fn intersect(nodes: &IndexVec<BlockId, DomNode>, mut a: BlockId, mut b: BlockId) -> BlockId {
    let rpo = |block: BlockId| nodes[block].rpo.unwrap_or(u32::MAX);

    while a != b {
        while rpo(a) > rpo(b) {
            a = match nodes[a].idom {
                Some(idom) => idom,
                None => return b,
            };
        }
        while rpo(b) > rpo(a) {
            b = match nodes[b].idom {
                Some(idom) => idom,
                None => return a,
            };
        }
    }
    a
}
