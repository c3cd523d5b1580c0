//! Basic blocks.

use crate::idx::Idx;
use crate::location::ValueId;
use crate::op::OpId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Block ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockId(pub u32);

impl Idx for BlockId {
    fn from_usize(idx: usize) -> Self {
        BlockId(idx as u32)
    }
    fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bb{}", self.0)
    }
}

/// Point where the collector may run concurrently with compiled code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SafepointKind {
    Call,
    Poll,
}

/// One entry in a block's straight-line body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Node {
    Access(OpId),
    Safepoint(SafepointKind),
    /// Allocation of a fresh object; also a safepoint.
    Allocate(ValueId),
}

impl Node {
    pub fn is_safepoint(&self) -> bool {
        matches!(self, Node::Safepoint(_) | Node::Allocate(_))
    }
}

/// Basic Block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicBlock {
    pub id: BlockId,
    pub nodes: Vec<Node>,
    pub preds: Vec<BlockId>,
    pub succs: Vec<BlockId>,
}

impl BasicBlock {
    pub(crate) fn new(id: BlockId) -> Self {
        Self {
            id,
            nodes: Vec::new(),
            preds: Vec::new(),
            succs: Vec::new(),
        }
    }

    /// Ops of this block in program order.
    pub fn ops(&self) -> impl Iterator<Item = OpId> + '_ {
        self.nodes.iter().filter_map(|node| match node {
            Node::Access(op) => Some(*op),
            _ => None,
        })
    }

    pub fn has_safepoint(&self) -> bool {
        self.nodes.iter().any(Node::is_safepoint)
    }
}
