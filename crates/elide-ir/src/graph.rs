//! Memory-Op Graph
//!
//! Control-flow graph of one compiled method, reduced to what barrier
//! elision needs: blocks holding ordered memory ops and safepoints, plus the
//! SSA values used as base references. The graph owns every block, op and
//! value for the duration of one compilation.
//!
//! Construction follows a build-then-finalize discipline: the front-end adds
//! blocks, ops and edges, then calls [`MemoryOpGraph::finalize`], which checks
//! the single-entry and reachability invariants. After that the structure is
//! frozen and only per-op annotations may change.

use crate::block::{BasicBlock, BlockId, Node, SafepointKind};
use crate::error::{GraphError, Result};
use crate::idx::IndexVec;
use crate::location::{FieldOffset, LocationKey, ValueId, ValueInfo, ValueOrigin};
use crate::op::{AccessKind, BarrierKind, Decision, MemoryOp, OpId};
use std::fmt;

/// IR of one method as seen by the barrier elision pass.
#[derive(Debug, Clone)]
pub struct MemoryOpGraph {
    name: String,
    blocks: IndexVec<BlockId, BasicBlock>,
    ops: IndexVec<OpId, MemoryOp>,
    values: IndexVec<ValueId, ValueInfo>,
    finalized: bool,
}

impl MemoryOpGraph {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            blocks: IndexVec::new(),
            ops: IndexVec::new(),
            values: IndexVec::new(),
            finalized: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The first block added is the entry block.
    pub fn entry(&self) -> Option<BlockId> {
        if self.blocks.is_empty() {
            None
        } else {
            Some(BlockId(0))
        }
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn blocks(&self) -> &IndexVec<BlockId, BasicBlock> {
        &self.blocks
    }

    pub fn ops(&self) -> &IndexVec<OpId, MemoryOp> {
        &self.ops
    }

    pub fn values(&self) -> &IndexVec<ValueId, ValueInfo> {
        &self.values
    }

    pub fn block(&self, id: BlockId) -> Result<&BasicBlock> {
        self.blocks.get(id).ok_or(GraphError::UnknownBlock(id))
    }

    pub fn op(&self, id: OpId) -> &MemoryOp {
        &self.ops[id]
    }

    pub fn value(&self, id: ValueId) -> Result<&ValueInfo> {
        self.values.get(id).ok_or(GraphError::UnknownValue(id))
    }

    fn ensure_open(&self) -> Result<()> {
        if self.finalized {
            Err(GraphError::AlreadyFinalized)
        } else {
            Ok(())
        }
    }

    fn ensure_block(&self, id: BlockId) -> Result<()> {
        if self.blocks.contains(id) {
            Ok(())
        } else {
            Err(GraphError::UnknownBlock(id))
        }
    }

    fn ensure_value(&self, id: ValueId) -> Result<()> {
        if self.values.contains(id) {
            Ok(())
        } else {
            Err(GraphError::UnknownValue(id))
        }
    }

    fn ensure_key(&self, key: &LocationKey) -> Result<()> {
        self.ensure_value(key.base)?;
        if let FieldOffset::Element(index) = key.offset {
            self.ensure_value(index)?;
        }
        Ok(())
    }

    fn new_value(&mut self, origin: ValueOrigin) -> ValueId {
        let id = self.values.next_index();
        self.values.push(ValueInfo { id, origin })
    }

    pub fn add_block(&mut self) -> Result<BlockId> {
        self.ensure_open()?;
        let id = self.blocks.next_index();
        Ok(self.blocks.push(BasicBlock::new(id)))
    }

    /// Incoming reference argument.
    pub fn add_param(&mut self) -> Result<ValueId> {
        self.ensure_open()?;
        Ok(self.new_value(ValueOrigin::Parameter))
    }

    /// Value with untracked provenance, e.g. a phi.
    pub fn add_merge_value(&mut self) -> Result<ValueId> {
        self.ensure_open()?;
        Ok(self.new_value(ValueOrigin::Merge))
    }

    pub fn add_op(
        &mut self,
        block: BlockId,
        kind: AccessKind,
        key: LocationKey,
        barrier: BarrierKind,
    ) -> Result<OpId> {
        self.ensure_open()?;
        self.ensure_block(block)?;
        self.ensure_key(&key)?;

        let position = self.blocks[block].nodes.len();
        let id = self.ops.next_index();
        self.ops
            .push(MemoryOp::new(id, kind, key, barrier, block, position));
        self.blocks[block].nodes.push(Node::Access(id));
        Ok(id)
    }

    /// Load that produces a reference value usable as a later base.
    pub fn add_load_value(
        &mut self,
        block: BlockId,
        key: LocationKey,
        barrier: BarrierKind,
    ) -> Result<(OpId, ValueId)> {
        let op = self.add_op(block, AccessKind::Load, key, barrier)?;
        let value = self.new_value(ValueOrigin::Loaded(op));
        self.ops[op].defines = Some(value);
        Ok((op, value))
    }

    pub fn add_safepoint(&mut self, block: BlockId, kind: SafepointKind) -> Result<()> {
        self.ensure_open()?;
        self.ensure_block(block)?;
        self.blocks[block].nodes.push(Node::Safepoint(kind));
        Ok(())
    }

    /// Allocation node; defines a fresh object.
    pub fn add_allocation(&mut self, block: BlockId) -> Result<ValueId> {
        self.ensure_open()?;
        self.ensure_block(block)?;
        let value = self.new_value(ValueOrigin::Allocation);
        self.blocks[block].nodes.push(Node::Allocate(value));
        Ok(value)
    }

    /// Add a control-flow edge. Duplicate edges are collapsed.
    pub fn add_edge(&mut self, from: BlockId, to: BlockId) -> Result<()> {
        self.ensure_open()?;
        self.ensure_block(from)?;
        self.ensure_block(to)?;

        if !self.blocks[from].succs.contains(&to) {
            self.blocks[from].succs.push(to);
            self.blocks[to].preds.push(from);
        }
        Ok(())
    }

    /// Validate the single-entry and reachability invariants and freeze the
    /// structure.
    pub fn finalize(&mut self) -> Result<()> {
        self.ensure_open()?;
        let entry = self.entry().ok_or(GraphError::MissingEntry)?;

        if !self.blocks[entry].preds.is_empty() {
            return Err(GraphError::EntryHasPredecessors(entry));
        }

        for (id, block) in self.blocks.iter_enumerated() {
            if id != entry && block.preds.is_empty() {
                return Err(GraphError::NoPredecessors(id));
            }
        }

        let mut reached = IndexVec::<BlockId, bool>::from_elem_n(false, self.blocks.len());
        for id in self.reverse_postorder() {
            reached[id] = true;
        }
        if let Some((id, _)) = reached.iter_enumerated().find(|(_, seen)| !**seen) {
            return Err(GraphError::Unreachable(id));
        }

        self.finalized = true;
        Ok(())
    }

    /// Blocks reachable from entry in reverse postorder.
    ///
    /// Every block appears after all of its predecessors except those reached
    /// through a back edge.
    pub fn reverse_postorder(&self) -> Vec<BlockId> {
        let mut postorder = self.postorder();
        postorder.reverse();
        postorder
    }

    /// Blocks reachable from entry in postorder.
    pub fn postorder(&self) -> Vec<BlockId> {
        let entry = match self.entry() {
            Some(entry) => entry,
            None => return Vec::new(),
        };

        let mut visited = IndexVec::<BlockId, bool>::from_elem_n(false, self.blocks.len());
        let mut order = Vec::with_capacity(self.blocks.len());
        // (block, index of the next successor to visit)
        let mut stack = vec![(entry, 0usize)];
        visited[entry] = true;

        while let Some((block, next)) = stack.pop() {
            let succs = &self.blocks[block].succs;
            if next < succs.len() {
                stack.push((block, next + 1));
                let succ = succs[next];
                if !visited[succ] {
                    visited[succ] = true;
                    stack.push((succ, 0));
                }
            } else {
                order.push(block);
            }
        }

        order
    }

    pub fn annotation(&self, op: OpId) -> Option<Decision> {
        self.ops[op].annotation()
    }

    pub fn annotate(&mut self, op: OpId, decision: Decision) {
        self.ops[op].set_annotation(Some(decision));
    }

    /// Mark every op; used for the all-barriers fallback compilation.
    pub fn annotate_all(&mut self, decision: Decision) {
        for op in self.ops.iter_mut() {
            op.set_annotation(Some(decision));
        }
    }

    pub fn reset_annotations(&mut self) {
        for op in self.ops.iter_mut() {
            op.set_annotation(None);
        }
    }

    pub fn safepoint_count(&self) -> usize {
        self.blocks
            .iter()
            .flat_map(|block| block.nodes.iter())
            .filter(|node| node.is_safepoint())
            .count()
    }
}

impl fmt::Display for MemoryOpGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "method {} {{", self.name)?;
        for block in self.blocks.iter() {
            write!(f, "  {}:", block.id)?;
            if !block.preds.is_empty() {
                let preds: Vec<String> = block.preds.iter().map(|p| p.to_string()).collect();
                write!(f, "  ; preds {}", preds.join(", "))?;
            }
            writeln!(f)?;
            for node in &block.nodes {
                match node {
                    Node::Access(op) => writeln!(f, "    {}", self.ops[*op])?,
                    Node::Safepoint(SafepointKind::Call) => writeln!(f, "    call")?,
                    Node::Safepoint(SafepointKind::Poll) => writeln!(f, "    safepoint")?,
                    Node::Allocate(value) => writeln!(f, "    {} = new", value)?,
                }
            }
            if !block.succs.is_empty() {
                let succs: Vec<String> = block.succs.iter().map(|s| s.to_string()).collect();
                writeln!(f, "    goto {}", succs.join(", "))?;
            }
        }
        write!(f, "}}")
    }
}
