//! Dominator-based elision
//!
//! An op B is elidable when some earlier access A on the same precise key
//! (or the allocation of B's base, with fresh allocations enabled) sits in a
//! dominating position and no path from A to B kills A's barrier.
//!
//! The path check walks backwards from B's block to A's block. Every block
//! met on the way is checked in full; A's block only after A and B's block
//! only before B, unless the walk comes back around to B's block through a
//! loop. Kill events are exactly those of the availability transfer, so
//! anything proven here is also proven by the dataflow.

use crate::analysis::availability::Transfer;
use crate::analysis::{AvailabilitySet, DominatorTree, KindSet};
use crate::config::ElisionConfig;
use crate::error::Result;
use elide_ir::{
    BlockId, Decision, IndexVec, LocationKey, MemoryOp, MemoryOpGraph, Node, OpId, ValueId,
};
use indexmap::IndexSet;
use rustc_hash::FxHashMap;

/// Candidate finder for [`crate::ElisionMode::Dominators`].
#[derive(Debug)]
pub struct DominatingBarriers<'a> {
    graph: &'a MemoryOpGraph,
    dom: &'a DominatorTree,
    transfer: Transfer<'a>,
    /// Barriered ops on each precise key, in op order.
    by_key: FxHashMap<LocationKey, Vec<OpId>>,
    /// Block and node index of each allocation.
    alloc_sites: FxHashMap<ValueId, (BlockId, usize)>,
}

impl<'a> DominatingBarriers<'a> {
    pub fn new(graph: &'a MemoryOpGraph, dom: &'a DominatorTree, config: &'a ElisionConfig) -> Self {
        let mut by_key: FxHashMap<LocationKey, Vec<OpId>> = FxHashMap::default();
        for op in graph.ops().iter() {
            if op.needs_barrier() && op.key.is_precise() {
                by_key.entry(op.key).or_default().push(op.id);
            }
        }

        let mut alloc_sites = FxHashMap::default();
        for block in graph.blocks().iter() {
            for (pos, node) in block.nodes.iter().enumerate() {
                if let Node::Allocate(value) = node {
                    alloc_sites.insert(*value, (block.id, pos));
                }
            }
        }

        Self {
            graph,
            dom,
            transfer: Transfer::new(graph, config),
            by_key,
            alloc_sites,
        }
    }

    /// Whether the node at (`block`, `pos`) executes before `op` on every
    /// path reaching it.
    fn dominates_op(&self, block: BlockId, pos: usize, op: &MemoryOp) -> Result<bool> {
        if block == op.block {
            Ok(pos < op.position)
        } else {
            self.dom.strictly_dominates(block, op.block)
        }
    }

    pub fn decide(&self, op: &MemoryOp) -> Result<Decision> {
        if !op.needs_barrier() || !op.key.is_precise() {
            return Ok(Decision::Required);
        }
        let config = self.transfer.config();

        if let Some(candidates) = self.by_key.get(&op.key) {
            for &id in candidates {
                let prior = self.graph.op(id);
                if id == op.id || !config.covers(prior.barrier, op.barrier) {
                    continue;
                }
                if !self.dominates_op(prior.block, prior.position, op)? {
                    continue;
                }

                let mut seed = AvailabilitySet::new();
                seed.insert(prior.key, prior.barrier);
                if self.path_clear(prior.block, prior.position, op, &seed)? {
                    log::trace!("{} elided by dominating {}", op.id, prior.id);
                    return Ok(Decision::Elidable);
                }
            }
        }

        if config.elide_fresh_allocations {
            if let Some(&(block, pos)) = self.alloc_sites.get(&op.key.base) {
                if self.dominates_op(block, pos, op)? {
                    let mut seed = AvailabilitySet::new();
                    seed.insert_fresh(op.key.base, KindSet::ALL);
                    if seed.covers(op, config) && self.path_clear(block, pos, op, &seed)? {
                        log::trace!("{} elided by allocation of {}", op.id, op.key.base);
                        return Ok(Decision::Elidable);
                    }
                }
            }
        }

        Ok(Decision::Required)
    }

    pub fn decide_all(&self) -> Result<IndexVec<OpId, Decision>> {
        let mut decisions = IndexVec::from_elem_n(Decision::Required, self.graph.ops().len());
        for op in self.graph.ops().iter() {
            decisions[op.id] = self.decide(op)?;
        }
        Ok(decisions)
    }

    /// Whether `seed`, established by the node at (`from`, `from_pos`),
    /// still holds on every path up to `to`.
    fn path_clear(
        &self,
        from: BlockId,
        from_pos: usize,
        to: &MemoryOp,
        seed: &AvailabilitySet,
    ) -> Result<bool> {
        let transfer = &self.transfer;
        let keeps = |state: &mut AvailabilitySet, nodes: &[Node]| {
            nodes.iter().all(|node| {
                transfer.apply(node, state);
                state.includes(seed)
            })
        };

        if from == to.block && from_pos < to.position {
            let nodes = &self.graph.block(from)?.nodes;
            return Ok(keeps(&mut seed.clone(), &nodes[from_pos + 1..to.position]));
        }

        let from_nodes = &self.graph.block(from)?.nodes;
        if !keeps(&mut seed.clone(), &from_nodes[from_pos + 1..]) {
            return Ok(false);
        }

        let to_block = self.graph.block(to.block)?;
        let mut state = seed.clone();
        transfer.enter_block(to_block, &mut state);
        if !state.includes(seed) || !keeps(&mut state, &to_block.nodes[..to.position]) {
            return Ok(false);
        }

        // Blocks between the two, found without crossing `from` again.
        let mut region: IndexSet<BlockId> = IndexSet::new();
        let mut worklist: Vec<BlockId> = to_block.preds.clone();
        while let Some(block) = worklist.pop() {
            if block == from || !region.insert(block) {
                continue;
            }
            worklist.extend(self.graph.block(block)?.preds.iter().copied());
        }

        for &block in &region {
            let mut state = seed.clone();
            transfer.apply_block(self.graph.block(block)?, &mut state);
            if !state.includes(seed) {
                log::trace!("{}: barrier from {} killed in {}", to.id, from, block);
                return Ok(false);
            }
        }

        Ok(true)
    }
}
