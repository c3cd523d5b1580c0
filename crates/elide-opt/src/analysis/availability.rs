//! Barrier Availability Analysis
//!
//! Forward must-dataflow over the memory-op graph. A location is available at
//! a program point when every path from entry to that point instituted a
//! barrier on it and no kill event happened since:
//! - a safepoint, call or allocation drops every kind the collector does not
//!   keep valid across safepoints
//! - an unbarriered store drops every entry it may overwrite
//! - redefining a value drops every entry naming it
//! - entering a join block drops every entry naming a merge value
//!
//! Merges intersect their predecessors' sets. Blocks not yet visited start at
//! top (`None`), the identity of intersection, so loops converge to the
//! greatest fixed point.

use crate::analysis::alias::{AliasClassifier, AliasResult};
use crate::config::{ElisionConfig, SafepointSurvival};
use crate::error::{ElisionError, Result};
use elide_ir::{
    BarrierKind, BasicBlock, BlockId, FieldOffset, GraphError, IndexVec, LocationKey, MemoryOp,
    MemoryOpGraph, Node, OpId, ValueId, ValueOrigin,
};
use std::collections::BTreeMap;
use std::fmt;

const READ: u8 = 0b01;
const WRITE: u8 = 0b10;

/// Barrier kinds established on one location.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct KindSet(u8);

impl KindSet {
    pub const EMPTY: KindSet = KindSet(0);
    pub const ALL: KindSet = KindSet(READ | WRITE);

    pub fn of(kind: BarrierKind) -> Self {
        KindSet(bit(kind))
    }

    pub fn contains(self, kind: BarrierKind) -> bool {
        let b = bit(kind);
        b != 0 && self.0 & b == b
    }

    pub fn insert(&mut self, kind: BarrierKind) {
        self.0 |= bit(kind);
    }

    pub fn intersect(self, other: KindSet) -> KindSet {
        KindSet(self.0 & other.0)
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn is_superset(self, other: KindSet) -> bool {
        self.0 & other.0 == other.0
    }

    /// Kinds left after a safepoint.
    pub fn survivors(self, survival: &SafepointSurvival) -> KindSet {
        let mut kept = KindSet::EMPTY;
        for kind in [BarrierKind::Read, BarrierKind::Write] {
            if self.contains(kind) && survival.survives(kind) {
                kept.insert(kind);
            }
        }
        kept
    }

    /// Whether some established kind satisfies `required`.
    pub fn covers(self, config: &ElisionConfig, required: BarrierKind) -> bool {
        [BarrierKind::Read, BarrierKind::Write]
            .into_iter()
            .any(|kind| self.contains(kind) && config.covers(kind, required))
    }
}

fn bit(kind: BarrierKind) -> u8 {
    match kind {
        BarrierKind::None => 0,
        BarrierKind::Read => READ,
        BarrierKind::Write => WRITE,
    }
}

impl fmt::Display for KindSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.contains(BarrierKind::Read), self.contains(BarrierKind::Write)) {
            (true, true) => f.write_str("read+write"),
            (true, false) => f.write_str("read"),
            (false, true) => f.write_str("write"),
            (false, false) => f.write_str("-"),
        }
    }
}

/// Locations already barriered at one program point.
///
/// `fresh` holds allocated values whose every field counts as barriered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AvailabilitySet {
    entries: BTreeMap<LocationKey, KindSet>,
    fresh: BTreeMap<ValueId, KindSet>,
}

impl AvailabilitySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.fresh.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len() + self.fresh.len()
    }

    pub fn kinds(&self, key: &LocationKey) -> KindSet {
        self.entries.get(key).copied().unwrap_or_default()
    }

    pub fn fresh_kinds(&self, value: ValueId) -> KindSet {
        self.fresh.get(&value).copied().unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&LocationKey, KindSet)> + '_ {
        self.entries.iter().map(|(key, kinds)| (key, *kinds))
    }

    /// Record a barrier of `kind` on `key`. Imprecise keys are ignored.
    pub fn insert(&mut self, key: LocationKey, kind: BarrierKind) {
        if !key.is_precise() || kind == BarrierKind::None {
            return;
        }
        self.entries.entry(key).or_default().insert(kind);
    }

    pub fn insert_fresh(&mut self, value: ValueId, kinds: KindSet) {
        if !kinds.is_empty() {
            *self.fresh.entry(value).or_default() = kinds;
        }
    }

    /// Intersection; an entry survives only with the kinds both sides hold.
    pub fn meet(&self, other: &AvailabilitySet) -> AvailabilitySet {
        AvailabilitySet {
            entries: meet_maps(&self.entries, &other.entries),
            fresh: meet_maps(&self.fresh, &other.fresh),
        }
    }

    /// Whether every fact of `other` also holds here.
    pub fn includes(&self, other: &AvailabilitySet) -> bool {
        other
            .entries
            .iter()
            .all(|(key, kinds)| self.kinds(key).is_superset(*kinds))
            && other
                .fresh
                .iter()
                .all(|(value, kinds)| self.fresh_kinds(*value).is_superset(*kinds))
    }

    /// Whether a barrier already established here satisfies `op`.
    pub fn covers(&self, op: &MemoryOp, config: &ElisionConfig) -> bool {
        if !op.needs_barrier() || !op.key.is_precise() {
            return false;
        }
        self.kinds(&op.key).covers(config, op.barrier)
            || self.fresh_kinds(op.key.base).covers(config, op.barrier)
    }

    fn retain_survivors(&mut self, survival: &SafepointSurvival) {
        self.entries.retain(|_, kinds| {
            *kinds = kinds.survivors(survival);
            !kinds.is_empty()
        });
        self.fresh.retain(|_, kinds| {
            *kinds = kinds.survivors(survival);
            !kinds.is_empty()
        });
    }

    fn kill_value(&mut self, value: ValueId) {
        self.entries.retain(|key, _| !mentions(key, |v| v == value));
        self.fresh.remove(&value);
    }
}

fn meet_maps<K: Ord + Copy>(
    a: &BTreeMap<K, KindSet>,
    b: &BTreeMap<K, KindSet>,
) -> BTreeMap<K, KindSet> {
    a.iter()
        .filter_map(|(key, kinds)| {
            let common = kinds.intersect(*b.get(key)?);
            (!common.is_empty()).then_some((*key, common))
        })
        .collect()
}

fn mentions(key: &LocationKey, mut pred: impl FnMut(ValueId) -> bool) -> bool {
    pred(key.base) || matches!(key.offset, FieldOffset::Element(index) if pred(index))
}

impl fmt::Display for AvailabilitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut items: Vec<String> = self
            .entries
            .iter()
            .map(|(key, kinds)| format!("{}:{}", key, kinds))
            .collect();
        items.extend(
            self.fresh
                .iter()
                .map(|(value, kinds)| format!("{}.*:{}", value, kinds)),
        );
        write!(f, "{{{}}}", items.join(", "))
    }
}

/// Transfer function shared by the dataflow and the dominator path walk.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Transfer<'a> {
    graph: &'a MemoryOpGraph,
    alias: AliasClassifier<'a>,
    config: &'a ElisionConfig,
}

impl<'a> Transfer<'a> {
    pub(crate) fn new(graph: &'a MemoryOpGraph, config: &'a ElisionConfig) -> Self {
        Self {
            graph,
            alias: AliasClassifier::new(graph),
            config,
        }
    }

    pub(crate) fn config(&self) -> &'a ElisionConfig {
        self.config
    }

    /// Phi values take a new object at every join.
    pub(crate) fn enter_block(&self, block: &BasicBlock, state: &mut AvailabilitySet) {
        if block.preds.len() < 2 {
            return;
        }
        let graph = self.graph;
        let is_merge = |v: ValueId| {
            graph
                .value(v)
                .map(|info| info.origin == ValueOrigin::Merge)
                .unwrap_or(true)
        };
        state.entries.retain(|key, _| !mentions(key, is_merge));
        state.fresh.retain(|value, _| !is_merge(*value));
    }

    pub(crate) fn apply(&self, node: &Node, state: &mut AvailabilitySet) {
        match *node {
            Node::Access(id) => {
                let op = self.graph.op(id);
                if op.is_unbarriered_store() {
                    let alias = self.alias;
                    let key = op.key;
                    state
                        .entries
                        .retain(|other, _| alias.classify(other, &key) == AliasResult::MustNotAlias);
                    state.fresh.retain(|value, _| {
                        alias.classify_bases(key.base, *value) == AliasResult::MustNotAlias
                    });
                }
                if op.needs_barrier() {
                    state.insert(op.key, op.barrier);
                }
                // The key names the base's old object.
                if let Some(value) = op.defines {
                    state.kill_value(value);
                }
            },
            Node::Safepoint(_) => state.retain_survivors(&self.config.survives_safepoint),
            Node::Allocate(value) => {
                state.retain_survivors(&self.config.survives_safepoint);
                state.kill_value(value);
                if self.config.elide_fresh_allocations {
                    state.insert_fresh(value, KindSet::ALL);
                }
            },
        }
    }

    pub(crate) fn apply_block(&self, block: &BasicBlock, state: &mut AvailabilitySet) {
        self.enter_block(block, state);
        for node in &block.nodes {
            self.apply(node, state);
        }
    }
}

/// Fixed-point availability for one graph.
#[derive(Debug)]
pub struct AvailabilityAnalysis<'a> {
    graph: &'a MemoryOpGraph,
    transfer: Transfer<'a>,
    rpo: Vec<BlockId>,
    block_entry: IndexVec<BlockId, Option<AvailabilitySet>>,
    block_exit: IndexVec<BlockId, Option<AvailabilitySet>>,
    rounds: usize,
    max_rounds: usize,
    converged: bool,
}

impl<'a> AvailabilityAnalysis<'a> {
    pub fn new(graph: &'a MemoryOpGraph, config: &'a ElisionConfig) -> Result<Self> {
        if !graph.is_finalized() {
            return Err(GraphError::NotFinalized.into());
        }
        let block_count = graph.blocks().len();

        Ok(Self {
            graph,
            transfer: Transfer::new(graph, config),
            rpo: graph.reverse_postorder(),
            block_entry: IndexVec::from_elem_n(None, block_count),
            block_exit: IndexVec::from_elem_n(None, block_count),
            rounds: 0,
            max_rounds: config.max_rounds,
            converged: false,
        })
    }

    pub fn graph(&self) -> &'a MemoryOpGraph {
        self.graph
    }

    /// One pass over all blocks in reverse postorder.
    ///
    /// Returns whether any block's exit set changed.
    pub fn step(&mut self) -> bool {
        let graph = self.graph;
        let mut changed = false;

        for i in 0..self.rpo.len() {
            let block_id = self.rpo[i];
            let block = &graph.blocks()[block_id];

            let entry = if block.preds.is_empty() {
                Some(AvailabilitySet::new())
            } else {
                let mut acc: Option<AvailabilitySet> = None;
                for pred in &block.preds {
                    if let Some(out) = &self.block_exit[*pred] {
                        acc = Some(match acc {
                            None => out.clone(),
                            Some(current) => current.meet(out),
                        });
                    }
                }
                acc.map(|mut state| {
                    self.transfer.enter_block(block, &mut state);
                    state
                })
            };

            let exit = entry.as_ref().map(|state| {
                let mut out = state.clone();
                for node in &block.nodes {
                    self.transfer.apply(node, &mut out);
                }
                out
            });

            if self.block_exit[block_id] != exit {
                changed = true;
            }
            self.block_entry[block_id] = entry;
            self.block_exit[block_id] = exit;
        }

        self.rounds += 1;
        self.converged = !changed;
        changed
    }

    /// Iterate to the fixed point or until the round budget runs out.
    pub fn run(&mut self) -> usize {
        while !self.converged {
            if self.rounds >= self.max_rounds {
                log::warn!(
                    "availability for {} did not converge within {} rounds",
                    self.graph.name(),
                    self.max_rounds
                );
                break;
            }
            let changed = self.step();
            log::trace!(
                "{}: availability round {} changed={}",
                self.graph.name(),
                self.rounds,
                changed
            );
        }
        self.rounds
    }

    pub fn is_fixed_point(&self) -> bool {
        self.converged
    }

    pub fn rounds(&self) -> usize {
        self.rounds
    }

    pub fn in_state(&self, block: BlockId) -> Result<&AvailabilitySet> {
        self.block_entry
            .get(block)
            .and_then(Option::as_ref)
            .ok_or(ElisionError::UnreachableBlock { block })
    }

    pub fn out_state(&self, block: BlockId) -> Result<&AvailabilitySet> {
        self.block_exit
            .get(block)
            .and_then(Option::as_ref)
            .ok_or(ElisionError::UnreachableBlock { block })
    }

    fn ensure_fixed_point(&self, op: OpId) -> Result<()> {
        if self.converged {
            Ok(())
        } else {
            Err(ElisionError::InconsistentAnnotation {
                op,
                reason: format!(
                    "availability has not reached a fixed point after {} rounds",
                    self.rounds
                ),
            })
        }
    }

    /// Availability immediately before `op` executes.
    pub fn state_before(&self, op: OpId) -> Result<AvailabilitySet> {
        self.ensure_fixed_point(op)?;
        let op = self.graph.op(op);
        let block = self.graph.block(op.block)?;
        let mut state = self.in_state(op.block)?.clone();
        for node in &block.nodes[..op.position] {
            self.transfer.apply(node, &mut state);
        }
        Ok(state)
    }

    /// Walk `block` calling `visit` with each op and the state before it.
    pub fn replay_block(
        &self,
        block: BlockId,
        mut visit: impl FnMut(&MemoryOp, &AvailabilitySet),
    ) -> Result<()> {
        let nodes = &self.graph.block(block)?.nodes;
        if let Some(first) = self.graph.blocks()[block].ops().next() {
            self.ensure_fixed_point(first)?;
        } else {
            return Ok(());
        }

        let mut state = self.in_state(block)?.clone();
        for node in nodes {
            if let Node::Access(id) = node {
                visit(self.graph.op(*id), &state);
            }
            self.transfer.apply(node, &mut state);
        }
        Ok(())
    }
}
