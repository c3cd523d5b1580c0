//! Alias Classifier
//!
//! Three-valued answers about whether two location keys address the same
//! memory. `MayAlias` is always a safe answer; `MustAlias` and
//! `MustNotAlias` are only given with a proof from key syntax or value
//! provenance.

use elide_ir::{FieldOffset, LocationKey, MemoryOpGraph, ValueId, ValueOrigin};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AliasResult {
    MustAlias,
    MustNotAlias,
    MayAlias,
}

/// Pure function of the graph's value table; shares no mutable state.
#[derive(Debug, Clone, Copy)]
pub struct AliasClassifier<'g> {
    graph: &'g MemoryOpGraph,
}

impl<'g> AliasClassifier<'g> {
    pub fn new(graph: &'g MemoryOpGraph) -> Self {
        Self { graph }
    }

    fn origin(&self, value: ValueId) -> ValueOrigin {
        self.graph
            .value(value)
            .map(|info| info.origin)
            .unwrap_or(ValueOrigin::Merge)
    }

    /// Whether two base values can refer to the same object.
    pub fn classify_bases(&self, a: ValueId, b: ValueId) -> AliasResult {
        if a == b {
            return AliasResult::MustAlias;
        }

        match (self.origin(a), self.origin(b)) {
            // Two allocation results are never the same object.
            (ValueOrigin::Allocation, ValueOrigin::Allocation) => AliasResult::MustNotAlias,
            // Parameters exist before anything this method allocates.
            (ValueOrigin::Allocation, ValueOrigin::Parameter)
            | (ValueOrigin::Parameter, ValueOrigin::Allocation) => AliasResult::MustNotAlias,
            // A loaded value may be a fresh object stored and read back.
            _ => AliasResult::MayAlias,
        }
    }

    pub fn classify(&self, a: &LocationKey, b: &LocationKey) -> AliasResult {
        match self.classify_bases(a.base, b.base) {
            AliasResult::MustNotAlias => AliasResult::MustNotAlias,
            AliasResult::MayAlias => AliasResult::MayAlias,
            AliasResult::MustAlias => match (a.offset, b.offset) {
                (FieldOffset::Unknown, _) | (_, FieldOffset::Unknown) => AliasResult::MayAlias,
                (FieldOffset::Field(x), FieldOffset::Field(y)) => {
                    if x == y {
                        AliasResult::MustAlias
                    } else {
                        AliasResult::MustNotAlias
                    }
                },
                (FieldOffset::Element(i), FieldOffset::Element(j)) if i == j => {
                    AliasResult::MustAlias
                },
                _ => AliasResult::MayAlias,
            },
        }
    }

    pub fn must_alias(&self, a: &LocationKey, b: &LocationKey) -> bool {
        self.classify(a, b) == AliasResult::MustAlias
    }
}
