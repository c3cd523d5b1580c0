//! Memory operations and their barrier annotations.

use crate::block::BlockId;
use crate::idx::Idx;
use crate::location::{LocationKey, ValueId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Memory op ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OpId(pub u32);

impl Idx for OpId {
    fn from_usize(idx: usize) -> Self {
        OpId(idx as u32)
    }
    fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for OpId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "op{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessKind {
    Load,
    Store,
}

/// Barrier the collector requires around an access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BarrierKind {
    None,
    Read,
    Write,
}

impl fmt::Display for BarrierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BarrierKind::None => "none",
            BarrierKind::Read => "read",
            BarrierKind::Write => "write",
        };
        f.write_str(name)
    }
}

/// Outcome of the elision pass for one op, consumed by code emission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Elidable,
    Required,
}

/// A load or store touching a managed reference field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryOp {
    pub id: OpId,
    pub kind: AccessKind,
    pub key: LocationKey,
    pub barrier: BarrierKind,
    /// Owning block.
    pub block: BlockId,
    /// Index of this op's node within the owning block.
    pub position: usize,
    /// Reference value produced by a load, if any.
    pub defines: Option<ValueId>,
    annotation: Option<Decision>,
}

impl MemoryOp {
    pub(crate) fn new(
        id: OpId,
        kind: AccessKind,
        key: LocationKey,
        barrier: BarrierKind,
        block: BlockId,
        position: usize,
    ) -> Self {
        Self {
            id,
            kind,
            key,
            barrier,
            block,
            position,
            defines: None,
            annotation: None,
        }
    }

    pub fn annotation(&self) -> Option<Decision> {
        self.annotation
    }

    pub(crate) fn set_annotation(&mut self, decision: Option<Decision>) {
        self.annotation = decision;
    }

    pub fn needs_barrier(&self) -> bool {
        self.barrier != BarrierKind::None
    }

    /// Whether code emission has to produce a barrier sequence for this op.
    ///
    /// Unannotated ops count as barriered.
    pub fn emits_barrier(&self) -> bool {
        self.needs_barrier() && self.annotation != Some(Decision::Elidable)
    }

    /// Store without any barrier; may overwrite a healed reference.
    pub fn is_unbarriered_store(&self) -> bool {
        self.kind == AccessKind::Store && self.barrier == BarrierKind::None
    }
}

impl fmt::Display for MemoryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(value) = self.defines {
            write!(f, "{} = ", value)?;
        }
        let kind = match self.kind {
            AccessKind::Load => "load",
            AccessKind::Store => "store",
        };
        write!(f, "{} {} [{}]", kind, self.key, self.barrier)?;
        match self.annotation {
            Some(Decision::Elidable) => write!(f, " elided"),
            Some(Decision::Required) if self.needs_barrier() => write!(f, " required"),
            _ => Ok(()),
        }
    }
}
