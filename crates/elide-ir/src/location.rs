//! Values and memory locations.
//!
//! A [`LocationKey`] names a memory location syntactically: the SSA value
//! holding the base reference plus the offset into the object. Two keys that
//! compare equal and have a precise offset always address the same location;
//! anything weaker has to be proven by the alias classifier.

use crate::idx::Idx;
use crate::op::OpId;
use std::fmt;

/// SSA value that may be used as a base reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ValueId(pub u32);

impl Idx for ValueId {
    fn from_usize(idx: usize) -> Self {
        ValueId(idx as u32)
    }
    fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Where a value comes from. Alias proofs are built from this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueOrigin {
    /// Incoming argument; exists before anything the method allocates.
    Parameter,
    /// Result of a reference load.
    Loaded(OpId),
    /// Fresh object from an allocation node.
    Allocation,
    /// Phi or any other value whose provenance is not tracked.
    Merge,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueInfo {
    pub id: ValueId,
    pub origin: ValueOrigin,
}

impl ValueInfo {
    pub fn is_allocation(&self) -> bool {
        matches!(self.origin, ValueOrigin::Allocation)
    }
}

/// Offset part of a location key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FieldOffset {
    /// Constant field offset in bytes.
    Field(u32),
    /// Array element selected by an SSA index value.
    Element(ValueId),
    /// No static offset (raw or unsafe access).
    Unknown,
}

/// Syntactic name of a memory location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LocationKey {
    pub base: ValueId,
    pub offset: FieldOffset,
}

impl LocationKey {
    pub fn field(base: ValueId, offset: u32) -> Self {
        Self {
            base,
            offset: FieldOffset::Field(offset),
        }
    }

    pub fn element(base: ValueId, index: ValueId) -> Self {
        Self {
            base,
            offset: FieldOffset::Element(index),
        }
    }

    pub fn unknown(base: ValueId) -> Self {
        Self {
            base,
            offset: FieldOffset::Unknown,
        }
    }

    /// Whether syntactic equality with this key implies must-alias.
    ///
    /// Keys without a static offset never take part in availability.
    pub fn is_precise(&self) -> bool {
        !matches!(self.offset, FieldOffset::Unknown)
    }
}

impl fmt::Display for LocationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.offset {
            FieldOffset::Field(off) => write!(f, "{}+{}", self.base, off),
            FieldOffset::Element(idx) => write!(f, "{}[{}]", self.base, idx),
            FieldOffset::Unknown => write!(f, "{}+?", self.base),
        }
    }
}
