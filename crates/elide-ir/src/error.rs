//! Error Module - Graph Construction Errors
//!
//! Every variant here is a structural defect in the method IR handed over by
//! the front-end. The pass never repairs a malformed graph: the caller
//! abandons optimization of that one method and emits every barrier.

use crate::block::BlockId;
use crate::location::ValueId;
use thiserror::Error;

/// Structural violation of the memory-op graph invariants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// Block id not owned by this graph
    ///
    /// **When returned:** `add_op`, `add_edge` or a lookup names a block that
    /// was never created by `add_block`
    ///
    /// **Recovery strategy:** Abort optimization of the method
    #[error("Malformed graph: unknown block {0}")]
    UnknownBlock(BlockId),

    /// Value id not owned by this graph
    ///
    /// **When returned:** A location key uses a value that was
    /// never created
    #[error("Malformed graph: unknown value {0}")]
    UnknownValue(ValueId),

    /// Graph has no blocks at all
    #[error("Malformed graph: no entry block")]
    MissingEntry,

    /// An edge targets the entry block
    ///
    /// **When returned:** `finalize` finds predecessors on the entry block;
    /// front-ends must emit a separate loop header instead
    #[error("Malformed graph: entry block {0} has predecessors")]
    EntryHasPredecessors(BlockId),

    /// A non-entry block has no predecessors
    #[error("Malformed graph: block {0} has no predecessors")]
    NoPredecessors(BlockId),

    /// A block is not reachable from the entry block
    ///
    /// **When returned:** `finalize` finds a cycle of blocks that only
    /// reach each other
    #[error("Malformed graph: block {0} is unreachable from entry")]
    Unreachable(BlockId),

    /// Mutation attempted after `finalize`
    #[error("Malformed graph: graph is finalized")]
    AlreadyFinalized,

    /// Analysis requested on a graph that was never finalized
    #[error("Malformed graph: graph is not finalized")]
    NotFinalized,
}

pub type Result<T> = std::result::Result<T, GraphError>;
