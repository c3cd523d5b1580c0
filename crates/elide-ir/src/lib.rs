//! Memory-Op Graph IR
//!
//! The IR consumed by the barrier elision pass: a control-flow graph of basic
//! blocks, each holding an ordered sequence of loads, stores, safepoints and
//! allocations. Every access is tagged with the location it touches and the
//! barrier the concurrent collector requires around it.
//!
//! ```
//! use elide_ir::{AccessKind, BarrierKind, LocationKey, MemoryOpGraph};
//!
//! let mut graph = MemoryOpGraph::new("getter");
//! let entry = graph.add_block().unwrap();
//! let this = graph.add_param().unwrap();
//! graph
//!     .add_op(entry, AccessKind::Load, LocationKey::field(this, 12), BarrierKind::Read)
//!     .unwrap();
//! graph.finalize().unwrap();
//! assert_eq!(graph.ops().len(), 1);
//! ```

pub mod block;
pub mod error;
pub mod graph;
pub mod idx;
pub mod location;
pub mod op;

pub use block::{BasicBlock, BlockId, Node, SafepointKind};
pub use error::{GraphError, Result};
pub use graph::MemoryOpGraph;
pub use idx::{Idx, IndexVec};
pub use location::{FieldOffset, LocationKey, ValueId, ValueInfo, ValueOrigin};
pub use op::{AccessKind, BarrierKind, Decision, MemoryOp, OpId};
