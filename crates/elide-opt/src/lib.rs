//! # elide-opt - GC Barrier Elision
//!
//! Removes redundant garbage-collector barriers from JIT-compiled methods
//! running under a concurrent, colored-pointer collector. A barrier on a
//! location is redundant when every path reaching the access already
//! instituted a barrier of a covering kind on the same location and nothing
//! since could have invalidated it.
//!
//! ## Overview
//!
//! - **Dominator Tree**: Cooper-Harvey-Kennedy over reverse postorder,
//!   constant-time dominance queries
//! - **Alias Classifier**: must / must-not / may answers from key syntax and
//!   value provenance
//! - **Availability**: forward must-dataflow; safepoints, unbarriered stores
//!   and redefinitions kill
//! - **Decision Engine**: `Elidable` only with proof, `Required` otherwise
//!
//! ## Quick Start
//!
//! ```rust
//! use elide_ir::{AccessKind, BarrierKind, Decision, LocationKey, MemoryOpGraph};
//! use elide_opt::{BarrierElision, ElisionConfig};
//!
//! fn main() -> Result<(), elide_opt::ElisionError> {
//!     let mut graph = MemoryOpGraph::new("Point.getX");
//!     let entry = graph.add_block()?;
//!     let this = graph.add_param()?;
//!     let x = LocationKey::field(this, 12);
//!     let first = graph.add_op(entry, AccessKind::Load, x, BarrierKind::Read)?;
//!     let again = graph.add_op(entry, AccessKind::Load, x, BarrierKind::Read)?;
//!     graph.finalize()?;
//!
//!     let pass = BarrierElision::new(ElisionConfig::default())?;
//!     let report = pass.run(&mut graph)?;
//!
//!     assert_eq!(graph.annotation(first), Some(Decision::Required));
//!     assert_eq!(graph.annotation(again), Some(Decision::Elidable));
//!     assert_eq!(report.required(), 1);
//!     Ok(())
//! }
//! ```
//!
//! ## Safety direction
//!
//! Every unproven case resolves to `Required`. A failure anywhere in the pass
//! is contained to the method: [`BarrierElision::run_or_fallback`] keeps
//! every barrier and flags the report.

pub mod analysis;
pub mod config;
pub mod elision;
pub mod error;
pub mod pipeline;
pub mod stats;

pub use analysis::{
    AliasClassifier, AliasResult, AvailabilityAnalysis, AvailabilitySet, DominatorTree, KindSet,
};
pub use config::{ConfigError, ElisionConfig, ElisionMode, SafepointSurvival};
pub use elision::{DominatingBarriers, ElisionEngine};
pub use error::{ElisionError, Result};
pub use pipeline::{run_batch, BarrierElision};
pub use stats::ElisionReport;
