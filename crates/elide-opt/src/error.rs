//! Error Module - Barrier Elision Errors
//!
//! None of these errors is retried. Each one means the front-end handed over
//! a malformed method or the pass was driven out of order; the caller drops
//! the optimization for that single method and compiles it with every
//! barrier in place (see [`crate::BarrierElision::run_or_fallback`]).
//!
//! # Error Categories
//!
//! - `MalformedGraph` - structural IR invariant violated
//! - `UnreachableBlock` - dominator query outside the tree's domain
//! - `InconsistentAnnotation` - decision requested before the fixed point
//! - `VerificationFailed` - the two elision formulations disagree on safety
//! - `Config` - invalid pass configuration

use crate::config::ConfigError;
use elide_ir::{BlockId, GraphError, OpId};
use thiserror::Error;

/// Main error type for the elision pass
#[derive(Debug, Error)]
pub enum ElisionError {
    /// Structural invariant of the memory-op graph violated
    ///
    /// **When returned:** Graph construction or `finalize` failed, or the
    /// pass was handed a graph that was never finalized
    ///
    /// **Recovery strategy:** Abort optimization of this method only
    #[error(transparent)]
    MalformedGraph(#[from] GraphError),

    /// Dominator query on a block outside the tree
    ///
    /// **When returned:** The tree was built from a graph that skipped
    /// `finalize` and the queried block is unreachable or unknown
    ///
    /// **Recovery strategy:** Cannot recover - pass ordering bug in the caller
    #[error("Unreachable block {block}: not in the dominator tree")]
    UnreachableBlock { block: BlockId },

    /// Elision decision requested before availability converged
    ///
    /// **When returned:** `decide` called before the dataflow reached its
    /// fixed point, or the round budget ran out first
    ///
    /// **Recovery strategy:** Fall back to all-barriers-required compilation
    #[error("Inconsistent annotation for {op}: {reason}")]
    InconsistentAnnotation { op: OpId, reason: String },

    /// The dominator formulation elided an op the dataflow keeps
    ///
    /// **When returned:** Only with `verify` enabled
    ///
    /// **Recovery strategy:** Fall back; report as a bug in the pass
    #[error("Verification failed: dominator-based elision of {op} is not justified by availability")]
    VerificationFailed { op: OpId },

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, ElisionError>;
