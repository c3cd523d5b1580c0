//! Analyses feeding the elision decision
//!
//! Provides dominance, alias and barrier availability analysis over a
//! finalized memory-op graph

pub mod alias;
pub mod availability;
pub mod dominators;

pub use alias::{AliasClassifier, AliasResult};
pub use availability::{AvailabilityAnalysis, AvailabilitySet, KindSet};
pub use dominators::DominatorTree;
