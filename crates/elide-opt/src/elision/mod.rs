//! Elision Decision Engine
//!
//! Turns converged availability into a per-op `Elidable | Required`
//! decision. An op is elidable only when it requires a barrier, its key is
//! precise, and the state right before it already holds a covering kind for
//! that key. Everything else is `Required`.

pub mod dominating;

pub use dominating::DominatingBarriers;

use crate::analysis::{AvailabilityAnalysis, AvailabilitySet};
use crate::config::ElisionConfig;
use crate::error::Result;
use elide_ir::{Decision, IndexVec, MemoryOp, OpId};

/// Dataflow formulation of the decision.
#[derive(Debug, Clone, Copy)]
pub struct ElisionEngine<'c> {
    config: &'c ElisionConfig,
}

impl<'c> ElisionEngine<'c> {
    pub fn new(config: &'c ElisionConfig) -> Self {
        Self { config }
    }

    /// Decide one op against the analysis.
    ///
    /// Fails with `InconsistentAnnotation` unless the analysis has reached
    /// its fixed point.
    pub fn decide(&self, op: &MemoryOp, analysis: &AvailabilityAnalysis<'_>) -> Result<Decision> {
        let state = analysis.state_before(op.id)?;
        Ok(self.decide_with(op, &state))
    }

    /// Decide one op against the state immediately before it.
    pub fn decide_with(&self, op: &MemoryOp, state: &AvailabilitySet) -> Decision {
        if state.covers(op, self.config) {
            Decision::Elidable
        } else {
            Decision::Required
        }
    }

    /// Decide every op of the analyzed graph, one block replay each.
    pub fn decide_all(&self, analysis: &AvailabilityAnalysis<'_>) -> Result<IndexVec<OpId, Decision>> {
        let graph = analysis.graph();
        let mut decisions = IndexVec::from_elem_n(Decision::Required, graph.ops().len());

        for block in graph.blocks().indices() {
            analysis.replay_block(block, |op, state| {
                decisions[op.id] = self.decide_with(op, state);
            })?;
        }

        Ok(decisions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ElisionError;
    use elide_ir::{AccessKind, BarrierKind, LocationKey, MemoryOpGraph};

    fn chain(barriers: &[BarrierKind]) -> MemoryOpGraph {
        let mut g = MemoryOpGraph::new("chain");
        let b0 = g.add_block().unwrap();
        let p = g.add_param().unwrap();
        for &barrier in barriers {
            let kind = if barrier == BarrierKind::Write {
                AccessKind::Store
            } else {
                AccessKind::Load
            };
            g.add_op(b0, kind, LocationKey::field(p, 8), barrier).unwrap();
        }
        g.finalize().unwrap();
        g
    }

    #[test]
    fn test_decide_before_fixed_point() {
        let g = chain(&[BarrierKind::Read]);
        let config = ElisionConfig::default();
        let analysis = AvailabilityAnalysis::new(&g, &config).unwrap();
        let engine = ElisionEngine::new(&config);
        assert!(matches!(
            engine.decide(g.op(OpId(0)), &analysis),
            Err(ElisionError::InconsistentAnnotation { .. })
        ));
        assert!(engine.decide_all(&analysis).is_err());
    }

    #[test]
    fn test_unbarriered_ops_are_required() {
        let g = chain(&[BarrierKind::Read, BarrierKind::None]);
        let config = ElisionConfig::default();
        let mut analysis = AvailabilityAnalysis::new(&g, &config).unwrap();
        analysis.run();
        let decisions = ElisionEngine::new(&config).decide_all(&analysis).unwrap();
        assert_eq!(decisions[OpId(0)], Decision::Required);
        assert_eq!(decisions[OpId(1)], Decision::Required);
    }

    #[test]
    fn test_no_downgrade() {
        let g = chain(&[BarrierKind::Read, BarrierKind::Write, BarrierKind::Read]);
        let config = ElisionConfig::default();
        let mut analysis = AvailabilityAnalysis::new(&g, &config).unwrap();
        analysis.run();
        let engine = ElisionEngine::new(&config);
        assert_eq!(engine.decide(g.op(OpId(1)), &analysis).unwrap(), Decision::Required);
        assert_eq!(engine.decide(g.op(OpId(2)), &analysis).unwrap(), Decision::Elidable);
    }

    #[test]
    fn test_write_implies_read_toggle() {
        let g = chain(&[BarrierKind::Write, BarrierKind::Read]);

        let strict = ElisionConfig::default();
        let mut analysis = AvailabilityAnalysis::new(&g, &strict).unwrap();
        analysis.run();
        let decisions = ElisionEngine::new(&strict).decide_all(&analysis).unwrap();
        assert_eq!(decisions[OpId(1)], Decision::Required);

        let relaxed = ElisionConfig {
            write_implies_read: true,
            ..Default::default()
        };
        let mut analysis = AvailabilityAnalysis::new(&g, &relaxed).unwrap();
        analysis.run();
        let decisions = ElisionEngine::new(&relaxed).decide_all(&analysis).unwrap();
        assert_eq!(decisions[OpId(1)], Decision::Elidable);
    }
}
