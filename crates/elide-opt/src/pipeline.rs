//! Pass driver
//!
//! Runs dominators, availability and the decision engine over one finalized
//! graph and writes the decisions back as op annotations.

use crate::analysis::{AvailabilityAnalysis, DominatorTree};
use crate::config::{ElisionConfig, ElisionMode};
use crate::elision::{DominatingBarriers, ElisionEngine};
use crate::error::{ElisionError, Result};
use crate::stats::ElisionReport;
use elide_ir::{Decision, GraphError, MemoryOpGraph};
use rayon::prelude::*;

/// The barrier elision pass, configured once and reusable across methods.
#[derive(Debug, Clone)]
pub struct BarrierElision {
    config: ElisionConfig,
}

impl BarrierElision {
    pub fn new(config: ElisionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ElisionConfig {
        &self.config
    }

    /// Annotate every op of `graph` and report the counts.
    ///
    /// Existing annotations are overwritten. On error the graph's
    /// annotations are left untouched.
    pub fn run(&self, graph: &mut MemoryOpGraph) -> Result<ElisionReport> {
        if !graph.is_finalized() {
            return Err(GraphError::NotFinalized.into());
        }
        log::debug!(
            "barrier elision for {}: {} blocks, {} ops, mode {:?}",
            graph.name(),
            graph.blocks().len(),
            graph.ops().len(),
            self.config.mode
        );

        let (decisions, rounds) = {
            let graph: &MemoryOpGraph = graph;
            let dom = DominatorTree::compute(graph);
            for block in graph.blocks().indices() {
                dom.depth(block)?;
            }

            let mut availability = AvailabilityAnalysis::new(graph, &self.config)?;
            let rounds = availability.run();
            let dataflow = ElisionEngine::new(&self.config).decide_all(&availability)?;

            let decisions = if self.config.mode == ElisionMode::Dominators || self.config.verify {
                let dominating = DominatingBarriers::new(graph, &dom, &self.config).decide_all()?;
                if self.config.verify {
                    for (op, decision) in dominating.iter_enumerated() {
                        if *decision == Decision::Elidable && dataflow[op] != Decision::Elidable {
                            return Err(ElisionError::VerificationFailed { op });
                        }
                    }
                }
                match self.config.mode {
                    ElisionMode::Dominators => dominating,
                    ElisionMode::Dataflow => dataflow,
                }
            } else {
                dataflow
            };
            (decisions, rounds)
        };

        for (op, decision) in decisions.iter_enumerated() {
            graph.annotate(op, *decision);
        }

        let report = ElisionReport::from_graph(graph, rounds);
        log::debug!(
            "{}: {} required, {} elided after {} rounds",
            report.method,
            report.required(),
            report.elided(),
            rounds
        );
        Ok(report)
    }

    /// Like [`run`](Self::run), but never fails: on error every op is
    /// annotated `Required` and the report is flagged as a fallback.
    pub fn run_or_fallback(&self, graph: &mut MemoryOpGraph) -> ElisionReport {
        match self.run(graph) {
            Ok(report) => report,
            Err(e) => {
                log::warn!(
                    "barrier elision failed for {}: {}; keeping every barrier",
                    graph.name(),
                    e
                );
                graph.annotate_all(Decision::Required);
                let mut report = ElisionReport::from_graph(graph, 0);
                report.fallback = true;
                report
            },
        }
    }
}

/// Run the pass over independent methods in parallel.
///
/// Each worker owns one graph; reports come back in input order.
pub fn run_batch(pass: &BarrierElision, graphs: &mut [MemoryOpGraph]) -> Vec<ElisionReport> {
    graphs
        .par_iter_mut()
        .map(|graph| pass.run_or_fallback(graph))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use elide_ir::{AccessKind, BarrierKind, LocationKey, OpId};

    fn two_loads(finalize: bool) -> MemoryOpGraph {
        let mut g = MemoryOpGraph::new("pair");
        let b0 = g.add_block().unwrap();
        let p = g.add_param().unwrap();
        for _ in 0..2 {
            g.add_op(b0, AccessKind::Load, LocationKey::field(p, 8), BarrierKind::Read)
                .unwrap();
        }
        if finalize {
            g.finalize().unwrap();
        }
        g
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = ElisionConfig {
            max_rounds: 0,
            ..Default::default()
        };
        assert!(matches!(
            BarrierElision::new(config),
            Err(ElisionError::Config(_))
        ));
    }

    #[test]
    fn test_run_annotates() {
        let pass = BarrierElision::new(ElisionConfig::default()).unwrap();
        let mut g = two_loads(true);
        let report = pass.run(&mut g).unwrap();
        assert_eq!(g.annotation(OpId(0)), Some(Decision::Required));
        assert_eq!(g.annotation(OpId(1)), Some(Decision::Elidable));
        assert_eq!(report.required(), 1);
        assert_eq!(report.elided(), 1);
        assert!(!report.fallback);
    }

    #[test]
    fn test_unfinalized_graph_falls_back() {
        let pass = BarrierElision::new(ElisionConfig::default()).unwrap();
        let mut g = two_loads(false);
        assert!(matches!(
            pass.run(&mut g),
            Err(ElisionError::MalformedGraph(GraphError::NotFinalized))
        ));
        assert_eq!(g.annotation(OpId(1)), None);

        let report = pass.run_or_fallback(&mut g);
        assert!(report.fallback);
        assert_eq!(report.required(), 2);
        assert_eq!(report.elided(), 0);
        assert_eq!(g.annotation(OpId(1)), Some(Decision::Required));
    }

    #[test]
    fn test_verify_passes_on_agreeing_modes() {
        let config = ElisionConfig {
            mode: ElisionMode::Dominators,
            verify: true,
            ..Default::default()
        };
        let pass = BarrierElision::new(config).unwrap();
        let mut g = two_loads(true);
        let report = pass.run(&mut g).unwrap();
        assert_eq!(report.elided(), 1);
    }

    #[test]
    fn test_batch_keeps_order() {
        let pass = BarrierElision::new(ElisionConfig::default()).unwrap();
        let mut graphs = vec![two_loads(true), two_loads(false), two_loads(true)];
        let reports = run_batch(&pass, &mut graphs);
        assert_eq!(reports.len(), 3);
        assert!(!reports[0].fallback);
        assert!(reports[1].fallback);
        assert_eq!(reports[2].elided(), 1);
    }
}
