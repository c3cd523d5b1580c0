//! Elision Statistics - Diagnostic Report
//!
//! Counts of instituted versus elided barriers per method, for verification
//! tooling that asserts on barrier counts. Reports from many methods are
//! aggregated with [`ElisionReport::merge`].

use elide_ir::{AccessKind, BarrierKind, MemoryOpGraph};
use serde::{Deserialize, Serialize};
use std::fmt;

/// ElisionReport - outcome of the pass for one method (or a batch)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElisionReport {
    /// Method name, or "total" for an aggregate
    pub method: String,
    pub loads: u64,
    pub stores: u64,
    /// Accesses that never needed a barrier
    pub unbarriered: u64,
    pub required_read: u64,
    pub required_write: u64,
    pub elided_read: u64,
    pub elided_write: u64,
    /// Safepoint, call and allocation nodes
    pub safepoints: u64,
    /// Dataflow rounds until the fixed point
    pub rounds: u64,
    /// The pass failed and every barrier was kept
    pub fallback: bool,
}

impl ElisionReport {
    /// Count the annotations currently on `graph`.
    pub fn from_graph(graph: &MemoryOpGraph, rounds: usize) -> Self {
        let mut report = Self {
            method: graph.name().to_string(),
            safepoints: graph.safepoint_count() as u64,
            rounds: rounds as u64,
            ..Default::default()
        };

        for op in graph.ops().iter() {
            match op.kind {
                AccessKind::Load => report.loads += 1,
                AccessKind::Store => report.stores += 1,
            }
            match (op.barrier, op.emits_barrier()) {
                (BarrierKind::None, _) => report.unbarriered += 1,
                (BarrierKind::Read, true) => report.required_read += 1,
                (BarrierKind::Read, false) => report.elided_read += 1,
                (BarrierKind::Write, true) => report.required_write += 1,
                (BarrierKind::Write, false) => report.elided_write += 1,
            }
        }

        report
    }

    /// Aggregate of a batch of reports.
    pub fn total<'r>(reports: impl IntoIterator<Item = &'r ElisionReport>) -> Self {
        let mut total = Self {
            method: "total".to_string(),
            ..Default::default()
        };
        for report in reports {
            total.merge(report);
        }
        total
    }

    /// Merge counts from another report; the method name is kept.
    pub fn merge(&mut self, other: &ElisionReport) {
        self.loads += other.loads;
        self.stores += other.stores;
        self.unbarriered += other.unbarriered;
        self.required_read += other.required_read;
        self.required_write += other.required_write;
        self.elided_read += other.elided_read;
        self.elided_write += other.elided_write;
        self.safepoints += other.safepoints;
        self.rounds += other.rounds;
        self.fallback |= other.fallback;
    }

    /// Barriers code emission has to produce
    #[inline]
    pub fn required(&self) -> u64 {
        self.required_read + self.required_write
    }

    #[inline]
    pub fn elided(&self) -> u64 {
        self.elided_read + self.elided_write
    }

    /// Accesses that asked for a barrier
    #[inline]
    pub fn barriered(&self) -> u64 {
        self.required() + self.elided()
    }

    /// Elided share of barriered accesses (percentage)
    pub fn elision_rate(&self) -> f64 {
        match self.barriered() {
            0 => 0.0,
            n => self.elided() as f64 / n as f64 * 100.0,
        }
    }
}

impl fmt::Display for ElisionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Barrier elision for {}:", self.method)?;
        writeln!(
            f,
            "  Accesses: {} loads, {} stores ({} unbarriered)",
            self.loads, self.stores, self.unbarriered
        )?;
        writeln!(
            f,
            "  Required: {} (read {}, write {})",
            self.required(),
            self.required_read,
            self.required_write
        )?;
        writeln!(
            f,
            "  Elided: {} (read {}, write {}) ({:.2}%)",
            self.elided(),
            self.elided_read,
            self.elided_write,
            self.elision_rate()
        )?;
        write!(
            f,
            "  Safepoints: {}, dataflow rounds: {}",
            self.safepoints, self.rounds
        )?;
        if self.fallback {
            write!(f, "\n  Fallback: all barriers kept")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use elide_ir::{Decision, LocationKey, SafepointKind};

    fn annotated() -> MemoryOpGraph {
        let mut g = MemoryOpGraph::new("sample");
        let b0 = g.add_block().unwrap();
        let p = g.add_param().unwrap();
        let key = LocationKey::field(p, 8);
        let r0 = g.add_op(b0, AccessKind::Load, key, BarrierKind::Read).unwrap();
        let r1 = g.add_op(b0, AccessKind::Load, key, BarrierKind::Read).unwrap();
        g.add_safepoint(b0, SafepointKind::Poll).unwrap();
        let w0 = g.add_op(b0, AccessKind::Store, key, BarrierKind::Write).unwrap();
        let raw = g
            .add_op(b0, AccessKind::Store, LocationKey::unknown(p), BarrierKind::None)
            .unwrap();
        g.finalize().unwrap();
        g.annotate(r0, Decision::Required);
        g.annotate(r1, Decision::Elidable);
        g.annotate(w0, Decision::Required);
        g.annotate(raw, Decision::Required);
        g
    }

    #[test]
    fn test_counts_from_annotations() {
        let report = ElisionReport::from_graph(&annotated(), 2);
        assert_eq!(report.method, "sample");
        assert_eq!((report.loads, report.stores), (2, 2));
        assert_eq!(report.unbarriered, 1);
        assert_eq!((report.required_read, report.elided_read), (1, 1));
        assert_eq!((report.required_write, report.elided_write), (1, 0));
        assert_eq!(report.required(), 2);
        assert_eq!(report.elided(), 1);
        assert_eq!(report.safepoints, 1);
        assert!((report.elision_rate() - 100.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_rate_is_zero() {
        assert_eq!(ElisionReport::default().elision_rate(), 0.0);
    }

    #[test]
    fn test_merge_and_total() {
        let one = ElisionReport::from_graph(&annotated(), 2);
        let mut failed = one.clone();
        failed.fallback = true;

        let total = ElisionReport::total([&one, &failed]);
        assert_eq!(total.method, "total");
        assert_eq!(total.required(), 4);
        assert_eq!(total.elided(), 2);
        assert_eq!(total.rounds, 4);
        assert!(total.fallback);
    }

    #[test]
    fn test_display_and_json() {
        let report = ElisionReport::from_graph(&annotated(), 2);
        let text = report.to_string();
        assert!(text.starts_with("Barrier elision for sample:"));
        assert!(text.contains("Required: 2 (read 1, write 1)"));
        assert!(text.contains("(33.33%)"));
        assert!(!text.contains("Fallback"));

        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"elided_read\":1"));
        let back: ElisionReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back, report);
    }
}
