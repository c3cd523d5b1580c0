//! The `analyze` command: run the pass over method description files.

use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use elide_opt::{run_batch, BarrierElision, ElisionConfig, ElisionMode, ElisionReport};
use serde::Serialize;

use crate::input::MethodDesc;

/// Arguments for the analyze command.
#[derive(Debug, Clone, Default)]
pub struct AnalyzeArgs {
    pub files: Vec<PathBuf>,
    pub json: bool,
    pub dump: bool,
    pub mode: Option<ElisionMode>,
    pub verify: bool,
    pub read_survives_safepoint: bool,
    pub write_survives_safepoint: bool,
    pub write_implies_read: bool,
    pub fresh_allocations: bool,
}

impl AnalyzeArgs {
    /// Flags only ever switch options on; they never undo the config file.
    pub fn apply(&self, mut config: ElisionConfig) -> ElisionConfig {
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        config.verify |= self.verify;
        config.survives_safepoint.read |= self.read_survives_safepoint;
        config.survives_safepoint.write |= self.write_survives_safepoint;
        config.write_implies_read |= self.write_implies_read;
        config.elide_fresh_allocations |= self.fresh_allocations;
        config
    }
}

#[derive(Debug, Serialize)]
struct AnalysisOutput<'r> {
    methods: &'r [ElisionReport],
    total: ElisionReport,
}

/// Load every file, run the pass on all methods in parallel, print reports.
pub fn run_analyze(args: AnalyzeArgs, config: ElisionConfig) -> anyhow::Result<()> {
    let config = args.apply(config);
    let pass = BarrierElision::new(config).context("invalid elision configuration")?;

    let mut graphs = Vec::with_capacity(args.files.len());
    for path in &args.files {
        let graph = MethodDesc::load(path)
            .and_then(|desc| desc.build())
            .with_context(|| format!("failed to load method from {}", path.display()))?;
        tracing::debug!("loaded {} from {}", graph.name(), path.display());
        graphs.push(graph);
    }

    let reports = run_batch(&pass, &mut graphs);
    let total = ElisionReport::total(&reports);
    for report in reports.iter().filter(|r| r.fallback) {
        tracing::warn!("{}: analysis failed, all barriers kept", report.method);
    }
    tracing::info!(
        "analyzed {} methods: {} barriers required, {} elided",
        reports.len(),
        total.required(),
        total.elided()
    );

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if args.json {
        let output = AnalysisOutput {
            methods: &reports,
            total,
        };
        serde_json::to_writer_pretty(&mut out, &output)?;
        writeln!(out)?;
    } else {
        for (report, graph) in reports.iter().zip(&graphs) {
            writeln!(out, "{}", report)?;
            if args.dump {
                writeln!(out, "{}", graph)?;
            }
            writeln!(out)?;
        }
        if reports.len() > 1 {
            writeln!(out, "{}", total)?;
        }
    }

    Ok(())
}
