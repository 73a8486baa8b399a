use std::io::Write;
use std::path::Path;

use crate::anomaly::engine::AnomalyEngine;
use crate::anomaly::types::AnalysisReport;
use crate::config::Config;
use crate::ingest::loader;
use crate::ingest::matrix::StatusMatrix;
use crate::report::chart::ChartData;
use crate::report::console::Reporter;

/// Outcome of a multi-file run.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub analyzed: usize,
    pub failed: Vec<String>,
}

/// Orchestrates the per-file steps:
/// 1. Load and validate the CSV
/// 2. Pivot into a status matrix
/// 3. Flag, alert and detect outliers
/// 4. Export chart inputs (when configured)
/// 5. Report to the operator
pub struct FilePipeline<W: Write> {
    config: Config,
    engine: AnomalyEngine,
    reporter: Reporter<W>,
}

impl<W: Write> FilePipeline<W> {
    pub fn new(config: Config, out: W) -> Self {
        let engine = AnomalyEngine::new(&config.analysis);
        let reporter = Reporter::new(out, config.output.format, config.analysis.threshold_percent);
        Self {
            config,
            engine,
            reporter,
        }
    }

    pub fn into_output(self) -> W {
        self.reporter.into_inner()
    }

    /// Run every step for one file. Errors are fatal for this file only.
    pub fn run_file(&mut self, path: &str) -> eyre::Result<AnalysisReport> {
        let records = loader::load_records(path, &self.config.input)
            .map_err(|e| eyre::eyre!("Failed to load '{}': {}", path, e))?;

        let mut matrix = StatusMatrix::from_records(&records)
            .map_err(|e| eyre::eyre!("Failed to pivot '{}': {}", path, e))?;
        if self.config.input.fill_missing_minutes {
            matrix = matrix.fill_missing_minutes();
        }
        tracing::info!(
            file = path,
            records = records.len(),
            buckets = matrix.len(),
            statuses = matrix.statuses().len(),
            "Transactions loaded"
        );

        let report = self.engine.analyze(&records, &matrix)?;

        // Export first so a failed export leaves no half-reported file behind.
        if let Some(dir) = &self.config.output.chart_dir {
            let stem = Path::new(path)
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("transactions");
            ChartData::from_matrix(&matrix).export(dir, stem)?;
        }

        self.reporter.report(&report)?;
        Ok(report)
    }

    /// Run all files in order. A failing file is logged and skipped.
    pub fn run_all(&mut self, paths: &[String]) -> eyre::Result<RunSummary> {
        let mut summary = RunSummary::default();

        for path in paths {
            match self.run_file(path) {
                Ok(_) => {
                    summary.analyzed += 1;
                    writeln!(self.reporter_out(), "Finished analyzing {}", path)?;
                }
                Err(e) => {
                    tracing::error!(file = %path, error = %e, "File analysis failed");
                    summary.failed.push(path.clone());
                }
            }
        }

        writeln!(self.reporter_out(), "No more alerts.")?;
        Ok(summary)
    }

    fn reporter_out(&mut self) -> &mut W {
        self.reporter.out_mut()
    }
}
