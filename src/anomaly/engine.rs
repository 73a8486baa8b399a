use crate::config::AnalysisConfig;
use crate::ingest::matrix::StatusMatrix;
use crate::ingest::types::TransactionRecord;

use super::detector::{self, DetectorParams};
use super::rules;
use super::types::AnalysisReport;

/// The anomaly detection engine. Runs the threshold rules and the outlier
/// model against one file's records.
///
/// The engine holds only parameters; every call starts from a clean slate.
pub struct AnomalyEngine {
    threshold_percent: f64,
    detector: DetectorParams,
}

impl AnomalyEngine {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            threshold_percent: config.threshold_percent,
            detector: DetectorParams::from(config),
        }
    }

    pub fn threshold_percent(&self) -> f64 {
        self.threshold_percent
    }

    /// Analyze one file's records. `matrix` must be the pivot of `records`.
    pub fn analyze(
        &self,
        records: &[TransactionRecord],
        matrix: &StatusMatrix,
    ) -> eyre::Result<AnalysisReport> {
        // Step 1: Buckets where problematic traffic exceeds the threshold
        let flagged = rules::flag_times(matrix, self.threshold_percent);
        if flagged.is_empty() {
            return Ok(AnalysisReport::default());
        }

        // Step 2: Per-category alerts inside flagged buckets
        let alerts = rules::alert_categories(records, &flagged, self.threshold_percent);

        // Step 3: Outlier model over flagged problematic records
        let anomalies = detector::detect_outliers(records, &flagged, &self.detector)?;

        tracing::info!(
            buckets = matrix.len(),
            flagged = flagged.len(),
            alerts = alerts.len(),
            anomalies = anomalies.len(),
            "Analysis complete"
        );

        Ok(AnalysisReport {
            flagged,
            alerts,
            anomalies,
        })
    }
}
