use std::io::Write;

use crate::anomaly::types::{AlertRecord, AnalysisReport, AnomalyRecord};
use crate::config::ReportFormat;

/// Writes analysis results for the operator.
pub struct Reporter<W: Write> {
    out: W,
    format: ReportFormat,
    threshold_percent: f64,
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W, format: ReportFormat, threshold_percent: f64) -> Self {
        Self {
            out,
            format,
            threshold_percent,
        }
    }

    pub fn out_mut(&mut self) -> &mut W {
        &mut self.out
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Print alerts and anomalies. Nothing is written when both are empty.
    pub fn report(&mut self, report: &AnalysisReport) -> eyre::Result<()> {
        for anomaly in &report.anomalies {
            tracing::warn!(
                time = %anomaly.time,
                status = %anomaly.status,
                count = anomaly.count,
                score = anomaly.score,
                "ANOMALY DETECTED"
            );
        }

        match self.format {
            ReportFormat::Table => {
                self.write_alerts(&report.alerts)?;
                self.write_anomaly_table(&report.anomalies)?;
            }
            ReportFormat::Json => {
                if !report.alerts.is_empty() || !report.anomalies.is_empty() {
                    serde_json::to_writer_pretty(&mut self.out, report)?;
                    writeln!(self.out)?;
                }
            }
        }
        self.out.flush()?;
        Ok(())
    }

    fn write_alerts(&mut self, alerts: &[AlertRecord]) -> eyre::Result<()> {
        for alert in alerts {
            writeln!(
                self.out,
                "ALERT: {} at or above {}% at {}",
                alert.category.as_str(),
                self.threshold_percent,
                alert.times.join(", ")
            )?;
        }
        Ok(())
    }

    fn write_anomaly_table(&mut self, anomalies: &[AnomalyRecord]) -> eyre::Result<()> {
        if anomalies.is_empty() {
            return Ok(());
        }

        let status_width = anomalies
            .iter()
            .map(|a| a.status.len())
            .max()
            .unwrap_or(0)
            .max("status".len());
        let time_width = anomalies
            .iter()
            .map(|a| a.time.len())
            .max()
            .unwrap_or(0)
            .max("time".len());

        writeln!(self.out, "Anomalies Detected:")?;
        writeln!(
            self.out,
            "{:<tw$}  {:<sw$}  {:>8}  {:>7}  {:>6}",
            "time",
            "status",
            "count",
            "anomaly",
            "score",
            tw = time_width,
            sw = status_width
        )?;
        for a in anomalies {
            writeln!(
                self.out,
                "{:<tw$}  {:<sw$}  {:>8}  {:>7}  {:>6.3}",
                a.time,
                a.status,
                a.count,
                a.label.as_i8(),
                a.score,
                tw = time_width,
                sw = status_width
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anomaly::types::OutlierLabel;
    use crate::ingest::types::StatusCategory;

    fn sample_report() -> AnalysisReport {
        AnalysisReport {
            flagged: ["09:00"].into_iter().collect(),
            alerts: vec![AlertRecord {
                category: StatusCategory::Failed,
                times: vec!["09:00".to_string(), "09:04".to_string()],
            }],
            anomalies: vec![AnomalyRecord {
                time: "09:00".to_string(),
                status: "backend_reversed".to_string(),
                count: 42,
                label: OutlierLabel::Outlier,
                score: 0.71234,
            }],
        }
    }

    fn render(report: &AnalysisReport, format: ReportFormat) -> String {
        let mut reporter = Reporter::new(Vec::new(), format, 5.0);
        reporter.report(report).unwrap();
        String::from_utf8(reporter.into_inner()).unwrap()
    }

    #[test]
    fn test_empty_report_writes_nothing() {
        assert!(render(&AnalysisReport::default(), ReportFormat::Table).is_empty());
        assert!(render(&AnalysisReport::default(), ReportFormat::Json).is_empty());
    }

    #[test]
    fn test_table_output() {
        let out = render(&sample_report(), ReportFormat::Table);
        assert!(out.contains("ALERT: failed at or above 5% at 09:00, 09:04"));
        assert!(out.contains("Anomalies Detected:"));
        let row = out.lines().last().unwrap();
        assert!(row.starts_with("09:00  backend_reversed"));
        assert!(row.contains("42"));
        assert!(row.contains("-1"));
        assert!(row.ends_with("0.712"));
    }

    #[test]
    fn test_alerts_without_anomalies_skip_table() {
        let mut report = sample_report();
        report.anomalies.clear();
        let out = render(&report, ReportFormat::Table);
        assert!(out.starts_with("ALERT:"));
        assert!(!out.contains("Anomalies Detected:"));
    }

    #[test]
    fn test_json_output() {
        let out = render(&sample_report(), ReportFormat::Json);
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["alerts"][0]["category"], "failed");
        assert_eq!(value["anomalies"][0]["status"], "backend_reversed");
        assert_eq!(value["anomalies"][0]["anomaly"], -1);
        assert_eq!(value["flagged"][0], "09:00");
    }
}
