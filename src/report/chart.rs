use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::ingest::matrix::StatusMatrix;

/// The two series an operator dashboard plots: total volume per bucket, and
/// the stacked share of each problematic status.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChartData {
    pub totals: Vec<(String, u64)>,
    pub problematic_columns: Vec<String>,
    pub problematic_percentages: Vec<(String, Vec<f64>)>,
}

impl ChartData {
    pub fn from_matrix(matrix: &StatusMatrix) -> Self {
        let columns = matrix.problematic_columns();
        let problematic_percentages = matrix
            .times()
            .iter()
            .enumerate()
            .map(|(i, time)| {
                let shares = matrix.shares(i);
                (time.clone(), columns.iter().map(|&c| shares[c]).collect())
            })
            .collect();

        Self {
            totals: matrix.totals(),
            problematic_columns: columns
                .iter()
                .map(|&c| matrix.statuses()[c].clone())
                .collect(),
            problematic_percentages,
        }
    }

    /// Write `<stem>_totals.csv` and `<stem>_problematic_pct.csv` into `dir`.
    pub fn export(&self, dir: impl AsRef<Path>, stem: &str) -> eyre::Result<Vec<PathBuf>> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)
            .map_err(|e| eyre::eyre!("Failed to create chart directory '{}': {}", dir.display(), e))?;

        let totals_path = dir.join(format!("{stem}_totals.csv"));
        let mut writer = csv::Writer::from_path(&totals_path)?;
        writer.write_record(["time", "total_transactions"])?;
        for (time, total) in &self.totals {
            writer.write_record([time.clone(), total.to_string()])?;
        }
        writer.flush()?;

        let pct_path = dir.join(format!("{stem}_problematic_pct.csv"));
        let mut writer = csv::Writer::from_path(&pct_path)?;
        let mut header = vec!["time".to_string()];
        header.extend(self.problematic_columns.iter().cloned());
        writer.write_record(&header)?;
        for (time, shares) in &self.problematic_percentages {
            let mut row = vec![time.clone()];
            row.extend(shares.iter().map(|s| format!("{s:.4}")));
            writer.write_record(&row)?;
        }
        writer.flush()?;

        tracing::debug!(dir = %dir.display(), stem, "Chart data exported");
        Ok(vec![totals_path, pct_path])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::types::TransactionRecord;

    fn matrix() -> StatusMatrix {
        StatusMatrix::from_records(&[
            TransactionRecord::new("09:00", "approved", 90),
            TransactionRecord::new("09:00", "denied", 6),
            TransactionRecord::new("09:00", "backend_reversed", 4),
            TransactionRecord::new("09:01", "approved", 0),
        ])
        .unwrap()
    }

    #[test]
    fn test_from_matrix() {
        let chart = ChartData::from_matrix(&matrix());
        assert_eq!(
            chart.totals,
            vec![("09:00".to_string(), 100), ("09:01".to_string(), 0)]
        );
        assert_eq!(chart.problematic_columns, vec!["denied", "backend_reversed"]);
        assert_eq!(chart.problematic_percentages[0].1, vec![6.0, 4.0]);
        assert_eq!(chart.problematic_percentages[1].1, vec![0.0, 0.0]);
    }

    #[test]
    fn test_empty_matrix() {
        let chart = ChartData::from_matrix(&StatusMatrix::default());
        assert_eq!(chart, ChartData::default());
    }

    #[test]
    fn test_export_writes_csv() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ChartData::from_matrix(&matrix())
            .export(dir.path().join("charts"), "transactions_1")
            .unwrap();
        assert_eq!(paths.len(), 2);

        let totals = std::fs::read_to_string(&paths[0]).unwrap();
        assert_eq!(totals, "time,total_transactions\n09:00,100\n09:01,0\n");

        let pct = std::fs::read_to_string(&paths[1]).unwrap();
        let mut lines = pct.lines();
        assert_eq!(lines.next(), Some("time,denied,backend_reversed"));
        assert_eq!(lines.next(), Some("09:00,6.0000,4.0000"));
    }
}
