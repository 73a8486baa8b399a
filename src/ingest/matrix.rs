use std::collections::{BTreeMap, HashMap};

use chrono::{Duration, NaiveTime};

use super::error::IngestError;
use super::types::{StatusCategory, TransactionRecord, CANONICAL_STATUS_ORDER};

/// Transaction counts pivoted into one row per time bucket and one column per status.
///
/// Rows are sorted by time label. Every status has a (possibly zero) cell in every row,
/// so a row sum is the bucket's true transaction total.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusMatrix {
    times: Vec<String>,
    statuses: Vec<String>,
    counts: Vec<Vec<u64>>,
}

impl StatusMatrix {
    /// Sum counts per (time, status) and pivot them into a matrix.
    ///
    /// Fails when a bucket's total does not fit in a `u64`, which also keeps
    /// every later row sum in range.
    pub fn from_records(records: &[TransactionRecord]) -> Result<Self, IngestError> {
        let mut encountered: Vec<&str> = Vec::new();
        let mut cells: BTreeMap<&str, HashMap<&str, u64>> = BTreeMap::new();
        let mut bucket_totals: HashMap<&str, u64> = HashMap::new();

        for record in records {
            if !encountered.contains(&record.status.as_str()) {
                encountered.push(&record.status);
            }
            let overflow = || IngestError::CountOverflow {
                time: record.time.clone(),
            };
            let total = bucket_totals.entry(&record.time).or_insert(0);
            *total = total.checked_add(record.count).ok_or_else(overflow)?;
            let cell = cells
                .entry(&record.time)
                .or_default()
                .entry(&record.status)
                .or_insert(0);
            *cell = cell.checked_add(record.count).ok_or_else(overflow)?;
        }

        let statuses = order_statuses(&encountered);
        let mut times = Vec::with_capacity(cells.len());
        let mut counts = Vec::with_capacity(cells.len());
        for (time, by_status) in cells {
            times.push(time.to_string());
            counts.push(
                statuses
                    .iter()
                    .map(|s| by_status.get(s.as_str()).copied().unwrap_or(0))
                    .collect(),
            );
        }

        Ok(Self {
            times,
            statuses,
            counts,
        })
    }

    /// Add a zero row for every minute of the day that has no data yet.
    /// Labels that are not `HH:MM` are left in place.
    pub fn fill_missing_minutes(self) -> Self {
        let width = self.statuses.len();
        let mut rows: BTreeMap<String, Vec<u64>> =
            self.times.into_iter().zip(self.counts).collect();

        let mut minute = NaiveTime::MIN;
        for _ in 0..24 * 60 {
            rows.entry(minute.format("%H:%M").to_string())
                .or_insert_with(|| vec![0; width]);
            minute = minute + Duration::minutes(1);
        }

        let (times, counts) = rows.into_iter().unzip();
        Self {
            times,
            statuses: self.statuses,
            counts,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn times(&self) -> &[String] {
        &self.times
    }

    pub fn statuses(&self) -> &[String] {
        &self.statuses
    }

    pub fn count(&self, time: &str, status: &str) -> Option<u64> {
        let row = self.times.iter().position(|t| t == time)?;
        let col = self.statuses.iter().position(|s| s == status)?;
        Some(self.counts[row][col])
    }

    pub fn row_total(&self, index: usize) -> u64 {
        self.counts[index].iter().sum()
    }

    /// Percentage share of each status in a row. A zero-total row yields all zeros.
    pub fn shares(&self, index: usize) -> Vec<f64> {
        let total = self.row_total(index);
        self.counts[index]
            .iter()
            .map(|&c| percentage(c, total))
            .collect()
    }

    /// Column indices whose status is failed, reversed (any flavour) or denied.
    pub fn problematic_columns(&self) -> Vec<usize> {
        self.statuses
            .iter()
            .enumerate()
            .filter(|(_, s)| StatusCategory::from_status(s).is_problematic())
            .map(|(i, _)| i)
            .collect()
    }

    /// Combined share of all problematic statuses in a row.
    pub fn problematic_share(&self, index: usize) -> f64 {
        let shares = self.shares(index);
        self.problematic_columns().iter().map(|&c| shares[c]).sum()
    }

    /// Total transactions per time bucket.
    pub fn totals(&self) -> Vec<(String, u64)> {
        self.times
            .iter()
            .enumerate()
            .map(|(i, t)| (t.clone(), self.row_total(i)))
            .collect()
    }
}

/// `part / total * 100`, defined as 0 when the total is 0.
pub fn percentage(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 * 100.0 / total as f64
    }
}

/// Canonical statuses first (when present), then unknown ones in encounter order.
fn order_statuses(encountered: &[&str]) -> Vec<String> {
    let mut ordered: Vec<String> = CANONICAL_STATUS_ORDER
        .iter()
        .filter(|s| encountered.contains(*s))
        .map(|s| s.to_string())
        .collect();
    for status in encountered {
        if !CANONICAL_STATUS_ORDER.contains(status) {
            ordered.push(status.to_string());
        }
    }
    ordered
}
