use std::collections::{BTreeSet, HashMap};

use crate::ingest::matrix::StatusMatrix;
use crate::ingest::types::{StatusCategory, TransactionRecord};

use super::types::{AlertRecord, FlaggedTimes};

/// Select the time buckets whose combined failed/reversed/denied share is
/// strictly greater than `threshold_percent`.
pub fn flag_times(matrix: &StatusMatrix, threshold_percent: f64) -> FlaggedTimes {
    matrix
        .times()
        .iter()
        .enumerate()
        .filter(|(i, _)| matrix.problematic_share(*i) > threshold_percent)
        .map(|(_, time)| time.as_str())
        .collect()
}

/// Each record's share of its own bucket's total, in record order.
/// Totals are widened to `u128` so no slice of `u64` counts can overflow them.
pub fn record_shares(records: &[TransactionRecord]) -> Vec<f64> {
    let mut bucket_totals: HashMap<&str, u128> = HashMap::new();
    for record in records {
        *bucket_totals.entry(&record.time).or_insert(0) += u128::from(record.count);
    }

    records
        .iter()
        .map(|r| match bucket_totals[r.time.as_str()] {
            0 => 0.0,
            total => r.count as f64 * 100.0 / total as f64,
        })
        .collect()
}

/// For every problematic category, list the flagged times where one of its
/// records alone reached `threshold_percent` (inclusive).
pub fn alert_categories(
    records: &[TransactionRecord],
    flagged: &FlaggedTimes,
    threshold_percent: f64,
) -> Vec<AlertRecord> {
    if flagged.is_empty() {
        return Vec::new();
    }

    let in_flagged: Vec<TransactionRecord> = records
        .iter()
        .filter(|r| flagged.contains(&r.time))
        .cloned()
        .collect();
    let shares = record_shares(&in_flagged);

    let mut by_category: HashMap<StatusCategory, BTreeSet<&str>> = HashMap::new();
    for (record, share) in in_flagged.iter().zip(shares) {
        let category = record.category();
        if category.is_problematic() && share >= threshold_percent {
            by_category.entry(category).or_default().insert(&record.time);
        }
    }

    StatusCategory::PROBLEMATIC
        .iter()
        .filter_map(|category| {
            let times = by_category.remove(category)?;
            Some(AlertRecord {
                category: *category,
                times: times.into_iter().map(String::from).collect(),
            })
        })
        .collect()
}
