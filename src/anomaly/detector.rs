use crate::config::AnalysisConfig;
use crate::ingest::types::TransactionRecord;

use super::error::DetectionError;
use super::forest::{ForestParams, IsolationForest};
use super::rules::record_shares;
use super::types::{AnomalyRecord, FlaggedTimes, OutlierLabel};

/// Outlier model settings. Plain values, so the detector never reads config itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct DetectorParams {
    pub forest: ForestParams,
}

impl From<&AnalysisConfig> for DetectorParams {
    fn from(config: &AnalysisConfig) -> Self {
        Self {
            forest: ForestParams {
                n_estimators: config.n_estimators,
                max_samples: config.max_samples,
                contamination: config.contamination,
                random_seed: config.random_seed,
            },
        }
    }
}

/// One-hot vocabulary over the statuses seen in a single detection run.
///
/// It is rebuilt from scratch on every call, so the feature layout depends on
/// which statuses happen to be present in that run's flagged subset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusVocabulary {
    statuses: Vec<String>,
}

impl StatusVocabulary {
    pub fn fit<'a>(statuses: impl IntoIterator<Item = &'a str>) -> Self {
        let mut statuses: Vec<String> = statuses.into_iter().map(String::from).collect();
        statuses.sort();
        statuses.dedup();
        Self { statuses }
    }

    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }

    pub fn encode(&self, status: &str) -> Vec<f64> {
        self.statuses
            .iter()
            .map(|s| if s == status { 1.0 } else { 0.0 })
            .collect()
    }
}

/// Feature row: `[count, share, one-hot(status)...]`.
pub fn feature_row(record: &TransactionRecord, share: f64, vocabulary: &StatusVocabulary) -> Vec<f64> {
    let mut row = Vec::with_capacity(2 + vocabulary.len());
    row.push(record.count as f64);
    row.push(share);
    row.extend(vocabulary.encode(&record.status));
    row
}

/// Turns a feature matrix into per-row labels and scores.
pub trait OutlierScorer {
    fn label(
        &self,
        features: &[Vec<f64>],
        params: &DetectorParams,
    ) -> Result<Vec<(OutlierLabel, f64)>, DetectionError>;
}

/// Fits the forest and scores the very rows it was fitted on.
#[derive(Debug, Clone, Copy, Default)]
pub struct InSampleScorer;

impl OutlierScorer for InSampleScorer {
    fn label(
        &self,
        features: &[Vec<f64>],
        params: &DetectorParams,
    ) -> Result<Vec<(OutlierLabel, f64)>, DetectionError> {
        let forest = IsolationForest::fit(features, &params.forest)?;
        forest.predict(features)
    }
}

/// Problematic records inside flagged buckets that the isolation forest marks as outliers.
pub fn detect_outliers(
    records: &[TransactionRecord],
    flagged: &FlaggedTimes,
    params: &DetectorParams,
) -> Result<Vec<AnomalyRecord>, DetectionError> {
    detect_outliers_with(&InSampleScorer, records, flagged, params)
}

pub fn detect_outliers_with<S: OutlierScorer>(
    scorer: &S,
    records: &[TransactionRecord],
    flagged: &FlaggedTimes,
    params: &DetectorParams,
) -> Result<Vec<AnomalyRecord>, DetectionError> {
    let shares = record_shares(records);
    let candidates: Vec<(&TransactionRecord, f64)> = records
        .iter()
        .zip(shares)
        .filter(|(r, _)| r.category().is_problematic() && flagged.contains(&r.time))
        .collect();

    if candidates.len() < 2 {
        tracing::debug!(
            candidates = candidates.len(),
            "Too few flagged problematic records for outlier detection"
        );
        return Ok(Vec::new());
    }

    let vocabulary = StatusVocabulary::fit(candidates.iter().map(|(r, _)| r.status.as_str()));
    let features: Vec<Vec<f64>> = candidates
        .iter()
        .map(|(record, share)| feature_row(record, *share, &vocabulary))
        .collect();

    let labels = scorer.label(&features, params)?;
    tracing::debug!(
        candidates = candidates.len(),
        vocabulary = vocabulary.len(),
        "Outlier model scored flagged records"
    );

    Ok(candidates
        .into_iter()
        .zip(labels)
        .filter(|(_, (label, _))| *label == OutlierLabel::Outlier)
        .map(|((record, _), (label, score))| AnomalyRecord {
            time: record.time.clone(),
            status: record.status.clone(),
            count: record.count,
            label,
            score,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(time: &str, status: &str, count: u64) -> TransactionRecord {
        TransactionRecord::new(time, status, count)
    }

    /// Twenty flagged minutes with a steady failure rate and one burst of denials.
    fn flagged_day() -> (Vec<TransactionRecord>, FlaggedTimes) {
        let mut records = Vec::new();
        for minute in 0..20u64 {
            let time = format!("14:{:02}", minute);
            records.push(rec(&time, "approved", 90));
            records.push(rec(&time, "failed", 8 + minute % 3));
            records.push(rec(&time, "denied", 4 + minute % 2));
        }
        records.push(rec("14:20", "approved", 90));
        records.push(rec("14:20", "denied", 900));
        let flagged: FlaggedTimes = records.iter().map(|r| r.time.clone()).collect();
        (records, flagged)
    }

    #[test]
    fn test_vocabulary_is_sorted_and_unique() {
        let vocabulary = StatusVocabulary::fit(["reversed", "denied", "reversed", "backend_reversed"]);
        assert_eq!(vocabulary.len(), 3);
        assert_eq!(vocabulary.encode("denied"), vec![0.0, 1.0, 0.0]);
        assert_eq!(vocabulary.encode("approved"), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_feature_row_layout() {
        let vocabulary = StatusVocabulary::fit(["denied", "failed"]);
        let row = feature_row(&rec("09:00", "failed", 12), 6.0, &vocabulary);
        assert_eq!(row, vec![12.0, 6.0, 0.0, 1.0]);
    }

    #[test]
    fn test_detects_burst() {
        let (records, flagged) = flagged_day();
        let anomalies = detect_outliers(&records, &flagged, &DetectorParams::default()).unwrap();

        assert!(!anomalies.is_empty());
        assert!(anomalies
            .iter()
            .any(|a| a.time == "14:20" && a.status == "denied" && a.count == 900));
        assert!(anomalies.iter().all(|a| a.label == OutlierLabel::Outlier));
        assert!(anomalies.iter().all(|a| a.status != "approved"));
    }

    #[test]
    fn test_never_exceeds_candidates() {
        let (records, flagged) = flagged_day();
        let candidates = records
            .iter()
            .filter(|r| r.category().is_problematic() && flagged.contains(&r.time))
            .count();
        let anomalies = detect_outliers(&records, &flagged, &DetectorParams::default()).unwrap();
        assert!(anomalies.len() <= candidates);
    }

    #[test]
    fn test_deterministic_with_fixed_seed() {
        let (records, flagged) = flagged_day();
        let params = DetectorParams::default();
        let first = detect_outliers(&records, &flagged, &params).unwrap();
        let second = detect_outliers(&records, &flagged, &params).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_flagged_set() {
        let (records, _) = flagged_day();
        let anomalies =
            detect_outliers(&records, &FlaggedTimes::default(), &DetectorParams::default()).unwrap();
        assert!(anomalies.is_empty());
    }

    #[test]
    fn test_single_candidate_is_skipped() {
        let records = vec![rec("09:00", "approved", 50), rec("09:00", "failed", 50)];
        let flagged: FlaggedTimes = ["09:00"].into_iter().collect();
        let anomalies = detect_outliers(&records, &flagged, &DetectorParams::default()).unwrap();
        assert!(anomalies.is_empty());
    }

    #[test]
    fn test_single_status_still_runs() {
        let mut records = Vec::new();
        for minute in 0..15u64 {
            let time = format!("08:{:02}", minute);
            records.push(rec(&time, "approved", 100));
            records.push(rec(&time, "failed", 10));
        }
        records.push(rec("08:15", "approved", 100));
        records.push(rec("08:15", "failed", 700));
        let flagged: FlaggedTimes = records.iter().map(|r| r.time.clone()).collect();

        let anomalies = detect_outliers(&records, &flagged, &DetectorParams::default()).unwrap();
        assert!(anomalies.iter().any(|a| a.time == "08:15"));
    }

    struct FlagEverything;

    impl OutlierScorer for FlagEverything {
        fn label(
            &self,
            features: &[Vec<f64>],
            _params: &DetectorParams,
        ) -> Result<Vec<(OutlierLabel, f64)>, DetectionError> {
            Ok(vec![(OutlierLabel::Outlier, 1.0); features.len()])
        }
    }

    #[test]
    fn test_custom_scorer_sees_only_candidates() {
        let (records, flagged) = flagged_day();
        let anomalies =
            detect_outliers_with(&FlagEverything, &records, &flagged, &DetectorParams::default())
                .unwrap();
        // 20 minutes x (failed + denied) + the burst minute's denial.
        assert_eq!(anomalies.len(), 41);
    }

    #[test]
    fn test_params_from_config() {
        let config = AnalysisConfig {
            contamination: 0.2,
            random_seed: 7,
            ..AnalysisConfig::default()
        };
        let params = DetectorParams::from(&config);
        assert_eq!(params.forest.contamination, 0.2);
        assert_eq!(params.forest.random_seed, 7);
        assert_eq!(params.forest.n_estimators, 100);
    }
}
