use std::collections::BTreeSet;

use serde::Serialize;

use crate::ingest::types::StatusCategory;

/// Time buckets whose combined problematic share exceeded the threshold, in label order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FlaggedTimes(BTreeSet<String>);

impl FlaggedTimes {
    pub fn contains(&self, time: &str) -> bool {
        self.0.contains(time)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|s| s.as_str())
    }

    pub fn is_subset(&self, other: &FlaggedTimes) -> bool {
        self.0.is_subset(&other.0)
    }
}

impl<S: Into<String>> FromIterator<S> for FlaggedTimes {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Times at which one problematic category on its own reached the threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlertRecord {
    pub category: StatusCategory,
    pub times: Vec<String>,
}

/// Isolation forest verdict, serialized as the conventional `1` / `-1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutlierLabel {
    Normal,
    Outlier,
}

impl OutlierLabel {
    pub fn as_i8(&self) -> i8 {
        match self {
            Self::Normal => 1,
            Self::Outlier => -1,
        }
    }
}

impl Serialize for OutlierLabel {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i8(self.as_i8())
    }
}

/// A flagged problematic record the outlier model singled out.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnomalyRecord {
    pub time: String,
    pub status: String,
    pub count: u64,
    #[serde(rename = "anomaly")]
    pub label: OutlierLabel,
    /// Isolation score in (0, 1]; higher is easier to isolate.
    pub score: f64,
}

/// Everything the analysis produced for one input file.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub flagged: FlaggedTimes,
    pub alerts: Vec<AlertRecord>,
    pub anomalies: Vec<AnomalyRecord>,
}
