use serde::Serialize;

/// Canonical column order for the statuses the payment processor emits.
pub const CANONICAL_STATUS_ORDER: [&str; 7] = [
    "processing",
    "approved",
    "refunded",
    "denied",
    "backend_reversed",
    "reversed",
    "failed",
];

/// One CSV row: a transaction count for a (time bucket, status) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionRecord {
    pub time: String,
    pub status: String,
    pub count: u64,
}

impl TransactionRecord {
    pub fn new(time: impl Into<String>, status: impl Into<String>, count: u64) -> Self {
        Self {
            time: time.into(),
            status: status.into(),
            count,
        }
    }

    pub fn category(&self) -> StatusCategory {
        StatusCategory::from_status(&self.status)
    }
}

/// Problematic status family a raw status string belongs to.
///
/// Matching is by substring, so `backend_reversed` tags as `Reversed`
/// and is counted together with plain `reversed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusCategory {
    Failed,
    Reversed,
    Denied,
    Other,
}

impl StatusCategory {
    /// Problematic categories in reporting order.
    pub const PROBLEMATIC: [StatusCategory; 3] = [Self::Failed, Self::Reversed, Self::Denied];

    pub fn from_status(status: &str) -> Self {
        if status.contains("failed") {
            Self::Failed
        } else if status.contains("reversed") {
            Self::Reversed
        } else if status.contains("denied") {
            Self::Denied
        } else {
            Self::Other
        }
    }

    pub fn is_problematic(&self) -> bool {
        !matches!(self, Self::Other)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Failed => "failed",
            Self::Reversed => "reversed",
            Self::Denied => "denied",
            Self::Other => "other",
        }
    }
}
