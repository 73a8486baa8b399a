use thiserror::Error;

#[derive(Debug, Error)]
pub enum DetectionError {
    #[error("insufficient data: required {required}, got {got}")]
    InsufficientData { required: usize, got: usize },

    #[error("invalid parameter: {name} - {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("feature row {row} has {got} columns, expected {expected}")]
    FeatureShape {
        row: usize,
        expected: usize,
        got: usize,
    },
}
