use thiserror::Error;

/// Failures while reading a transaction CSV. All of them are fatal for the file.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("failed to open '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("missing required column: {0}")]
    MissingColumn(&'static str),

    #[error("invalid transaction count '{value}' on line {line}")]
    InvalidCount { line: u64, value: String },

    #[error("transaction total for time bucket '{time}' overflows")]
    CountOverflow { time: String },
}
