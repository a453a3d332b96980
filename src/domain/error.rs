//! Domain error types.

use chrono::NaiveDate;

/// Top-level error type for longshort.
#[derive(Debug, thiserror::Error)]
pub enum LongshortError {
    #[error("data not found: {reason}")]
    DataNotFound { reason: String },

    #[error(
        "insufficient history for {strategy} on {date}: lookback starts {needed}, data starts {earliest}"
    )]
    InsufficientHistory {
        strategy: String,
        date: NaiveDate,
        needed: NaiveDate,
        earliest: NaiveDate,
    },

    #[error("invalid argument: {reason}")]
    InvalidArgument { reason: String },

    #[error("malformed row at line {line}: {reason}")]
    MalformedRow { line: u64, reason: String },

    #[error("malformed header: {reason}")]
    MalformedHeader { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("report error: {reason}")]
    Report { reason: String },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl LongshortError {
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        LongshortError::InvalidArgument {
            reason: reason.into(),
        }
    }
}

impl From<&LongshortError> for std::process::ExitCode {
    fn from(err: &LongshortError) -> Self {
        let code: u8 = match err {
            LongshortError::Io(_) | LongshortError::Report { .. } => 1,
            LongshortError::ConfigParse { .. }
            | LongshortError::ConfigMissing { .. }
            | LongshortError::ConfigInvalid { .. } => 2,
            LongshortError::DataNotFound { .. }
            | LongshortError::MalformedRow { .. }
            | LongshortError::MalformedHeader { .. }
            | LongshortError::Csv(_) => 3,
            LongshortError::InvalidArgument { .. } => 4,
            LongshortError::InsufficientHistory { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
