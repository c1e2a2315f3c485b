// Split Bill - Error types
// One enum for the library; binaries wrap it in anyhow at the edges.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SplitBillError {
    /// Settlement requested over zero records / zero participants.
    /// Callers show "nothing to settle", this is not fatal.
    #[error("nothing to settle: no expenses recorded")]
    EmptyInput,

    #[error("invalid record: {field}: {message}")]
    InvalidRecord { field: String, message: String },

    #[error("expense not found: {0}")]
    NotFound(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("search error: {0}")]
    Search(String),
}

impl SplitBillError {
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        SplitBillError::InvalidRecord {
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// True for the "nothing to settle" condition
    pub fn is_empty_input(&self) -> bool {
        matches!(self, SplitBillError::EmptyInput)
    }
}

pub type Result<T> = std::result::Result<T, SplitBillError>;
