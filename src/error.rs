use std::path::PathBuf;

use thiserror::Error;

/// Failures raised by normalization, storage and querying.
#[derive(Error, Debug)]
pub enum MatchError {
    #[error("malformed record {source_name}: {reason}")]
    MalformedRecord { source_name: String, reason: String },

    #[error("invalid json in {source_name}: {source}")]
    Json {
        source_name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("invalid query: {0}")]
    InvalidQuery(String),
}

impl MatchError {
    pub fn malformed(source_name: &str, reason: impl Into<String>) -> Self {
        MatchError::MalformedRecord {
            source_name: source_name.to_string(),
            reason: reason.into(),
        }
    }

    /// True for errors caused by the input data rather than the store.
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            MatchError::MalformedRecord { .. } | MatchError::Json { .. }
        )
    }
}

pub type MatchResult<T> = Result<T, MatchError>;
