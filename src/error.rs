//! Error kinds for the persisted index.
//!
//! Split along the build/disk side and the query side, with five error
//! kinds: input, I/O, invariant violation, query, and resource errors. Query
//! paths recover locally from "term not found"; every other error propagates
//! to the coordinator.

use std::path::PathBuf;

/// Errors raised while ingesting documents or building the on-disk layout.
#[derive(Debug, thiserror::Error)]
pub enum FlashError {
    #[error("malformed input at line {line}: {reason}")]
    Input { line: usize, reason: String },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invariant violation in {component}: {reason}")]
    Invariant { component: &'static str, reason: String },

    #[error("buffer pool exhausted: {0}")]
    Resource(String),
}

impl FlashError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }

    pub fn invariant(component: &'static str, reason: impl Into<String>) -> Self {
        Self::Invariant { component, reason: reason.into() }
    }
}

/// Errors raised while evaluating a query against an open index.
///
/// An unknown term is never represented here — it is handled locally as an
/// empty iterator .
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("index I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("index corrupted: {0}")]
    Corrupted(String),

    #[error("invalid query: {0}")]
    InvalidQuery(String),
}

impl From<FlashError> for QueryError {
    fn from(e: FlashError) -> Self {
        match e {
            FlashError::Io { source, .. } => QueryError::Io(source),
            FlashError::Invariant { component, reason } => {
                QueryError::Corrupted(format!("{component}: {reason}"))
            }
            other => QueryError::Corrupted(other.to_string()),
        }
    }
}
