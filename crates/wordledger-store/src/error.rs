// ABOUTME: Error taxonomy for ledger storage and merge operations.
// ABOUTME: Classifies SQLite failures into transient, uniqueness, referential, and fatal categories.

use rusqlite::ErrorCode;
use rusqlite::ffi;
use thiserror::Error;
use wordledger_core::ObservationError;

/// Errors raised by the ledger store primitives.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("lemma already exists: {0:?}")]
    DuplicateLemma(String),

    #[error("word not found: id {0}")]
    NotFound(i64),

    #[error("context references missing word id {0}")]
    ReferentialViolation(i64),

    #[error("transient storage failure: {0}")]
    Transient(#[source] rusqlite::Error),

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("sqlite error: {0}")]
    Sqlite(#[source] rusqlite::Error),
}

impl StoreError {
    /// Whether retrying the whole unit of work can succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Transient(_) | StoreError::DuplicateLemma(_))
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match err.sqlite_error_code() {
            Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) => StoreError::Transient(err),
            _ => StoreError::Sqlite(err),
        }
    }
}

/// True when `err` is a violation of a UNIQUE constraint.
pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

/// True when `err` is a violation of a FOREIGN KEY constraint.
pub(crate) fn is_foreign_key_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.extended_code == ffi::SQLITE_CONSTRAINT_FOREIGNKEY
    )
}

/// Errors surfaced by the ledger's units of work.
#[derive(Debug, Error)]
pub enum MergeError {
    #[error("invalid observation: {0}")]
    InvalidObservation(#[from] ObservationError),

    #[error("merging {lemma:?} from {sentence:?} failed: {source}")]
    Observation {
        lemma: String,
        sentence: String,
        #[source]
        source: StoreError,
    },

    #[error("unit of work failed after {attempts} attempts: {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: Box<MergeError>,
    },

    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

impl MergeError {
    /// Whether the failure came from a store error that may clear on retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            MergeError::Observation { source, .. } | MergeError::Store(source) => {
                source.is_retryable()
            }
            MergeError::InvalidObservation(_) | MergeError::RetriesExhausted { .. } => false,
        }
    }

    /// The underlying store error, unwrapping retry and observation context.
    pub fn store_error(&self) -> Option<&StoreError> {
        match self {
            MergeError::Observation { source, .. } | MergeError::Store(source) => Some(source),
            MergeError::RetriesExhausted { source, .. } => source.store_error(),
            MergeError::InvalidObservation(_) => None,
        }
    }
}
