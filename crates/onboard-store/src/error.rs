//! Error types for onboarding persistence

use onboard_model::{RecordId, Stage};

/// Store and write-path errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Record does not exist
    #[error("record not found: {0}")]
    NotFound(RecordId),

    /// Record was already created
    #[error("record already exists: {0}")]
    AlreadyExists(RecordId),

    /// Stored version differs from the one the write was planned against
    #[error("version mismatch on {record}/{stage}: expected {expected}, stored {actual}")]
    VersionMismatch {
        /// Record
        record: RecordId,
        /// Stage
        stage: Stage,
        /// Version the writer saw
        expected: u64,
        /// Version actually stored
        actual: u64,
    },

    /// Backend cannot be reached
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Commit refers to state that does not exist
    #[error("invalid commit: {0}")]
    InvalidCommit(String),
}

impl StoreError {
    /// Whether this is an optimistic-concurrency conflict
    #[inline]
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::VersionMismatch { .. })
    }
}
