//! Error types for the model layer

/// Errors raised while constructing model values from untrusted input
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// Stage ordinal outside 1..=10
    #[error("invalid stage ordinal: {0} (expected 1..=10)")]
    InvalidStageOrdinal(i64),

    /// Stage name not recognised
    #[error("unknown stage: '{0}'")]
    UnknownStage(String),

    /// Malformed record identifier
    #[error("invalid record id '{value}': {reason}")]
    InvalidRecordId {
        /// Raw input
        value: String,
        /// Parser message
        reason: String,
    },
}
