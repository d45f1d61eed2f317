//! Error types for the onboarding service
//!
//! Four outcomes a transport needs to tell apart:
//! - validation failures (aggregated, field-level, fix and resubmit)
//! - version conflicts (re-fetch and retry)
//! - missing records (surface, do not retry)
//! - persistence failures (surface, do not retry here)

use onboard_model::{RecordId, Stage};
use onboard_schema::ValidationError;
use onboard_store::{StoreError, WriteError};
use serde::Serialize;
use std::fmt;

/// Service error
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OnboardingError {
    /// Payload failed schema validation
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Supplied version is stale
    #[error("version conflict on {record}/{stage}: supplied {supplied}, current {current}")]
    VersionConflict {
        /// Record
        record: RecordId,
        /// Stage
        stage: Stage,
        /// Version the client sent
        supplied: u64,
        /// Version to re-fetch and retry from
        current: u64,
    },

    /// Record does not exist
    #[error("record not found: {0}")]
    NotFound(RecordId),

    /// Storage failed
    #[error("persistence failure: {0}")]
    Persistence(String),

    /// Configuration could not be loaded
    #[error("configuration error: {0}")]
    Config(String),
}

/// Classification of [`OnboardingError`] for transports and metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Validation failure
    Validation,
    /// Version conflict
    VersionConflict,
    /// Missing record
    NotFound,
    /// Storage failure
    Persistence,
    /// Bad configuration
    Config,
}

impl ErrorKind {
    /// Stable label
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::VersionConflict => "version_conflict",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Persistence => "persistence",
            ErrorKind::Config => "config",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl OnboardingError {
    /// Classification
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            OnboardingError::Validation(_) => ErrorKind::Validation,
            OnboardingError::VersionConflict { .. } => ErrorKind::VersionConflict,
            OnboardingError::NotFound(_) => ErrorKind::NotFound,
            OnboardingError::Persistence(_) => ErrorKind::Persistence,
            OnboardingError::Config(_) => ErrorKind::Config,
        }
    }

    /// Whether re-fetching and resubmitting can succeed unchanged
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, OnboardingError::VersionConflict { .. })
    }

    /// Field errors, for validation failures
    #[must_use]
    pub fn validation(&self) -> Option<&ValidationError> {
        match self {
            OnboardingError::Validation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for OnboardingError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => OnboardingError::NotFound(id),
            StoreError::VersionMismatch {
                record,
                stage,
                expected,
                actual,
            } => OnboardingError::VersionConflict {
                record,
                stage,
                supplied: expected,
                current: actual,
            },
            other @ (StoreError::AlreadyExists(_)
            | StoreError::Unavailable(_)
            | StoreError::InvalidCommit(_)) => OnboardingError::Persistence(other.to_string()),
        }
    }
}

impl From<WriteError> for OnboardingError {
    fn from(err: WriteError) -> Self {
        match err {
            WriteError::Validation(err) => OnboardingError::Validation(err),
            WriteError::Store(err) => err.into(),
        }
    }
}
