//! Aggregated, field-level validation errors

use onboard_model::Stage;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One problem with one field
///
/// Entity fields use `collection[index].field` paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Canonical field name or entity path
    pub field: String,
    /// Human-readable message
    pub message: String,
}

impl FieldError {
    /// Create a field error
    #[inline]
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Missing required field
    #[inline]
    #[must_use]
    pub fn required(field: impl Into<String>) -> Self {
        Self::new(field, "is required")
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Every missing or invalid field of one submission, never just the first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    /// Stage being validated, `None` when the stage itself was invalid
    pub stage: Option<Stage>,
    /// One entry per missing/invalid field
    pub errors: Vec<FieldError>,
}

impl ValidationError {
    /// Aggregate errors for a stage
    #[inline]
    #[must_use]
    pub fn new(stage: Option<Stage>, errors: Vec<FieldError>) -> Self {
        Self { stage, errors }
    }

    /// Single-field failure
    #[must_use]
    pub fn single(
        stage: Option<Stage>,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(stage, vec![FieldError::new(field, message)])
    }

    /// Field names (or entity paths) that failed
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.errors.iter().map(|e| e.field.as_str())
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.stage {
            Some(stage) => write!(f, "validation failed for stage {stage}")?,
            None => f.write_str("validation failed")?,
        }
        for (i, error) in self.errors.iter().enumerate() {
            f.write_str(if i == 0 { ": " } else { "; " })?;
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}
