//! Stage and field progress rows

use crate::ids::RecordId;
use crate::stage::Stage;
use crate::value::FieldKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Lifecycle status of a stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StageStatus {
    /// Never submitted
    #[default]
    NotStarted,
    /// At least one submission, not finalised
    InProgress,
    /// Finalised by a successful final submit
    Completed,
    /// Explicitly skipped by the user
    Skipped,
}

impl StageStatus {
    /// Stable tag string
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            StageStatus::NotStarted => "not-started",
            StageStatus::InProgress => "in-progress",
            StageStatus::Completed => "completed",
            StageStatus::Skipped => "skipped",
        }
    }
}

/// Field-granular status, same vocabulary as [`StageStatus`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldStatus {
    /// Field never seen in a submission
    #[default]
    NotStarted,
    /// Field seen, but blank
    InProgress,
    /// Field seen with a non-empty value
    Completed,
    /// Stage submission was marked skipped
    Skipped,
}

/// One row per (record, stage)
///
/// `version` only ever moves forward by exactly one per accepted write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageProgress {
    /// Owning record
    pub record_id: RecordId,
    /// Stage this row tracks
    pub stage: Stage,
    /// Lifecycle status
    pub status: StageStatus,
    /// Optimistic-concurrency counter
    pub version: u64,
    /// First time the row was created
    pub started_at: DateTime<Utc>,
    /// Last write (accepted or field-only)
    pub updated_at: DateTime<Utc>,
    /// Time of the final submit, if any
    pub completed_at: Option<DateTime<Utc>>,
}

impl StageProgress {
    /// Fresh row at version 0
    #[must_use]
    pub fn new(record_id: RecordId, stage: Stage, now: DateTime<Utc>) -> Self {
        Self {
            record_id,
            stage,
            status: StageStatus::NotStarted,
            version: 0,
            started_at: now,
            updated_at: now,
            completed_at: None,
        }
    }
}

/// One row per (stage progress, field name)
///
/// Holds the last submitted raw value so a reconnecting client can restore
/// exactly what was typed, including values that failed validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldProgress {
    /// Canonical (or passthrough) field name
    pub field: String,
    /// Type tag
    pub kind: FieldKind,
    /// Last submitted value, possibly masked
    pub value: Option<Value>,
    /// Field-granular status
    pub status: FieldStatus,
    /// Whether the stage declares this field required
    pub required: bool,
    /// Last time this field was seen
    pub updated_at: Option<DateTime<Utc>>,
}

impl FieldProgress {
    /// Placeholder row for a declared field never seen in a submission
    #[must_use]
    pub fn not_started(field: impl Into<String>, kind: FieldKind, required: bool) -> Self {
        Self {
            field: field.into(),
            kind,
            value: None,
            status: FieldStatus::NotStarted,
            required,
            updated_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn statuses_serialize_kebab_case() {
        assert_eq!(
            serde_json::to_value(StageStatus::NotStarted).unwrap(),
            json!("not-started")
        );
        assert_eq!(
            serde_json::to_value(FieldStatus::InProgress).unwrap(),
            json!("in-progress")
        );
        assert_eq!(StageStatus::Skipped.as_str(), "skipped");
    }

    #[test]
    fn new_progress_starts_at_version_zero() {
        let row = StageProgress::new(RecordId::new(), Stage::Owner, Utc::now());
        assert_eq!(row.version, 0);
        assert_eq!(row.status, StageStatus::NotStarted);
        assert!(row.completed_at.is_none());
    }
}
