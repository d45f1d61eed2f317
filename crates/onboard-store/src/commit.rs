//! Planned stage writes
//!
//! A [`StageCommit`] is everything one submission changes for one
//! (record, stage): stage data, field progress rows, the stage progress
//! transition and the version bump. Stores apply a commit all-or-nothing.

use crate::error::StoreError;
use chrono::{DateTime, Utc};
use onboard_model::{
    ActorId, EntityId, EntityRow, FieldProgress, FieldValue, OnboardingRecord, RecordId, Stage,
    StageProgress, StageStatus,
};
use onboard_schema::{FieldPatch, PatchValue};
use serde::Serialize;
use std::collections::BTreeMap;

/// One write to a collection stage's entity rows
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum EntityOp {
    /// New entity
    Create {
        /// New row id
        id: EntityId,
        /// Normalised natural key
        natural_key: String,
        /// Initial fields, defaults included
        fields: BTreeMap<String, FieldValue>,
    },
    /// Merge into an existing entity
    Update {
        /// Row id
        id: EntityId,
        /// Fields to set or clear
        patch: FieldPatch,
        /// Whether the row was inactive and comes back
        reactivate: bool,
        /// Replacement natural key
        #[serde(skip_serializing_if = "Option::is_none")]
        rekey: Option<String>,
    },
    /// Entity no longer submitted
    Deactivate {
        /// Row id
        id: EntityId,
    },
}

/// Stage data change
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StageChange {
    /// Stage data untouched
    #[default]
    None,
    /// Additive scalar merge
    Scalar {
        /// Fields to set or clear
        patch: FieldPatch,
    },
    /// Entity operations, applied in order
    Entities {
        /// Operations
        ops: Vec<EntityOp>,
    },
}

/// Everything one submission writes for one (record, stage)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageCommit {
    /// Record
    pub record_id: RecordId,
    /// Stage
    pub stage: Stage,
    /// Version the commit was planned against; `None` skips the check
    pub expected_version: Option<u64>,
    /// Whether the stage version advances
    pub bump_version: bool,
    /// Stage data change
    pub change: StageChange,
    /// Field progress upserts
    pub fields: Vec<FieldProgress>,
    /// New stage status, `None` keeps the stored one
    pub status: Option<StageStatus>,
    /// Acting user
    pub actor: ActorId,
    /// Commit time
    pub at: DateTime<Utc>,
}

impl StageCommit {
    /// Empty commit for a stage
    #[must_use]
    pub fn new(record_id: RecordId, stage: Stage, actor: ActorId, at: DateTime<Utc>) -> Self {
        Self {
            record_id,
            stage,
            expected_version: None,
            bump_version: false,
            change: StageChange::None,
            fields: Vec::new(),
            status: None,
            actor,
            at,
        }
    }

    /// Check the stored version before applying
    #[inline]
    #[must_use]
    pub fn expecting(mut self, version: Option<u64>) -> Self {
        self.expected_version = version;
        self
    }

    /// Advance the version by one on apply
    #[inline]
    #[must_use]
    pub fn bumping(mut self) -> Self {
        self.bump_version = true;
        self
    }

    /// Set the stage data change
    #[inline]
    #[must_use]
    pub fn with_change(mut self, change: StageChange) -> Self {
        self.change = change;
        self
    }

    /// Set the field progress upserts
    #[inline]
    #[must_use]
    pub fn with_fields(mut self, fields: Vec<FieldProgress>) -> Self {
        self.fields = fields;
        self
    }

    /// Set the stage status
    #[inline]
    #[must_use]
    pub fn with_status(mut self, status: StageStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Apply to a record in place
    ///
    /// Callers wanting all-or-nothing semantics apply to a copy and swap it
    /// in only on success.
    ///
    /// # Errors
    ///
    /// [`StoreError::VersionMismatch`] when an existing progress row's
    /// version differs from `expected_version`; [`StoreError::InvalidCommit`]
    /// when an entity op names a row that does not exist (or already does).
    pub fn apply_to(&self, record: &mut OnboardingRecord) -> Result<StageProgress, StoreError> {
        if record.id != self.record_id {
            return Err(StoreError::InvalidCommit(format!(
                "commit for {} applied to {}",
                self.record_id, record.id
            )));
        }

        // A first write creates the row and is accepted whatever it expected
        let existed = record.progress.contains_key(&self.stage);
        let progress = record
            .progress
            .entry(self.stage)
            .or_insert_with(|| StageProgress::new(self.record_id, self.stage, self.at));

        if let Some(expected) = self.expected_version.filter(|_| existed) {
            if progress.version != expected {
                return Err(StoreError::VersionMismatch {
                    record: self.record_id,
                    stage: self.stage,
                    expected,
                    actual: progress.version,
                });
            }
        }

        if self.bump_version {
            progress.version += 1;
        }
        if let Some(status) = self.status {
            progress.status = status;
            progress.completed_at = match status {
                StageStatus::Completed => progress.completed_at.or(Some(self.at)),
                _ => None,
            };
        }
        progress.updated_at = self.at;
        let progress = progress.clone();

        match &self.change {
            StageChange::None => {}
            StageChange::Scalar { patch } => {
                let section = record.sections.entry(self.stage).or_default();
                merge(&mut section.values, patch);
                section.updated_by = Some(self.actor.clone());
                section.updated_at = Some(self.at);
            }
            StageChange::Entities { ops } => {
                let rows = record.entities.entry(self.stage).or_default();
                for op in ops {
                    self.apply_entity_op(rows, op)?;
                }
            }
        }

        let fields = record.fields.entry(self.stage).or_default();
        for row in &self.fields {
            fields.insert(row.field.clone(), row.clone());
        }
        record.updated_at = self.at;

        Ok(progress)
    }

    fn apply_entity_op(&self, rows: &mut Vec<EntityRow>, op: &EntityOp) -> Result<(), StoreError> {
        match op {
            EntityOp::Create {
                id,
                natural_key,
                fields,
            } => {
                if rows.iter().any(|row| row.id == *id) {
                    return Err(StoreError::InvalidCommit(format!("entity {id} already exists")));
                }
                rows.push(EntityRow {
                    id: *id,
                    natural_key: natural_key.clone(),
                    fields: fields.clone(),
                    active: true,
                    created_by: self.actor.clone(),
                    updated_by: self.actor.clone(),
                    created_at: self.at,
                    updated_at: self.at,
                });
            }
            EntityOp::Update {
                id,
                patch,
                reactivate,
                rekey,
            } => {
                let row = find(rows, *id)?;
                merge(&mut row.fields, patch);
                if *reactivate {
                    row.active = true;
                }
                if let Some(key) = rekey {
                    row.natural_key.clone_from(key);
                }
                row.updated_by = self.actor.clone();
                row.updated_at = self.at;
            }
            EntityOp::Deactivate { id } => {
                let row = find(rows, *id)?;
                row.active = false;
                row.updated_by = self.actor.clone();
                row.updated_at = self.at;
            }
        }
        Ok(())
    }
}

fn find(rows: &mut [EntityRow], id: EntityId) -> Result<&mut EntityRow, StoreError> {
    rows.iter_mut()
        .find(|row| row.id == id)
        .ok_or_else(|| StoreError::InvalidCommit(format!("unknown entity {id}")))
}

/// Additive merge: sets overwrite, clears remove, untouched fields stay
fn merge(values: &mut BTreeMap<String, FieldValue>, patch: &FieldPatch) {
    for (field, change) in patch.iter() {
        match change {
            PatchValue::Set(value) => {
                values.insert(field.to_string(), value.clone());
            }
            PatchValue::Clear => {
                values.remove(field);
            }
        }
    }
}
