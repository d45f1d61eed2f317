//! The onboarding record and its per-stage contents

use crate::flags::LegacyFlags;
use crate::ids::{ActorId, EntityId, RecordId};
use crate::progress::{FieldProgress, StageProgress};
use crate::stage::Stage;
use crate::value::FieldValue;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Persisted values of one scalar stage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScalarSection {
    /// Canonical field name to value; cleared fields are absent
    pub values: BTreeMap<String, FieldValue>,
    /// Last writer
    pub updated_by: Option<ActorId>,
    /// Last write time
    pub updated_at: Option<DateTime<Utc>>,
}

impl ScalarSection {
    /// Value of a canonical field
    #[inline]
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.values.get(field)
    }
}

/// A child entity of a collection stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRow {
    /// Row identity
    pub id: EntityId,
    /// Normalised natural key used for replace-by-natural-key matching
    pub natural_key: String,
    /// Canonical field values
    pub fields: BTreeMap<String, FieldValue>,
    /// Deactivated rows are kept but ignored by completion
    pub active: bool,
    /// Creating actor
    pub created_by: ActorId,
    /// Last writer
    pub updated_by: ActorId,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last write time
    pub updated_at: DateTime<Utc>,
}

impl EntityRow {
    /// Value of a canonical field
    #[inline]
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    /// Boolean field, `None` when absent or not boolean
    #[inline]
    #[must_use]
    pub fn flag(&self, field: &str) -> Option<bool> {
        self.get(field).and_then(FieldValue::as_bool)
    }
}

/// The property being onboarded
///
/// Created once, then mutated incrementally by stage commits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnboardingRecord {
    /// Record identity
    pub id: RecordId,
    /// Creating actor
    pub created_by: ActorId,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last commit time
    pub updated_at: DateTime<Utc>,
    /// Scalar stage values
    pub sections: BTreeMap<Stage, ScalarSection>,
    /// Collection stage entity tables
    pub entities: BTreeMap<Stage, Vec<EntityRow>>,
    /// Stage progress rows, created lazily
    pub progress: BTreeMap<Stage, StageProgress>,
    /// Field progress rows per stage, created lazily
    pub fields: BTreeMap<Stage, BTreeMap<String, FieldProgress>>,
    /// Legacy completion flags
    pub flags: LegacyFlags,
}

impl OnboardingRecord {
    /// Empty record
    #[must_use]
    pub fn new(id: RecordId, created_by: ActorId, now: DateTime<Utc>) -> Self {
        Self {
            id,
            created_by,
            created_at: now,
            updated_at: now,
            sections: BTreeMap::new(),
            entities: BTreeMap::new(),
            progress: BTreeMap::new(),
            fields: BTreeMap::new(),
            flags: LegacyFlags::new(),
        }
    }

    /// Scalar section of a stage, if anything was ever written
    #[inline]
    #[must_use]
    pub fn section(&self, stage: Stage) -> Option<&ScalarSection> {
        self.sections.get(&stage)
    }

    /// Value of a scalar field
    #[must_use]
    pub fn value(&self, stage: Stage, field: &str) -> Option<&FieldValue> {
        self.section(stage).and_then(|s| s.get(field))
    }

    /// All entity rows of a collection stage, active or not
    #[must_use]
    pub fn entities(&self, stage: Stage) -> &[EntityRow] {
        self.entities.get(&stage).map_or(&[][..], Vec::as_slice)
    }

    /// Active entity rows of a collection stage
    pub fn active_entities(&self, stage: Stage) -> impl Iterator<Item = &EntityRow> {
        self.entities(stage).iter().filter(|row| row.active)
    }

    /// Stage progress row, if the stage was ever touched
    #[inline]
    #[must_use]
    pub fn progress(&self, stage: Stage) -> Option<&StageProgress> {
        self.progress.get(&stage)
    }

    /// Stored version of a stage (0 when no row exists)
    #[inline]
    #[must_use]
    pub fn version(&self, stage: Stage) -> u64 {
        self.progress(stage).map_or(0, |p| p.version)
    }

    /// Field progress rows of a stage
    #[must_use]
    pub fn field_progress(&self, stage: Stage) -> Option<&BTreeMap<String, FieldProgress>> {
        self.fields.get(&stage)
    }

    /// Owned slice of everything a single stage write needs
    #[must_use]
    pub fn view(&self, stage: Stage) -> StageView {
        StageView {
            record_id: self.id,
            stage,
            progress: self.progress(stage).cloned(),
            section: self.section(stage).cloned(),
            entities: self.entities(stage).to_vec(),
            fields: self.field_progress(stage).cloned().unwrap_or_default(),
        }
    }
}

/// Snapshot of one stage of one record
#[derive(Debug, Clone, PartialEq)]
pub struct StageView {
    /// Owning record
    pub record_id: RecordId,
    /// Stage
    pub stage: Stage,
    /// Progress row, `None` when the stage was never touched
    pub progress: Option<StageProgress>,
    /// Scalar values, for scalar stages
    pub section: Option<ScalarSection>,
    /// Entity rows, for collection stages
    pub entities: Vec<EntityRow>,
    /// Field progress rows
    pub fields: BTreeMap<String, FieldProgress>,
}

impl StageView {
    /// Stored version (0 when no row exists)
    #[inline]
    #[must_use]
    pub fn version(&self) -> u64 {
        self.progress.as_ref().map_or(0, |p| p.version)
    }
}
