//! Transport-facing submission request

use onboard_model::{ActorId, RecordId};
use onboard_schema::RawPayload;
use onboard_store::Intent;
use serde::{Deserialize, Serialize};

/// One stage submission as a transport delivers it
///
/// The stage is an unvalidated ordinal; out-of-range values surface as a
/// validation error on `stage`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitStage {
    /// Record
    pub record_id: RecordId,
    /// Stage ordinal, expected in 1..=10
    pub stage: i64,
    /// Raw payload, any naming convention
    #[serde(default)]
    pub payload: RawPayload,
    /// Final submit
    #[serde(default)]
    pub completed: bool,
    /// Background auto-save; logged when sent without a `version`
    #[serde(default)]
    pub is_auto_save: bool,
    /// Version the client last saw; `None` skips the conflict check
    #[serde(default)]
    pub version: Option<u64>,
    /// Stage deliberately skipped
    #[serde(default)]
    pub skipped: bool,
    /// Acting user, for audit fields
    #[serde(default = "ActorId::system", alias = "userId")]
    pub actor: ActorId,
}

impl SubmitStage {
    /// Draft submission by the system actor
    #[must_use]
    pub fn new(record_id: RecordId, stage: i64, payload: RawPayload) -> Self {
        Self {
            record_id,
            stage,
            payload,
            completed: false,
            is_auto_save: false,
            version: None,
            skipped: false,
            actor: ActorId::system(),
        }
    }

    /// As an auto-save against a known version
    #[inline]
    #[must_use]
    pub fn auto_save(mut self, version: u64) -> Self {
        self.is_auto_save = true;
        self.version = Some(version);
        self
    }

    /// With an explicit version check
    #[inline]
    #[must_use]
    pub fn at_version(mut self, version: u64) -> Self {
        self.version = Some(version);
        self
    }

    /// As a final submit
    #[inline]
    #[must_use]
    pub fn completed(mut self) -> Self {
        self.completed = true;
        self
    }

    /// As a skip
    #[inline]
    #[must_use]
    pub fn skipped(mut self) -> Self {
        self.skipped = true;
        self
    }

    /// Acting user
    #[inline]
    #[must_use]
    pub fn by(mut self, actor: ActorId) -> Self {
        self.actor = actor;
        self
    }

    /// What the client means; skip wins over final, final over draft
    #[must_use]
    pub fn intent(&self) -> Intent {
        if self.skipped {
            Intent::Skip
        } else if self.completed {
            Intent::Final
        } else {
            Intent::Draft
        }
    }
}
