//! Stage write path
//!
//! `canonicalize → lock → read → version check → track → validate → plan →
//! commit`, all under the (record, stage) lock. A payload that fails
//! validation still records field progress, but stage data and the version
//! stay as they were.

use crate::arbiter::VersionArbiter;
use crate::commit::StageCommit;
use crate::error::StoreError;
use crate::persister::{plan, PersistReport};
use crate::store::OnboardingStore;
use crate::tracker::FieldTracker;
use onboard_model::{ActorId, Clock, RecordId, Stage, StageProgress, StageStatus};
use onboard_schema::{canonicalize, Mode, RawPayload, ValidationError, Validator};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::trace;

/// What the client means by a submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    /// Auto-save or draft: partial validation
    Draft,
    /// Final submit: complete validation, stage marked completed
    Final,
    /// Stage deliberately skipped: partial validation, stage marked skipped
    Skip,
}

impl Intent {
    /// Validation mode for this intent
    #[inline]
    #[must_use]
    pub const fn mode(self) -> Mode {
        match self {
            Intent::Final => Mode::Complete,
            Intent::Draft | Intent::Skip => Mode::Partial,
        }
    }

    /// Stage status after an accepted write
    #[must_use]
    pub const fn next_status(self, current: StageStatus) -> StageStatus {
        match (self, current) {
            (Intent::Final, _) => StageStatus::Completed,
            (Intent::Skip, _) => StageStatus::Skipped,
            (Intent::Draft, StageStatus::Completed) => StageStatus::Completed,
            (Intent::Draft, _) => StageStatus::InProgress,
        }
    }
}

/// One stage submission
#[derive(Debug, Clone, PartialEq)]
pub struct StageSubmission {
    /// Record
    pub record_id: RecordId,
    /// Stage
    pub stage: Stage,
    /// Raw client payload
    pub payload: RawPayload,
    /// Draft, final or skip
    pub intent: Intent,
    /// Version the client last saw; `None` skips the check
    pub version: Option<u64>,
    /// Acting user
    pub actor: ActorId,
}

/// Result of an accepted write
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageWriteOutcome {
    /// Stage progress after the commit
    pub progress: StageProgress,
    /// What happened to stage data
    pub report: PersistReport,
    /// Payload keys the schema does not declare
    pub passthrough: Vec<String>,
}

/// Write-path failures
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WriteError {
    /// Payload rejected; field progress was still recorded
    #[error(transparent)]
    Validation(ValidationError),

    /// Version conflict or storage failure
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Orchestrates one stage write
#[derive(Debug)]
pub struct StageWriter {
    store: Arc<dyn OnboardingStore>,
    arbiter: VersionArbiter,
    validator: Validator,
    tracker: FieldTracker,
    clock: Arc<dyn Clock>,
}

impl StageWriter {
    /// Writer over a store
    #[must_use]
    pub fn new(store: Arc<dyn OnboardingStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            arbiter: VersionArbiter::new(),
            validator: Validator::new(),
            tracker: FieldTracker::new(),
            clock,
        }
    }

    /// Use a configured validator
    #[inline]
    #[must_use]
    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = validator;
        self
    }

    /// Use a configured tracker
    #[inline]
    #[must_use]
    pub fn with_tracker(mut self, tracker: FieldTracker) -> Self {
        self.tracker = tracker;
        self
    }

    /// Per-key lock table
    #[inline]
    #[must_use]
    pub fn arbiter(&self) -> &VersionArbiter {
        &self.arbiter
    }

    /// Run a submission through the write path
    ///
    /// # Errors
    ///
    /// [`WriteError::Validation`] for a rejected payload,
    /// [`WriteError::Store`] for version conflicts and storage failures.
    pub async fn write(&self, submission: StageSubmission) -> Result<StageWriteOutcome, WriteError> {
        let StageSubmission {
            record_id,
            stage,
            payload,
            intent,
            version,
            actor,
        } = submission;

        let canonical = canonicalize(stage, &payload);
        let _lock = self.arbiter.lock(record_id, stage).await;

        let view = self.store.stage_view(record_id, stage).await?;
        VersionArbiter::check(&view, version)?;

        let now = self.clock.now();
        let fields = self
            .tracker
            .track(&canonical, intent == Intent::Skip, now);
        let commit = StageCommit::new(record_id, stage, actor, now)
            .expecting(version)
            .with_fields(fields);

        let validated = match self.validator.validate(&canonical, intent.mode()) {
            Ok(validated) => validated,
            Err(error) => {
                self.store.commit(commit).await?;
                trace!(record = %record_id, stage = %stage, "field progress kept for rejected payload");
                return Err(WriteError::Validation(error));
            }
        };

        let current = view.progress.as_ref().map_or(StageStatus::NotStarted, |p| p.status);
        let planned = plan(&view, &validated);
        let progress = self
            .store
            .commit(
                commit
                    .bumping()
                    .with_change(planned.change)
                    .with_status(intent.next_status(current)),
            )
            .await?;

        trace!(record = %record_id, stage = %stage, version = progress.version, "stage written");
        Ok(StageWriteOutcome {
            progress,
            report: planned.report,
            passthrough: validated.passthrough,
        })
    }
}
