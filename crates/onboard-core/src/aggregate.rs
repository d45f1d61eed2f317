//! Read models returned by the service

use crate::completion::{CompletionReport, StageCompletion};
use onboard_model::{FieldProgress, LegacyFlags, RecordId, Stage, StageProgress, StageStatus};
use onboard_store::PersistReport;
use serde::Serialize;
use std::collections::BTreeMap;

/// Whole-record progress, as returned by the aggregate read
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateProgress {
    /// Record
    pub record_id: RecordId,
    /// Lowest stage neither complete nor skipped
    pub current_stage: Stage,
    /// Per-stage completion, in ordinal order
    pub stages: Vec<StageCompletion>,
    /// Overall completion percentage
    pub overall_percent: u8,
    /// Stored version per stage, for the next auto-save
    pub versions: BTreeMap<Stage, u64>,
    /// Lifecycle status per stage
    pub statuses: BTreeMap<Stage, StageStatus>,
    /// Field progress rows per stage, declared fields first
    pub fields: BTreeMap<Stage, Vec<FieldProgress>>,
    /// Legacy flags after synchronisation
    pub flags: LegacyFlags,
}

impl AggregateProgress {
    pub(crate) fn assemble(
        record_id: RecordId,
        completion: CompletionReport,
        progress: &BTreeMap<Stage, StageProgress>,
        fields: BTreeMap<Stage, Vec<FieldProgress>>,
        flags: LegacyFlags,
    ) -> Self {
        let versions = Stage::ALL
            .into_iter()
            .map(|stage| (stage, progress.get(&stage).map_or(0, |p| p.version)))
            .collect();
        let statuses = Stage::ALL
            .into_iter()
            .map(|stage| {
                let status = progress.get(&stage).map_or(StageStatus::NotStarted, |p| p.status);
                (stage, status)
            })
            .collect();

        Self {
            record_id,
            current_stage: completion.current_stage,
            overall_percent: completion.overall_percent,
            stages: completion.stages,
            versions,
            statuses,
            fields,
            flags,
        }
    }

    /// Completion verdict for a stage
    #[inline]
    #[must_use]
    pub fn stage(&self, stage: Stage) -> &StageCompletion {
        &self.stages[stage.index()]
    }

    /// Stored version of a stage
    #[inline]
    #[must_use]
    pub fn version(&self, stage: Stage) -> u64 {
        self.versions.get(&stage).copied().unwrap_or(0)
    }

    /// Field progress row
    #[must_use]
    pub fn field(&self, stage: Stage, field: &str) -> Option<&FieldProgress> {
        self.fields.get(&stage)?.iter().find(|f| f.field == field)
    }
}

/// Restoration view of a single stage
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageFields {
    /// Record
    pub record_id: RecordId,
    /// Stage
    pub stage: Stage,
    /// Stored version
    pub version: u64,
    /// Lifecycle status
    pub status: StageStatus,
    /// Field progress rows, declared fields first
    pub fields: Vec<FieldProgress>,
}

/// Result of an accepted submission
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmitOutcome {
    /// Stage written
    pub stage: Stage,
    /// Stage progress after the write
    pub progress: StageProgress,
    /// New version
    pub version: u64,
    /// What happened to stage data
    pub report: PersistReport,
    /// Payload keys outside the stage schema
    pub passthrough: Vec<String>,
    /// Aggregate progress after the write
    pub aggregate: AggregateProgress,
}
