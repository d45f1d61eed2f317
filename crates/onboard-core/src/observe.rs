//! Observability boundary
//!
//! Called by the service after an operation has finished. Nothing here
//! returns a value or influences control flow.

use crate::completion::CompletionReport;
use crate::error::{ErrorKind, OnboardingError};
use crate::sync::FlagSyncReport;
use metrics::{counter, histogram};
use onboard_model::{ActorId, RecordId, Stage};
use onboard_store::{Intent, PersistReport, StageWriteOutcome};
use tracing::{debug, info, warn};

pub(crate) fn record_created(record: RecordId, actor: &ActorId) {
    info!(record = %record, actor = %actor, "onboarding record created");
    counter!("onboarding_records_created_total").increment(1);
}

pub(crate) fn submit_accepted(record: RecordId, stage: Stage, intent: Intent, outcome: &StageWriteOutcome) {
    counter!("onboarding_submit_total", "stage" => stage.name(), "outcome" => "accepted").increment(1);

    match &outcome.report {
        PersistReport::Scalar { set, cleared } => info!(
            record = %record,
            stage = %stage,
            ?intent,
            version = outcome.progress.version,
            status = outcome.progress.status.as_str(),
            set = set.len(),
            cleared = cleared.len(),
            "stage submitted"
        ),
        PersistReport::Collection(batch) => {
            for (op, count) in [
                ("created", batch.created),
                ("updated", batch.updated),
                ("deactivated", batch.deactivated),
                ("failed", batch.failed),
            ] {
                if count > 0 {
                    counter!("onboarding_entities_total", "stage" => stage.name(), "op" => op)
                        .increment(count as u64);
                }
            }
            info!(
                record = %record,
                stage = %stage,
                ?intent,
                version = outcome.progress.version,
                status = outcome.progress.status.as_str(),
                created = batch.created,
                updated = batch.updated,
                deactivated = batch.deactivated,
                failed = batch.failed,
                "stage submitted"
            );
        }
    }

    if !outcome.passthrough.is_empty() {
        debug!(record = %record, stage = %stage, keys = ?outcome.passthrough, "undeclared keys passed through");
    }
}

pub(crate) fn unversioned_auto_save(record: RecordId, stage: Stage) {
    warn!(record = %record, stage = %stage, "auto-save without a version, written last-write-wins");
}

pub(crate) fn aggregate_after_commit_failed(
    record: RecordId,
    stage: Stage,
    outcome: &StageWriteOutcome,
    err: &OnboardingError,
) {
    warn!(
        record = %record,
        stage = %stage,
        version = outcome.progress.version,
        error = %err,
        "stage committed but aggregate read failed"
    );
}

pub(crate) fn submit_rejected(record: RecordId, stage: Option<Stage>, err: &OnboardingError) {
    let kind = err.kind();
    counter!(
        "onboarding_submit_total",
        "stage" => stage.map_or("unknown", Stage::name),
        "outcome" => kind.as_str()
    )
    .increment(1);

    let stage = stage.map(|s| s.ordinal());
    match (kind, err) {
        (ErrorKind::Validation, OnboardingError::Validation(invalid)) => info!(
            record = %record,
            ?stage,
            errors = invalid.errors.len(),
            fields = ?invalid.fields().collect::<Vec<_>>(),
            "stage submission failed validation"
        ),
        (ErrorKind::VersionConflict, _) => info!(record = %record, ?stage, error = %err, "stale stage submission"),
        (ErrorKind::NotFound, _) => info!(record = %record, ?stage, "submission for unknown record"),
        _ => warn!(record = %record, ?stage, error = %err, "stage submission failed"),
    }
}

pub(crate) fn flags_synced(record: RecordId, report: &FlagSyncReport) {
    if !report.raised.is_empty() {
        counter!("onboarding_flag_sync_total", "outcome" => "raised").increment(report.raised.len() as u64);
        info!(record = %record, raised = ?report.raised, "legacy flags synchronised");
    }
    if !report.failed.is_empty() {
        counter!("onboarding_flag_sync_total", "outcome" => "failed").increment(report.failed.len() as u64);
    }
}

pub(crate) fn progress_read(record: RecordId, actor: Option<&ActorId>, completion: &CompletionReport) {
    histogram!("onboarding_overall_percent").record(f64::from(completion.overall_percent));
    debug!(
        record = %record,
        actor = actor.map(ActorId::as_str),
        current_stage = %completion.current_stage,
        overall = completion.overall_percent,
        "aggregate progress read"
    );
}
