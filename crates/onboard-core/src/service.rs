//! Onboarding service
//!
//! Stateless apart from its collaborators: every call names its record
//! explicitly and all per-record state lives in the store.

use crate::aggregate::{AggregateProgress, StageFields, SubmitOutcome};
use crate::completion::CompletionCalculator;
use crate::config::OnboardingConfig;
use crate::documents::DocumentSignal;
use crate::error::OnboardingError;
use crate::observe;
use crate::request::SubmitStage;
use crate::sync::FlagSynchronizer;
use onboard_model::{ActorId, Clock, OnboardingRecord, RecordId, Stage, StageStatus, SystemClock};
use onboard_schema::{stage_for_ordinal, Validator};
use onboard_store::{FieldTracker, OnboardingStore, StageSubmission, StageWriter};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Entry point for transports
#[derive(Debug)]
pub struct OnboardingService {
    store: Arc<dyn OnboardingStore>,
    writer: StageWriter,
    synchronizer: FlagSynchronizer,
    documents: Option<Arc<dyn DocumentSignal>>,
    clock: Arc<dyn Clock>,
    config: OnboardingConfig,
}

impl OnboardingService {
    /// Service over a store, on the system clock
    #[must_use]
    pub fn new(store: Arc<dyn OnboardingStore>, config: OnboardingConfig) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        Self {
            writer: build_writer(&store, &clock, &config),
            synchronizer: FlagSynchronizer::new(config.sync_legacy_flags),
            documents: None,
            store,
            clock,
            config,
        }
    }

    /// Use another clock for audit timestamps
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.writer = build_writer(&self.store, &clock, &self.config);
        self.clock = clock;
        self
    }

    /// Take the documents rule from binary storage
    #[inline]
    #[must_use]
    pub fn with_document_signal(mut self, signal: Arc<dyn DocumentSignal>) -> Self {
        self.documents = Some(signal);
        self
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &OnboardingConfig {
        &self.config
    }

    /// Backing store
    #[inline]
    #[must_use]
    pub fn store(&self) -> &Arc<dyn OnboardingStore> {
        &self.store
    }

    /// Create an empty record
    ///
    /// # Errors
    ///
    /// [`OnboardingError::Persistence`] when the store rejects the insert.
    pub async fn create_record(&self, actor: ActorId) -> Result<RecordId, OnboardingError> {
        let record = OnboardingRecord::new(RecordId::new(), actor.clone(), self.clock.now());
        let id = record.id;
        self.store.insert_record(record).await?;
        observe::record_created(id, &actor);
        Ok(id)
    }

    /// Submit one stage and return the updated aggregate
    ///
    /// Arbitration depends on `version` alone; an auto-save without one is
    /// logged and written last-write-wins.
    ///
    /// # Errors
    ///
    /// - [`OnboardingError::Validation`] for a bad ordinal or payload; field
    ///   progress is still recorded for the latter
    /// - [`OnboardingError::VersionConflict`] when the supplied version is stale
    /// - [`OnboardingError::NotFound`] for an unknown record
    /// - [`OnboardingError::Persistence`] when the store fails. The aggregate
    ///   is read after the commit, so a failure of that read leaves the write
    ///   in place with its version advanced; re-read the stage with
    ///   [`stage_fields`](Self::stage_fields) before retrying.
    pub async fn submit_stage(&self, request: SubmitStage) -> Result<SubmitOutcome, OnboardingError> {
        let record_id = request.record_id;
        let stage = match stage_for_ordinal(request.stage) {
            Ok(stage) => stage,
            Err(err) => {
                let err = OnboardingError::from(err);
                observe::submit_rejected(record_id, None, &err);
                return Err(err);
            }
        };

        let result = self.submit_known_stage(stage, request).await;
        if let Err(err) = &result {
            observe::submit_rejected(record_id, Some(stage), err);
        }
        result
    }

    async fn submit_known_stage(
        &self,
        stage: Stage,
        request: SubmitStage,
    ) -> Result<SubmitOutcome, OnboardingError> {
        let intent = request.intent();
        let record_id = request.record_id;
        let actor = request.actor;
        if request.is_auto_save && request.version.is_none() {
            observe::unversioned_auto_save(record_id, stage);
        }

        let written = self
            .writer
            .write(StageSubmission {
                record_id,
                stage,
                payload: request.payload,
                intent,
                version: request.version,
                actor: actor.clone(),
            })
            .await?;
        observe::submit_accepted(record_id, stage, intent, &written);

        let aggregate = self
            .aggregate_progress(record_id, Some(actor))
            .await
            .map_err(|err| {
                observe::aggregate_after_commit_failed(record_id, stage, &written, &err);
                err
            })?;
        Ok(SubmitOutcome {
            stage,
            version: written.progress.version,
            progress: written.progress,
            report: written.report,
            passthrough: written.passthrough,
            aggregate,
        })
    }

    /// Current stage, completion, field progress and synchronised flags
    ///
    /// Idempotent apart from raising legacy flags, whose failures are
    /// swallowed.
    ///
    /// # Errors
    ///
    /// [`OnboardingError::NotFound`] for an unknown record,
    /// [`OnboardingError::Persistence`] when the snapshot cannot be read.
    pub async fn aggregate_progress(
        &self,
        record_id: RecordId,
        actor: Option<ActorId>,
    ) -> Result<AggregateProgress, OnboardingError> {
        let record = self.store.snapshot(record_id).await?;
        let document_count = match &self.documents {
            Some(signal) => signal.active_document_count(record_id).await,
            None => None,
        };

        let completion = CompletionCalculator::calculate(&record, document_count);
        observe::progress_read(record_id, actor.as_ref(), &completion);

        let synced = self
            .synchronizer
            .sync(self.store.as_ref(), record_id, record.flags, &completion)
            .await;
        observe::flags_synced(record_id, &synced);

        let fields: BTreeMap<_, _> = Stage::ALL
            .into_iter()
            .map(|stage| (stage, FieldTracker::restore(&record.view(stage))))
            .collect();

        Ok(AggregateProgress::assemble(
            record_id,
            completion,
            &record.progress,
            fields,
            synced.flags,
        ))
    }

    /// Field progress of one stage, for restoring a form
    ///
    /// # Errors
    ///
    /// [`OnboardingError::Validation`] for a bad ordinal,
    /// [`OnboardingError::NotFound`] for an unknown record.
    pub async fn stage_fields(&self, record_id: RecordId, stage: i64) -> Result<StageFields, OnboardingError> {
        let stage = stage_for_ordinal(stage)?;
        let view = self.store.stage_view(record_id, stage).await?;
        Ok(StageFields {
            record_id,
            stage,
            version: view.version(),
            status: view.progress.as_ref().map_or(StageStatus::NotStarted, |p| p.status),
            fields: FieldTracker::restore(&view),
        })
    }
}

fn build_writer(store: &Arc<dyn OnboardingStore>, clock: &Arc<dyn Clock>, config: &OnboardingConfig) -> StageWriter {
    StageWriter::new(Arc::clone(store), Arc::clone(clock))
        .with_validator(Validator::new().with_max_entities(config.max_entities_per_submission))
        .with_tracker(FieldTracker::new().with_masking(config.mask_sensitive_values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::MockDocumentSignal;
    use onboard_store::MemoryStore;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn documents_payload() -> onboard_schema::RawPayload {
        json!({"documents": [{"documentType": "deed", "fileName": "deed.pdf"}]})
            .as_object()
            .cloned()
            .unwrap()
    }

    #[tokio::test]
    async fn document_signal_decides_the_documents_stage() {
        let mut signal = MockDocumentSignal::new();
        signal.expect_active_document_count().times(2).returning(|_| Some(0));

        let store: Arc<dyn OnboardingStore> = Arc::new(MemoryStore::new());
        let service = OnboardingService::new(store, OnboardingConfig::default())
            .with_document_signal(Arc::new(signal));
        let id = service.create_record(ActorId::system()).await.unwrap();

        let outcome = service
            .submit_stage(SubmitStage::new(id, 6, documents_payload()))
            .await
            .unwrap();
        assert_eq!(outcome.report.batch().unwrap().created, 1);
        assert!(!outcome.aggregate.stage(Stage::Documents).is_complete);

        let aggregate = service.aggregate_progress(id, None).await.unwrap();
        assert!(!aggregate.flags.get(Stage::Documents));
    }

    #[tokio::test]
    async fn unknown_signal_falls_back_to_rows() {
        let mut signal = MockDocumentSignal::new();
        signal.expect_active_document_count().returning(|_| None);

        let store: Arc<dyn OnboardingStore> = Arc::new(MemoryStore::new());
        let service = OnboardingService::new(store, OnboardingConfig::default())
            .with_document_signal(Arc::new(signal));
        let id = service.create_record(ActorId::system()).await.unwrap();

        let outcome = service
            .submit_stage(SubmitStage::new(id, 6, documents_payload()))
            .await
            .unwrap();
        assert!(outcome.aggregate.stage(Stage::Documents).is_complete);
        assert!(outcome.aggregate.flags.get(Stage::Documents));
    }

    #[tokio::test]
    async fn out_of_range_ordinal_is_a_validation_error() {
        let store: Arc<dyn OnboardingStore> = Arc::new(MemoryStore::new());
        let service = OnboardingService::new(store, OnboardingConfig::default());
        let id = service.create_record(ActorId::system()).await.unwrap();

        for ordinal in [0, 11, -3] {
            let err = service
                .submit_stage(SubmitStage::new(id, ordinal, onboard_schema::RawPayload::new()))
                .await
                .unwrap_err();
            assert_eq!(err.validation().unwrap().fields().collect::<Vec<_>>(), vec!["stage"]);
        }
        assert!(service.stage_fields(id, 12).await.is_err());
    }
}
