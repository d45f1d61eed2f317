//! Legacy flag synchronizer
//!
//! Raises flags for stages the calculator reports complete. Flags ratchet:
//! nothing here ever writes `false`. Write failures are logged and swallowed
//! so the aggregate read that triggered the sync still succeeds.

use crate::completion::CompletionReport;
use onboard_model::{LegacyFlags, RecordId, Stage};
use onboard_store::OnboardingStore;
use serde::Serialize;
use tracing::{debug, warn};

/// What one synchronisation pass did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlagSyncReport {
    /// Flags after the pass; failed raises keep their stored value
    pub flags: LegacyFlags,
    /// Flags raised false → true
    pub raised: Vec<Stage>,
    /// Flags whose write failed
    pub failed: Vec<Stage>,
}

impl FlagSyncReport {
    /// Report for a pass that wrote nothing
    #[inline]
    #[must_use]
    pub fn unchanged(flags: LegacyFlags) -> Self {
        Self {
            flags,
            raised: Vec::new(),
            failed: Vec::new(),
        }
    }
}

/// Best-effort writer of derived completion flags
#[derive(Debug, Clone, Copy)]
pub struct FlagSynchronizer {
    enabled: bool,
}

impl Default for FlagSynchronizer {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl FlagSynchronizer {
    /// Synchronizer, on or off
    #[inline]
    #[must_use]
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    /// Whether passes write anything
    #[inline]
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Stages whose flag should go false → true
    #[must_use]
    pub fn pending(stored: LegacyFlags, completion: &CompletionReport) -> Vec<Stage> {
        completion
            .complete_stages()
            .filter(|stage| !stored.get(*stage))
            .collect()
    }

    /// Raise flags for complete stages; never fails
    pub async fn sync(
        &self,
        store: &dyn OnboardingStore,
        record: RecordId,
        stored: LegacyFlags,
        completion: &CompletionReport,
    ) -> FlagSyncReport {
        if !self.enabled {
            return FlagSyncReport::unchanged(stored);
        }

        let mut report = FlagSyncReport::unchanged(stored);
        for stage in Self::pending(stored, completion) {
            match store.write_legacy_flag(record, stage, true).await {
                Ok(()) => {
                    report.flags.set(stage, true);
                    report.raised.push(stage);
                }
                Err(err) => {
                    warn!(record = %record, stage = %stage, error = %err, "legacy flag write failed");
                    report.failed.push(stage);
                }
            }
        }
        if !report.raised.is_empty() {
            debug!(record = %record, raised = ?report.raised, "legacy flags raised");
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::CompletionCalculator;
    use chrono::Utc;
    use onboard_model::{ActorId, FieldValue, OnboardingRecord, ScalarSection};
    use onboard_store::MemoryStore;
    use pretty_assertions::assert_eq;

    async fn acknowledged_record(store: &MemoryStore) -> OnboardingRecord {
        let mut record = OnboardingRecord::new(RecordId::new(), ActorId::system(), Utc::now());
        let mut section = ScalarSection::default();
        section
            .values
            .insert("acknowledged".into(), FieldValue::Boolean(true));
        record.sections.insert(Stage::Review, section);
        store.insert_record(record.clone()).await.unwrap();
        record
    }

    #[tokio::test]
    async fn raises_only_complete_stages() {
        let store = MemoryStore::new();
        let record = acknowledged_record(&store).await;
        let completion = CompletionCalculator::calculate(&record, None);

        let report = FlagSynchronizer::default()
            .sync(&store, record.id, record.flags, &completion)
            .await;
        assert_eq!(report.raised, vec![Stage::Review]);
        assert_eq!(report.flags.set_stages().collect::<Vec<_>>(), vec![Stage::Review]);
        assert!(store.snapshot(record.id).await.unwrap().flags.get(Stage::Review));
    }

    #[tokio::test]
    async fn never_lowers_a_flag() {
        let store = MemoryStore::new();
        let mut record = acknowledged_record(&store).await;
        record.sections.clear();
        record.flags.set(Stage::Photos, true);
        let completion = CompletionCalculator::calculate(&record, None);

        let report = FlagSynchronizer::default()
            .sync(&store, record.id, record.flags, &completion)
            .await;
        assert!(report.raised.is_empty());
        assert!(report.flags.get(Stage::Photos));
    }

    #[tokio::test]
    async fn write_failures_are_reported_not_raised() {
        let store = MemoryStore::new();
        let record = acknowledged_record(&store).await;
        store.fail_flag_writes(true);
        let completion = CompletionCalculator::calculate(&record, None);

        let report = FlagSynchronizer::default()
            .sync(&store, record.id, record.flags, &completion)
            .await;
        assert_eq!(report.failed, vec![Stage::Review]);
        assert!(!report.flags.get(Stage::Review));
    }

    #[tokio::test]
    async fn disabled_synchronizer_writes_nothing() {
        let store = MemoryStore::new();
        let record = acknowledged_record(&store).await;
        let completion = CompletionCalculator::calculate(&record, None);

        let sync = FlagSynchronizer::new(false);
        assert!(!sync.is_enabled());
        let report = sync.sync(&store, record.id, record.flags, &completion).await;
        assert_eq!(report, FlagSyncReport::unchanged(record.flags));
        assert!(!store.snapshot(record.id).await.unwrap().flags.get(Stage::Review));
    }
}
