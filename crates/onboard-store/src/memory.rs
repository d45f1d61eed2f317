//! In-memory store
//!
//! One `RwLock` per record inside a `DashMap`. Commits apply to a copy under
//! the write lock and swap it in only on success, so readers see either the
//! old or the new record and never a half-applied batch. No lock is held
//! across an await point.

use crate::commit::StageCommit;
use crate::error::StoreError;
use crate::store::OnboardingStore;
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use onboard_model::{OnboardingRecord, RecordId, Stage, StageProgress, StageView};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::trace;

/// In-memory [`OnboardingStore`] with fault injection for tests
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: DashMap<RecordId, Arc<RwLock<OnboardingRecord>>>,
    unavailable: AtomicBool,
    failing_flag_writes: AtomicBool,
    failing_snapshots: AtomicBool,
}

impl MemoryStore {
    /// Empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store holds no records
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Make every operation fail with [`StoreError::Unavailable`]
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Make legacy flag writes fail with [`StoreError::Unavailable`]
    pub fn fail_flag_writes(&self, failing: bool) {
        self.failing_flag_writes.store(failing, Ordering::SeqCst);
    }

    /// Make whole-record snapshots fail with [`StoreError::Unavailable`]
    pub fn fail_snapshots(&self, failing: bool) {
        self.failing_snapshots.store(failing, Ordering::SeqCst);
    }

    fn ensure_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store switched off".into()));
        }
        Ok(())
    }

    fn record(&self, id: RecordId) -> Result<Arc<RwLock<OnboardingRecord>>, StoreError> {
        self.ensure_available()?;
        self.records
            .get(&id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(StoreError::NotFound(id))
    }
}

#[async_trait]
impl OnboardingStore for MemoryStore {
    async fn insert_record(&self, record: OnboardingRecord) -> Result<(), StoreError> {
        self.ensure_available()?;
        match self.records.entry(record.id) {
            Entry::Occupied(_) => Err(StoreError::AlreadyExists(record.id)),
            Entry::Vacant(slot) => {
                trace!(record = %record.id, "record inserted");
                slot.insert(Arc::new(RwLock::new(record)));
                Ok(())
            }
        }
    }

    async fn snapshot(&self, id: RecordId) -> Result<OnboardingRecord, StoreError> {
        let record = self.record(id)?;
        if self.failing_snapshots.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("snapshot read rejected".into()));
        }
        let snapshot = record.read().clone();
        Ok(snapshot)
    }

    async fn stage_view(&self, id: RecordId, stage: Stage) -> Result<StageView, StoreError> {
        let record = self.record(id)?;
        let view = record.read().view(stage);
        Ok(view)
    }

    async fn commit(&self, commit: StageCommit) -> Result<StageProgress, StoreError> {
        let record = self.record(commit.record_id)?;
        let mut guard = record.write();
        let mut next = guard.clone();
        let progress = commit.apply_to(&mut next)?;
        *guard = next;
        trace!(
            record = %commit.record_id,
            stage = %commit.stage,
            version = progress.version,
            "commit applied"
        );
        Ok(progress)
    }

    async fn write_legacy_flag(
        &self,
        id: RecordId,
        stage: Stage,
        value: bool,
    ) -> Result<(), StoreError> {
        let record = self.record(id)?;
        if self.failing_flag_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("legacy flag write rejected".into()));
        }
        record.write().flags.set(stage, value);
        Ok(())
    }
}
