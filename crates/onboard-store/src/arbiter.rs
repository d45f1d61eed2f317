//! Optimistic concurrency per (record, stage)
//!
//! Writers take the key's async lock, read the stored version, decide and
//! commit while still holding it; the store's compare-and-swap on
//! `expected_version` backs this up for writers outside this process.

use crate::error::StoreError;
use dashmap::DashMap;
use onboard_model::{RecordId, Stage, StageView};
use std::fmt;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

type Key = (RecordId, Stage);

/// Per-key write serialisation and version checks
#[derive(Debug, Default)]
pub struct VersionArbiter {
    locks: DashMap<Key, Arc<Mutex<()>>>,
}

/// Exclusive right to write one (record, stage), released on drop
pub struct StageLock {
    key: Key,
    _guard: OwnedMutexGuard<()>,
}

impl fmt::Debug for StageLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageLock")
            .field("record", &self.key.0)
            .field("stage", &self.key.1)
            .finish()
    }
}

impl VersionArbiter {
    /// Arbiter with no keys
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to a key
    pub async fn lock(&self, record: RecordId, stage: Stage) -> StageLock {
        let key = (record, stage);
        let mutex = Arc::clone(self.locks.entry(key).or_default().value());
        StageLock {
            key,
            _guard: mutex.lock_owned().await,
        }
    }

    /// Accept or reject a supplied version against the stored row
    ///
    /// No row yet, or no supplied version: accepted. Otherwise the versions
    /// must be equal.
    ///
    /// # Errors
    ///
    /// [`StoreError::VersionMismatch`] carrying the stored version.
    pub fn check(view: &StageView, supplied: Option<u64>) -> Result<(), StoreError> {
        match (&view.progress, supplied) {
            (Some(progress), Some(expected)) if progress.version != expected => {
                Err(StoreError::VersionMismatch {
                    record: view.record_id,
                    stage: view.stage,
                    expected,
                    actual: progress.version,
                })
            }
            _ => Ok(()),
        }
    }

    /// Number of keys with a lock entry
    #[inline]
    #[must_use]
    pub fn tracked_keys(&self) -> usize {
        self.locks.len()
    }

    /// Drop lock entries nobody holds or waits on
    pub fn prune(&self) {
        self.locks.retain(|_, mutex| Arc::strong_count(mutex) > 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use onboard_model::{ActorId, OnboardingRecord, StageProgress};
    use std::time::Duration;

    fn view(version: Option<u64>) -> StageView {
        let mut record = OnboardingRecord::new(RecordId::new(), ActorId::system(), Utc::now());
        if let Some(version) = version {
            let mut progress = StageProgress::new(record.id, Stage::Owner, Utc::now());
            progress.version = version;
            record.progress.insert(Stage::Owner, progress);
        }
        record.view(Stage::Owner)
    }

    #[test]
    fn first_write_and_unversioned_writes_pass() {
        assert!(VersionArbiter::check(&view(None), Some(9)).is_ok());
        assert!(VersionArbiter::check(&view(Some(3)), None).is_ok());
        assert!(VersionArbiter::check(&view(Some(3)), Some(3)).is_ok());
    }

    #[test]
    fn mismatch_reports_stored_version() {
        let err = VersionArbiter::check(&view(Some(3)), Some(2)).unwrap_err();
        assert!(matches!(err, StoreError::VersionMismatch { expected: 2, actual: 3, .. }));
    }

    #[tokio::test]
    async fn same_key_is_serialised() {
        let arbiter = Arc::new(VersionArbiter::new());
        let record = RecordId::new();

        let held = arbiter.lock(record, Stage::Staff).await;
        let waiter = {
            let arbiter = Arc::clone(&arbiter);
            tokio::spawn(async move { arbiter.lock(record, Stage::Staff).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        // Other stages of the same record are independent
        let other = tokio::time::timeout(Duration::from_millis(100), arbiter.lock(record, Stage::Photos)).await;
        assert!(other.is_ok());

        drop(held);
        assert!(waiter.await.is_ok());
    }

    #[tokio::test]
    async fn prune_keeps_held_locks() {
        let arbiter = VersionArbiter::new();
        let record = RecordId::new();
        let held = arbiter.lock(record, Stage::Owner).await;
        drop(arbiter.lock(record, Stage::Banking).await);

        arbiter.prune();
        assert_eq!(arbiter.tracked_keys(), 1);
        drop(held);
        arbiter.prune();
        assert_eq!(arbiter.tracked_keys(), 0);
    }
}
