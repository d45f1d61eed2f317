//! Persistence seam

use crate::commit::StageCommit;
use crate::error::StoreError;
use async_trait::async_trait;
use onboard_model::{OnboardingRecord, RecordId, Stage, StageProgress, StageView};
use std::fmt::Debug;

/// Durable home of onboarding records
///
/// Implementations must apply [`StageCommit`]s atomically, including the
/// compare-and-swap on `expected_version`, and must never expose a
/// partially applied commit to readers.
#[async_trait]
pub trait OnboardingStore: Send + Sync + Debug {
    /// Create a record
    async fn insert_record(&self, record: OnboardingRecord) -> Result<(), StoreError>;

    /// Consistent copy of a whole record
    async fn snapshot(&self, id: RecordId) -> Result<OnboardingRecord, StoreError>;

    /// Consistent copy of one stage of a record
    async fn stage_view(&self, id: RecordId, stage: Stage) -> Result<StageView, StoreError> {
        Ok(self.snapshot(id).await?.view(stage))
    }

    /// Apply a commit all-or-nothing, returning the resulting stage progress
    async fn commit(&self, commit: StageCommit) -> Result<StageProgress, StoreError>;

    /// Overwrite one legacy completion flag
    async fn write_legacy_flag(
        &self,
        id: RecordId,
        stage: Stage,
        value: bool,
    ) -> Result<(), StoreError>;
}
