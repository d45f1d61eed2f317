//! Binary-storage collaborator seam
//!
//! Only existence and count signals cross this boundary, never file content.

use async_trait::async_trait;
use onboard_model::RecordId;
use std::fmt::Debug;

/// Document existence signal from binary storage
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentSignal: Send + Sync + Debug {
    /// Number of active stored documents for a record, `None` when unknown
    async fn active_document_count(&self, record: RecordId) -> Option<usize>;
}
