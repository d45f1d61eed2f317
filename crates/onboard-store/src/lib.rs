//! Onboarding Store
//!
//! Everything on the write side of a stage submission:
//!
//! - [`OnboardingStore`]: the persistence seam, with [`MemoryStore`]
//! - [`VersionArbiter`]: per (record, stage) locks and version checks
//! - [`plan`]: the stage persister (additive scalars, replace-by-natural-key
//!   collections)
//! - [`FieldTracker`]: field progress rows for exact restoration
//! - [`StageWriter`]: the pipeline tying them together
//!
//! # Example
//!
//! ```rust
//! use onboard_model::{ActorId, OnboardingRecord, RecordId, Stage, SystemClock};
//! use onboard_store::{Intent, MemoryStore, OnboardingStore, StageSubmission, StageWriter};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let store = Arc::new(MemoryStore::new());
//! let record = OnboardingRecord::new(RecordId::new(), ActorId::system(), chrono::Utc::now());
//! let id = record.id;
//! store.insert_record(record).await.unwrap();
//!
//! let writer = StageWriter::new(store.clone(), Arc::new(SystemClock));
//! let outcome = writer
//!     .write(StageSubmission {
//!         record_id: id,
//!         stage: Stage::Property,
//!         payload: json!({"town": "Braga"}).as_object().unwrap().clone(),
//!         intent: Intent::Draft,
//!         version: Some(0),
//!         actor: ActorId::new("agent-1"),
//!     })
//!     .await
//!     .unwrap();
//! assert_eq!(outcome.progress.version, 1);
//! # });
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod arbiter;
mod commit;
mod error;
mod memory;
mod persister;
mod store;
mod tracker;
mod writer;

// Re-exports
pub use arbiter::{StageLock, VersionArbiter};
pub use commit::{EntityOp, StageChange, StageCommit};
pub use error::StoreError;
pub use memory::MemoryStore;
pub use persister::{plan, BatchReport, PersistPlan, PersistReport};
pub use store::OnboardingStore;
pub use tracker::FieldTracker;
pub use writer::{Intent, StageSubmission, StageWriteOutcome, StageWriter, WriteError};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
