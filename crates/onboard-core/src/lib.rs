//! Onboarding Core
//!
//! The service transports talk to. Ties the write path from `onboard-store`
//! to read-time completion and legacy flag synchronisation.
//!
//! # Core Concepts
//!
//! - [`OnboardingService`]: create record, submit stage, aggregate progress
//! - [`CompletionCalculator`]: per-stage completion derived from data only
//! - [`FlagSynchronizer`]: best-effort, ratcheting legacy flag writes
//! - [`OnboardingConfig`]: TOML-loadable settings
//!
//! # Example
//!
//! ```rust
//! use onboard_core::{OnboardingConfig, OnboardingService, SubmitStage};
//! use onboard_model::{ActorId, Stage};
//! use onboard_store::MemoryStore;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let service = OnboardingService::new(Arc::new(MemoryStore::new()), OnboardingConfig::default());
//! let id = service.create_record(ActorId::new("agent-1")).await.unwrap();
//!
//! let payload = json!({"acknowledged": true}).as_object().unwrap().clone();
//! let outcome = service
//!     .submit_stage(SubmitStage::new(id, 10, payload).completed())
//!     .await
//!     .unwrap();
//! assert_eq!(outcome.aggregate.overall_percent, 10);
//! assert!(outcome.aggregate.flags.get(Stage::Review));
//! # });
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod aggregate;
mod completion;
mod config;
mod documents;
mod error;
mod observe;
mod request;
mod service;
mod sync;

// Re-exports
pub use aggregate::{AggregateProgress, StageFields, SubmitOutcome};
pub use completion::{CompletionCalculator, CompletionReport, StageCompletion};
pub use config::{LogConfig, OnboardingConfig};
pub use documents::DocumentSignal;
pub use error::{ErrorKind, OnboardingError};
pub use request::SubmitStage;
pub use service::OnboardingService;
pub use sync::{FlagSyncReport, FlagSynchronizer};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
