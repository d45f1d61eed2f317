//! Onboarding Model
//!
//! Strongly-typed building blocks shared by every layer of the onboarding
//! workflow.
//!
//! # Core Concepts
//!
//! - [`Stage`]: one of the ten fixed onboarding steps (ordinal 1..=10)
//! - [`FieldValue`]: a coerced, typed canonical value
//! - [`StageProgress`] / [`FieldProgress`]: lifecycle and restoration rows
//! - [`EntityRow`]: a child entity of a collection stage
//! - [`OnboardingRecord`]: the property being onboarded, with all of the above
//! - [`LegacyFlags`]: the ten derived completion booleans
//!
//! # Example
//!
//! ```rust
//! use onboard_model::{ActorId, OnboardingRecord, RecordId, Stage};
//! use chrono::Utc;
//!
//! let record = OnboardingRecord::new(RecordId::new(), ActorId::new("agent-7"), Utc::now());
//! assert!(record.progress(Stage::Property).is_none());
//! assert_eq!(Stage::try_from(5u8).unwrap(), Stage::Credentials);
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod clock;
mod error;
mod flags;
mod ids;
mod progress;
mod record;
mod stage;
mod value;

// Re-exports
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::ModelError;
pub use flags::LegacyFlags;
pub use ids::{ActorId, EntityId, RecordId};
pub use progress::{FieldProgress, FieldStatus, StageProgress, StageStatus};
pub use record::{EntityRow, OnboardingRecord, ScalarSection, StageView};
pub use stage::Stage;
pub use value::{FieldKind, FieldValue};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
