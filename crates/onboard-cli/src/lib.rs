//! Onboarding CLI
//!
//! Library half of the `onboard` binary: scenario replay against an
//! in-memory store, catalogue listing and subscriber setup.

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod scenario;
pub mod stages;
pub mod telemetry;

// Re-exports
pub use scenario::{Replayer, ReplayReport, Scenario, Step, StepReport, StepResult, SubmitStep};
pub use stages::{catalog_json, render_catalog};
