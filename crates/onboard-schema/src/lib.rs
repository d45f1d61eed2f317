//! Onboarding Schema
//!
//! The static stage catalogue and the two pure pipeline steps that run
//! before anything touches storage:
//!
//! 1. [`canonicalize`]: alias resolution onto canonical field names
//! 2. [`Validator::validate`]: coercion and required-field enforcement in
//!    [`Mode::Partial`] (auto-save) or [`Mode::Complete`] (final submit)
//!
//! # Example
//!
//! ```rust
//! use onboard_model::Stage;
//! use onboard_schema::{canonicalize, Mode, Validator};
//! use serde_json::json;
//!
//! let raw = json!({"zipCode": "4000-123", "town": "Porto"});
//! let payload = canonicalize(Stage::Property, raw.as_object().unwrap());
//! assert!(payload.get("postal_code").is_some());
//!
//! let validated = Validator::new().validate(&payload, Mode::Partial).unwrap();
//! assert_eq!(validated.patch().unwrap().len(), 2);
//!
//! let err = Validator::new().validate(&payload, Mode::Complete).unwrap_err();
//! assert!(err.fields().any(|f| f == "property_name"));
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod canonical;
mod catalog;
mod coerce;
mod error;
mod payload;
mod validator;

// Re-exports
pub use canonical::{canonicalize, canonicalize_entity, CanonicalPayload, RawPayload};
pub use catalog::{
    catalog, schema, CollectionSpec, FieldDefault, FieldSpec, KeyShape, NaturalKey, StageSchema,
    StageShape, ValueRule,
};
pub use coerce::is_blank;
pub use error::{FieldError, ValidationError};
pub use payload::{
    EntityBatch, FieldPatch, Mode, PatchValue, RejectedEntity, StageBody, ValidatedEntity,
    ValidatedPayload,
};
pub use validator::{stage_for_ordinal, Validator, DEFAULT_MAX_ENTITIES};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
