//! # Adherence Core
//!
//! Core business logic for the medication adherence tracker.
//!
//! This crate contains the pure domain operations:
//! - Entity model and file-backed entity store
//! - Role-based authorization decisions
//! - Access-scoped queries for list endpoints
//! - Adherence analytics (summary and dose history)
//! - Account registration and token issuance
//!
//! **No API concerns**: HTTP routing, request parsing, and response
//! serialization belong in `api-rest`.

pub mod accounts;
pub mod analytics;
pub mod authz;
pub mod config;
pub mod error;
pub mod model;
pub mod scope;
pub mod store;
pub mod tokens;

pub use adherence_types::{BloodPressure, EmailAddress, NonEmptyText, TextError};
pub use authz::{authorize, Action, Actor, Decision, PatientRef, Resource};
pub use config::CoreConfig;
pub use error::{AdherenceError, AdherenceResult};
pub use model::{
    Activity, ActivityStatus, DoctorProfile, MedicationSchedule, Notification, PatientProfile,
    Role, User,
};
pub use scope::{scope_for, Scope};
pub use store::EntityStore;
pub use tokens::{Claims, TokenKind, TokenPair, TokenService};
