//! Entity model for the adherence tracker.
//!
//! Entities are plain data: relationships are explicit foreign-key fields
//! resolved through the entity store, never traversed implicitly. The
//! authorization engine and analytics consume these records as values.

use crate::{AdherenceError, AdherenceResult, BloodPressure, EmailAddress, NonEmptyText};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// The closed set of roles a user can hold.
///
/// Exactly one role per user; there is no role-change operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Patient,
    Doctor,
    Admin,
}

impl std::str::FromStr for Role {
    type Err = AdherenceError;

    fn from_str(s: &str) -> AdherenceResult<Self> {
        match s {
            "patient" => Ok(Role::Patient),
            "doctor" => Ok(Role::Doctor),
            "admin" => Ok(Role::Admin),
            other => Err(AdherenceError::Validation(format!(
                "unknown role '{other}' (expected patient, doctor or admin)"
            ))),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Role::Patient => "patient",
            Role::Doctor => "doctor",
            Role::Admin => "admin",
        };
        write!(f, "{name}")
    }
}

/// An authenticated identity. The password hash never leaves the store
/// layer; API responses use their own view type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: EmailAddress,
    pub password_hash: String,
    pub role: Role,
}

/// Medical metadata for a patient-role user. 1:1 with its `User`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PatientProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub date_of_birth: Option<NaiveDate>,
    pub medical_history: String,
}

/// Professional metadata for a doctor-role user. 1:1 with its `User`.
///
/// `patients` is the assignment set: the PatientProfile ids this doctor
/// treats. It is the sole basis for doctor access.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DoctorProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub specialization: String,
    pub patients: Vec<Uuid>,
}

/// A prescribed medication course for one patient.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MedicationSchedule {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub medication_name: String,
    pub dosage: String,
    /// Free-text cadence, e.g. "once daily".
    pub frequency: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl MedicationSchedule {
    /// Write-time invariant: the course cannot end before it starts.
    pub fn validate(&self) -> AdherenceResult<()> {
        if self.end_date < self.start_date {
            return Err(AdherenceError::Validation(
                "end_date cannot be earlier than start_date".into(),
            ));
        }
        Ok(())
    }
}

/// Outcome of one dose event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ActivityStatus {
    Taken,
    Missed,
}

impl std::str::FromStr for ActivityStatus {
    type Err = AdherenceError;

    fn from_str(s: &str) -> AdherenceResult<Self> {
        match s {
            "taken" => Ok(ActivityStatus::Taken),
            "missed" => Ok(ActivityStatus::Missed),
            other => Err(AdherenceError::Validation(format!(
                "unknown status '{other}' (expected taken or missed)"
            ))),
        }
    }
}

/// One dose event logged against a schedule.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Activity {
    pub id: Uuid,
    pub schedule_id: Uuid,
    pub date_time: DateTime<Utc>,
    pub status: ActivityStatus,
    pub notes: String,
    /// Optional reading taken alongside the dose, e.g. "120/80".
    #[schema(value_type = Option<String>)]
    pub blood_pressure: Option<BloodPressure>,
}

/// An informational message logged for a patient. This is a record, not a
/// dispatched message; there are no delivery semantics.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Notification {
    pub id: Uuid,
    pub patient_id: Uuid,
    #[schema(value_type = String)]
    pub message: NonEmptyText,
    pub sent_at: DateTime<Utc>,
}
