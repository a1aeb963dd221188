//! Request handlers, one module per surface area.

pub mod activities;
pub mod adherence;
pub mod auth;
pub mod notifications;
pub mod schedules;
pub mod users;

use crate::error::ApiError;
use crate::AppState;
use adherence_core::{EntityStore, Role, User};
use axum::extract::State;
use axum::response::Json;
use chrono::NaiveDate;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

/// Informational response body for endpoints that only acknowledge.
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageRes {
    pub detail: String,
}

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint, used for monitoring and load balancer probes.
#[axum::debug_handler]
pub async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(HealthRes {
        ok: true,
        message: "adherence API is alive".into(),
    })
}

/// Patient profile as exposed over the API.
#[derive(Debug, Serialize, ToSchema)]
pub struct PatientProfileRes {
    pub id: Uuid,
    pub date_of_birth: Option<NaiveDate>,
    pub medical_history: String,
}

/// Doctor profile as exposed over the API.
#[derive(Debug, Serialize, ToSchema)]
pub struct DoctorProfileRes {
    pub id: Uuid,
    pub specialization: String,
    pub patients: Vec<Uuid>,
}

/// User record as exposed over the API. The password hash stays in the
/// store.
#[derive(Debug, Serialize, ToSchema)]
pub struct UserRes {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub patient_profile: Option<PatientProfileRes>,
    pub doctor_profile: Option<DoctorProfileRes>,
}

impl UserRes {
    /// Builds the response view, attaching whichever role profile exists.
    pub fn build(store: &EntityStore, user: &User) -> Self {
        let patient_profile = store.patient_profile_for_user(user.id).map(|p| {
            PatientProfileRes {
                id: p.id,
                date_of_birth: p.date_of_birth,
                medical_history: p.medical_history,
            }
        });
        let doctor_profile = store.doctor_profile_for_user(user.id).map(|d| {
            DoctorProfileRes {
                id: d.id,
                specialization: d.specialization,
                patients: d.patients,
            }
        });

        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.as_str().to_owned(),
            role: user.role,
            patient_profile,
            doctor_profile,
        }
    }
}

/// Parses a `YYYY-MM-DD` field, reporting the field name on failure.
pub(crate) fn parse_date(field: &str, value: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| ApiError::bad_request(format!("{field}: invalid date (expected YYYY-MM-DD)")))
}

/// Detail for a denied object action.
pub(crate) const PERMISSION_DENIED: &str = "you do not have permission to perform this action";

/// Detail for a denied write-time ownership check, phrased per role.
pub(crate) fn ownership_denied(role: Role) -> &'static str {
    match role {
        Role::Patient => "patients can only create for themselves",
        Role::Doctor => "doctor not assigned to this patient",
        Role::Admin => PERMISSION_DENIED,
    }
}
