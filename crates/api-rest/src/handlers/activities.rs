//! Dose activity CRUD, RBAC-scoped.
//!
//! Doctors may create and read activity for assigned patients but never
//! update or delete it; only the patient or an admin corrects dose logs.

use crate::error::{ApiError, ErrorBody};
use crate::extract::AuthUser;
use crate::handlers::{ownership_denied, PERMISSION_DENIED};
use crate::AppState;
use adherence_core::{
    authorize, scope_for, Action, Activity, ActivityStatus, BloodPressure, PatientRef, Resource,
    Role,
};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Deserialize, ToSchema)]
pub struct ActivityCreateReq {
    /// Schedule the dose belongs to.
    pub schedule: Uuid,
    /// RFC 3339 timestamp; defaults to now.
    pub date_time: Option<String>,
    /// "taken" or "missed".
    pub status: String,
    pub notes: Option<String>,
    /// Optional reading such as "120/80".
    pub blood_pressure_reading: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ActivityUpdateReq {
    pub date_time: Option<String>,
    pub status: Option<String>,
    pub notes: Option<String>,
    /// Empty string clears the reading.
    pub blood_pressure_reading: Option<String>,
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, ApiError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| ApiError::bad_request("date_time: invalid timestamp (expected RFC 3339)"))
}

fn parse_reading(value: &str) -> Result<Option<BloodPressure>, ApiError> {
    if value.trim().is_empty() {
        return Ok(None);
    }
    BloodPressure::parse(value)
        .map(Some)
        .map_err(|err| ApiError::bad_request(format!("blood_pressure_reading: {err}")))
}

fn resolve_activity(state: &AppState, id: Uuid) -> Result<(Activity, PatientRef), ApiError> {
    let activity = state
        .store
        .activity(id)
        .ok_or_else(|| ApiError::not_found("activity not found"))?;
    let patient = state
        .store
        .patient_ref_for_activity(id)
        .ok_or_else(|| ApiError::not_found("patient not found"))?;
    Ok((activity, patient))
}

fn mutation_denied(role: Role, action: Action) -> ApiError {
    if role == Role::Doctor {
        let detail = match action {
            Action::Delete => "doctors cannot delete activities",
            _ => "doctors cannot modify activities",
        };
        return ApiError::forbidden(detail);
    }
    ApiError::forbidden(PERMISSION_DENIED)
}

#[utoipa::path(
    get,
    path = "/activities",
    responses(
        (status = 200, description = "Activities visible to the caller", body = [Activity]),
        (status = 401, description = "Not authenticated", body = ErrorBody)
    )
)]
/// Lists the dose activities the caller is authorized to see, newest
/// first.
#[axum::debug_handler]
pub async fn list_activities(State(state): State<AppState>, auth: AuthUser) -> Json<Vec<Activity>> {
    let scope = scope_for(&auth.actor);
    Json(state.store.activities_in_scope(&scope))
}

#[utoipa::path(
    post,
    path = "/activities",
    request_body = ActivityCreateReq,
    responses(
        (status = 201, description = "Activity logged", body = Activity),
        (status = 400, description = "Validation error", body = ErrorBody),
        (status = 403, description = "Not authorized for the schedule's patient", body = ErrorBody),
        (status = 404, description = "Unknown schedule", body = ErrorBody)
    )
)]
/// Logs a dose event against a schedule. The write-time ownership check
/// follows the schedule's patient.
#[axum::debug_handler]
pub async fn create_activity(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<ActivityCreateReq>,
) -> Result<(StatusCode, Json<Activity>), ApiError> {
    let patient = state
        .store
        .patient_ref_for_schedule(req.schedule)
        .ok_or_else(|| ApiError::not_found("schedule not found"))?;
    if !authorize(&auth.actor, Action::Create, &Resource::Activity(patient)).is_allowed() {
        return Err(ApiError::forbidden(ownership_denied(auth.actor.role)));
    }

    let activity = Activity {
        id: Uuid::new_v4(),
        schedule_id: req.schedule,
        date_time: req
            .date_time
            .as_deref()
            .map(parse_timestamp)
            .transpose()?
            .unwrap_or_else(Utc::now),
        status: req.status.parse::<ActivityStatus>()?,
        notes: req.notes.unwrap_or_default(),
        blood_pressure: req
            .blood_pressure_reading
            .as_deref()
            .map(parse_reading)
            .transpose()?
            .flatten(),
    };
    state.store.insert_activity(activity.clone())?;

    Ok((StatusCode::CREATED, Json(activity)))
}

#[utoipa::path(
    get,
    path = "/activities/{id}",
    params(("id" = Uuid, Path, description = "Activity id")),
    responses(
        (status = 200, description = "The activity", body = Activity),
        (status = 403, description = "Not authorized", body = ErrorBody),
        (status = 404, description = "Unknown activity", body = ErrorBody)
    )
)]
/// Fetches one activity.
#[axum::debug_handler]
pub async fn get_activity(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Activity>, ApiError> {
    let (activity, patient) = resolve_activity(&state, id)?;
    if !authorize(&auth.actor, Action::Read, &Resource::Activity(patient)).is_allowed() {
        return Err(ApiError::forbidden(PERMISSION_DENIED));
    }
    Ok(Json(activity))
}

#[utoipa::path(
    put,
    path = "/activities/{id}",
    params(("id" = Uuid, Path, description = "Activity id")),
    request_body = ActivityUpdateReq,
    responses(
        (status = 200, description = "Updated activity", body = Activity),
        (status = 400, description = "Validation error", body = ErrorBody),
        (status = 403, description = "Not authorized; doctors never modify activities", body = ErrorBody),
        (status = 404, description = "Unknown activity", body = ErrorBody)
    )
)]
/// Updates an activity. Denied to doctors even for assigned patients.
#[axum::debug_handler]
pub async fn update_activity(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<ActivityUpdateReq>,
) -> Result<Json<Activity>, ApiError> {
    let (mut activity, patient) = resolve_activity(&state, id)?;
    if !authorize(&auth.actor, Action::Update, &Resource::Activity(patient)).is_allowed() {
        return Err(mutation_denied(auth.actor.role, Action::Update));
    }

    if let Some(ts) = req.date_time.as_deref() {
        activity.date_time = parse_timestamp(ts)?;
    }
    if let Some(status) = req.status.as_deref() {
        activity.status = status.parse::<ActivityStatus>()?;
    }
    if let Some(notes) = req.notes {
        activity.notes = notes;
    }
    if let Some(reading) = req.blood_pressure_reading.as_deref() {
        activity.blood_pressure = parse_reading(reading)?;
    }
    state.store.update_activity(activity.clone())?;

    Ok(Json(activity))
}

#[utoipa::path(
    delete,
    path = "/activities/{id}",
    params(("id" = Uuid, Path, description = "Activity id")),
    responses(
        (status = 204, description = "Activity deleted"),
        (status = 403, description = "Not authorized; doctors never delete activities", body = ErrorBody),
        (status = 404, description = "Unknown activity", body = ErrorBody)
    )
)]
/// Deletes an activity. Denied to doctors even for assigned patients.
#[axum::debug_handler]
pub async fn delete_activity(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let (_, patient) = resolve_activity(&state, id)?;
    if !authorize(&auth.actor, Action::Delete, &Resource::Activity(patient)).is_allowed() {
        return Err(mutation_denied(auth.actor.role, Action::Delete));
    }
    state.store.delete_activity(id)?;
    Ok(StatusCode::NO_CONTENT)
}
