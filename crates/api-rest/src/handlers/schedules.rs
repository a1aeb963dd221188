//! Medication schedule CRUD, RBAC-scoped.

use crate::error::{ApiError, ErrorBody};
use crate::extract::AuthUser;
use crate::handlers::{ownership_denied, parse_date, PERMISSION_DENIED};
use crate::AppState;
use adherence_core::{
    authorize, scope_for, Action, MedicationSchedule, PatientRef, Resource,
};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Deserialize, ToSchema)]
pub struct ScheduleCreateReq {
    /// Target PatientProfile id.
    pub patient: Uuid,
    pub medication_name: String,
    pub dosage: String,
    pub frequency: String,
    /// `YYYY-MM-DD`.
    pub start_date: String,
    /// `YYYY-MM-DD`, must not be earlier than `start_date`.
    pub end_date: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ScheduleUpdateReq {
    pub medication_name: Option<String>,
    pub dosage: Option<String>,
    pub frequency: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

fn resolve_schedule(
    state: &AppState,
    id: Uuid,
) -> Result<(MedicationSchedule, PatientRef), ApiError> {
    let schedule = state
        .store
        .schedule(id)
        .ok_or_else(|| ApiError::not_found("schedule not found"))?;
    let patient = state
        .store
        .patient_ref(schedule.patient_id)
        .ok_or_else(|| ApiError::not_found("patient not found"))?;
    Ok((schedule, patient))
}

#[utoipa::path(
    get,
    path = "/schedules",
    responses(
        (status = 200, description = "Schedules visible to the caller", body = [MedicationSchedule]),
        (status = 401, description = "Not authenticated", body = ErrorBody)
    )
)]
/// Lists the schedules the caller is authorized to see.
#[axum::debug_handler]
pub async fn list_schedules(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Json<Vec<MedicationSchedule>> {
    let scope = scope_for(&auth.actor);
    Json(state.store.schedules_in_scope(&scope))
}

#[utoipa::path(
    post,
    path = "/schedules",
    request_body = ScheduleCreateReq,
    responses(
        (status = 201, description = "Schedule created", body = MedicationSchedule),
        (status = 400, description = "Validation error", body = ErrorBody),
        (status = 403, description = "Not authorized for the target patient", body = ErrorBody),
        (status = 404, description = "Unknown patient", body = ErrorBody)
    )
)]
/// Creates a schedule. The declared target patient must pass the same
/// ownership rule as any other access: patients create only for
/// themselves, doctors only for assigned patients.
#[axum::debug_handler]
pub async fn create_schedule(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<ScheduleCreateReq>,
) -> Result<(StatusCode, Json<MedicationSchedule>), ApiError> {
    let patient = state
        .store
        .patient_ref(req.patient)
        .ok_or_else(|| ApiError::not_found("patient not found"))?;
    if !authorize(&auth.actor, Action::Create, &Resource::Schedule(patient)).is_allowed() {
        return Err(ApiError::forbidden(ownership_denied(auth.actor.role)));
    }

    let schedule = MedicationSchedule {
        id: Uuid::new_v4(),
        patient_id: req.patient,
        medication_name: req.medication_name,
        dosage: req.dosage,
        frequency: req.frequency,
        start_date: parse_date("start_date", &req.start_date)?,
        end_date: parse_date("end_date", &req.end_date)?,
    };
    state.store.insert_schedule(schedule.clone())?;

    Ok((StatusCode::CREATED, Json(schedule)))
}

#[utoipa::path(
    get,
    path = "/schedules/{id}",
    params(("id" = Uuid, Path, description = "Schedule id")),
    responses(
        (status = 200, description = "The schedule", body = MedicationSchedule),
        (status = 403, description = "Not authorized", body = ErrorBody),
        (status = 404, description = "Unknown schedule", body = ErrorBody)
    )
)]
/// Fetches one schedule.
#[axum::debug_handler]
pub async fn get_schedule(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<MedicationSchedule>, ApiError> {
    let (schedule, patient) = resolve_schedule(&state, id)?;
    if !authorize(&auth.actor, Action::Read, &Resource::Schedule(patient)).is_allowed() {
        return Err(ApiError::forbidden(PERMISSION_DENIED));
    }
    Ok(Json(schedule))
}

#[utoipa::path(
    put,
    path = "/schedules/{id}",
    params(("id" = Uuid, Path, description = "Schedule id")),
    request_body = ScheduleUpdateReq,
    responses(
        (status = 200, description = "Updated schedule", body = MedicationSchedule),
        (status = 400, description = "Validation error", body = ErrorBody),
        (status = 403, description = "Not authorized", body = ErrorBody),
        (status = 404, description = "Unknown schedule", body = ErrorBody)
    )
)]
/// Updates a schedule's medication fields or course dates. The date
/// invariant is re-checked on every write.
#[axum::debug_handler]
pub async fn update_schedule(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<ScheduleUpdateReq>,
) -> Result<Json<MedicationSchedule>, ApiError> {
    let (mut schedule, patient) = resolve_schedule(&state, id)?;
    if !authorize(&auth.actor, Action::Update, &Resource::Schedule(patient)).is_allowed() {
        return Err(ApiError::forbidden(PERMISSION_DENIED));
    }

    if let Some(name) = req.medication_name {
        schedule.medication_name = name;
    }
    if let Some(dosage) = req.dosage {
        schedule.dosage = dosage;
    }
    if let Some(frequency) = req.frequency {
        schedule.frequency = frequency;
    }
    if let Some(start) = req.start_date.as_deref() {
        schedule.start_date = parse_date("start_date", start)?;
    }
    if let Some(end) = req.end_date.as_deref() {
        schedule.end_date = parse_date("end_date", end)?;
    }
    state.store.update_schedule(schedule.clone())?;

    Ok(Json(schedule))
}

#[utoipa::path(
    delete,
    path = "/schedules/{id}",
    params(("id" = Uuid, Path, description = "Schedule id")),
    responses(
        (status = 204, description = "Schedule and its activities deleted"),
        (status = 403, description = "Not authorized", body = ErrorBody),
        (status = 404, description = "Unknown schedule", body = ErrorBody)
    )
)]
/// Deletes a schedule and its activities.
#[axum::debug_handler]
pub async fn delete_schedule(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let (_, patient) = resolve_schedule(&state, id)?;
    if !authorize(&auth.actor, Action::Delete, &Resource::Schedule(patient)).is_allowed() {
        return Err(ApiError::forbidden(PERMISSION_DENIED));
    }
    state.store.delete_schedule(id)?;
    Ok(StatusCode::NO_CONTENT)
}
