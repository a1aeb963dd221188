//! Adherence analytics endpoints.

use crate::error::{ApiError, ErrorBody};
use crate::extract::AuthUser;
use crate::handlers::parse_date;
use crate::AppState;
use adherence_core::analytics;
use adherence_core::{authorize, Action, Activity, PatientRef, Resource};
use axum::extract::{Path, Query, State};
use axum::response::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Debug, Deserialize, IntoParams)]
pub struct SummaryParams {
    /// "7d" for a seven-day window; anything else means 30 days.
    pub range: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SummaryRes {
    pub patient_id: Uuid,
    pub range: String,
    pub total_doses: u64,
    pub taken_doses: u64,
    /// Formatted percentage, e.g. "70.00%".
    pub adherence_rate: String,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct HistoryParams {
    /// Inclusive `YYYY-MM-DD` lower bound on the dose date.
    pub start: Option<String>,
    /// Inclusive `YYYY-MM-DD` upper bound on the dose date.
    pub end: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HistoryRes {
    pub patient_id: Uuid,
    pub results: Vec<Activity>,
}

fn authorized_patient(
    state: &AppState,
    auth: &AuthUser,
    patient_id: Uuid,
) -> Result<PatientRef, ApiError> {
    let patient = state
        .store
        .patient_ref(patient_id)
        .ok_or_else(|| ApiError::not_found("patient not found"))?;
    if !authorize(&auth.actor, Action::Read, &Resource::Adherence(patient)).is_allowed() {
        return Err(ApiError::forbidden("forbidden"));
    }
    Ok(patient)
}

#[utoipa::path(
    get,
    path = "/patients/{id}/adherence/summary",
    params(("id" = Uuid, Path, description = "PatientProfile id"), SummaryParams),
    responses(
        (status = 200, description = "Adherence statistics for the window", body = SummaryRes),
        (status = 403, description = "Not authorized for this patient", body = ErrorBody),
        (status = 404, description = "Unknown patient", body = ErrorBody)
    )
)]
/// Dose statistics over a trailing window. An unrecognized `range`
/// value falls back to the 30-day window rather than erroring.
#[axum::debug_handler]
pub async fn summary(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Query(params): Query<SummaryParams>,
) -> Result<Json<SummaryRes>, ApiError> {
    authorized_patient(&state, &auth, id)?;

    let range = params.range.unwrap_or_else(|| "7d".into());
    let days = analytics::window_days(&range);
    let data = analytics::summary(&state.store, id, days, Utc::now());

    Ok(Json(SummaryRes {
        patient_id: id,
        range,
        total_doses: data.total,
        taken_doses: data.taken,
        adherence_rate: format!("{:.2}%", data.rate),
    }))
}

#[utoipa::path(
    get,
    path = "/patients/{id}/adherence/history",
    params(("id" = Uuid, Path, description = "PatientProfile id"), HistoryParams),
    responses(
        (status = 200, description = "Dose history, newest first", body = HistoryRes),
        (status = 400, description = "Malformed date bound", body = ErrorBody),
        (status = 403, description = "Not authorized for this patient", body = ErrorBody),
        (status = 404, description = "Unknown patient", body = ErrorBody)
    )
)]
/// Full dose history with optional inclusive date-only bounds.
#[axum::debug_handler]
pub async fn history(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<HistoryRes>, ApiError> {
    authorized_patient(&state, &auth, id)?;

    let start = params
        .start
        .as_deref()
        .map(|d| parse_date("start", d))
        .transpose()?;
    let end = params
        .end
        .as_deref()
        .map(|d| parse_date("end", d))
        .transpose()?;

    let results = analytics::history(&state.store, id, start, end);
    Ok(Json(HistoryRes {
        patient_id: id,
        results,
    }))
}
