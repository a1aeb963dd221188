//! Notification records: scoped listing and creation.

use crate::error::{ApiError, ErrorBody};
use crate::extract::AuthUser;
use crate::handlers::MessageRes;
use crate::AppState;
use adherence_core::{scope_for, NonEmptyText, Notification};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use chrono::Utc;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Deserialize, ToSchema)]
pub struct NotificationSendReq {
    /// Target PatientProfile id.
    pub patient: Option<Uuid>,
    pub message: Option<String>,
}

fn create_record(state: &AppState, req: NotificationSendReq) -> Result<Notification, ApiError> {
    let (Some(patient_id), Some(message)) = (req.patient, req.message) else {
        return Err(ApiError::bad_request("patient and message required"));
    };
    let message = NonEmptyText::new(&message)
        .map_err(|_| ApiError::bad_request("patient and message required"))?;
    if state.store.patient_ref(patient_id).is_none() {
        return Err(ApiError::not_found("patient not found"));
    }

    let notification = Notification {
        id: Uuid::new_v4(),
        patient_id,
        message,
        sent_at: Utc::now(),
    };
    state.store.insert_notification(notification.clone())?;
    Ok(notification)
}

#[utoipa::path(
    get,
    path = "/notifications",
    responses(
        (status = 200, description = "Notifications visible to the caller", body = [Notification]),
        (status = 401, description = "Not authenticated", body = ErrorBody)
    )
)]
/// Lists the notifications the caller is authorized to see, newest
/// first.
#[axum::debug_handler]
pub async fn list_notifications(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Json<Vec<Notification>> {
    let scope = scope_for(&auth.actor);
    Json(state.store.notifications_in_scope(&scope))
}

#[utoipa::path(
    post,
    path = "/notifications",
    request_body = NotificationSendReq,
    responses(
        (status = 201, description = "Notification record created", body = Notification),
        (status = 400, description = "Missing fields", body = ErrorBody),
        (status = 404, description = "Unknown patient", body = ErrorBody)
    )
)]
/// Creates a notification record and returns it.
#[axum::debug_handler]
pub async fn create_notification(
    State(state): State<AppState>,
    _auth: AuthUser,
    Json(req): Json<NotificationSendReq>,
) -> Result<(StatusCode, Json<Notification>), ApiError> {
    let notification = create_record(&state, req)?;
    Ok((StatusCode::CREATED, Json(notification)))
}

#[utoipa::path(
    post,
    path = "/notifications/send",
    request_body = NotificationSendReq,
    responses(
        (status = 201, description = "Notification queued", body = MessageRes),
        (status = 400, description = "Missing fields", body = ErrorBody),
        (status = 404, description = "Unknown patient", body = ErrorBody)
    )
)]
/// Logs a notification for a patient. This records the message; nothing
/// is dispatched.
#[axum::debug_handler]
pub async fn send_notification(
    State(state): State<AppState>,
    _auth: AuthUser,
    Json(req): Json<NotificationSendReq>,
) -> Result<(StatusCode, Json<MessageRes>), ApiError> {
    create_record(&state, req)?;
    Ok((
        StatusCode::CREATED,
        Json(MessageRes {
            detail: "notification queued".into(),
        }),
    ))
}
