//! User management. Reads are open to any authenticated caller; writes
//! go through the authorization engine (admin-only, with the own-record
//! exception for updates).

use crate::error::{ApiError, ErrorBody};
use crate::extract::AuthUser;
use crate::handlers::{auth::RegisterReq, parse_date, UserRes, PERMISSION_DENIED};
use crate::AppState;
use adherence_core::accounts::{self, NewAccount, ProfileUpdate};
use adherence_core::{authorize, Action, EmailAddress, NonEmptyText, Resource, Role};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Deserialize, ToSchema)]
pub struct UserUpdateReq {
    pub email: Option<String>,
    pub date_of_birth: Option<String>,
    pub medical_history: Option<String>,
    pub specialization: Option<String>,
    pub patients: Option<Vec<Uuid>>,
}

#[utoipa::path(
    get,
    path = "/users",
    responses(
        (status = 200, description = "All users", body = [UserRes]),
        (status = 401, description = "Not authenticated", body = ErrorBody)
    )
)]
/// Lists all users.
#[axum::debug_handler]
pub async fn list_users(State(state): State<AppState>, _auth: AuthUser) -> Json<Vec<UserRes>> {
    let users = state
        .store
        .list_users()
        .iter()
        .map(|user| UserRes::build(&state.store, user))
        .collect();
    Json(users)
}

#[utoipa::path(
    get,
    path = "/users/{id}",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "The user", body = UserRes),
        (status = 404, description = "Unknown user", body = ErrorBody)
    )
)]
/// Fetches one user.
#[axum::debug_handler]
pub async fn get_user(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<UserRes>, ApiError> {
    let user = state
        .store
        .user(id)
        .ok_or_else(|| ApiError::not_found("user not found"))?;
    Ok(Json(UserRes::build(&state.store, &user)))
}

#[utoipa::path(
    post,
    path = "/users",
    request_body = RegisterReq,
    responses(
        (status = 201, description = "User created", body = UserRes),
        (status = 400, description = "Validation error", body = ErrorBody),
        (status = 403, description = "Not an admin", body = ErrorBody)
    )
)]
/// Creates a user with the registration rules. Admin only.
#[axum::debug_handler]
pub async fn create_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<RegisterReq>,
) -> Result<(StatusCode, Json<UserRes>), ApiError> {
    if !authorize(&auth.actor, Action::Create, &Resource::Users).is_allowed() {
        return Err(ApiError::forbidden(PERMISSION_DENIED));
    }

    let role: Role = req.role.parse()?;
    let username = NonEmptyText::new(&req.username)
        .map_err(|_| ApiError::bad_request("username is required"))?;
    let email =
        EmailAddress::parse(&req.email).map_err(|err| ApiError::bad_request(err.to_string()))?;
    let date_of_birth = req
        .date_of_birth
        .as_deref()
        .map(|d| parse_date("date_of_birth", d))
        .transpose()?;

    let user = accounts::register(
        &state.store,
        &state.tokens,
        NewAccount {
            username,
            email,
            password: req.password,
            role,
            date_of_birth,
            medical_history: req.medical_history,
            specialization: req.specialization,
        },
    )?;

    Ok((StatusCode::CREATED, Json(UserRes::build(&state.store, &user))))
}

#[utoipa::path(
    put,
    path = "/users/{id}",
    params(("id" = Uuid, Path, description = "User id")),
    request_body = UserUpdateReq,
    responses(
        (status = 200, description = "Updated user", body = UserRes),
        (status = 403, description = "Not the user or an admin", body = ErrorBody),
        (status = 404, description = "Unknown user", body = ErrorBody)
    )
)]
/// Updates a user's account and role profile. Allowed for an admin or
/// the user themself.
#[axum::debug_handler]
pub async fn update_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UserUpdateReq>,
) -> Result<Json<UserRes>, ApiError> {
    if !authorize(&auth.actor, Action::Update, &Resource::User(id)).is_allowed() {
        return Err(ApiError::forbidden(PERMISSION_DENIED));
    }

    let update = ProfileUpdate {
        email: req
            .email
            .as_deref()
            .map(|e| EmailAddress::parse(e).map_err(|err| ApiError::bad_request(err.to_string())))
            .transpose()?,
        date_of_birth: req
            .date_of_birth
            .as_deref()
            .map(|d| parse_date("date_of_birth", d))
            .transpose()?,
        medical_history: req.medical_history,
        specialization: req.specialization,
        patients: req.patients,
    };

    let user = accounts::update_profile(&state.store, id, update)?;
    Ok(Json(UserRes::build(&state.store, &user)))
}

#[utoipa::path(
    delete,
    path = "/users/{id}",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 204, description = "User and owned records deleted"),
        (status = 403, description = "Not an admin", body = ErrorBody),
        (status = 404, description = "Unknown user", body = ErrorBody)
    )
)]
/// Deletes a user and cascades through its profile, schedules,
/// activities, and notifications. Admin only.
#[axum::debug_handler]
pub async fn delete_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if !authorize(&auth.actor, Action::Delete, &Resource::User(id)).is_allowed() {
        return Err(ApiError::forbidden(PERMISSION_DENIED));
    }
    state.store.delete_user(id)?;
    Ok(StatusCode::NO_CONTENT)
}
