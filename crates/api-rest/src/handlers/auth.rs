//! Registration, token issuance, logout, and profile self-service.

use crate::error::{ApiError, ErrorBody};
use crate::extract::AuthUser;
use crate::handlers::{parse_date, UserRes};
use crate::AppState;
use adherence_core::accounts::{self, NewAccount, ProfileUpdate};
use adherence_core::{AdherenceError, EmailAddress, NonEmptyText, Role};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterReq {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: String,
    /// Patient-role only, `YYYY-MM-DD`.
    pub date_of_birth: Option<String>,
    /// Patient-role only.
    pub medical_history: Option<String>,
    /// Doctor-role only.
    pub specialization: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TokenPairRes {
    pub access: String,
    pub refresh: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TokenReq {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RefreshReq {
    pub refresh: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AccessTokenRes {
    pub access: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LogoutReq {
    pub refresh: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ProfileUpdateReq {
    pub email: Option<String>,
    pub date_of_birth: Option<String>,
    pub medical_history: Option<String>,
    pub specialization: Option<String>,
    pub patients: Option<Vec<Uuid>>,
}

impl ProfileUpdateReq {
    fn into_update(self) -> Result<ProfileUpdate, ApiError> {
        Ok(ProfileUpdate {
            email: self
                .email
                .as_deref()
                .map(|e| EmailAddress::parse(e).map_err(|err| ApiError::bad_request(err.to_string())))
                .transpose()?,
            date_of_birth: self
                .date_of_birth
                .as_deref()
                .map(|d| parse_date("date_of_birth", d))
                .transpose()?,
            medical_history: self.medical_history,
            specialization: self.specialization,
            patients: self.patients,
        })
    }
}

#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterReq,
    responses(
        (status = 201, description = "User and role profile created", body = UserRes),
        (status = 400, description = "Validation error", body = ErrorBody)
    )
)]
/// Registers a new account: one User plus exactly one profile matching
/// the declared role.
#[axum::debug_handler]
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterReq>,
) -> Result<(StatusCode, Json<UserRes>), ApiError> {
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
    post,
    path = "/auth/token",
    request_body = TokenReq,
    responses(
        (status = 200, description = "Token pair issued", body = TokenPairRes),
        (status = 401, description = "Invalid credentials", body = ErrorBody)
    )
)]
/// Issues an access/refresh token pair for valid credentials.
#[axum::debug_handler]
pub async fn token(
    State(state): State<AppState>,
    Json(req): Json<TokenReq>,
) -> Result<Json<TokenPairRes>, ApiError> {
    let user = accounts::authenticate(&state.store, &state.tokens, &req.username, &req.password)?;
    let pair = state.tokens.issue_pair(user.id, Utc::now())?;
    Ok(Json(TokenPairRes {
        access: pair.access,
        refresh: pair.refresh,
    }))
}

#[utoipa::path(
    post,
    path = "/auth/token/refresh",
    request_body = RefreshReq,
    responses(
        (status = 200, description = "New access token", body = AccessTokenRes),
        (status = 400, description = "Missing refresh token", body = ErrorBody),
        (status = 401, description = "Invalid refresh token", body = ErrorBody)
    )
)]
/// Exchanges a refresh token for a new access token.
#[axum::debug_handler]
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshReq>,
) -> Result<Json<AccessTokenRes>, ApiError> {
    let refresh = req
        .refresh
        .as_deref()
        .filter(|r| !r.is_empty())
        .ok_or_else(|| ApiError::bad_request("refresh token required"))?;
    let access = state
        .tokens
        .refresh_access(&state.store, refresh, Utc::now())?;
    Ok(Json(AccessTokenRes { access }))
}

#[utoipa::path(
    post,
    path = "/auth/logout",
    request_body = LogoutReq,
    responses(
        (status = 205, description = "Refresh token revoked"),
        (status = 400, description = "Missing or invalid refresh token", body = ErrorBody)
    )
)]
/// Revokes a refresh token. Revoking a malformed or already revoked
/// token is a 400, never a 500.
#[axum::debug_handler]
pub async fn logout(
    State(state): State<AppState>,
    _auth: AuthUser,
    Json(req): Json<LogoutReq>,
) -> Result<StatusCode, ApiError> {
    let refresh = req
        .refresh
        .as_deref()
        .filter(|r| !r.is_empty())
        .ok_or_else(|| ApiError::bad_request("refresh token required"))?;

    state
        .tokens
        .revoke_refresh(&state.store, refresh)
        .map_err(|err| match err {
            AdherenceError::Auth(_) => ApiError::bad_request("invalid token"),
            other => ApiError::from(other),
        })?;

    Ok(StatusCode::RESET_CONTENT)
}

#[utoipa::path(
    get,
    path = "/auth/profile",
    responses(
        (status = 200, description = "The caller's user record", body = UserRes),
        (status = 401, description = "Not authenticated", body = ErrorBody)
    )
)]
/// Returns the caller's own user record and role profile.
#[axum::debug_handler]
pub async fn my_profile(State(state): State<AppState>, auth: AuthUser) -> Json<UserRes> {
    Json(UserRes::build(&state.store, &auth.user))
}

#[utoipa::path(
    put,
    path = "/auth/profile",
    request_body = ProfileUpdateReq,
    responses(
        (status = 200, description = "Updated user record", body = UserRes),
        (status = 400, description = "Validation error", body = ErrorBody),
        (status = 401, description = "Not authenticated", body = ErrorBody)
    )
)]
/// Updates the caller's own account and role profile. Fields for the
/// other role are ignored.
#[axum::debug_handler]
pub async fn update_my_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<ProfileUpdateReq>,
) -> Result<Json<UserRes>, ApiError> {
    let update = req.into_update()?;
    let user = accounts::update_profile(&state.store, auth.user.id, update)?;
    Ok(Json(UserRes::build(&state.store, &user)))
}
