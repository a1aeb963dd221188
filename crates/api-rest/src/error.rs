//! Error envelope for the REST surface.
//!
//! Domain errors are translated here and nowhere else. Anything that is
//! not an expected domain category is logged with full context and
//! surfaced as a generic 500 so internals never leak to the caller.

use adherence_core::AdherenceError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

/// The `{"detail": ...}` body every error response carries.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub detail: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, detail)
    }

    pub fn unauthorized(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, detail)
    }

    pub fn forbidden(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, detail)
    }

    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, detail)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<AdherenceError> for ApiError {
    fn from(err: AdherenceError) -> Self {
        match &err {
            AdherenceError::Validation(detail) => Self::bad_request(detail.clone()),
            AdherenceError::Forbidden(detail) => Self::forbidden(detail.clone()),
            AdherenceError::NotFound(detail) => Self::not_found(detail.clone()),
            AdherenceError::Auth(detail) => Self::unauthorized(detail.clone()),
            _ => {
                tracing::error!("unhandled domain error: {err}");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error.")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { detail: self.detail })).into_response()
    }
}
