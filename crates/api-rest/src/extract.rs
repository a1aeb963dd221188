//! Bearer-token authentication extractor.

use crate::error::ApiError;
use crate::AppState;
use adherence_core::{Actor, TokenKind, User};
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

/// The authenticated caller, resolved from the `Authorization: Bearer`
/// header. Carries both the user record and the authorization actor so
/// handlers never rebuild either.
pub struct AuthUser {
    pub user: User,
    pub actor: Actor,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| {
                ApiError::unauthorized("authentication credentials were not provided")
            })?;
        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::unauthorized("invalid authorization header"))?;

        let claims = state.tokens.verify(token, TokenKind::Access)?;
        let user = state
            .store
            .user(claims.sub)
            .ok_or_else(|| ApiError::unauthorized("user no longer exists"))?;
        let actor = state.store.actor_for(&user);

        Ok(AuthUser { user, actor })
    }
}
