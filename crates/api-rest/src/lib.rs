//! # API REST
//!
//! REST surface for the medication adherence tracker.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON serialization, CORS, the error envelope)
//!
//! Domain logic lives in `adherence-core`; this crate only parses
//! requests, consults the authorization engine, and translates results.

#![warn(rust_2018_idioms)]

pub mod error;
pub mod extract;
pub mod handlers;

use adherence_core::{CoreConfig, EntityStore, TokenService};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Application state shared across request handlers.
#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<CoreConfig>,
    pub store: Arc<EntityStore>,
    pub tokens: Arc<TokenService>,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::auth::register,
        handlers::auth::token,
        handlers::auth::refresh,
        handlers::auth::logout,
        handlers::auth::my_profile,
        handlers::auth::update_my_profile,
        handlers::users::list_users,
        handlers::users::get_user,
        handlers::users::create_user,
        handlers::users::update_user,
        handlers::users::delete_user,
        handlers::schedules::list_schedules,
        handlers::schedules::create_schedule,
        handlers::schedules::get_schedule,
        handlers::schedules::update_schedule,
        handlers::schedules::delete_schedule,
        handlers::activities::list_activities,
        handlers::activities::create_activity,
        handlers::activities::get_activity,
        handlers::activities::update_activity,
        handlers::activities::delete_activity,
        handlers::adherence::summary,
        handlers::adherence::history,
        handlers::notifications::list_notifications,
        handlers::notifications::create_notification,
        handlers::notifications::send_notification,
    ),
    components(schemas(
        error::ErrorBody,
        handlers::MessageRes,
        handlers::HealthRes,
        handlers::UserRes,
        handlers::PatientProfileRes,
        handlers::DoctorProfileRes,
        handlers::auth::RegisterReq,
        handlers::auth::TokenReq,
        handlers::auth::TokenPairRes,
        handlers::auth::RefreshReq,
        handlers::auth::AccessTokenRes,
        handlers::auth::LogoutReq,
        handlers::auth::ProfileUpdateReq,
        handlers::users::UserUpdateReq,
        handlers::schedules::ScheduleCreateReq,
        handlers::schedules::ScheduleUpdateReq,
        handlers::activities::ActivityCreateReq,
        handlers::activities::ActivityUpdateReq,
        handlers::adherence::SummaryRes,
        handlers::adherence::HistoryRes,
        handlers::notifications::NotificationSendReq,
        adherence_core::Role,
        adherence_core::ActivityStatus,
        adherence_core::PatientProfile,
        adherence_core::DoctorProfile,
        adherence_core::MedicationSchedule,
        adherence_core::Activity,
        adherence_core::Notification,
    ))
)]
pub struct ApiDoc;

/// Builds the application router.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/token", post(handlers::auth::token))
        .route("/auth/token/refresh", post(handlers::auth::refresh))
        .route("/auth/logout", post(handlers::auth::logout))
        .route(
            "/auth/profile",
            get(handlers::auth::my_profile).put(handlers::auth::update_my_profile),
        )
        .route(
            "/users",
            get(handlers::users::list_users).post(handlers::users::create_user),
        )
        .route(
            "/users/:id",
            get(handlers::users::get_user)
                .put(handlers::users::update_user)
                .delete(handlers::users::delete_user),
        )
        .route(
            "/schedules",
            get(handlers::schedules::list_schedules).post(handlers::schedules::create_schedule),
        )
        .route(
            "/schedules/:id",
            get(handlers::schedules::get_schedule)
                .put(handlers::schedules::update_schedule)
                .delete(handlers::schedules::delete_schedule),
        )
        .route(
            "/activities",
            get(handlers::activities::list_activities).post(handlers::activities::create_activity),
        )
        .route(
            "/activities/:id",
            get(handlers::activities::get_activity)
                .put(handlers::activities::update_activity)
                .delete(handlers::activities::delete_activity),
        )
        .route(
            "/patients/:id/adherence/summary",
            get(handlers::adherence::summary),
        )
        .route(
            "/patients/:id/adherence/history",
            get(handlers::adherence::history),
        )
        .route(
            "/notifications",
            get(handlers::notifications::list_notifications)
                .post(handlers::notifications::create_notification),
        )
        .route(
            "/notifications/send",
            post(handlers::notifications::send_notification),
        )
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
