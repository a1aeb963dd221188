//! Medication adherence REST API server binary.
//!
//! Resolves configuration from the environment once at startup, opens the
//! entity store, and serves the axum application.

use adherence_core::{CoreConfig, EntityStore, NonEmptyText, TokenService};
use api_rest::{app, AppState};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the adherence REST API server.
///
/// # Environment Variables
/// - `MED_REST_ADDR`: server address (default: "0.0.0.0:8000")
/// - `MED_DATA_DIR`: entity store directory (default: "./adherence_data")
/// - `MED_TOKEN_SECRET`: HS256 signing secret (default: a dev-only value)
/// - `MED_ACCESS_TTL_SECS` / `MED_REFRESH_TTL_SECS`: token lifetimes
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - the configuration is invalid or the store cannot be opened, or
/// - the server address cannot be bound.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = std::env::var("MED_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".into());
    let data_dir = std::env::var("MED_DATA_DIR").unwrap_or_else(|_| "./adherence_data".into());
    let token_secret =
        std::env::var("MED_TOKEN_SECRET").unwrap_or_else(|_| "dev-secret-change-me".into());
    let access_ttl_secs = ttl_from_env(
        "MED_ACCESS_TTL_SECS",
        adherence_core::config::DEFAULT_ACCESS_TTL_SECS,
    )?;
    let refresh_ttl_secs = ttl_from_env(
        "MED_REFRESH_TTL_SECS",
        adherence_core::config::DEFAULT_REFRESH_TTL_SECS,
    )?;

    let cfg = CoreConfig::new(
        PathBuf::from(data_dir),
        NonEmptyText::new(token_secret)?,
        access_ttl_secs,
        refresh_ttl_secs,
    )?;
    let store = EntityStore::open(&cfg)?;
    let tokens = TokenService::new(&cfg);

    let state = AppState {
        cfg: Arc::new(cfg),
        store: Arc::new(store),
        tokens: Arc::new(tokens),
    };

    tracing::info!("-- Starting adherence REST API on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app(state)).await?;

    Ok(())
}

fn ttl_from_env(var: &str, default: i64) -> anyhow::Result<i64> {
    match std::env::var(var) {
        Ok(value) => Ok(value.parse()?),
        Err(_) => Ok(default),
    }
}
