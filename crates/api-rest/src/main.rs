//! Standalone REST API server binary.
//!
//! ## Purpose
//! Runs the front desk REST API on its own.
//!
//! ## Intended use
//! Useful for development when you want the API with Swagger UI and nothing else. The
//! workspace's `frontdesk-run` binary additionally loads the remedy catalog before serving.

use std::sync::Arc;

use api_rest::{router, AppState, DEFAULT_REST_ADDR, REST_ADDR_ENV};
use frontdesk_core::{CoreConfig, HttpConnector};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the front desk REST API server.
///
/// # Environment Variables
/// - `FRONTDESK_REST_ADDR`: Server address (default: "0.0.0.0:3000")
/// - `FRONTDESK_STORE_URL`, `FRONTDESK_REMEDY_SOURCE`, `FRONTDESK_MATERIA_MEDICA_URL`,
///   `FRONTDESK_DEFAULT_STATE`: see [`CoreConfig::from_process_env`]
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - the configuration is invalid,
/// - the server address cannot be bound, or
/// - the HTTP server fails while running.
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

    let addr = std::env::var(REST_ADDR_ENV).unwrap_or_else(|_| DEFAULT_REST_ADDR.into());
    let cfg = CoreConfig::from_process_env()?;

    if cfg.store_endpoint().is_none() {
        tracing::warn!("No store endpoint configured; patient and visit operations will fail");
    }

    tracing::info!("-- Starting front desk REST API on {}", addr);

    let app = router(AppState::new(cfg, Arc::new(HttpConnector)));
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
