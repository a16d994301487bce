use std::sync::Arc;

use api_rest::{AppState, DEFAULT_REST_ADDR, REST_ADDR_ENV, router};
use frontdesk_core::{CoreConfig, HttpConnector, RemedyCatalog};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the front desk service
///
/// Loads the remedy catalog once from the configured source, then serves the REST API.
/// A catalog that fails to load is logged and left empty; `POST /catalog/sync` retries it.
///
/// # Environment Variables
/// - `FRONTDESK_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `FRONTDESK_STORE_URL`: remote store endpoint (optional)
/// - `FRONTDESK_REMEDY_SOURCE`: remedy inventory URL or CSV path
/// - `FRONTDESK_MATERIA_MEDICA_URL`: reference link shown to the operator
/// - `FRONTDESK_DEFAULT_STATE`: region filled in for new patients (default: "CA")
///
/// # Returns
/// * `Ok(())` - If the server starts and runs successfully
/// * `Err(anyhow::Error)` - If configuration, startup or the server fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("frontdesk_run=info".parse()?)
                .add_directive("frontdesk_core=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = std::env::var(REST_ADDR_ENV).unwrap_or_else(|_| DEFAULT_REST_ADDR.into());
    let cfg = CoreConfig::from_process_env()?;
    if cfg.store_endpoint().is_none() {
        tracing::warn!("No store endpoint configured; patient and visit operations will fail");
    }

    let source = cfg.remedy_source().clone();
    let state = AppState::new(cfg, Arc::new(HttpConnector));

    match tokio::task::spawn_blocking(move || RemedyCatalog::load(&source)).await? {
        Ok(catalog) => state.replace_catalog(catalog).map_err(|e| anyhow::anyhow!("{e:?}"))?,
        Err(e) => tracing::error!("Initial catalog load failed: {}", e.user_message()),
    }

    tracing::info!("-- Starting front desk REST API on {}", rest_addr);

    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, router(state)).await?;

    Ok(())
}
