//! Standalone REST API server binary.
//!
//! ## Purpose
//! Runs the REST view server on its own against the configured record API.
//!
//! ## Intended use
//! Useful during development when only the REST server (with OpenAPI/Swagger UI) is wanted. The
//! workspace's main `gluco-run` binary serves the same router.

use api_rest::{router, AppState};
use gluco_client::OntimizeClient;
use gluco_core::{ClientConfig, GlucoApi, ServerConfig};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the Gluco REST API server.
///
/// # Environment Variables
/// - `GLUCO_REST_ADDR`: server address (default: "0.0.0.0:3000")
/// - `GLUCO_VIEW_TOKEN`: bearer token accepted on patient routes
/// - `GLUCO_API_ENDPOINT`, `GLUCO_API_USER`, `GLUCO_API_PASSWORD`, `GLUCO_API_TIMEOUT_SECS`:
///   record API connection
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

    let server = ServerConfig::from_env_values(
        std::env::var("GLUCO_REST_ADDR").ok(),
        std::env::var("GLUCO_VIEW_TOKEN").ok(),
    )?;
    let client = ClientConfig::from_env_values(
        std::env::var("GLUCO_API_ENDPOINT").ok(),
        std::env::var("GLUCO_API_USER").ok(),
        std::env::var("GLUCO_API_PASSWORD").ok(),
        std::env::var("GLUCO_API_TIMEOUT_SECS").ok(),
    )?;

    if server.view_token().is_none() {
        tracing::warn!("GLUCO_VIEW_TOKEN is not set; every patient route will answer 401");
    }

    let api: Arc<dyn GlucoApi> = Arc::new(OntimizeClient::new(&client)?);
    let app = router(AppState::new(api, server.view_token().map(str::to_owned)));

    tracing::info!(
        "-- Starting Gluco REST API on {} (record API {})",
        server.addr(),
        client.api_endpoint()
    );
    let listener = tokio::net::TcpListener::bind(server.addr()).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
