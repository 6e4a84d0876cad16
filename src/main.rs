use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use api_rest::{AppState, router};
use gluco_client::OntimizeClient;
use gluco_core::{ClientConfig, GlucoApi, ServerConfig};

/// `RUST_LOG` plus info level for the gluco crates and the REST layer.
fn log_filter() -> anyhow::Result<EnvFilter> {
    Ok(EnvFilter::from_default_env()
        .add_directive("gluco=info".parse()?)
        .add_directive("api_rest=info".parse()?))
}

/// Main entry point for the Gluco application
///
/// Serves the patient pages over REST, backed by the Ontimize record API, and shuts down
/// cleanly on Ctrl-C.
///
/// # Environment Variables
/// - `GLUCO_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `GLUCO_VIEW_TOKEN`: bearer token required on patient routes
/// - `GLUCO_API_ENDPOINT`: record API base URL
/// - `GLUCO_API_USER` / `GLUCO_API_PASSWORD`: record API basic-auth credentials
/// - `GLUCO_API_TIMEOUT_SECS`: record API request timeout (default: 30)
///
/// # Returns
/// * `Ok(())` - If the server starts and later stops cleanly
/// * `Err(anyhow::Error)` - If configuration, binding or serving fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(log_filter()?)
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

    tracing::info!("++ Record API at {}", client.api_endpoint());
    tracing::info!("++ Starting Gluco REST on {}", server.addr());

    let api: Arc<dyn GlucoApi> = Arc::new(OntimizeClient::new(&client)?);
    let app = router(AppState::new(api, server.view_token().map(str::to_owned)));

    let listener = tokio::net::TcpListener::bind(server.addr()).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("-- Shutting down Gluco REST");
            }
        })
        .await?;

    Ok(())
}
