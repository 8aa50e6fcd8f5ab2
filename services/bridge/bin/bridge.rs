//! Main Entrypoint for the Stewart Bridge Service
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment.
//! 2. Initializing logging.
//! 3. Constructing the shared agent runner.
//! 4. Building the Axum router and applying middleware.
//! 5. Starting the web server and handling graceful shutdown.

use anyhow::Context;
use std::sync::Arc;
use stewart_bridge::{config::Config, router::create_router, state::AppState};
use stewart_live::{AgentConfig, AgentRunner, gemini::GeminiLiveRunner};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

/// Listens for the `Ctrl+C` signal to gracefully shut down the server.
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    info!("Received shutdown signal. Shutting down gracefully...");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .init();
    info!("Configuration loaded. Initializing application state...");

    // The runner is process-wide and immutable after init; every connection
    // supervisor gets the same handle through AppState.
    let mut agent = AgentConfig::board_member();
    agent.model = config.live_model.clone();
    info!(
        agent = %agent.name,
        description = %agent.description,
        "Loaded agent persona"
    );
    let runner: Arc<dyn AgentRunner> =
        Arc::new(GeminiLiveRunner::new(config.gemini_api_key.clone(), agent));

    let app_state = Arc::new(AppState {
        runner,
        config: Arc::new(config.clone()),
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(app_state).layer(cors);

    info!(
        model = %config.live_model,
        bind_address = %config.bind_address,
        static_dir = %config.static_dir.display(),
        "Service configured. Starting server..."
    );
    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server has shut down.");
    Ok(())
}
