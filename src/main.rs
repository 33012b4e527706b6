use std::sync::Arc;

use dotenvy::dotenv;
use tokio::net::TcpListener;
use tracing::{error, info};

mod analysis;
mod config;
mod error;
mod handlers;
mod llm;
mod server;
mod state;
mod utils;

use analysis::Analyzer;
use config::Config;
use llm::{GeminiClient, VisionClient};
use server::build_router;
use state::AppState;
use utils::http::build_http_client;
use utils::logging::init_logging;

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {err}");
        return;
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let config = Arc::new(Config::load()?);
    let _guards = init_logging(&config);

    let http = build_http_client(&config)?;
    let model = Arc::new(GeminiClient::new(http.clone(), &config));
    let recognizer = Arc::new(VisionClient::new(http, &config));
    let analyzer = Analyzer::new(&config, model, recognizer);

    info!(
        "Starting Drug Interaction API on {} (mode={}, models={})",
        config.bind_addr,
        analyzer.mode().as_str(),
        analyzer.models().join(",")
    );

    let state = AppState::new(config.clone(), analyzer);
    let app = build_router(state);
    let listener = TcpListener::bind(config.bind_addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}
