mod config;
mod errors;
mod jobs;
mod llm_client;
mod routes;
mod sheets;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::{Mutex, RwLock};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::jobs::models::JobTable;
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::sheets::SheetsSync;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Foreman API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize LLM client
    let llm = LlmClient::new(config.anthropic_api_key.clone());
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    // Initialize spreadsheet sync. Setup failures degrade to a local-only
    // table instead of aborting: jobs can still be taken in and tracked.
    let sheets = match SheetsSync::connect(&config).await {
        Ok(sync) => {
            info!("Spreadsheet sync initialized");
            Some(Arc::new(Mutex::new(sync)))
        }
        Err(e) => {
            warn!("Spreadsheet sync unavailable, running with local table only: {e}");
            None
        }
    };

    // Build app state: one explicitly owned job table for the process.
    let state = AppState {
        jobs: Arc::new(RwLock::new(JobTable::new())),
        llm,
        sheets,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
