mod config;
mod documents;
mod drafting;
mod errors;
mod ledger;
mod llm_client;
mod routes;
mod state;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::llm_client::{TextGenerator, WatsonxClient, WatsonxSettings};
use crate::routes::build_router;
use crate::state::{AppState, LedgerHandle};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Counsel API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize model client
    let llm = WatsonxClient::new(WatsonxSettings::from_config(&config))
        .context("Failed to build watsonx.ai client")?;
    info!("LLM client initialized (model: {})", llm.model_id());

    // Initialize ledger client (optional)
    let ledger = match &config.ledger {
        Some(ledger_config) => {
            let handle = LedgerHandle::connect(ledger_config)?;
            info!(
                "Ledger client initialized ({}, account {})",
                ledger_config.rpc_url, handle.account
            );
            Some(handle)
        }
        None => {
            warn!("LEDGER_RPC_URL not set; ledger routes will answer 503");
            None
        }
    };

    // Build app state
    let state = AppState {
        llm: Arc::new(llm),
        ledger,
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
