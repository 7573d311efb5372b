//! # brainflow-server
//!
//! HTTP backend for the BrainFlow outliner.
//!
//! This binary provides:
//! - **Accounts** with signed bearer sessions (access + refresh tokens)
//! - **Outlines** stored as whole documents, edited through the tree engine
//!   (items, indent/outdent, batch operations, templates)
//! - **Content generation** for Brainlift sections via an OpenAI-compatible
//!   model, with a canned fallback
//! - **Voice capture**: transcription, text structuring and spoken commands
//! - **Per-client rate limiting**

mod api;
mod assist;
mod auth;
mod config;
mod error;
mod outlines;
mod rate_limit;

use std::sync::Arc;
use std::time::Duration;

use brainflow_assist::AssistService;
use brainflow_shared::session::TokenSigner;
use brainflow_store::{DocumentStore, MemoryStore, SqliteStore};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::api::AppState;
use crate::config::{ServerConfig, StoreBackend};

fn open_store(config: &ServerConfig) -> anyhow::Result<Arc<dyn DocumentStore>> {
    let store: Arc<dyn DocumentStore> = match config.store_backend {
        StoreBackend::Memory => {
            warn!("Using the in-memory store; data is lost on shutdown");
            Arc::new(MemoryStore::new())
        }
        StoreBackend::Sqlite => match &config.database_path {
            Some(path) => Arc::new(SqliteStore::open_at(path)?),
            None => Arc::new(SqliteStore::open_default()?),
        },
    };
    Ok(store)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,brainflow_server=debug")),
        )
        .init();

    info!("Starting BrainFlow server v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(?config, "Loaded configuration");

    // -----------------------------------------------------------------------
    // 3. Initialize subsystems
    // -----------------------------------------------------------------------

    // Document store, chosen once here and shared by every handler
    let store = open_store(&config)?;
    store.health().await?;
    info!(backend = store.backend(), "Document store ready");

    // Session token signer
    let tokens = match config.token_signing_key {
        Some(seed) => TokenSigner::new(seed),
        None => {
            warn!("TOKEN_SIGNING_KEY not set; sessions will not survive a restart");
            TokenSigner::generate()
        }
    }
    .with_lifetimes(
        chrono::Duration::minutes(config.access_token_minutes),
        chrono::Duration::days(config.refresh_token_days),
    );

    // Content generator (canned fallback when no API key is configured)
    let assist = AssistService::from_config(&config.assist_config())?;

    let http_addr = config.http_addr;
    let app_state = AppState::new(store.clone(), assist, tokens, config);

    // -----------------------------------------------------------------------
    // 4. Spawn background tasks
    // -----------------------------------------------------------------------

    // Every 5 minutes, drop throttle state for clients quiet for 10 minutes
    let limiter = app_state.rate_limiter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(300));
        loop {
            interval.tick().await;
            limiter.forget_idle(Duration::from_secs(600)).await;
        }
    });

    // -----------------------------------------------------------------------
    // 5. Run the HTTP API server (blocks until shutdown)
    // -----------------------------------------------------------------------
    let outcome = tokio::select! {
        result = api::serve(app_state, http_addr) => {
            if let Err(e) = &result {
                tracing::error!(error = %e, "HTTP server failed");
            }
            result
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
            Ok(())
        }
    };

    // -----------------------------------------------------------------------
    // 6. Release the store
    // -----------------------------------------------------------------------
    if let Err(e) = store.close().await {
        warn!(error = %e, "Failed to close document store cleanly");
    }

    outcome
}
