//! # Quoteboard — Live Market Quote Dashboard Backend
//!
//! ## Architecture Overview
//!
//! ```text
//!  ┌──────────────┐  GET /time_series (every 30 s)  ┌──────────────────────┐
//!  │  Twelve Data │ ◀───────────────────────────────│  RefreshScheduler    │
//!  │  REST API    │ ───────────────────────────────▶│  (one fetch at once) │
//!  └──────────────┘                                 └──────────┬───────────┘
//!                                                              │ replace
//!                                                   ┌──────────▼───────────┐
//!                                                   │  TimeSeriesStore     │
//!                                                   │  Arc<StoreSnapshot>  │
//!                                                   └──────────┬───────────┘
//!                                                              │ merge / window
//!  ┌──────────────┐  GET /api/quotes, /ws/quotes    ┌──────────▼───────────┐
//!  │  Dashboard   │ ◀───────────────────────────────│  Axum routes         │
//!  └──────────────┘                                 └──────────────────────┘
//! ```
//!
//! Configuration is read from the environment, see [`config`].

use std::sync::Arc;
use std::time::Duration;

use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod config;
mod error;
mod models;
mod provider;
mod routes;
mod scheduler;
mod state;
mod store;
mod table;
mod window;

use config::Config;
use provider::{twelve_data::TwelveDataClient, QuoteSource};
use state::build_state;

// ─── Entry Point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Load .env (optional) ──────────────────────────────────────────────
    dotenvy::dotenv().ok();

    // ── 2. Structured logging ────────────────────────────────────────────────
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env()
            .add_directive("quoteboard=debug".parse()?)
            .add_directive("tower_http=info".parse()?))
        .init();

    // ── 3. Configuration ─────────────────────────────────────────────────────
    let config = Config::from_env()?;
    info!(
        symbols  = ?config.symbols,
        interval = %config.interval,
        poll     = ?config.poll_interval,
        "⚙️ Configuration loaded"
    );

    // ── 4. Provider + shared state ───────────────────────────────────────────
    let http = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(5))
        .build()?;
    let source: Arc<dyn QuoteSource> = Arc::new(TwelveDataClient::new(http, &config));
    let state = build_state(source, config.symbols.clone(), config.poll_interval);

    // ── 5. Refresh loop (first fetch fires immediately) ──────────────────────
    state.scheduler.start().await;

    // ── 6. Router ────────────────────────────────────────────────────────────
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = routes::router(Arc::clone(&state))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // ── 7. Serve until Ctrl-C, then stop the refresh loop ────────────────────
    info!(addr = ?config.bind_addr, "🚀 Quoteboard server starting");

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.scheduler.stop().await;
    info!("👋 Quoteboard shut down");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
