//! Educational Research Generator · Backend
//!
//! - Axum HTTP + WebSocket API
//! - Research generation through an OpenAI-compatible chat backend
//! - Dual rendering of generated documents (screen tree + inline-styled HTML)
//! - Persistent history and credential (JSON files under the data dir)
//! - Static SPA fallback (./static/index.html)
//!
//! Important env variables:
//!   PORT                 : u16 (default 3000)
//!   OPENAI_API_KEY       : fallback credential when none is stored
//!   OPENAI_BASE_URL      : default "https://api.openai.com/v1"
//!   OPENAI_MODEL         : default "gpt-4o"
//!   OPENAI_TEMPERATURE   : default 0.7
//!   OPENAI_TIMEOUT_SECS  : request timeout; unset means no timeout
//!   RESEARCH_DATA_DIR    : default "./data"
//!   RESEARCH_CONFIG_PATH : path to TOML config (prompts, render defaults, UI language)
//!   LOG_LEVEL            : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT           : "pretty" (default) or "json"

mod telemetry;
mod util;
mod domain;
mod config;
mod errors;
mod format;
mod prompt;
mod llm;
mod store;
mod history;
mod state;
mod protocol;
mod routes;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{info, instrument};

use crate::routes::build_router;
use crate::state::AppState;

#[instrument(level = "info", skip_all)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  // Shared state: generation client, stores, session.
  let state = Arc::new(AppState::from_env()?);

  let app = build_router(state);

  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "research_backend", %addr, "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;
  info!(target: "research_backend", "Server stopped");
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(target: "research_backend", error = %e, "Failed to listen for shutdown signal");
  }
}
