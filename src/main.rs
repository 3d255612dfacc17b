//! Madrasa · Assessment Backend
//!
//! - Axum HTTP + WebSocket API
//! - Quiz and self-test sessions over a built-in or TOML-provided corpus
//! - Optional text/speech generation via an OpenAI-compatible API
//! - Static SPA fallback (./static/index.html)
//!
//! Important env variables:
//!   PORT                : u16 (default 3000)
//!   MADRASA_CONFIG_PATH : path to TOML config (prompts + optional corpus sections)
//!   GEN_API_KEY         : server default credential (requests may send their own apiKey)
//!   GEN_BASE_URL        : default "https://api.openai.com/v1"
//!   GEN_CHAT_MODEL      : default "gpt-4o-mini"
//!   GEN_SPEECH_MODEL    : default "gpt-4o-mini-tts"
//!   GEN_VOICE           : default "alloy"
//!   LOG_LEVEL           : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT          : "pretty" (default) or "json"

mod telemetry;
mod util;
mod domain;
mod config;
mod seeds;
mod engine;
mod audio;
mod generation;
mod state;
mod protocol;
mod logic;
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

  // Shared read-only state: corpus, prompts, generation client.
  let state = Arc::new(AppState::new()?);

  let app = build_router(state.clone());

  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "madrasa_backend", %addr, "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;
  info!(target: "madrasa_backend", "Server stopped");
  Ok(())
}

/// Resolves on Ctrl-C. Open sessions are simply dropped.
async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(target: "madrasa_backend", error = %e, "Failed to listen for shutdown signal");
    std::future::pending::<()>().await;
  }
  info!(target: "madrasa_backend", "Shutdown signal received");
}
