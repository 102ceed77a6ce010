//! atelier-server: turns hand-drawn sketches into photorealistic renders
//! through iterative conversations with a generation model.
//!
//! Holds per-session conversation state in memory, bounds in-flight model
//! calls with a FIFO gate, applies a per-call deadline, and evicts idle
//! sessions on a timer.

mod api;
mod gate;
mod mem;
mod orchestrate;
mod sessions;
mod state;

use std::sync::Arc;
use std::time::Duration;

use atelier_ai::{GeminiClient, GeminiConfig};
use clap::Parser;
use tokio::net::TcpListener;

use crate::gate::Gate;
use crate::sessions::SessionStore;
use crate::state::{AppState, Settings};

#[derive(Parser)]
#[command(name = "atelier-server", about = "Sketch-to-photoreal rendering service")]
struct Args {
    /// Port to listen on.
    #[arg(short, long, default_value_t = 3456)]
    port: u16,

    /// Maximum simultaneous in-flight model calls.
    #[arg(long, default_value_t = 3)]
    max_concurrent: usize,

    /// Wall-clock deadline for one model call, in seconds.
    #[arg(long, default_value_t = 120)]
    request_timeout: u64,

    /// Idle session lifetime in seconds.
    #[arg(long, default_value_t = 1800)]
    session_ttl: u64,

    /// Eviction sweep period in seconds.
    #[arg(long, default_value_t = 60)]
    sweep_interval: u64,

    /// Reject new requests above this RSS ceiling, in MiB; 0 disables.
    #[arg(long, default_value_t = 2048)]
    memory_limit_mb: u64,

    /// Generation model identifier.
    #[arg(long, default_value = "gemini-2.5-flash-image")]
    model: String,

    /// Default sampling temperature.
    #[arg(long, default_value_t = 1.0)]
    temperature: f64,

    /// Gemini API key.
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: String,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "atelier_server=info,atelier_ai=info".into()),
        )
        .init();

    let args = Args::parse();

    let client = GeminiClient::new(
        GeminiConfig::new(args.api_key.clone()).with_model(args.model.clone()),
    );

    let store = SessionStore::new();
    let sweeper = store.spawn_sweeper(
        Duration::from_secs(args.session_ttl),
        Duration::from_secs(args.sweep_interval),
    );

    let state = AppState {
        store: store.clone(),
        gate: Gate::new(args.max_concurrent),
        client: Arc::new(client),
        settings: Arc::new(Settings {
            request_timeout: Duration::from_secs(args.request_timeout),
            default_temperature: args.temperature,
            memory_limit_bytes: (args.memory_limit_mb > 0)
                .then(|| args.memory_limit_mb * 1024 * 1024),
        }),
    };

    let app = api::create_router(state);
    let addr = format!("0.0.0.0:{}", args.port);
    let listener = TcpListener::bind(&addr)
        .await
        .expect("Failed to bind TCP listener");

    tracing::info!(
        model = %args.model,
        max_concurrent = args.max_concurrent,
        "atelier-server listening on {}",
        addr
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    // Orderly teardown: the sweeper is owned here, not free-running.
    sweeper.abort();
    store.clear().await;
    tracing::info!("Shutdown complete");
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to listen for ctrl-c");
    tracing::info!("Shutdown signal received");
}
