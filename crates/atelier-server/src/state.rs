//! Shared application state handed to every handler.

use std::sync::Arc;
use std::time::Duration;

use atelier_ai::GenerationClient;

use crate::gate::Gate;
use crate::sessions::SessionStore;

#[derive(Clone)]
pub struct AppState {
    pub store: SessionStore,
    pub gate: Gate,
    pub client: Arc<dyn GenerationClient>,
    pub settings: Arc<Settings>,
}

pub struct Settings {
    /// Wall-clock deadline for one dispatched model call.
    pub request_timeout: Duration,
    /// Sampling temperature when the request supplies none.
    pub default_temperature: f64,
    /// RSS ceiling for the load-shedding precondition; `None` disables it.
    pub memory_limit_bytes: Option<u64>,
}
