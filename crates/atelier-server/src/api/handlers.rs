//! HTTP handlers.

use axum::{Json, extract::State};

use crate::api::ApiResult;
use crate::orchestrate::{self, GenerateRequest, GenerateResponse};
use crate::sessions::SessionSummary;
use crate::state::AppState;

/// Single conversation endpoint covering both NEW and CONTINUE.
pub async fn generate(
    State(state): State<AppState>,
    Json(req): Json<GenerateRequest>,
) -> ApiResult<Json<GenerateResponse>> {
    orchestrate::run(&state, req).await.map(Json)
}

#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionListResponse {
    pub count: usize,
    pub sessions: Vec<SessionSummary>,
}

/// Diagnostic listing of live sessions.
pub async fn list_sessions(State(state): State<AppState>) -> Json<SessionListResponse> {
    let sessions = state.store.list().await;
    Json(SessionListResponse {
        count: sessions.len(),
        sessions,
    })
}

#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub active_calls: usize,
    pub max_concurrent: usize,
    pub sessions: usize,
}

pub async fn healthz(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        active_calls: state.gate.active(),
        max_concurrent: state.gate.max(),
        sessions: state.store.count().await,
    })
}
