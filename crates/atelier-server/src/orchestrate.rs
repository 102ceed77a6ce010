//! Per-request conversation orchestration.
//!
//! Decides NEW vs CONTINUE, validates inputs, assembles the outgoing
//! message, then dispatches through the gate under the request deadline
//! and unpacks the model's reply.

use atelier_ai::{GenerationConfig, Part, UsageCounters};
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::api::{ApiError, ApiResult};
use crate::mem;
use crate::state::AppState;

/// Body of `POST /api/generate`. `sessionId` absent means NEW.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub session_id: Option<String>,
    pub prompt: Option<String>,
    /// Base sketch; required together with `mime_type` on NEW.
    pub image_base64: Option<String>,
    pub mime_type: Option<String>,
    /// Optional annotation overlay on CONTINUE.
    pub annotation_base64: Option<String>,
    /// Mime type of the annotation; PNG (what the canvas exports) when
    /// absent.
    pub annotation_mime_type: Option<String>,
    /// Number or numeric string; anything else falls back to the default.
    pub temperature: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub session_id: String,
    pub images: Vec<ImagePayload>,
    pub text: String,
    pub usage: UsageCounters,
    pub turn: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImagePayload {
    pub mime_type: String,
    pub data: String,
}

/// Lenient temperature parsing: JSON number, or a string that parses as
/// one. Anything else reads as absent.
fn parse_temperature(value: Option<&serde_json::Value>) -> Option<f64> {
    let value = value?;
    if let Some(n) = value.as_f64() {
        return Some(n);
    }
    value.as_str()?.trim().parse().ok()
}

fn require_base64(field: &str, data: &str) -> ApiResult<()> {
    base64::engine::general_purpose::STANDARD
        .decode(data)
        .map(|_| ())
        .map_err(|_| ApiError::bad_request(format!("{field} is not valid base64")))
}

/// Handle one conversation request end to end.
pub async fn run(state: &AppState, req: GenerateRequest) -> ApiResult<GenerateResponse> {
    // Load-shedding precondition, evaluated before any state is touched
    // and before the request can reach the gate.
    if let (Some(limit), Some(rss)) = (state.settings.memory_limit_bytes, mem::rss_bytes()) {
        if rss > limit {
            return Err(ApiError::Overloaded(format!(
                "process memory {}MiB exceeds the {}MiB ceiling, retry later",
                rss / (1024 * 1024),
                limit / (1024 * 1024),
            )));
        }
    }

    let prompt = req
        .prompt
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty());
    let temperature = parse_temperature(req.temperature.as_ref());

    let mut parts = Vec::new();
    if let Some(p) = prompt {
        parts.push(Part::text(p));
    }

    let (session_id, conversation, call_temperature) = match req.session_id.as_deref() {
        // CONTINUE: the session must still be live.
        Some(id) => {
            let conversation = state.store.lookup(id).await.ok_or_else(|| {
                ApiError::not_found(format!("session {id} expired or not found"))
            })?;

            if let Some(annotation) = req.annotation_base64.as_deref().filter(|a| !a.is_empty()) {
                require_base64("annotationBase64", annotation)?;
                let mime_type = req.annotation_mime_type.as_deref().unwrap_or("image/png");
                parts.push(Part::inline_data(mime_type, annotation));
            }
            if parts.is_empty() {
                return Err(ApiError::bad_request(
                    "continuation needs a prompt or an annotation",
                ));
            }

            (id.to_string(), conversation, temperature)
        }
        // NEW: prompt and base sketch are both required. Validation failures
        // are terminal before any session exists.
        None => {
            if prompt.is_none() {
                return Err(ApiError::bad_request("a new session requires a prompt"));
            }
            let (Some(image), Some(mime_type)) =
                (req.image_base64.as_deref(), req.mime_type.as_deref())
            else {
                return Err(ApiError::bad_request(
                    "a new session requires imageBase64 and mimeType",
                ));
            };
            require_base64("imageBase64", image)?;
            parts.push(Part::inline_data(mime_type, image));

            let config = GenerationConfig::image(
                temperature.unwrap_or(state.settings.default_temperature),
            );
            let (id, conversation) = state.store.create(config).await;
            // Session temperature was just set from the request; no
            // per-call override on the first exchange.
            (id, conversation, None)
        }
    };

    // Attempted exchanges count, even if the call below fails.
    let turn = state.store.begin_turn(&session_id).await.ok_or_else(|| {
        ApiError::not_found(format!("session {session_id} expired or not found"))
    })?;

    let _permit = state.gate.acquire().await;
    tracing::debug!(session_id = %session_id, turn, active = state.gate.active(), "Dispatching");

    let outcome = tokio::time::timeout(state.settings.request_timeout, async {
        let mut conversation = conversation.lock().await;
        conversation
            .send(state.client.as_ref(), parts, call_temperature)
            .await
    })
    .await;

    let response = match outcome {
        Err(_) => return Err(ApiError::Timeout),
        Ok(Err(e)) => return Err(e.into()),
        Ok(Ok(response)) => response,
    };

    let text = response.visible_text();
    let images: Vec<ImagePayload> = response
        .images()
        .map(|blob| ImagePayload {
            mime_type: blob.mime_type.clone(),
            data: blob.data.clone(),
        })
        .collect();

    // The endpoint's contract is "every success yields at least one image";
    // surface the model's own explanation when it gave one.
    if images.is_empty() {
        let text = text.trim();
        let msg = if text.is_empty() {
            "model returned no image".to_string()
        } else {
            format!("model returned no image: {text}")
        };
        return Err(ApiError::Upstream(msg));
    }

    tracing::info!(session_id = %session_id, turn, images = images.len(), "Exchange complete");

    Ok(GenerateResponse {
        session_id,
        images,
        text,
        usage: response.usage,
        turn,
    })
}
