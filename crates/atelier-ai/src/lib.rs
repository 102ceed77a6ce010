//! Generation client for Atelier.
//!
//! Provides a Gemini image-generation API client with:
//! - Multimodal requests (text + inline image parts)
//! - Multi-turn conversations that carry generated images forward
//! - Per-call sampling overrides
//! - Provider-reported usage counters

pub mod conversation;
pub mod gemini;

use async_trait::async_trait;

pub use conversation::Conversation;
pub use gemini::{GeminiClient, GeminiConfig};

/// An opaque remote call to the generation model. Implemented by
/// [`GeminiClient`]; mockable for tests.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    async fn generate(
        &self,
        contents: &[Content],
        config: &GenerationConfig,
    ) -> Result<GenerationResponse, GenError>;
}

/// One entry in a conversation, wire-compatible with the Gemini
/// `generateContent` request body.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Content {
    pub role: Role,
    pub parts: Vec<Part>,
}

impl Content {
    pub fn user(parts: Vec<Part>) -> Self {
        Self {
            role: Role::User,
            parts,
        }
    }

    pub fn model(parts: Vec<Part>) -> Self {
        Self {
            role: Role::Model,
            parts,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// A single message part: text or inline binary data.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(untagged)]
pub enum Part {
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: Blob,
    },
    Text {
        text: String,
    },
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn inline_data(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self::InlineData {
            inline_data: Blob {
                mime_type: mime_type.into(),
                data: data.into(),
            },
        }
    }
}

/// Inline binary payload (base64) with its mime type.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    pub mime_type: String,
    /// Base64-encoded bytes.
    pub data: String,
}

/// Sampling configuration for a conversation or a single call.
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    pub temperature: f64,
    /// Which modalities the model may respond with, e.g. `["TEXT", "IMAGE"]`.
    pub response_modalities: Vec<String>,
    /// Aspect-ratio hint for generated images, e.g. `"1:1"`.
    pub aspect_ratio: Option<String>,
}

impl GenerationConfig {
    /// Image-generation defaults: both modalities enabled, square output.
    pub fn image(temperature: f64) -> Self {
        Self {
            temperature,
            response_modalities: vec!["TEXT".to_string(), "IMAGE".to_string()],
            aspect_ratio: Some("1:1".to_string()),
        }
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }
}

/// Provider-reported token counters for one call.
#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageCounters {
    pub prompt_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
}

/// Parsed model response. Internal-reasoning ("thought") text is dropped
/// during parsing; `parts` holds only user-visible output in response order.
#[derive(Debug, Clone)]
pub struct GenerationResponse {
    pub parts: Vec<Part>,
    pub usage: UsageCounters,
}

impl GenerationResponse {
    /// All inline image payloads, in response order.
    pub fn images(&self) -> impl Iterator<Item = &Blob> {
        self.parts.iter().filter_map(|part| match part {
            Part::InlineData { inline_data } => Some(inline_data),
            Part::Text { .. } => None,
        })
    }

    /// All user-visible text fragments concatenated in response order.
    pub fn visible_text(&self) -> String {
        let mut out = String::new();
        for part in &self.parts {
            if let Part::Text { text } = part {
                out.push_str(text);
            }
        }
        out
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GenError {
    #[error("API error: {0}")]
    Api(String),
    #[error("Rate limited")]
    RateLimited,
    #[error("Network error: {0}")]
    Network(String),
    #[error("Parse error: {0}")]
    Parse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn part_serializes_to_gemini_wire_shape() {
        let text = serde_json::to_value(Part::text("a ring")).unwrap();
        assert_eq!(text, serde_json::json!({ "text": "a ring" }));

        let image = serde_json::to_value(Part::inline_data("image/png", "QUJD")).unwrap();
        assert_eq!(
            image,
            serde_json::json!({ "inlineData": { "mimeType": "image/png", "data": "QUJD" } })
        );
    }

    #[test]
    fn content_role_serializes_lowercase() {
        let content = serde_json::to_value(Content::model(vec![Part::text("ok")])).unwrap();
        assert_eq!(content["role"], "model");
    }

    #[test]
    fn response_unpack_preserves_order() {
        let response = GenerationResponse {
            parts: vec![
                Part::text("before "),
                Part::inline_data("image/png", "QQ=="),
                Part::text("after"),
                Part::inline_data("image/jpeg", "Qg=="),
            ],
            usage: UsageCounters::default(),
        };

        assert_eq!(response.visible_text(), "before after");
        let mimes: Vec<_> = response.images().map(|b| b.mime_type.as_str()).collect();
        assert_eq!(mimes, ["image/png", "image/jpeg"]);
    }

    #[test]
    fn image_config_defaults() {
        let config = GenerationConfig::image(0.8);
        assert_eq!(config.temperature, 0.8);
        assert_eq!(config.response_modalities, ["TEXT", "IMAGE"]);
        assert_eq!(config.aspect_ratio.as_deref(), Some("1:1"));
    }
}
