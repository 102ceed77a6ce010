//! Gemini API client struct, request building, and response parsing.

use crate::{Content, GenError, GenerationConfig, GenerationResponse, Part, UsageCounters};

use super::config::GeminiConfig;

pub(crate) const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Gemini API client.
pub struct GeminiClient {
    pub(crate) config: GeminiConfig,
    pub(crate) http: reqwest::Client,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::builder()
                .connect_timeout(std::time::Duration::from_secs(10))
                .timeout(std::time::Duration::from_secs(300))
                .build()
                .expect("failed to build HTTP client"),
        }
    }

    pub(crate) fn api_url(&self) -> String {
        format!("{}/{}:generateContent", GEMINI_API_BASE, self.config.model)
    }

    /// Build the JSON request body for the Gemini API.
    pub(crate) fn build_request_body(
        &self,
        contents: &[Content],
        config: &GenerationConfig,
    ) -> serde_json::Value {
        let mut body = serde_json::json!({
            "contents": contents,
            "generationConfig": {
                "temperature": config.temperature,
                "responseModalities": config.response_modalities,
            }
        });

        if let Some(ref aspect_ratio) = config.aspect_ratio {
            body["generationConfig"]["imageConfig"] = serde_json::json!({
                "aspectRatio": aspect_ratio,
            });
        }

        body
    }

    /// Parse a Gemini response, dropping internal-reasoning ("thought") text.
    pub(crate) fn parse_response(
        &self,
        json: serde_json::Value,
    ) -> Result<GenerationResponse, GenError> {
        let candidates = json["candidates"]
            .as_array()
            .ok_or_else(|| GenError::Parse("no candidates in response".to_string()))?;

        let first = candidates
            .first()
            .ok_or_else(|| GenError::Parse("empty candidates".to_string()))?;

        let raw_parts = first["content"]["parts"]
            .as_array()
            .cloned()
            .unwrap_or_default();

        let mut parts = Vec::new();
        for part in &raw_parts {
            if let Some(inline) = part.get("inlineData") {
                parts.push(Part::inline_data(
                    inline["mimeType"].as_str().unwrap_or("image/png"),
                    inline["data"].as_str().unwrap_or(""),
                ));
            } else if let Some(text) = part["text"].as_str() {
                if part["thought"].as_bool() != Some(true) {
                    parts.push(Part::text(text));
                }
            }
        }

        let usage = UsageCounters {
            prompt_tokens: json["usageMetadata"]["promptTokenCount"]
                .as_u64()
                .unwrap_or(0),
            output_tokens: json["usageMetadata"]["candidatesTokenCount"]
                .as_u64()
                .unwrap_or(0),
            total_tokens: json["usageMetadata"]["totalTokenCount"]
                .as_u64()
                .unwrap_or(0),
        };

        Ok(GenerationResponse { parts, usage })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> GeminiClient {
        GeminiClient::new(GeminiConfig::new("test-key"))
    }

    #[test]
    fn request_body_carries_contents_and_sampling() {
        let contents = vec![Content::user(vec![
            Part::text("photorealistic ring"),
            Part::inline_data("image/jpeg", "QUJD"),
        ])];
        let config = GenerationConfig::image(0.4);

        let body = client().build_request_body(&contents, &config);

        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "photorealistic ring");
        assert_eq!(
            body["contents"][0]["parts"][1]["inlineData"]["mimeType"],
            "image/jpeg"
        );
        assert_eq!(body["generationConfig"]["temperature"], 0.4);
        assert_eq!(
            body["generationConfig"]["responseModalities"],
            serde_json::json!(["TEXT", "IMAGE"])
        );
        assert_eq!(
            body["generationConfig"]["imageConfig"]["aspectRatio"],
            "1:1"
        );
    }

    #[test]
    fn request_body_omits_image_config_without_aspect_hint() {
        let mut config = GenerationConfig::image(0.4);
        config.aspect_ratio = None;
        let body = client().build_request_body(&[], &config);
        assert!(body["generationConfig"].get("imageConfig").is_none());
    }

    #[test]
    fn parse_collects_images_and_skips_thought_text() {
        let json = serde_json::json!({
            "candidates": [{
                "content": {
                    "parts": [
                        { "text": "planning the render", "thought": true },
                        { "text": "Here is your ring. " },
                        { "inlineData": { "mimeType": "image/png", "data": "QUJD" } },
                        { "text": "Let me know what to refine." }
                    ]
                }
            }],
            "usageMetadata": {
                "promptTokenCount": 12,
                "candidatesTokenCount": 1290,
                "totalTokenCount": 1302
            }
        });

        let response = client().parse_response(json).unwrap();

        assert_eq!(response.images().count(), 1);
        assert_eq!(
            response.visible_text(),
            "Here is your ring. Let me know what to refine."
        );
        assert_eq!(response.usage.prompt_tokens, 12);
        assert_eq!(response.usage.output_tokens, 1290);
        assert_eq!(response.usage.total_tokens, 1302);
    }

    #[test]
    fn parse_rejects_missing_candidates() {
        let err = client()
            .parse_response(serde_json::json!({ "promptFeedback": {} }))
            .unwrap_err();
        assert!(matches!(err, GenError::Parse(_)));
    }

    #[test]
    fn parse_rejects_empty_candidates() {
        let err = client()
            .parse_response(serde_json::json!({ "candidates": [] }))
            .unwrap_err();
        assert!(matches!(err, GenError::Parse(_)));
    }

    #[test]
    fn api_url_targets_generate_content() {
        assert_eq!(
            client().api_url(),
            format!("{GEMINI_API_BASE}/gemini-2.5-flash-image:generateContent")
        );
    }
}
