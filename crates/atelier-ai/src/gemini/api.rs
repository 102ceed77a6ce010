//! GenerationClient trait implementation for GeminiClient.

use async_trait::async_trait;
use tracing::debug;

use crate::{Content, GenError, GenerationClient, GenerationConfig, GenerationResponse};

use super::client::GeminiClient;

#[async_trait]
impl GenerationClient for GeminiClient {
    async fn generate(
        &self,
        contents: &[Content],
        config: &GenerationConfig,
    ) -> Result<GenerationResponse, GenError> {
        let body = self.build_request_body(contents, config);
        let url = self.api_url();

        debug!(model = %self.config.model, contents = contents.len(), "Gemini API request");

        let response = self
            .http
            .post(&url)
            .header("content-type", "application/json")
            .header("x-goog-api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| GenError::Network(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(GenError::RateLimited);
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(GenError::Api(format!("HTTP {status}: {text}")));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| GenError::Parse(e.to_string()))?;

        self.parse_response(json)
    }
}
