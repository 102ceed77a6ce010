//! Multi-turn conversation handle.
//!
//! Owns the accumulated message history exchanged with the generation
//! model. Generated image parts are kept in history so refinement turns
//! can reference them.

use crate::{Content, GenError, GenerationClient, GenerationConfig, GenerationResponse, Part};

/// One ongoing exchange with the generation model.
pub struct Conversation {
    contents: Vec<Content>,
    config: GenerationConfig,
}

impl Conversation {
    pub fn new(config: GenerationConfig) -> Self {
        Self {
            contents: Vec::new(),
            config,
        }
    }

    /// Send one user message and record the model's reply in history.
    ///
    /// A `temperature` override applies to this call only; the session
    /// default is untouched. History is committed only once the call
    /// completes successfully: a failed call leaves it unchanged, and so
    /// does a call abandoned mid-await (callers race this future against
    /// a deadline and drop it on expiry), so a retry never sends the same
    /// user content twice.
    pub async fn send(
        &mut self,
        client: &dyn GenerationClient,
        parts: Vec<Part>,
        temperature: Option<f64>,
    ) -> Result<GenerationResponse, GenError> {
        let mut contents = self.contents.clone();
        contents.push(Content::user(parts));

        let result = match temperature {
            Some(t) => {
                let config = self.config.clone().with_temperature(t);
                client.generate(&contents, &config).await
            }
            None => client.generate(&contents, &self.config).await,
        };

        let response = result?;
        contents.push(Content::model(response.parts.clone()));
        self.contents = contents;
        Ok(response)
    }

    /// Number of history entries (two per completed exchange).
    pub fn len(&self) -> usize {
        self.contents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }
}
