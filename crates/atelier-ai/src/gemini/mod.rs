//! Gemini image-generation API client.
//!
//! Split into: config (settings), client (request building + response
//! parsing), api (GenerationClient impl).

mod api;
mod client;
mod config;

pub use client::GeminiClient;
pub use config::GeminiConfig;
