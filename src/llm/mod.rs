//! Text generation backend.
//!
//! This module provides the protocol-agnostic [`TextGenerator`] handle used by
//! the extractor, the community summarizer and the answer synthesizer, plus
//! the `OpenAI`-compatible Chat Completions implementation.
//!
//! # Example
//!
//! ```rust,ignore
//! use review_graphrag::llm::{ChatCompletionsDriver, GenerationOptions, LlmSettings, TextGenerator};
//!
//! let settings = review_graphrag::config::load_llm_settings()?;
//! let generator = ChatCompletionsDriver::new(settings);
//! let text = generator.generate("Say hi", &GenerationOptions::default()).await?;
//! ```

pub mod chat_completions;
pub mod provider;

pub use chat_completions::ChatCompletionsDriver;
pub use provider::Provider;

use serde::{Deserialize, Serialize};

/// LLM connection and model settings.
#[derive(Debug, Clone)]
pub struct LlmSettings {
    /// Base URL for the LLM API (e.g., `https://api.openai.com`).
    pub base_url: String,
    /// Optional API key for authentication.
    pub api_key: Option<String>,
    /// Model identifier (e.g., `gpt-4o-mini`).
    pub model: String,
    /// Provider type (auto-detected from `base_url` if not specified).
    pub provider: Provider,
}

/// Sampling options sent with every generation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    pub temperature: f32,
    pub top_p: f32,
    pub max_output_tokens: u32,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: 0.2,
            top_p: 1.0,
            max_output_tokens: 4096,
        }
    }
}

/// Role of a message author. Every request is a single user turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// User message.
    User,
}

/// A message in a generation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

/// Handle to a text generation backend.
///
/// Constructed once at process start and shared as `Arc<dyn TextGenerator>`
/// by every component that needs generation.
#[async_trait::async_trait]
pub trait TextGenerator: Send + Sync + std::fmt::Debug {
    /// Generate a completion for a single prompt.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the backend returns no text.
    async fn generate(&self, prompt: &str, options: &GenerationOptions) -> anyhow::Result<String>;
}
