//! OpenAI Chat Completions API driver.
//!
//! This module implements [`TextGenerator`] on top of the Chat Completions
//! API (`/v1/chat/completions`). Requests are non-streaming: the whole answer
//! is returned in one response body.

use anyhow::{Context, anyhow};

use super::{GenerationOptions, LlmSettings, Message, TextGenerator};

/// Driver for the OpenAI Chat Completions API.
#[derive(Clone)]
pub struct ChatCompletionsDriver {
    http: reqwest::Client,
    settings: LlmSettings,
}

impl std::fmt::Debug for ChatCompletionsDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatCompletionsDriver")
            .field("base_url", &self.settings.base_url)
            .field("model", &self.settings.model)
            .field("provider", &self.settings.provider)
            .finish()
    }
}

impl ChatCompletionsDriver {
    /// Create a new Chat Completions driver with the given settings.
    #[must_use]
    pub fn new(settings: LlmSettings) -> Self {
        Self {
            http: reqwest::Client::new(),
            settings,
        }
    }

    fn request_body(&self, prompt: &str, options: &GenerationOptions) -> serde_json::Value {
        serde_json::json!({
            "model": self.settings.model,
            "stream": false,
            "messages": [Message::user(prompt)],
            "temperature": options.temperature,
            "top_p": options.top_p,
            "max_tokens": options.max_output_tokens,
        })
    }
}

/// Pull the assistant text out of a Chat Completions response body.
fn parse_completion(body: &serde_json::Value) -> anyhow::Result<String> {
    if let Some(err) = body.get("error") {
        let message = err
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("unknown error");
        return Err(anyhow!("LLM backend error: {message}"));
    }

    let choice = body["choices"]
        .get(0)
        .context("LLM response contained no choices")?;

    choice["message"]["content"]
        .as_str()
        .map(ToString::to_string)
        .context("LLM response contained no message content")
}

#[async_trait::async_trait]
impl TextGenerator for ChatCompletionsDriver {
    async fn generate(&self, prompt: &str, options: &GenerationOptions) -> anyhow::Result<String> {
        let url = self.settings.provider.build_chat_url(&self.settings.base_url);
        let body = self.request_body(prompt, options);

        let mut rb = self.http.post(&url).json(&body);
        if let Some(k) = &self.settings.api_key {
            rb = if self.settings.provider.uses_api_key_header() {
                rb.header("api-key", k)
            } else {
                rb.bearer_auth(k)
            };
        }

        tracing::debug!(
            model = %self.settings.model,
            prompt_length = prompt.len(),
            "Sending chat completion request"
        );

        let resp = rb.send().await?.error_for_status()?;
        let value: serde_json::Value = resp.json().await?;
        let content = parse_completion(&value)?;

        tracing::debug!(content_length = content.len(), "Chat completion received");

        Ok(content)
    }
}
