//! `OpenAI`-compatible embeddings client (`/v1/embeddings`).

use super::Embedder;
use crate::llm::LlmSettings;
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingDatum {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

/// Remote embeddings over the same provider surface as the chat driver.
#[derive(Clone)]
pub struct OpenAiEmbedder {
    http: reqwest::Client,
    settings: LlmSettings,
}

impl std::fmt::Debug for OpenAiEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiEmbedder")
            .field("base_url", &self.settings.base_url)
            .field("model", &self.settings.model)
            .finish()
    }
}

impl OpenAiEmbedder {
    /// `settings.model` names the embedding model, not the chat model.
    #[must_use]
    pub fn new(settings: LlmSettings) -> Self {
        Self {
            http: reqwest::Client::new(),
            settings,
        }
    }

    async fn request(&self, input: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let expected = input.len();
        let url = self
            .settings
            .provider
            .build_embeddings_url(&self.settings.base_url);
        let body = serde_json::json!({
            "model": self.settings.model,
            "input": input,
        });

        let mut rb = self.http.post(&url).json(&body);
        if let Some(k) = &self.settings.api_key {
            rb = if self.settings.provider.uses_api_key_header() {
                rb.header("api-key", k)
            } else {
                rb.bearer_auth(k)
            };
        }

        let resp = rb.send().await?.error_for_status()?;
        let parsed: EmbeddingsResponse = resp
            .json()
            .await
            .context("Failed to parse embeddings response")?;

        order_embeddings(parsed, expected)
    }
}

/// Put returned rows back in input order and check none are missing.
fn order_embeddings(mut parsed: EmbeddingsResponse, expected: usize) -> Result<Vec<Vec<f32>>> {
    if parsed.data.len() != expected {
        return Err(anyhow!(
            "Embeddings backend returned {} vectors for {} inputs",
            parsed.data.len(),
            expected
        ));
    }
    parsed.data.sort_by_key(|d| d.index);
    Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn model_name(&self) -> &str {
        &self.settings.model
    }

    async fn embed_documents(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        tracing::info!(count = texts.len(), model = %self.settings.model, "Requesting document embeddings");
        self.request(texts).await
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.request(vec![text.to_string()])
            .await?
            .into_iter()
            .next()
            .context("No embedding generated")
    }
}
