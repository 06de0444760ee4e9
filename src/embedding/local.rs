use super::Embedder;
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

/// Instruction BGE English models expect in front of search queries.
const BGE_QUERY_INSTRUCTION: &str = "Represent this sentence for searching relevant passages: ";

/// Local embedding inference through `fastembed`.
///
/// The ONNX model is loaded lazily on first use and then reused. Inference is
/// blocking, so it runs on the blocking pool with the model moved in and out.
pub struct FastEmbedder {
    model: Arc<Mutex<Option<TextEmbedding>>>,
    model_code: String,
    kind: EmbeddingModel,
}

impl std::fmt::Debug for FastEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FastEmbedder")
            .field("model_code", &self.model_code)
            .field("model_loaded", &"Dynamic")
            .finish()
    }
}

impl FastEmbedder {
    /// Default local model.
    pub const DEFAULT_MODEL: &'static str = "BAAI/bge-small-en-v1.5";

    /// Resolve a model code (e.g. `BAAI/bge-small-en-v1.5`) to a supported model.
    pub fn new(model_code: &str) -> Result<Self> {
        let info = TextEmbedding::list_supported_models()
            .into_iter()
            .find(|m| m.model_code.eq_ignore_ascii_case(model_code))
            .ok_or_else(|| anyhow!("Unsupported fastembed model: {model_code}"))?;

        Ok(Self {
            model: Arc::new(Mutex::new(None)),
            model_code: info.model_code,
            kind: info.model,
        })
    }

    async fn embed_raw(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let mut model_guard = self.model.lock().await;
        if model_guard.is_none() {
            info!(model = %self.model_code, "Initializing fastembed model...");
            let mut options = InitOptions::new(self.kind.clone());
            options.show_download_progress = false;

            let kind_name = self.model_code.clone();
            let model = tokio::task::spawn_blocking(move || TextEmbedding::try_new(options))
                .await?
                .with_context(|| format!("Failed to load fastembed model {kind_name}"))?;
            *model_guard = Some(model);
        }

        let mut owned_model = model_guard
            .take()
            .context("Model unexpectedly None during embed")?;

        let (embeddings_res, returned_model) = tokio::task::spawn_blocking(move || {
            let res = owned_model.embed(texts, None);
            (res, owned_model)
        })
        .await?;

        *model_guard = Some(returned_model);
        embeddings_res.map_err(|e| anyhow!(e))
    }
}

/// Prefixes (query, document) a model family expects, if any.
fn mode_prefixes(model_code: &str) -> (&'static str, &'static str) {
    let lower = model_code.to_lowercase();
    if lower.contains("bge") && lower.contains("-en") {
        (BGE_QUERY_INSTRUCTION, "")
    } else if lower.contains("e5") {
        ("query: ", "passage: ")
    } else {
        ("", "")
    }
}

#[async_trait]
impl Embedder for FastEmbedder {
    fn model_name(&self) -> &str {
        &self.model_code
    }

    async fn embed_documents(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let (_, doc_prefix) = mode_prefixes(&self.model_code);
        let texts = if doc_prefix.is_empty() {
            texts
        } else {
            texts.into_iter().map(|t| format!("{doc_prefix}{t}")).collect()
        };
        info!(count = texts.len(), "Generating document embeddings");
        self.embed_raw(texts).await
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let (query_prefix, _) = mode_prefixes(&self.model_code);
        let embeddings = self.embed_raw(vec![format!("{query_prefix}{text}")]).await?;
        embeddings
            .into_iter()
            .next()
            .context("No embedding generated")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_prefixes() {
        assert_eq!(
            mode_prefixes("BAAI/bge-small-en-v1.5"),
            (BGE_QUERY_INSTRUCTION, "")
        );
        assert_eq!(
            mode_prefixes("intfloat/multilingual-e5-small"),
            ("query: ", "passage: ")
        );
        assert_eq!(mode_prefixes("sentence-transformers/all-MiniLM-L6-v2"), ("", ""));
    }

    #[test]
    fn test_unknown_model_rejected() {
        assert!(FastEmbedder::new("not/a-model").is_err());
    }

    #[test]
    fn test_default_model_resolves() {
        let embedder = FastEmbedder::new(FastEmbedder::DEFAULT_MODEL).unwrap();
        assert!(
            embedder
                .model_name()
                .eq_ignore_ascii_case(FastEmbedder::DEFAULT_MODEL)
        );
    }
}
