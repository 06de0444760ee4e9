//! Text embedding backends.
//!
//! Entities are embedded in document mode at build time and questions in
//! query mode at query time. Both must come from the same model, so every
//! [`Embedder`] reports its model name and the persisted index records it.

pub mod local;
pub mod openai;

pub use self::local::FastEmbedder;
pub use self::openai::OpenAiEmbedder;

use async_trait::async_trait;

/// Handle to a text embedding backend.
#[async_trait]
pub trait Embedder: Send + Sync + std::fmt::Debug {
    /// Identifier of the embedding model (recorded alongside the index).
    fn model_name(&self) -> &str;

    /// Embed a batch of documents in one backend call.
    async fn embed_documents(&self, texts: Vec<String>) -> anyhow::Result<Vec<Vec<f32>>>;

    /// Embed a single search query.
    async fn embed_query(&self, text: &str) -> anyhow::Result<Vec<f32>>;
}
