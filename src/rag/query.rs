//! Query session over a built index.
//!
//! Loads the artifacts once and answers questions against them. Every
//! outcome is a printable string; only a missing index is reported
//! differently from a generation failure.

use crate::corpus::ReviewCorpus;
use crate::embedding::Embedder;
use crate::error::Result;
use crate::persistence::IndexArtifacts;
use crate::rag::answer::AnswerSynthesizer;
use crate::rag::retrieval::{ContextBundle, LocalSearchConfig, LocalSearchRetriever};
use std::path::Path;
use std::sync::Arc;

pub const MISSING_INDEX: &str =
    "Could not find the necessary index files. Please build the index first.";
pub const NOTHING_RELEVANT: &str =
    "I couldn't find any relevant information in the knowledge graph to answer your question.";

/// Answers questions from loaded, read-only artifacts.
#[derive(Debug)]
pub struct QueryEngine {
    artifacts: Option<IndexArtifacts>,
    corpus: ReviewCorpus,
    retriever: LocalSearchRetriever,
    synthesizer: AnswerSynthesizer,
    embedder: Arc<dyn Embedder>,
}

impl QueryEngine {
    /// Open the index in `index_dir`.
    ///
    /// A missing or unusable index does not fail here; every later question
    /// is answered with [`MISSING_INDEX`].
    pub async fn open(
        index_dir: &Path,
        corpus: ReviewCorpus,
        embedder: Arc<dyn Embedder>,
        synthesizer: AnswerSynthesizer,
        search: LocalSearchConfig,
    ) -> Self {
        let artifacts = match IndexArtifacts::load(index_dir).await {
            Ok(artifacts) => match artifacts.ensure_model(embedder.model_name()) {
                Ok(()) => Some(artifacts),
                Err(e) => {
                    tracing::error!(error = %e, "Index is incompatible with the configured embedder");
                    None
                }
            },
            Err(e) => {
                tracing::error!(dir = %index_dir.display(), error = %e, "Could not load index");
                None
            }
        };

        Self {
            artifacts,
            corpus,
            retriever: LocalSearchRetriever::with_config(search),
            synthesizer,
            embedder,
        }
    }

    /// Wrap artifacts that are already in memory, e.g. straight after a build.
    pub fn from_artifacts(
        artifacts: IndexArtifacts,
        corpus: ReviewCorpus,
        embedder: Arc<dyn Embedder>,
        synthesizer: AnswerSynthesizer,
        search: LocalSearchConfig,
    ) -> Self {
        Self {
            artifacts: Some(artifacts),
            corpus,
            retriever: LocalSearchRetriever::with_config(search),
            synthesizer,
            embedder,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.artifacts.is_some()
    }

    /// Assemble the context bundle for `query`, or `None` without an index.
    pub async fn context(&self, query: &str) -> Option<Result<ContextBundle>> {
        let artifacts = self.artifacts.as_ref()?;
        Some(
            self.retriever
                .retrieve(
                    query,
                    &artifacts.graph,
                    &artifacts.entity_index,
                    &artifacts.summaries,
                    self.embedder.as_ref(),
                    &self.corpus,
                )
                .await,
        )
    }

    /// Answer one question.
    pub async fn answer(&self, query: &str) -> String {
        tracing::info!(query, "Answering question");
        let bundle = match self.context(query).await {
            None => return MISSING_INDEX.to_string(),
            Some(Err(e)) => {
                tracing::error!(error = %e, "Context retrieval failed");
                return format!("An error occurred while searching the knowledge graph: {e}");
            }
            Some(Ok(bundle)) => bundle,
        };

        if bundle.is_empty() {
            return NOTHING_RELEVANT.to_string();
        }
        self.synthesizer.answer(&bundle.render(), query).await
    }
}
