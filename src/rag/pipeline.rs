//! GraphRAG build pipeline.
//!
//! Reviews are extracted into the knowledge graph, the graph is partitioned
//! into communities, every community is summarized, and entity values are
//! embedded into the vector index. Artifacts are written only after every
//! step has succeeded.

use crate::corpus::{ReviewCorpus, ReviewDocument};
use crate::embedding::Embedder;
use crate::error::{GraphRagError, Result};
use crate::llm::{GenerationOptions, TextGenerator};
use crate::persistence::IndexArtifacts;
use crate::rag::community::{CommunityConfig, GreedyModularityDetector};
use crate::rag::extraction::{EntityExtractor, LlmEntityExtractor};
use crate::rag::graph_store::KnowledgeGraph;
use crate::rag::summarize::CommunitySummarizer;
use crate::rag::vector_index::EntityIndex;
use futures::StreamExt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

// =============================================================================
// Options and Report
// =============================================================================

/// Build-time knobs.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Pause after every extraction request
    pub extraction_delay: Duration,
    /// Pause after every summary request
    pub summary_delay: Duration,
    /// Maximum backend requests in flight (1 = strictly sequential)
    pub concurrency: usize,
    /// Modularity resolution for community detection
    pub resolution: f64,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            extraction_delay: Duration::from_millis(1000),
            summary_delay: Duration::from_millis(500),
            concurrency: 1,
            resolution: 1.0,
        }
    }
}

/// What a build produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildReport {
    pub documents: usize,
    pub failed_documents: Vec<String>,
    pub nodes: usize,
    pub edges: usize,
    pub communities: usize,
    pub modularity: f64,
    pub indexed_entities: usize,
}

// =============================================================================
// Index Builder
// =============================================================================

/// Runs the full build over a corpus.
#[derive(Debug, Clone)]
pub struct IndexBuilder {
    extractor: Arc<dyn EntityExtractor>,
    summarizer: CommunitySummarizer,
    embedder: Arc<dyn Embedder>,
    options: BuildOptions,
}

impl IndexBuilder {
    pub fn new(
        extractor: Arc<dyn EntityExtractor>,
        summarizer: CommunitySummarizer,
        embedder: Arc<dyn Embedder>,
        options: BuildOptions,
    ) -> Self {
        let summarizer = summarizer
            .with_delay(options.summary_delay)
            .with_concurrency(options.concurrency);
        Self {
            extractor,
            summarizer,
            embedder,
            options,
        }
    }

    /// Extract every document and merge results in document order.
    ///
    /// A failed document contributes nothing and is reported by name.
    pub async fn build_graph(&self, documents: &[ReviewDocument]) -> (KnowledgeGraph, Vec<String>) {
        let total = documents.len();
        let extractor = &self.extractor;
        let delay = self.options.extraction_delay;

        let outcomes: Vec<_> = futures::stream::iter(documents.iter().enumerate())
            .map(|(position, doc)| async move {
                let outcome = extractor.extract(&doc.text).await;
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                tracing::debug!(document = %doc.name, position = position + 1, total, "Extracted review");
                (doc, outcome)
            })
            .buffered(self.options.concurrency.max(1))
            .collect()
            .await;

        let mut graph = KnowledgeGraph::new();
        let mut failed = Vec::new();
        for (doc, outcome) in outcomes {
            match outcome {
                Ok(result) => {
                    let stats = graph.merge_extraction(&result, &doc.name);
                    tracing::debug!(
                        document = %doc.name,
                        nodes_added = stats.nodes_added,
                        duplicates = stats.duplicate_nodes,
                        edges_added = stats.edges_added,
                        "Merged extraction"
                    );
                }
                Err(e) => {
                    let err = GraphRagError::from(e);
                    tracing::warn!(document = %doc.name, error = %err, "Skipping review");
                    failed.push(doc.name.clone());
                }
            }
        }

        tracing::info!(
            extractor = self.extractor.name(),
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            failed = failed.len(),
            "Initial graph built"
        );
        (graph, failed)
    }

    /// Run every build step in memory.
    pub async fn build(&self, documents: &[ReviewDocument]) -> Result<(IndexArtifacts, BuildReport)> {
        let (mut graph, failed_documents) = self.build_graph(documents).await;
        if graph.is_empty() {
            return Err(GraphRagError::IndexBuild(format!(
                "no entities extracted from {} documents",
                documents.len()
            )));
        }

        let detector = GreedyModularityDetector::with_config(CommunityConfig {
            resolution: self.options.resolution,
        });
        let partition = detector.detect(&graph.undirected_projection());
        graph.assign_communities(&partition.assignment);

        let summaries = self.summarizer.summarize(&graph, &partition).await;
        let entity_index = EntityIndex::build(&graph, self.embedder.as_ref()).await?;

        let report = BuildReport {
            documents: documents.len(),
            failed_documents,
            nodes: graph.node_count(),
            edges: graph.edge_count(),
            communities: partition.len(),
            modularity: partition.modularity,
            indexed_entities: entity_index.len(),
        };

        Ok((
            IndexArtifacts {
                graph,
                summaries,
                entity_index,
            },
            report,
        ))
    }

    /// Build from a corpus and persist the artifacts to `index_dir`.
    pub async fn build_and_save(
        &self,
        corpus: &ReviewCorpus,
        index_dir: &Path,
    ) -> Result<(IndexArtifacts, BuildReport)> {
        let documents = corpus
            .load_all()
            .await
            .map_err(|e| GraphRagError::IndexBuild(format!("could not read reviews: {e:#}")))?;
        tracing::info!(documents = documents.len(), dir = %corpus.dir().display(), "Building knowledge graph");

        let (artifacts, report) = self.build(&documents).await?;
        artifacts.save(index_dir).await?;

        tracing::info!(
            documents = report.documents,
            failed = report.failed_documents.len(),
            nodes = report.nodes,
            edges = report.edges,
            communities = report.communities,
            indexed = report.indexed_entities,
            "GraphRAG build complete"
        );
        Ok((artifacts, report))
    }
}

/// Build and persist an index with the LLM extractor and summarizer.
pub async fn build_index(
    corpus: &ReviewCorpus,
    index_dir: &Path,
    options: BuildOptions,
    generation: GenerationOptions,
    generator: Arc<dyn TextGenerator>,
    embedder: Arc<dyn Embedder>,
) -> Result<BuildReport> {
    let extractor = LlmEntityExtractor::new(Arc::clone(&generator), generation.clone());
    let summarizer = CommunitySummarizer::new(generator, generation);
    let builder = IndexBuilder::new(Arc::new(extractor), summarizer, embedder, options);
    let (_, report) = builder.build_and_save(corpus, index_dir).await?;
    Ok(report)
}

// =============================================================================
// Tests
// =============================================================================
