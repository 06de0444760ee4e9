//! Local-Search Retriever
//!
//! Starts from the entities nearest to the question in embedding space and
//! fans out: graph neighbors for local context, community summaries for
//! global context, and the original reviews for grounding.

use crate::corpus::ReviewCorpus;
use crate::embedding::Embedder;
use crate::error::{GraphRagError, Result};
use crate::rag::graph_store::KnowledgeGraph;
use crate::rag::summarize::CommunitySummaries;
use crate::rag::vector_index::EntityIndex;
use std::collections::HashSet;

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for local search.
#[derive(Debug, Clone)]
pub struct LocalSearchConfig {
    /// Number of entry-point entities
    pub top_k: usize,
}

impl Default for LocalSearchConfig {
    fn default() -> Self {
        Self { top_k: 5 }
    }
}

// =============================================================================
// Context Bundle
// =============================================================================

/// Context assembled for one query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextBundle {
    /// Entry-point entity ids, closest first
    pub entry_points: Vec<String>,
    /// One fragment per entry point: the entity and its neighbors
    pub local_graph: Vec<String>,
    /// One fragment per distinct community
    pub global_community: Vec<String>,
    /// One excerpt per distinct source review
    pub source_text: Vec<String>,
}

impl ContextBundle {
    /// True when search found no entry point at all.
    pub fn is_empty(&self) -> bool {
        self.entry_points.is_empty()
    }

    /// Render the labeled sections: summaries, relationships, then sources.
    ///
    /// Empty sections are omitted; an empty bundle renders as `""`.
    pub fn render(&self) -> String {
        if self.is_empty() {
            return String::new();
        }

        let mut out = String::from("CONTEXT FOR YOUR ANSWER:\n\n");
        if !self.global_community.is_empty() {
            out.push_str("## Overall Topic Summaries\n");
            out.push_str(&self.global_community.join("\n"));
            out.push_str("\n\n");
        }
        if !self.local_graph.is_empty() {
            out.push_str("## Specific Entity Relationships\n");
            out.push_str(&self.local_graph.join("\n\n"));
            out.push_str("\n\n");
        }
        if !self.source_text.is_empty() {
            out.push_str("## Grounding Source Text from Original Reviews\n");
            out.push_str(&self.source_text.join("\n\n"));
        }
        out
    }
}

// =============================================================================
// Retriever
// =============================================================================

/// Local-search context builder over loaded, read-only artifacts.
#[derive(Debug, Clone, Default)]
pub struct LocalSearchRetriever {
    config: LocalSearchConfig,
}

impl LocalSearchRetriever {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: LocalSearchConfig) -> Self {
        Self { config }
    }

    /// Build the context bundle for `query`.
    ///
    /// Fails only if the query cannot be embedded or searched; an index with
    /// nothing close returns an empty bundle.
    pub async fn retrieve(
        &self,
        query: &str,
        graph: &KnowledgeGraph,
        index: &EntityIndex,
        summaries: &CommunitySummaries,
        embedder: &dyn Embedder,
        corpus: &ReviewCorpus,
    ) -> Result<ContextBundle> {
        let query_vec = embedder
            .embed_query(query)
            .await
            .map_err(|e| GraphRagError::QueryEmbedding(e.to_string()))?;

        let hits = index.search(&query_vec, self.config.top_k)?;
        tracing::info!(
            entry_points = ?hits.iter().map(|(id, _)| *id).collect::<Vec<_>>(),
            "Found entry points"
        );

        let mut bundle = ContextBundle::default();
        let mut seen_communities = HashSet::new();
        let mut seen_sources = HashSet::new();

        for (node_id, distance) in hits {
            let Some(node) = graph.node(node_id) else {
                tracing::warn!(node_id, "Index references an entity missing from the graph");
                continue;
            };
            tracing::debug!(node_id, distance, "Expanding entry point");
            bundle.entry_points.push(node.id.clone());

            // Local graph context
            let mut fragment = format!(
                "Entity '{}' (Type: {}) is related to:",
                node.value, node.entity_type
            );
            let neighbors = graph.neighbors(node_id);
            if neighbors.is_empty() {
                fragment.push_str("\n  - No direct relationships found.");
            }
            for neighbor in neighbors {
                fragment.push_str(&format!(
                    "\n  - '{}' (Type: {})",
                    neighbor.value, neighbor.entity_type
                ));
            }
            bundle.local_graph.push(fragment);

            // Community context
            if let Some(community) = node.community_id
                && seen_communities.insert(community)
            {
                let summary = summaries.get(community).unwrap_or("No summary available.");
                bundle.global_community.push(format!(
                    "This topic belongs to a community summarized as: '{summary}'"
                ));
            }

            // Grounding source text
            if !node.source_file.is_empty() && seen_sources.insert(node.source_file.clone()) {
                match corpus.read_source(&node.source_file).await {
                    Ok(Some(text)) => bundle.source_text.push(format!(
                        "--- START OF RELEVANT REVIEW ({}) ---\n{}\n--- END OF REVIEW ---",
                        node.source_file, text
                    )),
                    Ok(None) => {
                        tracing::debug!(source_file = %node.source_file, "Source review not found, skipping");
                    }
                    Err(e) => {
                        tracing::warn!(source_file = %node.source_file, error = %e, "Could not read source review");
                    }
                }
            }
        }

        tracing::debug!(
            local = bundle.local_graph.len(),
            communities = bundle.global_community.len(),
            sources = bundle.source_text.len(),
            "Assembled context"
        );

        Ok(bundle)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::graph::EntityType;
    use crate::rag::community::GreedyModularityDetector;
    use crate::test_support::FakeEmbedder;
    use std::collections::HashMap;

    struct Fixture {
        _dir: tempfile::TempDir,
        corpus: ReviewCorpus,
        graph: KnowledgeGraph,
        index: EntityIndex,
        summaries: CommunitySummaries,
        embedder: FakeEmbedder,
    }

    /// Review a: crash + login (connected). Review b: dark mode + night theme (connected).
    async fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "Crashes at login.").unwrap();
        std::fs::write(dir.path().join("b.txt"), "Please add dark mode.").unwrap();

        let mut graph = KnowledgeGraph::new();
        graph.add_entity("crash", EntityType::BugReport, "crash on login", "a.txt");
        graph.add_entity("login", EntityType::ProductComponent, "Login", "a.txt");
        graph.add_entity("dark", EntityType::FeatureRequest, "dark mode", "b.txt");
        graph.add_entity("night", EntityType::FeatureRequest, "night theme", "b.txt");
        graph.add_relationship("crash", "login", "related_to");
        graph.add_relationship("night", "dark", "related_to");

        let partition = GreedyModularityDetector::new().detect(&graph.undirected_projection());
        graph.assign_communities(&partition.assignment);

        let embedder = FakeEmbedder::new(2)
            .with_vector("crash on login", vec![1.0, 0.0])
            .with_vector("Login", vec![0.9, 0.1])
            .with_vector("dark mode", vec![0.0, 1.0])
            .with_vector("night theme", vec![0.1, 0.9])
            .with_vector("login crash?", vec![1.0, 0.05]);
        let index = EntityIndex::build(&graph, &embedder).await.unwrap();

        let summaries = partition
            .communities
            .iter()
            .enumerate()
            .map(|(i, members)| (i, format!("Theme of {}", members.join("+"))))
            .collect();

        Fixture {
            corpus: ReviewCorpus::new(dir.path(), "txt"),
            _dir: dir,
            graph,
            index,
            summaries,
            embedder,
        }
    }

    async fn retrieve(f: &Fixture, query: &str, top_k: usize) -> ContextBundle {
        LocalSearchRetriever::with_config(LocalSearchConfig { top_k })
            .retrieve(query, &f.graph, &f.index, &f.summaries, &f.embedder, &f.corpus)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_dedup_within_query() {
        let f = fixture().await;
        let bundle = retrieve(&f, "login crash?", 2).await;

        assert_eq!(bundle.entry_points, vec!["crash", "login"]);
        assert_eq!(bundle.local_graph.len(), 2);
        assert_eq!(bundle.global_community.len(), 1);
        assert_eq!(bundle.source_text.len(), 1);
        assert!(bundle.source_text[0].contains("Crashes at login."));
        assert!(bundle.local_graph[0].contains("'Login' (Type: PRODUCT_COMPONENT)"));
    }

    #[tokio::test]
    async fn test_all_entry_points_cover_both_reviews() {
        let f = fixture().await;
        let bundle = retrieve(&f, "login crash?", 10).await;

        assert_eq!(bundle.entry_points.len(), 4);
        assert_eq!(bundle.global_community.len(), 2);
        assert_eq!(bundle.source_text.len(), 2);
        // Closest review first.
        assert!(bundle.source_text[0].contains("(a.txt)"));
    }

    #[tokio::test]
    async fn test_render_section_order() {
        let f = fixture().await;
        let rendered = retrieve(&f, "login crash?", 1).await.render();

        let summaries = rendered.find("## Overall Topic Summaries").unwrap();
        let relations = rendered.find("## Specific Entity Relationships").unwrap();
        let sources = rendered
            .find("## Grounding Source Text from Original Reviews")
            .unwrap();
        assert!(rendered.starts_with("CONTEXT FOR YOUR ANSWER:"));
        assert!(summaries < relations && relations < sources);
    }

    #[tokio::test]
    async fn test_missing_summary_and_source_are_tolerated() {
        let mut f = fixture().await;
        f.summaries = CommunitySummaries::new();
        std::fs::remove_file(f.corpus.dir().join("a.txt")).unwrap();

        let bundle = retrieve(&f, "login crash?", 1).await;
        assert_eq!(
            bundle.global_community,
            vec!["This topic belongs to a community summarized as: 'No summary available.'"]
        );
        assert!(bundle.source_text.is_empty());
        assert!(!bundle.render().contains("## Grounding Source Text"));
    }

    #[tokio::test]
    async fn test_no_relationships_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let mut graph = KnowledgeGraph::new();
        graph.add_entity("solo", EntityType::UserSentiment, "Positive", "gone.txt");
        graph.assign_communities(&HashMap::from([("solo".to_string(), 0)]));
        let embedder = FakeEmbedder::new(2);
        let index = EntityIndex::build(&graph, &embedder).await.unwrap();

        let bundle = LocalSearchRetriever::new()
            .retrieve(
                "anything",
                &graph,
                &index,
                &CommunitySummaries::new(),
                &embedder,
                &ReviewCorpus::new(dir.path(), "txt"),
            )
            .await
            .unwrap();

        assert_eq!(
            bundle.local_graph,
            vec!["Entity 'Positive' (Type: USER_SENTIMENT) is related to:\n  - No direct relationships found."]
        );
    }

    #[tokio::test]
    async fn test_query_embedding_failure() {
        let f = fixture().await;
        let err = LocalSearchRetriever::new()
            .retrieve(
                "q",
                &f.graph,
                &f.index,
                &f.summaries,
                &FakeEmbedder::failing(),
                &f.corpus,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, GraphRagError::QueryEmbedding(_)));
    }

    #[test]
    fn test_empty_bundle_renders_empty() {
        assert_eq!(ContextBundle::default().render(), "");
    }
}
