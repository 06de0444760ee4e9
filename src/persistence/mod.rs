//! Persisted index artifacts.
//!
//! One directory per analyzed app holds four files that are written after a
//! successful build and always loaded together:
//!
//! - `graph.json`: build fingerprint, nodes with attributes, then typed edges
//! - `community_summaries.json`: community index -> summary sentence
//! - `entity_embeddings.json`: the flat L2 index (model, dimension, rows, fingerprint)
//! - `faiss_node_ids.json`: entity id of every index row, in row order
//!
//! A save writes into `<dir>.staging` and swaps the whole directory in, so a
//! failed save never touches the live index. The fingerprint covers the
//! embedding rows and the id array; a graph or embeddings file from another
//! build is rejected at load.

use crate::error::{GraphRagError, Result};
use crate::rag::graph_store::{GraphDocument, KnowledgeGraph};
use crate::rag::summarize::CommunitySummaries;
use crate::rag::vector_index::{EntityIndex, FlatL2Index};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const GRAPH_FILE: &str = "graph.json";
pub const SUMMARIES_FILE: &str = "community_summaries.json";
pub const EMBEDDINGS_FILE: &str = "entity_embeddings.json";
pub const NODE_IDS_FILE: &str = "faiss_node_ids.json";

const ALL_FILES: [&str; 4] = [GRAPH_FILE, SUMMARIES_FILE, EMBEDDINGS_FILE, NODE_IDS_FILE];

/// On-disk form of the graph.
#[derive(Debug, Serialize, Deserialize)]
struct GraphFile {
    fingerprint: String,
    #[serde(flatten)]
    graph: GraphDocument,
}

/// On-disk form of the embedding index.
#[derive(Debug, Serialize, Deserialize)]
struct EmbeddingsFile {
    model: String,
    dimension: usize,
    count: usize,
    fingerprint: String,
    data: Vec<f32>,
}

/// Everything a query needs, loaded read-only.
#[derive(Debug, Clone)]
pub struct IndexArtifacts {
    pub graph: KnowledgeGraph,
    pub summaries: CommunitySummaries,
    pub entity_index: EntityIndex,
}

impl IndexArtifacts {
    /// True when all four artifacts are present in `dir`.
    pub fn exists(dir: &Path) -> bool {
        ALL_FILES.iter().all(|f| dir.join(f).is_file())
    }

    /// Write all artifacts to a staging directory, then swap it in for `dir`.
    pub async fn save(&self, dir: &Path) -> Result<()> {
        let staging = sibling(dir, "staging")?;
        let previous = sibling(dir, "previous")?;

        remove_dir_if_present(&staging).await?;
        tokio::fs::create_dir_all(&staging).await?;

        let stamp = fingerprint(&self.entity_index);
        let index = self.entity_index.index();
        let embeddings = EmbeddingsFile {
            model: self.entity_index.model().to_string(),
            dimension: index.dimension(),
            count: index.len(),
            fingerprint: stamp.clone(),
            data: index.raw().to_vec(),
        };
        let graph = GraphFile {
            fingerprint: stamp,
            graph: self.graph.to_document(),
        };

        write_json(&staging, GRAPH_FILE, &graph).await?;
        write_json(&staging, SUMMARIES_FILE, &self.summaries).await?;
        write_json(&staging, EMBEDDINGS_FILE, &embeddings).await?;
        write_json(&staging, NODE_IDS_FILE, &self.entity_index.node_ids()).await?;

        remove_dir_if_present(&previous).await?;
        if tokio::fs::try_exists(dir).await? {
            tokio::fs::rename(dir, &previous).await?;
        }
        tokio::fs::rename(&staging, dir).await?;
        if let Err(e) = remove_dir_if_present(&previous).await {
            tracing::warn!(dir = %previous.display(), error = %e, "Could not remove previous index");
        }

        tracing::info!(dir = %dir.display(), "Saved GraphRAG artifacts");
        Ok(())
    }

    /// Load all artifacts; any missing, unreadable or inconsistent file is an `IndexLoad` error.
    pub async fn load(dir: &Path) -> Result<Self> {
        let graph_file: GraphFile = read_json(dir, GRAPH_FILE).await?;
        let summaries: CommunitySummaries = read_json(dir, SUMMARIES_FILE).await?;
        let embeddings: EmbeddingsFile = read_json(dir, EMBEDDINGS_FILE).await?;
        let node_ids: Vec<String> = read_json(dir, NODE_IDS_FILE).await?;

        let graph = KnowledgeGraph::from_document(graph_file.graph)?;

        let index = FlatL2Index::from_raw(embeddings.dimension, embeddings.data)?;
        if index.len() != embeddings.count {
            return Err(GraphRagError::IndexLoad(format!(
                "{EMBEDDINGS_FILE} declares {} rows but holds {}",
                embeddings.count,
                index.len()
            )));
        }
        let entity_index = EntityIndex::from_parts(embeddings.model, index, node_ids)?;

        let actual = fingerprint(&entity_index);
        if actual != embeddings.fingerprint || actual != graph_file.fingerprint {
            return Err(GraphRagError::IndexLoad(format!(
                "artifacts in {} come from different builds",
                dir.display()
            )));
        }

        if let Some(missing) = entity_index
            .node_ids()
            .iter()
            .find(|id| !graph.contains(id))
        {
            return Err(GraphRagError::IndexLoad(format!(
                "{NODE_IDS_FILE} references unknown entity {missing}"
            )));
        }

        tracing::info!(
            dir = %dir.display(),
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            communities = summaries.len(),
            indexed = entity_index.len(),
            "Loaded GraphRAG artifacts"
        );

        Ok(Self {
            graph,
            summaries,
            entity_index,
        })
    }

    /// Reject an index built with a different embedding model.
    pub fn ensure_model(&self, model: &str) -> Result<()> {
        if self.entity_index.model() == model {
            Ok(())
        } else {
            Err(GraphRagError::IndexLoad(format!(
                "index was built with embedding model {} but {model} is configured",
                self.entity_index.model()
            )))
        }
    }
}

/// blake3 over model, shape, ids and rows of the index.
fn fingerprint(entity_index: &EntityIndex) -> String {
    let index = entity_index.index();
    let mut hasher = blake3::Hasher::new();
    hasher.update(entity_index.model().as_bytes());
    hasher.update(&(index.dimension() as u64).to_le_bytes());
    hasher.update(&(entity_index.len() as u64).to_le_bytes());
    for id in entity_index.node_ids() {
        hasher.update(&(id.len() as u64).to_le_bytes());
        hasher.update(id.as_bytes());
    }
    for value in index.raw() {
        hasher.update(&value.to_le_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

/// `<dir>.<suffix>` next to `dir`.
fn sibling(dir: &Path, suffix: &str) -> Result<PathBuf> {
    let name = dir.file_name().ok_or_else(|| {
        GraphRagError::IndexBuild(format!("index path has no directory name: {}", dir.display()))
    })?;
    let mut name = name.to_os_string();
    name.push(format!(".{suffix}"));
    Ok(dir.with_file_name(name))
}

async fn remove_dir_if_present(dir: &Path) -> Result<()> {
    match tokio::fs::remove_dir_all(dir).await {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
        _ => Ok(()),
    }
}

async fn write_json<T: Serialize + ?Sized>(dir: &Path, name: &str, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec(value)?;
    tokio::fs::write(dir.join(name), bytes).await?;
    Ok(())
}

async fn read_json<T: DeserializeOwned>(dir: &Path, name: &str) -> Result<T> {
    let path = dir.join(name);
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| GraphRagError::IndexLoad(format!("{}: {e}", path.display())))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| GraphRagError::IndexLoad(format!("{}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::graph::EntityType;
    use crate::embedding::Embedder;
    use crate::test_support::FakeEmbedder;
    use std::collections::HashMap;

    async fn build(order: &[(&str, EntityType, &str, &str)], summary: &str) -> IndexArtifacts {
        let mut graph = KnowledgeGraph::new();
        for (id, kind, value, source) in order {
            graph.add_entity(id, kind.clone(), value, source);
        }
        graph.add_relationship("bug1", "feat1", "related_to");
        graph.assign_communities(&HashMap::from([
            ("bug1".to_string(), 0),
            ("feat1".to_string(), 0),
        ]));
        let entity_index = EntityIndex::build(&graph, &FakeEmbedder::new(4)).await.unwrap();
        let mut summaries = CommunitySummaries::new();
        summaries.insert(0, summary);

        IndexArtifacts {
            graph,
            summaries,
            entity_index,
        }
    }

    async fn sample() -> IndexArtifacts {
        build(
            &[
                ("bug1", EntityType::BugReport, "crash on open", "a.txt"),
                ("feat1", EntityType::FeatureRequest, "dark mode", "b.txt"),
            ],
            "Crashes and themes.",
        )
        .await
    }

    async fn rebuilt() -> IndexArtifacts {
        build(
            &[
                ("feat1", EntityType::FeatureRequest, "dark mode", "b.txt"),
                ("bug1", EntityType::BugReport, "crash on open", "a.txt"),
            ],
            "Themes and crashes.",
        )
        .await
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("graphrag_index");
        let artifacts = sample().await;
        assert!(!IndexArtifacts::exists(&dir));

        artifacts.save(&dir).await.unwrap();
        assert!(IndexArtifacts::exists(&dir));

        let loaded = IndexArtifacts::load(&dir).await.unwrap();
        assert_eq!(loaded.entity_index, artifacts.entity_index);
        assert_eq!(loaded.summaries, artifacts.summaries);
        assert_eq!(loaded.graph.to_document(), artifacts.graph.to_document());
        assert!(loaded.ensure_model("fake-embedder").is_ok());
        assert!(loaded.ensure_model("other-model").is_err());

        let query = FakeEmbedder::new(4).embed_query("crash").await.unwrap();
        let before = artifacts.entity_index.search(&query, 2).unwrap();
        let after = loaded.entity_index.search(&query, 2).unwrap();
        assert_eq!(after.len(), 2);
        assert_eq!(after, before);
    }

    #[tokio::test]
    async fn test_resave_replaces_whole_index() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("graphrag_index");
        sample().await.save(&dir).await.unwrap();

        let second = rebuilt().await;
        second.save(&dir).await.unwrap();

        assert!(!root.path().join("graphrag_index.staging").exists());
        assert!(!root.path().join("graphrag_index.previous").exists());
        let loaded = IndexArtifacts::load(&dir).await.unwrap();
        assert_eq!(loaded.entity_index.node_ids(), ["feat1", "bug1"]);
        assert_eq!(loaded.summaries.get(0), Some("Themes and crashes."));
    }

    #[tokio::test]
    async fn test_interrupted_save_leaves_live_index() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("graphrag_index");
        sample().await.save(&dir).await.unwrap();

        // A staging directory left behind by a crashed save.
        let staging = root.path().join("graphrag_index.staging");
        std::fs::create_dir_all(&staging).unwrap();
        std::fs::write(staging.join(GRAPH_FILE), "{").unwrap();

        let loaded = IndexArtifacts::load(&dir).await.unwrap();
        assert_eq!(loaded.entity_index.node_ids(), ["bug1", "feat1"]);

        rebuilt().await.save(&dir).await.unwrap();
        assert!(!staging.exists());
        assert!(IndexArtifacts::load(&dir).await.is_ok());
    }

    #[tokio::test]
    async fn test_files_from_two_builds_fail_load() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("graphrag_index");
        let other = root.path().join("other_index");
        sample().await.save(&dir).await.unwrap();
        rebuilt().await.save(&other).await.unwrap();

        // Newer graph, summaries and rows next to the older id array.
        for name in [GRAPH_FILE, SUMMARIES_FILE, EMBEDDINGS_FILE] {
            std::fs::copy(other.join(name), dir.join(name)).unwrap();
        }
        assert!(IndexArtifacts::exists(&dir));

        assert!(matches!(
            IndexArtifacts::load(&dir).await,
            Err(GraphRagError::IndexLoad(_))
        ));
    }

    #[tokio::test]
    async fn test_graph_from_other_build_fails_load() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("graphrag_index");
        let other = root.path().join("other_index");
        sample().await.save(&dir).await.unwrap();
        rebuilt().await.save(&other).await.unwrap();

        std::fs::copy(other.join(GRAPH_FILE), dir.join(GRAPH_FILE)).unwrap();

        assert!(matches!(
            IndexArtifacts::load(&dir).await,
            Err(GraphRagError::IndexLoad(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_artifact_fails_load() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("graphrag_index");
        sample().await.save(&dir).await.unwrap();
        std::fs::remove_file(dir.join(NODE_IDS_FILE)).unwrap();

        assert!(!IndexArtifacts::exists(&dir));
        assert!(matches!(
            IndexArtifacts::load(&dir).await,
            Err(GraphRagError::IndexLoad(_))
        ));
    }

    #[tokio::test]
    async fn test_misaligned_ids_fail_load() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("graphrag_index");
        sample().await.save(&dir).await.unwrap();
        std::fs::write(dir.join(NODE_IDS_FILE), r#"["bug1"]"#).unwrap();

        assert!(matches!(
            IndexArtifacts::load(&dir).await,
            Err(GraphRagError::IndexLoad(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_id_fails_load() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("graphrag_index");
        sample().await.save(&dir).await.unwrap();
        std::fs::write(dir.join(NODE_IDS_FILE), r#"["bug1", "ghost"]"#).unwrap();

        assert!(matches!(
            IndexArtifacts::load(&dir).await,
            Err(GraphRagError::IndexLoad(_))
        ));
    }
}
