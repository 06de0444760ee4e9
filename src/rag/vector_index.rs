//! Entity Vector Index
//!
//! Exact nearest-neighbor search over entity embeddings with squared
//! Euclidean distance, plus the parallel array mapping index rows back to
//! entity ids. The two halves only ever travel together as [`EntityIndex`].

use crate::embedding::Embedder;
use crate::error::{GraphRagError, Result};
use crate::rag::graph_store::KnowledgeGraph;
use serde::{Deserialize, Serialize};

// =============================================================================
// Flat L2 Index
// =============================================================================

/// A search hit: row position and squared L2 distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub position: usize,
    pub distance: f32,
}

/// Brute-force index over fixed-dimension `f32` rows, stored row-major.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatL2Index {
    dimension: usize,
    data: Vec<f32>,
}

impl FlatL2Index {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            data: Vec::new(),
        }
    }

    /// Rebuild from raw row-major data.
    pub fn from_raw(dimension: usize, data: Vec<f32>) -> Result<Self> {
        if dimension == 0 || data.len() % dimension != 0 {
            return Err(GraphRagError::IndexLoad(format!(
                "embedding data of length {} does not fit dimension {dimension}",
                data.len()
            )));
        }
        Ok(Self { dimension, data })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        if self.dimension == 0 {
            0
        } else {
            self.data.len() / self.dimension
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn raw(&self) -> &[f32] {
        &self.data
    }

    pub fn row(&self, position: usize) -> Option<&[f32]> {
        let start = position.checked_mul(self.dimension)?;
        self.data.get(start..start + self.dimension)
    }

    /// Append one row.
    pub fn add(&mut self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dimension {
            return Err(GraphRagError::IndexBuild(format!(
                "vector has dimension {}, index expects {}",
                vector.len(),
                self.dimension
            )));
        }
        self.data.extend_from_slice(vector);
        Ok(())
    }

    /// The `k` closest rows, nearest first. Equal distances keep row order.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        if query.len() != self.dimension {
            return Err(GraphRagError::QueryEmbedding(format!(
                "query has dimension {}, index expects {}",
                query.len(),
                self.dimension
            )));
        }
        if k == 0 || self.dimension == 0 {
            return Ok(Vec::new());
        }

        let mut hits: Vec<Neighbor> = self
            .data
            .chunks_exact(self.dimension)
            .enumerate()
            .map(|(position, row)| Neighbor {
                position,
                distance: squared_l2(row, query),
            })
            .collect();

        hits.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then(a.position.cmp(&b.position))
        });
        hits.truncate(k);
        Ok(hits)
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

// =============================================================================
// Entity Index
// =============================================================================

/// Embedding index and row -> entity id mapping, kept in lockstep.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityIndex {
    model: String,
    index: FlatL2Index,
    node_ids: Vec<String>,
}

impl EntityIndex {
    /// Pair an index with its id array; row counts must agree.
    pub fn from_parts(model: String, index: FlatL2Index, node_ids: Vec<String>) -> Result<Self> {
        if index.len() != node_ids.len() {
            return Err(GraphRagError::IndexLoad(format!(
                "index has {} rows but {} node ids",
                index.len(),
                node_ids.len()
            )));
        }
        Ok(Self {
            model,
            index,
            node_ids,
        })
    }

    /// Embed every entity value and build the index.
    ///
    /// Entities with a blank value are not indexed. Any failure here is fatal
    /// for the build: a partial index is unusable.
    pub async fn build(graph: &KnowledgeGraph, embedder: &dyn Embedder) -> Result<Self> {
        let (node_ids, values): (Vec<String>, Vec<String>) = graph
            .nodes()
            .filter(|n| !n.value.trim().is_empty())
            .map(|n| (n.id.clone(), n.value.clone()))
            .unzip();

        if values.is_empty() {
            return Err(GraphRagError::IndexBuild(
                "no entity values to index".to_string(),
            ));
        }

        let embeddings = embedder
            .embed_documents(values)
            .await
            .map_err(|e| GraphRagError::IndexBuild(format!("embedding request failed: {e}")))?;

        if embeddings.len() != node_ids.len() {
            return Err(GraphRagError::IndexBuild(format!(
                "embedding backend returned {} vectors for {} entities",
                embeddings.len(),
                node_ids.len()
            )));
        }

        let dimension = embeddings[0].len();
        if dimension == 0 {
            return Err(GraphRagError::IndexBuild(
                "embedding backend returned empty vectors".to_string(),
            ));
        }

        let mut index = FlatL2Index::new(dimension);
        for vector in &embeddings {
            index.add(vector)?;
        }

        tracing::info!(
            entities = node_ids.len(),
            dimension,
            model = embedder.model_name(),
            "Built entity vector index"
        );

        Ok(Self {
            model: embedder.model_name().to_string(),
            index,
            node_ids,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn index(&self) -> &FlatL2Index {
        &self.index
    }

    pub fn node_ids(&self) -> &[String] {
        &self.node_ids
    }

    pub fn len(&self) -> usize {
        self.node_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.node_ids.is_empty()
    }

    /// Nearest entities as `(id, squared distance)`, closest first.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(&str, f32)>> {
        Ok(self
            .index
            .search(query, k)?
            .into_iter()
            .filter_map(|hit| {
                self.node_ids
                    .get(hit.position)
                    .map(|id| (id.as_str(), hit.distance))
            })
            .collect())
    }
}

// =============================================================================
// Tests
// =============================================================================
