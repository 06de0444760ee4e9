//! Knowledge Graph Store
//!
//! A directed multigraph of review entities on top of `petgraph`. Nodes are
//! addressed by their string id; parallel edges with different labels are
//! kept. Community detection works on an undirected, simple projection.

use crate::domain::graph::{EntityNode, EntityType, ExtractionResult, RelationEdge};
use crate::error::{GraphRagError, Result};
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

// =============================================================================
// Serialized Form
// =============================================================================

/// An edge as persisted in `graph.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub relation_type: String,
}

/// Persisted form of the graph: nodes in insertion order, then edges.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphDocument {
    pub nodes: Vec<EntityNode>,
    pub edges: Vec<EdgeRecord>,
}

/// Counts from merging one extraction result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub nodes_added: usize,
    pub duplicate_nodes: usize,
    pub edges_added: usize,
    pub edges_dropped: usize,
}

// =============================================================================
// Knowledge Graph
// =============================================================================

/// Directed multigraph of entities keyed by id.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeGraph {
    graph: DiGraph<EntityNode, RelationEdge>,
    index: HashMap<String, NodeIndex>,
}

impl KnowledgeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node if its id is new.
    ///
    /// First write wins: for an existing id, `type`, `value` and
    /// `source_file` are left untouched and `source_file` is recorded in
    /// `also_seen_in`. Returns `true` if a node was inserted.
    pub fn add_entity(
        &mut self,
        id: &str,
        entity_type: EntityType,
        value: &str,
        source_file: &str,
    ) -> bool {
        if let Some(&existing) = self.index.get(id) {
            let node = &mut self.graph[existing];
            if node.source_file != source_file
                && !node.also_seen_in.iter().any(|s| s == source_file)
            {
                node.also_seen_in.push(source_file.to_string());
            }
            return false;
        }

        let node = self.graph.add_node(EntityNode {
            id: id.to_string(),
            entity_type,
            value: value.to_string(),
            source_file: source_file.to_string(),
            also_seen_in: Vec::new(),
            community_id: None,
        });
        self.index.insert(id.to_string(), node);
        true
    }

    /// Insert a directed edge if both endpoints exist; otherwise a silent no-op.
    pub fn add_relationship(&mut self, source: &str, target: &str, relation_type: &str) -> bool {
        match (self.index.get(source), self.index.get(target)) {
            (Some(&s), Some(&t)) => {
                self.graph.add_edge(
                    s,
                    t,
                    RelationEdge {
                        relation_type: relation_type.to_string(),
                    },
                );
                true
            }
            _ => false,
        }
    }

    /// Merge one review's extraction: entities first, then relationships.
    pub fn merge_extraction(&mut self, result: &ExtractionResult, source_file: &str) -> MergeStats {
        let mut stats = MergeStats::default();

        for entity in &result.entities {
            if self.add_entity(
                &entity.id,
                entity.entity_type.clone(),
                &entity.value,
                source_file,
            ) {
                stats.nodes_added += 1;
            } else {
                stats.duplicate_nodes += 1;
            }
        }

        for rel in &result.relationships {
            if self.add_relationship(&rel.source, &rel.target, &rel.relation_type) {
                stats.edges_added += 1;
            } else {
                stats.edges_dropped += 1;
            }
        }

        if stats.edges_dropped > 0 {
            tracing::debug!(
                source_file,
                dropped = stats.edges_dropped,
                "Dropped relationships with unknown endpoints"
            );
        }

        stats
    }

    pub fn node(&self, id: &str) -> Option<&EntityNode> {
        self.index.get(id).map(|&n| &self.graph[n])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// All nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &EntityNode> {
        self.graph.node_weights()
    }

    /// All edges as `(source, target, edge)` in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = (&EntityNode, &EntityNode, &RelationEdge)> {
        self.graph.edge_references().map(|e| {
            (
                &self.graph[e.source()],
                &self.graph[e.target()],
                e.weight(),
            )
        })
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Undirected neighbors of `id`, regardless of edge direction.
    ///
    /// Parallel edges collapse to one neighbor and self-loops are skipped.
    /// Neighbors come back in node insertion order.
    pub fn neighbors(&self, id: &str) -> Vec<&EntityNode> {
        let Some(&node) = self.index.get(id) else {
            return Vec::new();
        };

        let unique: BTreeSet<NodeIndex> = self
            .graph
            .neighbors_directed(node, Direction::Outgoing)
            .chain(self.graph.neighbors_directed(node, Direction::Incoming))
            .filter(|&n| n != node)
            .collect();

        unique.into_iter().map(|n| &self.graph[n]).collect()
    }

    /// Undirected simple projection, node weights are entity ids.
    ///
    /// Node `i` of the projection is the `i`-th node in insertion order.
    /// Multi-edges collapse, edge labels are discarded and self-loops dropped.
    pub fn undirected_projection(&self) -> UnGraph<String, ()> {
        let mut projection =
            UnGraph::with_capacity(self.graph.node_count(), self.graph.edge_count());
        for node in self.graph.node_weights() {
            projection.add_node(node.id.clone());
        }

        let mut seen = BTreeSet::new();
        for edge in self.graph.edge_references() {
            let (a, b) = (edge.source().index(), edge.target().index());
            if a == b {
                continue;
            }
            let key = (a.min(b), a.max(b));
            if seen.insert(key) {
                projection.add_edge(NodeIndex::new(key.0), NodeIndex::new(key.1), ());
            }
        }

        projection
    }

    /// Write community indices onto nodes. Nodes missing from the map are cleared.
    pub fn assign_communities(&mut self, assignment: &HashMap<String, usize>) {
        for node in self.graph.node_weights_mut() {
            node.community_id = assignment.get(&node.id).copied();
        }
    }

    /// Snapshot for persistence.
    pub fn to_document(&self) -> GraphDocument {
        GraphDocument {
            nodes: self.graph.node_weights().cloned().collect(),
            edges: self
                .edges()
                .map(|(s, t, e)| EdgeRecord {
                    source: s.id.clone(),
                    target: t.id.clone(),
                    relation_type: e.relation_type.clone(),
                })
                .collect(),
        }
    }

    /// Rebuild from a persisted snapshot, rejecting duplicate ids and dangling edges.
    pub fn from_document(doc: GraphDocument) -> Result<Self> {
        let mut graph = Self::new();

        for node in doc.nodes {
            if graph.index.contains_key(&node.id) {
                return Err(GraphRagError::IndexLoad(format!(
                    "duplicate node id in graph: {}",
                    node.id
                )));
            }
            let id = node.id.clone();
            let idx = graph.graph.add_node(node);
            graph.index.insert(id, idx);
        }

        for edge in doc.edges {
            if !graph.add_relationship(&edge.source, &edge.target, &edge.relation_type) {
                return Err(GraphRagError::IndexLoad(format!(
                    "edge {} -> {} references a missing node",
                    edge.source, edge.target
                )));
            }
        }

        Ok(graph)
    }
}

// =============================================================================
// Tests
// =============================================================================
