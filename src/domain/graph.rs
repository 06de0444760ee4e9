//! Knowledge Graph Domain Models
//!
//! Entity, relationship and extraction structures for the review graph.

use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Entity Types
// =============================================================================

/// Kind of entity extracted from a review.
///
/// The vocabulary is open: labels outside the known set are kept verbatim
/// (normalized to upper snake case) as [`EntityType::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EntityType {
    /// A feature the reviewer asks for
    FeatureRequest,
    /// A defect the reviewer reports
    BugReport,
    /// Overall sentiment of the review
    UserSentiment,
    /// A part of the app the reviewer mentions
    ProductComponent,
    /// Any other label returned by the extractor
    Other(String),
}

impl EntityType {
    /// Canonical upper snake case label.
    pub fn as_str(&self) -> &str {
        match self {
            Self::FeatureRequest => "FEATURE_REQUEST",
            Self::BugReport => "BUG_REPORT",
            Self::UserSentiment => "USER_SENTIMENT",
            Self::ProductComponent => "PRODUCT_COMPONENT",
            Self::Other(label) => label,
        }
    }

    /// Parse an extractor label, tolerating case and separator differences.
    pub fn parse(label: &str) -> Self {
        let normalized = label
            .trim()
            .to_uppercase()
            .replace([' ', '-'], "_");
        match normalized.as_str() {
            "FEATURE_REQUEST" => Self::FeatureRequest,
            "BUG_REPORT" | "BUG" => Self::BugReport,
            "USER_SENTIMENT" | "SENTIMENT" => Self::UserSentiment,
            "PRODUCT_COMPONENT" | "COMPONENT" => Self::ProductComponent,
            _ => Self::Other(normalized),
        }
    }
}

impl Default for EntityType {
    fn default() -> Self {
        Self::Other("UNKNOWN".to_string())
    }
}

impl From<String> for EntityType {
    fn from(label: String) -> Self {
        Self::parse(&label)
    }
}

impl From<EntityType> for String {
    fn from(kind: EntityType) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Graph Node / Edge
// =============================================================================

/// A node of the knowledge graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityNode {
    /// Identifier, unique within one graph
    pub id: String,
    /// Entity kind
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    /// Short text describing the entity; this is what gets embedded
    pub value: String,
    /// Review document the entity was first extracted from
    pub source_file: String,
    /// Later documents that produced the same id (first write wins)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub also_seen_in: Vec<String>,
    /// Community index, assigned by community detection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub community_id: Option<usize>,
}

/// A directed, typed edge of the knowledge graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationEdge {
    /// Relationship label (e.g., "related_to", "describes")
    #[serde(rename = "type")]
    pub relation_type: String,
}

// =============================================================================
// Extraction Result
// =============================================================================

/// An entity as returned by the extractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedEntity {
    pub id: String,
    #[serde(rename = "type", default)]
    pub entity_type: EntityType,
    #[serde(default)]
    pub value: String,
}

/// A relationship as returned by the extractor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedRelationship {
    pub source: String,
    pub target: String,
    #[serde(rename = "type", default = "ExtractedRelationship::default_type")]
    pub relation_type: String,
}

impl ExtractedRelationship {
    fn default_type() -> String {
        "related_to".to_string()
    }
}

/// Result of entity/relationship extraction from one review.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Extracted entities
    #[serde(default)]
    pub entities: Vec<ExtractedEntity>,
    /// Extracted relationships
    #[serde(default)]
    pub relationships: Vec<ExtractedRelationship>,
}
