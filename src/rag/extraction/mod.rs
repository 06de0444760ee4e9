//! Entity and Relationship Extraction
//!
//! Provides the trait interface for turning one review into typed entities
//! and relationships, and the parser for the structured block the generation
//! backend returns.

pub mod llm;

pub use llm::LlmEntityExtractor;

use crate::domain::graph::ExtractionResult;
use crate::error::ExtractionError;
use async_trait::async_trait;

// =============================================================================
// Extraction Strategy Trait
// =============================================================================

/// Strategy for extracting entities and relationships from review text.
#[async_trait]
pub trait EntityExtractor: Send + Sync + std::fmt::Debug {
    /// Extract from one review. Each review is attempted exactly once.
    async fn extract(&self, review_text: &str) -> Result<ExtractionResult, ExtractionError>;

    /// Get the name of this extraction strategy.
    fn name(&self) -> &'static str;
}

// =============================================================================
// Structured Output Parsing
// =============================================================================

/// Parse the outermost `{ ... }` block of a backend response.
///
/// Surrounding prose and Markdown fences are ignored. Entities with an empty
/// id and relationships with an empty endpoint are discarded.
pub fn parse_extraction(response: &str) -> Result<ExtractionResult, ExtractionError> {
    let start = response.find('{').ok_or(ExtractionError::NoStructuredBlock)?;
    let end = response.rfind('}').ok_or(ExtractionError::NoStructuredBlock)?;
    if end < start {
        return Err(ExtractionError::NoStructuredBlock);
    }

    let mut result: ExtractionResult = serde_json::from_str(&response[start..=end])
        .map_err(|e| ExtractionError::Malformed(e.to_string()))?;

    result.entities.retain(|e| !e.id.trim().is_empty());
    result
        .relationships
        .retain(|r| !r.source.trim().is_empty() && !r.target.trim().is_empty());

    Ok(result)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::graph::EntityType;

    #[test]
    fn test_parse_fenced_block() {
        let response = r#"Here you go:
```json
{
  "entities": [
    {"id": "app_crash", "type": "BUG_REPORT", "value": "App crashes on opening playlist"},
    {"id": "playlist_feature", "type": "PRODUCT_COMPONENT", "value": "Playlist"}
  ],
  "relationships": [
    {"source": "app_crash", "target": "playlist_feature", "type": "related_to"}
  ]
}
```"#;
        let result = parse_extraction(response).unwrap();
        assert_eq!(result.entities.len(), 2);
        assert_eq!(result.entities[0].entity_type, EntityType::BugReport);
        assert_eq!(result.relationships[0].relation_type, "related_to");
    }

    #[test]
    fn test_parse_no_block() {
        assert!(matches!(
            parse_extraction("I could not find any entities."),
            Err(ExtractionError::NoStructuredBlock)
        ));
        assert!(matches!(
            parse_extraction("} backwards {"),
            Err(ExtractionError::NoStructuredBlock)
        ));
    }

    #[test]
    fn test_parse_malformed_block() {
        assert!(matches!(
            parse_extraction(r#"{"entities": [ {"id": "a", }"#),
            Err(ExtractionError::Malformed(_))
        ));
    }

    #[test]
    fn test_parse_drops_blank_ids() {
        let result = parse_extraction(
            r#"{"entities": [{"id": " ", "type": "BUG_REPORT", "value": "x"}],
                "relationships": [{"source": "", "target": "a", "type": "r"}]}"#,
        )
        .unwrap();
        assert!(result.entities.is_empty());
        assert!(result.relationships.is_empty());
    }
}
