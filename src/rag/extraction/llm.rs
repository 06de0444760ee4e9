//! LLM-backed review extractor.

use super::{EntityExtractor, parse_extraction};
use crate::domain::graph::ExtractionResult;
use crate::error::ExtractionError;
use crate::llm::{GenerationOptions, TextGenerator};
use async_trait::async_trait;
use std::sync::Arc;

const EXTRACTION_PROMPT: &str = r#"Analyze the following user review and extract key entities and their relationships.
The entities to extract are:
- FEATURE_REQUEST: A specific feature the user is asking for.
- BUG_REPORT: An issue or bug the user is reporting.
- USER_SENTIMENT: The overall sentiment of the review (e.g., "Positive", "Negative", "Mixed", "Neutral").
- PRODUCT_COMPONENT: A specific part of the app mentioned (e.g., "UI", "Playlist", "Search", "Login").

Return the output as a JSON object with two keys: "entities" and "relationships".
Example:
Review: "The new update is terrible. The app crashes every time I open my playlist. I wish there was a dark mode."
Output:
{
  "entities": [
    {"id": "app_crash", "type": "BUG_REPORT", "value": "App crashes on opening playlist"},
    {"id": "playlist_feature", "type": "PRODUCT_COMPONENT", "value": "Playlist"},
    {"id": "dark_mode_request", "type": "FEATURE_REQUEST", "value": "Dark mode"},
    {"id": "negative_sentiment", "type": "USER_SENTIMENT", "value": "Negative"}
  ],
  "relationships": [
    {"source": "app_crash", "target": "playlist_feature", "type": "related_to"},
    {"source": "negative_sentiment", "target": "app_crash", "type": "describes"},
    {"source": "negative_sentiment", "target": "dark_mode_request", "type": "describes"}
  ]
}

Now, analyze this review:
---
{review}
---
"#;

/// Extracts entities by prompting the generation backend for a JSON block.
#[derive(Debug, Clone)]
pub struct LlmEntityExtractor {
    generator: Arc<dyn TextGenerator>,
    options: GenerationOptions,
}

impl LlmEntityExtractor {
    pub fn new(generator: Arc<dyn TextGenerator>, options: GenerationOptions) -> Self {
        Self { generator, options }
    }

    fn prompt(review_text: &str) -> String {
        EXTRACTION_PROMPT.replace("{review}", review_text)
    }
}

#[async_trait]
impl EntityExtractor for LlmEntityExtractor {
    async fn extract(&self, review_text: &str) -> Result<ExtractionResult, ExtractionError> {
        let response = self
            .generator
            .generate(&Self::prompt(review_text), &self.options)
            .await
            .map_err(|e| ExtractionError::Backend(e.to_string()))?;

        parse_extraction(&response)
    }

    fn name(&self) -> &'static str {
        "llm"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Debug)]
    struct CannedGenerator {
        reply: Result<String, String>,
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl TextGenerator for CannedGenerator {
        async fn generate(&self, prompt: &str, _: &GenerationOptions) -> anyhow::Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.reply.clone().map_err(|e| anyhow::anyhow!(e))
        }
    }

    fn extractor(reply: Result<&str, &str>) -> (LlmEntityExtractor, Arc<CannedGenerator>) {
        let generator = Arc::new(CannedGenerator {
            reply: reply.map(ToString::to_string).map_err(ToString::to_string),
            prompts: Mutex::new(Vec::new()),
        });
        let handle: Arc<dyn TextGenerator> = generator.clone();
        (
            LlmEntityExtractor::new(handle, GenerationOptions::default()),
            generator,
        )
    }

    #[tokio::test]
    async fn test_extract_embeds_review_in_prompt() {
        let (extractor, generator) = extractor(Ok(
            r#"{"entities": [{"id": "bug1", "type": "BUG_REPORT", "value": "crash on open"}]}"#,
        ));
        let result = extractor.extract("It crashes when I open it").await.unwrap();
        assert_eq!(result.entities[0].id, "bug1");

        let prompts = generator.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("---\nIt crashes when I open it\n---"));
    }

    #[tokio::test]
    async fn test_backend_failure_maps_to_extraction_error() {
        let (extractor, _) = extractor(Err("503 Service Unavailable"));
        let err = extractor.extract("anything").await.unwrap_err();
        assert!(matches!(err, ExtractionError::Backend(msg) if msg.contains("503")));
    }
}
