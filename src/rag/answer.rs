//! Answer Synthesizer
//!
//! Turns an assembled context and the user's question into one generation
//! request.

use crate::error::{GraphRagError, Result};
use crate::llm::{GenerationOptions, TextGenerator};
use std::sync::Arc;

/// Generates the final prose answer.
#[derive(Debug, Clone)]
pub struct AnswerSynthesizer {
    generator: Arc<dyn TextGenerator>,
    options: GenerationOptions,
}

impl AnswerSynthesizer {
    pub fn new(generator: Arc<dyn TextGenerator>, options: GenerationOptions) -> Self {
        Self { generator, options }
    }

    pub fn prompt(context: &str, query: &str) -> String {
        format!(
            "You are an AI assistant for a product manager. Your task is to answer questions based on a knowledge graph built from user reviews.\n\
             Use the provided context, which includes global summaries, local entity relationships, and original review text, to synthesize a comprehensive and actionable answer.\n\
             Do not mention the internal mechanics (e.g., \"based on the community summary\"). Answer the question directly and professionally.\n\n\
             {context}\n---\n\n\
             USER'S QUESTION:\n\"{query}\"\n\n\
             ANSWER:\n"
        )
    }

    /// Generate an answer, surfacing backend failures as [`GraphRagError::Generation`].
    pub async fn try_answer(&self, context: &str, query: &str) -> Result<String> {
        self.generator
            .generate(&Self::prompt(context, query), &self.options)
            .await
            .map_err(|e| GraphRagError::Generation(e.to_string()))
    }

    /// Generate an answer; a backend failure becomes a readable error string.
    pub async fn answer(&self, context: &str, query: &str) -> String {
        match self.try_answer(context, query).await {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(error = %e, "Answer generation failed");
                format!("An error occurred while generating the answer: {e}")
            }
        }
    }
}
