//! Community Summarizer
//!
//! One generated sentence per community, describing its theme.

use crate::error::GraphRagError;
use crate::llm::{GenerationOptions, TextGenerator};
use crate::rag::community::CommunityPartition;
use crate::rag::graph_store::KnowledgeGraph;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Stored in place of a summary when generation fails.
pub const SUMMARY_FAILED: &str = "Summary generation failed.";

/// Summary sentences keyed by community index.
///
/// Serializes as a JSON object with stringified integer keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommunitySummaries(BTreeMap<usize, String>);

impl CommunitySummaries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, community: usize, summary: impl Into<String>) {
        self.0.insert(community, summary.into());
    }

    pub fn get(&self, community: usize) -> Option<&str> {
        self.0.get(&community).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.0.iter().map(|(k, v)| (*k, v.as_str()))
    }
}

impl FromIterator<(usize, String)> for CommunitySummaries {
    fn from_iter<T: IntoIterator<Item = (usize, String)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Summarizes communities through the generation backend.
#[derive(Debug, Clone)]
pub struct CommunitySummarizer {
    generator: Arc<dyn TextGenerator>,
    options: GenerationOptions,
    delay: Duration,
    concurrency: usize,
}

impl CommunitySummarizer {
    pub fn new(generator: Arc<dyn TextGenerator>, options: GenerationOptions) -> Self {
        Self {
            generator,
            options,
            delay: Duration::ZERO,
            concurrency: 1,
        }
    }

    /// Pause after every request, for backend rate limits.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Maximum requests in flight.
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// One line per member: `- Entity: <value> (Type: <type>)`.
    pub fn describe_members(graph: &KnowledgeGraph, members: &[String]) -> String {
        members
            .iter()
            .filter_map(|id| graph.node(id))
            .map(|node| format!("- Entity: {} (Type: {})", node.value, node.entity_type))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn prompt(listing: &str) -> String {
        format!(
            "The following is a list of entities and concepts belonging to a single community detected within a knowledge graph of app reviews.\n\
             Summarize the main theme or topic of this community in a single, concise sentence.\n\n\
             Entities:\n{listing}\n\nSummary:\n"
        )
    }

    async fn summarize_one(&self, community: usize, listing: String) -> String {
        let outcome = self
            .generator
            .generate(&Self::prompt(&listing), &self.options)
            .await;

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let failure = match outcome {
            Ok(text) if !text.trim().is_empty() => return text.trim().to_string(),
            Ok(_) => GraphRagError::Summarization {
                community,
                message: "empty response".to_string(),
            },
            Err(e) => GraphRagError::Summarization {
                community,
                message: e.to_string(),
            },
        };

        tracing::warn!(community, error = %failure, "Storing failure marker for community");
        SUMMARY_FAILED.to_string()
    }

    /// Summarize every community; per-community failures never abort.
    pub async fn summarize(
        &self,
        graph: &KnowledgeGraph,
        partition: &CommunityPartition,
    ) -> CommunitySummaries {
        let jobs: Vec<(usize, String)> = partition
            .communities
            .iter()
            .enumerate()
            .map(|(idx, members)| (idx, Self::describe_members(graph, members)))
            .collect();

        let total = jobs.len();
        let summaries: CommunitySummaries = futures::stream::iter(jobs)
            .map(|(idx, listing)| async move {
                let summary = self.summarize_one(idx, listing).await;
                tracing::debug!(community = idx, total, "Community summarized");
                (idx, summary)
            })
            .buffered(self.concurrency)
            .collect::<Vec<_>>()
            .await
            .into_iter()
            .collect();

        tracing::info!(count = summaries.len(), "Generated community summaries");
        summaries
    }
}
