//! GraphRAG over app reviews.
//!
//! Build: extraction -> knowledge graph -> communities -> summaries -> entity index.
//! Query: entry points -> local graph + community summaries + source reviews -> answer.

pub mod answer;
pub mod community;
pub mod extraction;
pub mod graph_store;
pub mod pipeline;
pub mod query;
pub mod retrieval;
pub mod summarize;
pub mod vector_index;

pub use answer::AnswerSynthesizer;
pub use community::{CommunityPartition, GreedyModularityDetector};
pub use graph_store::KnowledgeGraph;
pub use pipeline::{BuildOptions, BuildReport, IndexBuilder, build_index};
pub use query::QueryEngine;
pub use retrieval::{ContextBundle, LocalSearchConfig, LocalSearchRetriever};
pub use summarize::{CommunitySummaries, CommunitySummarizer};
pub use vector_index::{EntityIndex, FlatL2Index};
