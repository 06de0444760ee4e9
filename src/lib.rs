//! Review GraphRAG
//!
//! Question answering over a corpus of app reviews through a knowledge graph.
//!
//! # Architecture
//!
//! - **Build**: an LLM extracts typed entities and relationships from every
//!   review into one knowledge graph, which is partitioned into communities by
//!   greedy modularity; each community gets a one-sentence summary and every
//!   entity value is embedded into a flat L2 index.
//! - **Query**: the entities nearest to a question seed a local search that
//!   gathers graph neighbors, community summaries and the original reviews
//!   into a context for the final answer.
//!
//! # Modules
//!
//! - [`rag`]: graph store, community detection, summaries, vector index, retrieval
//! - [`llm`]: text generation backend
//! - [`embedding`]: text embedding backends
//! - [`persistence`]: on-disk index artifacts
//! - [`corpus`]: review files on disk

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::implicit_hasher)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::cargo_common_metadata)]
#![allow(clippy::multiple_crate_versions)]
#![allow(clippy::unused_async)]

pub mod config;
pub mod corpus;
pub mod domain;
pub mod embedding;
pub mod error;
pub mod llm;
pub mod persistence;
pub mod rag;
pub mod telemetry;

#[cfg(test)]
mod test_support;

pub use error::{GraphRagError, Result};
