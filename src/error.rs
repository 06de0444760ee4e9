//! Error taxonomy for the build and query paths.
//!
//! Backend adapters speak `anyhow`; components convert at the call site into
//! one of these variants so callers can tell skip-and-continue failures from
//! fatal ones.

/// Errors surfaced by the GraphRAG engine.
#[derive(Debug, thiserror::Error)]
pub enum GraphRagError {
    /// A review could not be turned into entities (non-fatal, document skipped).
    #[error("Extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    /// A community summary request failed (non-fatal, placeholder stored).
    #[error("Summarization failed for community {community}: {message}")]
    Summarization { community: usize, message: String },

    /// The entity index could not be built (fatal for the build).
    #[error("Index build failed: {0}")]
    IndexBuild(String),

    /// Persisted artifacts are missing, unreadable or inconsistent.
    #[error("Index load failed: {0}")]
    IndexLoad(String),

    /// The query text could not be embedded.
    #[error("Query embedding failed: {0}")]
    QueryEmbedding(String),

    /// The generation backend failed while answering.
    #[error("Generation failed: {0}")]
    Generation(String),

    /// Invalid or missing configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// An I/O error occurred while reading or writing artifacts.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Artifact (de)serialization failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Reasons a single review failed extraction.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    /// The generation backend returned an error.
    #[error("backend error: {0}")]
    Backend(String),

    /// The response held no `{ ... }` block.
    #[error("no structured block found in response")]
    NoStructuredBlock,

    /// The structured block was not valid extraction JSON.
    #[error("malformed structured output: {0}")]
    Malformed(String),
}

pub type Result<T, E = GraphRagError> = std::result::Result<T, E>;
