use crate::error::GraphRagError;
use crate::llm::{GenerationOptions, LlmSettings, Provider};
use crate::rag::pipeline::BuildOptions;
use crate::rag::retrieval::LocalSearchConfig;
use clap::{Parser, Subcommand};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "CONFIG_FILE", global = true)]
    pub config: Option<String>,

    /// Directory holding one review per file
    #[arg(long, env = "REVIEWS_DIR", global = true)]
    pub reviews_dir: Option<String>,

    /// Directory for the persisted index (defaults to `<reviews_dir>/graphrag_index`)
    #[arg(long, global = true)]
    pub index_dir: Option<String>,

    /// Entry-point entities per question
    #[arg(long, global = true)]
    pub top_k: Option<usize>,

    /// Maximum backend requests in flight during a build
    #[arg(long, global = true)]
    pub concurrency: Option<usize>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Rebuild the index from the review corpus
    Build,
    /// Answer one question, building the index first if needed
    Ask {
        /// The question
        question: String,
    },
    /// Answer questions read line by line from stdin until `exit`
    Chat,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub corpus: CorpusConfig,
    pub build: BuildConfig,
    pub query: QueryConfig,
    pub generation: GenerationOptions,
    pub embedding: EmbeddingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CorpusConfig {
    pub reviews_dir: PathBuf,
    pub index_dir: Option<PathBuf>,
    pub extension: String,
}

impl CorpusConfig {
    pub fn index_dir(&self) -> PathBuf {
        self.index_dir
            .clone()
            .unwrap_or_else(|| self.reviews_dir.join("graphrag_index"))
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct BuildConfig {
    pub extraction_delay_ms: u64,
    pub summary_delay_ms: u64,
    pub concurrency: usize,
    pub resolution: f64,
}

impl BuildConfig {
    pub fn options(&self) -> BuildOptions {
        BuildOptions {
            extraction_delay: Duration::from_millis(self.extraction_delay_ms),
            summary_delay: Duration::from_millis(self.summary_delay_ms),
            concurrency: self.concurrency.max(1),
            resolution: self.resolution,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct QueryConfig {
    pub top_k: usize,
}

impl QueryConfig {
    pub fn search(&self) -> LocalSearchConfig {
        LocalSearchConfig { top_k: self.top_k }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// Local ONNX model through fastembed
    Fastembed,
    /// `OpenAI`-compatible `/v1/embeddings` endpoint
    Openai,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProvider,
    pub model: Option<String>,
}

impl AppConfig {
    pub fn load() -> Result<(Cli, Self), config::ConfigError> {
        let cli = Cli::try_parse().map_err(|e| config::ConfigError::Message(e.to_string()))?;
        let config = Self::from_cli(&cli)?;
        Ok((cli, config))
    }

    pub fn load_from_args<I, T>(args: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli =
            Cli::try_parse_from(args).map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Self::from_cli(&cli)
    }

    pub fn from_cli(cli: &Cli) -> Result<Self, config::ConfigError> {
        let defaults = GenerationOptions::default();
        let mut builder = Config::builder();

        // 1. Defaults
        builder = builder
            .set_default("corpus.reviews_dir", "reviews")?
            .set_default("corpus.extension", "txt")?
            .set_default("build.extraction_delay_ms", 1000)?
            .set_default("build.summary_delay_ms", 500)?
            .set_default("build.concurrency", 1)?
            .set_default("build.resolution", 1.0)?
            .set_default("query.top_k", 5)?
            .set_default("generation.temperature", f64::from(defaults.temperature))?
            .set_default("generation.top_p", f64::from(defaults.top_p))?
            .set_default("generation.max_output_tokens", i64::from(defaults.max_output_tokens))?
            .set_default("embedding.provider", "fastembed")?;

        // 2. Config file
        if let Some(path) = &cli.config {
            builder = builder.add_source(File::with_name(path));
        }

        // 3. Environment, e.g. GRAPHRAG_QUERY__TOP_K=8
        builder = builder.add_source(
            Environment::with_prefix("GRAPHRAG")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        // 4. CLI flags
        if let Some(dir) = &cli.reviews_dir {
            builder = builder.set_override("corpus.reviews_dir", dir.as_str())?;
        }
        if let Some(dir) = &cli.index_dir {
            builder = builder.set_override("corpus.index_dir", dir.as_str())?;
        }
        if let Some(k) = cli.top_k {
            builder = builder.set_override("query.top_k", k as u64)?;
        }
        if let Some(n) = cli.concurrency {
            builder = builder.set_override("build.concurrency", n as u64)?;
        }

        let cfg = builder.build()?;
        cfg.try_deserialize()
    }
}

fn required_env(name: &str) -> Result<String, GraphRagError> {
    let value = std::env::var(name)
        .map_err(|_| GraphRagError::Config(format!("Missing required env var: {name}")))?;
    if value.trim().is_empty() {
        return Err(GraphRagError::Config(format!("{name} cannot be empty")));
    }
    Ok(value)
}

pub fn load_llm_settings() -> Result<LlmSettings, GraphRagError> {
    let base_url = required_env("LLM_BASE_URL")?;
    let model = required_env("LLM_MODEL")?;

    let api_key = std::env::var("LLM_API_KEY")
        .ok()
        .filter(|s| !s.trim().is_empty());

    // Auto-detect provider from base URL
    let mut provider = Provider::detect_from_url(&base_url);

    // Azure routes by deployment rather than by model
    if let Provider::AzureOpenAI { .. } = &provider
        && let Ok(deployment_name) = std::env::var("AZURE_DEPLOYMENT_NAME")
    {
        provider = Provider::AzureOpenAI {
            deployment_name,
            api_version: std::env::var("AZURE_API_VERSION")
                .unwrap_or_else(|_| "2024-08-01-preview".to_string()),
        };
    }

    Ok(LlmSettings {
        base_url,
        api_key,
        model,
        provider,
    })
}

/// Connection settings for the `openai` embedding provider.
///
/// Shares the LLM endpoint and key; the model comes from `embedding.model`.
pub fn load_embedding_settings(config: &EmbeddingConfig) -> Result<LlmSettings, GraphRagError> {
    let mut settings = load_llm_settings()?;
    settings.model = config
        .model
        .clone()
        .unwrap_or_else(|| "text-embedding-3-small".to_string());
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subcommands_parse() {
        let cli = Cli::try_parse_from(["review-graphrag", "ask", "What do users hate?"]).unwrap();
        assert_eq!(
            cli.command,
            Some(Command::Ask {
                question: "What do users hate?".to_string()
            })
        );

        let cli = Cli::try_parse_from(["review-graphrag", "build", "--concurrency", "4"]).unwrap();
        assert_eq!(cli.command, Some(Command::Build));
        assert_eq!(cli.concurrency, Some(4));

        let cli = Cli::try_parse_from(["review-graphrag"]).unwrap();
        assert_eq!(cli.command, None);
    }

    #[test]
    fn test_index_dir_defaults_under_reviews() {
        let corpus = CorpusConfig {
            reviews_dir: PathBuf::from("reviews/my_app"),
            index_dir: None,
            extension: "txt".to_string(),
        };
        assert_eq!(corpus.index_dir(), PathBuf::from("reviews/my_app/graphrag_index"));
    }

    #[test]
    fn test_build_options_clamp_concurrency() {
        let build = BuildConfig {
            extraction_delay_ms: 0,
            summary_delay_ms: 250,
            concurrency: 0,
            resolution: 1.0,
        };
        let options = build.options();
        assert_eq!(options.concurrency, 1);
        assert_eq!(options.summary_delay, Duration::from_millis(250));
    }
}
