//! Review GraphRAG CLI
//!
//! Builds the knowledge-graph index over a review directory and answers
//! questions against it.

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::map_err_ignore)]
#![allow(clippy::manual_let_else)]
#![allow(clippy::unused_async)]
#![allow(clippy::match_same_arms)]

use mimalloc::MiMalloc;

/// Global allocator for improved performance (M-MIMALLOC-APPS).
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use dotenvy::dotenv;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};

use review_graphrag::config::{
    AppConfig, Command, EmbeddingProvider, load_embedding_settings, load_llm_settings,
};
use review_graphrag::corpus::ReviewCorpus;
use review_graphrag::embedding::{Embedder, FastEmbedder, OpenAiEmbedder};
use review_graphrag::llm::{ChatCompletionsDriver, TextGenerator};
use review_graphrag::persistence::IndexArtifacts;
use review_graphrag::rag::{AnswerSynthesizer, QueryEngine, build_index};
use review_graphrag::telemetry;

#[tokio::main]
async fn main() {
    // Load .env (if present)
    let _ = dotenv();
    telemetry::init();

    let (cli, config) = match AppConfig::load() {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(2);
        }
    };

    if let Err(e) = run(cli.command.unwrap_or(Command::Chat), config).await {
        error!(error = %e, "Fatal error");
        eprintln!("{e:#}");
        std::process::exit(1);
    }
}

async fn run(command: Command, config: AppConfig) -> anyhow::Result<()> {
    let generator: Arc<dyn TextGenerator> =
        Arc::new(ChatCompletionsDriver::new(load_llm_settings()?));
    let embedder: Arc<dyn Embedder> = match config.embedding.provider {
        EmbeddingProvider::Fastembed => Arc::new(FastEmbedder::new(
            config
                .embedding
                .model
                .as_deref()
                .unwrap_or(FastEmbedder::DEFAULT_MODEL),
        )?),
        EmbeddingProvider::Openai => Arc::new(OpenAiEmbedder::new(load_embedding_settings(
            &config.embedding,
        )?)),
    };

    let corpus = ReviewCorpus::new(&config.corpus.reviews_dir, &config.corpus.extension);
    let index_dir = config.corpus.index_dir();

    info!(
        reviews_dir = %config.corpus.reviews_dir.display(),
        index_dir = %index_dir.display(),
        embedder = embedder.model_name(),
        "Configuration loaded"
    );

    let needs_build = command == Command::Build || !IndexArtifacts::exists(&index_dir);
    if needs_build {
        if command != Command::Build {
            println!("No index found. Building the knowledge graph...");
        }
        let report = build_index(
            &corpus,
            &index_dir,
            config.build.options(),
            config.generation.clone(),
            Arc::clone(&generator),
            Arc::clone(&embedder),
        )
        .await
        .context("Failed to build the knowledge graph index")?;

        println!(
            "Indexed {} entities from {} reviews ({} failed): {} nodes, {} edges, {} communities.",
            report.indexed_entities,
            report.documents,
            report.failed_documents.len(),
            report.nodes,
            report.edges,
            report.communities
        );
    } else {
        println!("Loading existing GraphRAG index from '{}'...", index_dir.display());
    }

    if command == Command::Build {
        return Ok(());
    }

    let engine = open_engine(&index_dir, corpus, embedder, generator, &config).await;
    match command {
        Command::Ask { question } => println!("{}", engine.answer(&question).await),
        _ => chat(&engine).await?,
    }
    Ok(())
}

async fn open_engine(
    index_dir: &Path,
    corpus: ReviewCorpus,
    embedder: Arc<dyn Embedder>,
    generator: Arc<dyn TextGenerator>,
    config: &AppConfig,
) -> QueryEngine {
    QueryEngine::open(
        index_dir,
        corpus,
        embedder,
        AnswerSynthesizer::new(generator, config.generation.clone()),
        config.query.search(),
    )
    .await
}

async fn chat(engine: &QueryEngine) -> anyhow::Result<()> {
    println!("\nGraphRAG index is ready. You can now ask questions.");
    println!("Type 'exit' to quit.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("\n> Ask a question about the reviews: ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let query = line.trim();
        if query.eq_ignore_ascii_case("exit") {
            break;
        }
        if query.is_empty() {
            continue;
        }

        let answer = engine.answer(query).await;
        println!("\n--- AI Insight ---");
        println!("{answer}");
        println!("--------------------");
    }
    Ok(())
}
