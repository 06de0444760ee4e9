#![allow(dead_code)]

use async_trait::async_trait;
use review_graphrag::embedding::Embedder;
use review_graphrag::llm::{GenerationOptions, TextGenerator};
use std::collections::HashMap;
use std::sync::Mutex;

/// Replies with the first rule whose needle occurs in the prompt.
#[derive(Debug, Default)]
pub struct RoutingGenerator {
    rules: Vec<(String, Result<String, String>)>,
    prompts: Mutex<Vec<String>>,
}

impl RoutingGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(mut self, needle: &str, reply: &str) -> Self {
        self.rules.push((needle.to_string(), Ok(reply.to_string())));
        self
    }

    pub fn fail_on(mut self, needle: &str, message: &str) -> Self {
        self.rules.push((needle.to_string(), Err(message.to_string())));
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn prompts_containing(&self, needle: &str) -> usize {
        self.prompts().iter().filter(|p| p.contains(needle)).count()
    }
}

#[async_trait]
impl TextGenerator for RoutingGenerator {
    async fn generate(&self, prompt: &str, _: &GenerationOptions) -> anyhow::Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let reply = self
            .rules
            .iter()
            .find(|(needle, _)| prompt.contains(needle.as_str()))
            .map(|(_, reply)| reply.clone())
            .unwrap_or_else(|| Err(format!("no rule for prompt: {prompt}")));
        reply.map_err(|e| anyhow::anyhow!(e))
    }
}

/// Looks vectors up by exact text; unknown texts map to the zero vector.
#[derive(Debug)]
pub struct TableEmbedder {
    dimension: usize,
    table: HashMap<String, Vec<f32>>,
}

impl TableEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            table: HashMap::new(),
        }
    }

    pub fn with(mut self, text: &str, vector: &[f32]) -> Self {
        self.table.insert(text.to_string(), vector.to_vec());
        self
    }

    fn lookup(&self, text: &str) -> Vec<f32> {
        self.table
            .get(text)
            .cloned()
            .unwrap_or_else(|| vec![0.0; self.dimension])
    }
}

#[async_trait]
impl Embedder for TableEmbedder {
    fn model_name(&self) -> &str {
        "table-embedder"
    }

    async fn embed_documents(&self, texts: Vec<String>) -> anyhow::Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.lookup(t)).collect())
    }

    async fn embed_query(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        Ok(self.lookup(text))
    }
}
