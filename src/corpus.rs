//! Review corpus on disk.
//!
//! A corpus is one directory of review documents, one review per file. The
//! file name is the document's stable identifier and ends up as the
//! `source_file` of every entity extracted from it.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A raw review document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewDocument {
    /// File name within the corpus directory
    pub name: String,
    /// Review text (lossy UTF-8)
    pub text: String,
}

/// Directory-backed review corpus.
#[derive(Debug, Clone)]
pub struct ReviewCorpus {
    dir: PathBuf,
    extension: String,
}

impl ReviewCorpus {
    pub fn new(dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            extension: extension.into().trim_start_matches('.').to_string(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// List document names, sorted so builds visit reviews in a stable order.
    pub fn list(&self) -> Result<Vec<String>> {
        if !self.dir.is_dir() {
            anyhow::bail!("Review directory not found: {}", self.dir.display());
        }

        let mut names: Vec<String> = WalkDir::new(&self.dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| {
                e.path()
                    .extension()
                    .and_then(|s| s.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case(&self.extension))
            })
            .filter_map(|e| e.file_name().to_str().map(ToString::to_string))
            .collect();

        names.sort();
        Ok(names)
    }

    /// Load every document of the corpus.
    pub async fn load_all(&self) -> Result<Vec<ReviewDocument>> {
        let mut docs = Vec::new();
        for name in self.list()? {
            let text = self
                .read_source(&name)
                .await?
                .with_context(|| format!("Review disappeared while loading: {name}"))?;
            docs.push(ReviewDocument { name, text });
        }
        Ok(docs)
    }

    /// Read one document; `Ok(None)` when it does not exist.
    pub async fn read_source(&self, name: &str) -> Result<Option<String>> {
        // Names are bare file names; anything with a path component is not ours.
        if Path::new(name).components().count() != 1 {
            return Ok(None);
        }

        match tokio::fs::read(self.dir.join(name)).await {
            Ok(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read review {name}")),
        }
    }
}
