use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::CodefixError;
use crate::model::BugExample;

pub fn load_examples_json(path: &Path) -> Result<Vec<BugExample>> {
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let reader = BufReader::new(file);
    serde_json::from_reader(reader).with_context(|| format!("parse examples {}", path.display()))
}

/// One embedded description, positionally aligned with the knowledge base.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedEmbedding {
    pub description: String,
    pub embedding: Vec<f32>,
}

/// Derived embeddings persisted between runs, the only disk artifact the
/// matcher writes. The cache is never trusted blindly: `matches` checks it
/// against the live model and knowledge base, and any doubt means
/// re-embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingCache {
    pub model: String,
    pub dimension: usize,
    pub entries: Vec<CachedEmbedding>,
}

impl EmbeddingCache {
    /// Pair descriptions with their freshly computed embeddings, enforcing a
    /// uniform vector dimension.
    pub fn build(
        model: &str,
        dimension: usize,
        descriptions: &[&str],
        embeddings: Vec<Vec<f32>>,
    ) -> Result<Self> {
        if descriptions.len() != embeddings.len() {
            bail!(
                "got {} embeddings for {} descriptions",
                embeddings.len(),
                descriptions.len()
            );
        }
        for embedding in &embeddings {
            if embedding.len() != dimension {
                return Err(CodefixError::DimensionMismatch {
                    expected: dimension,
                    actual: embedding.len(),
                }
                .into());
            }
        }

        let entries = descriptions
            .iter()
            .zip(embeddings)
            .map(|(description, embedding)| CachedEmbedding {
                description: (*description).to_string(),
                embedding,
            })
            .collect();

        Ok(Self {
            model: model.to_string(),
            dimension,
            entries,
        })
    }

    /// True when this cache was produced by `model` over exactly these
    /// descriptions, in this order, with every stored vector at the declared
    /// dimension. An intact envelope over damaged vectors is still stale.
    pub fn matches(&self, model: &str, dimension: usize, descriptions: &[&str]) -> bool {
        self.model == model
            && self.dimension == dimension
            && self.entries.len() == descriptions.len()
            && self.entries.iter().zip(descriptions).all(|(entry, description)| {
                entry.description == *description && entry.embedding.len() == self.dimension
            })
    }

    pub fn into_embeddings(self) -> Vec<Vec<f32>> {
        self.entries.into_iter().map(|entry| entry.embedding).collect()
    }

    /// Read a cache file. Any failure (missing, unreadable, unparsable)
    /// yields `None`: a cache is rebuildable by definition.
    pub fn load(path: &Path) -> Option<Self> {
        let file = File::open(path).ok()?;
        match serde_json::from_reader(BufReader::new(file)) {
            Ok(cache) => Some(cache),
            Err(err) => {
                tracing::info!(
                    path = %path.display(),
                    error = %err,
                    "ignoring unreadable embedding cache"
                );
                None
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("create {}", parent.display()))?;
            }
        }
        let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, self).context("serialize embedding cache")?;
        writer.flush().context("flush embedding cache")?;
        Ok(())
    }
}
