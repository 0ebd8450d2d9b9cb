use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{anyhow, Context, Result};
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

use crate::embed::EmbeddingProvider;

/// Model identifier stamped into the embedding cache and status output.
pub const MODEL_NAME: &str = "all-MiniLM-L6-v2";

/// Output dimension of all-MiniLM-L6-v2.
pub const EMBEDDING_DIM: usize = 384;

/// Sentence embeddings from the pretrained all-MiniLM-L6-v2 model.
///
/// The model is an external artifact: fastembed fetches the published ONNX
/// weights on first use (into `cache_dir` when given) and runs them locally.
/// `TextEmbedding::embed` takes `&mut self`, so the handle lives behind a
/// `Mutex`.
pub struct MiniLmEmbeddingProvider {
    model: Mutex<TextEmbedding>,
}

impl MiniLmEmbeddingProvider {
    pub fn load() -> Result<Self> {
        Self::load_with_cache_dir(None)
    }

    pub fn load_with_cache_dir(cache_dir: Option<PathBuf>) -> Result<Self> {
        let mut options =
            InitOptions::new(EmbeddingModel::AllMiniLML6V2).with_show_download_progress(false);
        if let Some(dir) = cache_dir {
            options = options.with_cache_dir(dir);
        }

        let model = TextEmbedding::try_new(options)
            .with_context(|| format!("load embedding model {MODEL_NAME}"))?;
        tracing::info!(model = MODEL_NAME, dim = EMBEDDING_DIM, "embedding model ready");

        Ok(Self {
            model: Mutex::new(model),
        })
    }

    fn encode(&self, texts: Vec<&str>) -> Result<Vec<Vec<f32>>> {
        let mut model = self
            .model
            .lock()
            .map_err(|_| anyhow!("embedding model mutex poisoned"))?;
        model
            .embed(texts, None)
            .with_context(|| format!("encode text with {MODEL_NAME}"))
    }
}

impl EmbeddingProvider for MiniLmEmbeddingProvider {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.encode(vec![text])?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("{MODEL_NAME} returned no embedding"))
    }

    fn embed_all(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        self.encode(texts.to_vec())
    }

    fn name(&self) -> &str {
        MODEL_NAME
    }

    fn dimension(&self) -> usize {
        EMBEDDING_DIM
    }
}
