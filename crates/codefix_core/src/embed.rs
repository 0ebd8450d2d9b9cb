use anyhow::Result;

pub trait EmbeddingProvider {
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    fn embed_all(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|text| self.embed(text)).collect()
    }

    /// Short model identifier, stamped into the embedding cache and shown in
    /// status output.
    fn name(&self) -> &str;

    /// Output vector dimension.
    fn dimension(&self) -> usize;
}

impl EmbeddingProvider for Box<dyn EmbeddingProvider> {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        (**self).embed(text)
    }

    fn embed_all(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        (**self).embed_all(texts)
    }

    fn name(&self) -> &str {
        (**self).name()
    }

    fn dimension(&self) -> usize {
        (**self).dimension()
    }
}

/// Deterministic bag-of-words embeddings: each lowercased alphanumeric token
/// is FNV-1a hashed into a bucket, then the vector is L2-normalised. No model
/// download, no network; used by tests, `--offline` runs, and as the degraded
/// fallback when the pretrained model cannot load.
#[derive(Debug, Clone)]
pub struct HashEmbeddingProvider {
    dim: usize,
    name: String,
}

impl HashEmbeddingProvider {
    pub fn new(dim: usize) -> Self {
        let dim = dim.max(8);
        Self {
            dim,
            name: format!("hash-{dim}"),
        }
    }
}

impl Default for HashEmbeddingProvider {
    fn default() -> Self {
        Self::new(crate::minilm_embed::EMBEDDING_DIM)
    }
}

fn fnv1a(token: &str) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for byte in token.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

impl EmbeddingProvider for HashEmbeddingProvider {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0f32; self.dim];

        let lowered = text.to_ascii_lowercase();
        for token in lowered
            .split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let bucket = (fnv1a(token) as usize) % self.dim;
            vector[bucket] += 1.0;
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut vector {
                *x /= norm;
            }
        }

        Ok(vector)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn dimension(&self) -> usize {
        self.dim
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_embeddings_are_deterministic() {
        let provider = HashEmbeddingProvider::new(64);
        let a = provider.embed("React state not updating").unwrap();
        let b = provider.embed("React state not updating").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn hash_embeddings_are_normalised() {
        let provider = HashEmbeddingProvider::new(64);
        let v = provider.embed("useEffect runs forever").unwrap();
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn different_texts_embed_differently() {
        let provider = HashEmbeddingProvider::new(64);
        let a = provider.embed("infinite render loop").unwrap();
        let b = provider.embed("null pointer on login").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn token_free_text_embeds_to_zero_vector() {
        let provider = HashEmbeddingProvider::new(64);
        let v = provider.embed("!!! ---").unwrap();
        assert!(v.iter().all(|x| *x == 0.0));
    }

    #[test]
    fn dimension_is_clamped_and_reported() {
        let provider = HashEmbeddingProvider::new(2);
        assert_eq!(provider.dimension(), 8);
        assert_eq!(provider.name(), "hash-8");
        assert_eq!(provider.embed("x").unwrap().len(), 8);
    }

    #[test]
    fn boxed_provider_delegates() {
        let provider: Box<dyn EmbeddingProvider> = Box::new(HashEmbeddingProvider::new(16));
        assert_eq!(provider.dimension(), 16);
        let all = provider.embed_all(&["a", "b"]).unwrap();
        assert_eq!(all.len(), 2);
    }
}
