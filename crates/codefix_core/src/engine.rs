use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Result;
use serde::Serialize;

use crate::embed::EmbeddingProvider;
use crate::error::CodefixError;
use crate::knowledge::KnowledgeBase;
use crate::model::{BugExample, BugReport, BugSolution, MatchOutcome};
use crate::retrieval::{decide, DEFAULT_CONFIDENCE_THRESHOLD};
use crate::storage::EmbeddingCache;

/// Default location of the curated examples file.
pub const DEFAULT_EXAMPLES_PATH: &str = "data/examples.json";
/// Default location of the derived embedding cache.
pub const DEFAULT_CACHE_PATH: &str = "data/embeddings.json";

/// The matcher: a knowledge base, one embedding per example description, and
/// a provider for query embeddings. Built once at startup; immutable
/// afterwards apart from an explicit `rebuild_embeddings`.
pub struct SolutionEngine {
    knowledge: KnowledgeBase,
    provider: Box<dyn EmbeddingProvider>,
    embeddings: Vec<Vec<f32>>,
    threshold: f32,
    cache_path: Option<PathBuf>,
}

impl SolutionEngine {
    /// Embed every example description now, default threshold, no cache file.
    pub fn new(knowledge: KnowledgeBase, provider: Box<dyn EmbeddingProvider>) -> Result<Self> {
        Self::build(knowledge, provider, DEFAULT_CONFIDENCE_THRESHOLD, None)
    }

    pub fn with_threshold(
        knowledge: KnowledgeBase,
        provider: Box<dyn EmbeddingProvider>,
        threshold: f32,
    ) -> Result<Self> {
        Self::build(knowledge, provider, threshold, None)
    }

    /// Reuse `cache_path` when it is coherent with the knowledge base and
    /// provider; re-embed and rewrite it otherwise.
    pub fn with_cache(
        knowledge: KnowledgeBase,
        provider: Box<dyn EmbeddingProvider>,
        threshold: f32,
        cache_path: &Path,
    ) -> Result<Self> {
        Self::build(knowledge, provider, threshold, Some(cache_path.to_path_buf()))
    }

    fn build(
        knowledge: KnowledgeBase,
        provider: Box<dyn EmbeddingProvider>,
        threshold: f32,
        cache_path: Option<PathBuf>,
    ) -> Result<Self> {
        let descriptions = knowledge.descriptions();

        let mut embeddings = None;
        if let Some(path) = cache_path.as_deref() {
            if let Some(cache) = EmbeddingCache::load(path) {
                if cache.matches(provider.name(), provider.dimension(), &descriptions) {
                    tracing::info!(
                        path = %path.display(),
                        entries = cache.entries.len(),
                        "reusing cached embeddings"
                    );
                    embeddings = Some(cache.into_embeddings());
                } else {
                    tracing::info!(path = %path.display(), "embedding cache is stale, re-embedding");
                }
            }
        }

        let embeddings = match embeddings {
            Some(embeddings) => embeddings,
            None => embed_corpus(provider.as_ref(), &descriptions, cache_path.as_deref())?,
        };

        Ok(Self {
            knowledge,
            provider,
            embeddings,
            threshold,
            cache_path,
        })
    }

    /// Embed the report description and match it against the knowledge base.
    pub fn analyze(&self, report: &BugReport) -> Result<MatchOutcome> {
        let text = report.description.trim();
        if text.is_empty() {
            return Err(CodefixError::EmptyQuery.into());
        }

        let query = self.provider.embed(text)?;
        if query.len() != self.provider.dimension() {
            return Err(CodefixError::DimensionMismatch {
                expected: self.provider.dimension(),
                actual: query.len(),
            }
            .into());
        }

        let outcome = decide(&query, self.knowledge.examples(), &self.embeddings, self.threshold);
        tracing::debug!(
            decision = ?outcome.decision,
            similarity = outcome.similarity,
            confidence = outcome.confidence,
            nearest = outcome.best_title.as_deref().unwrap_or(""),
            "analyzed bug report"
        );
        Ok(outcome)
    }

    /// The solution on a confident hit, `None` on a miss.
    pub fn find_solution(&self, report: &BugReport) -> Result<Option<BugSolution>> {
        Ok(self.analyze(report)?.solution)
    }

    /// Re-embed every example and rewrite the cache file when one is set.
    pub fn rebuild_embeddings(&mut self) -> Result<()> {
        let descriptions = self.knowledge.descriptions();
        self.embeddings =
            embed_corpus(self.provider.as_ref(), &descriptions, self.cache_path.as_deref())?;
        Ok(())
    }

    pub fn examples(&self) -> &[BugExample] {
        self.knowledge.examples()
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn status(&self) -> EngineStatus {
        EngineStatus {
            model: self.provider.name().to_string(),
            examples_count: self.knowledge.len(),
            dimension: self.provider.dimension(),
            threshold: self.threshold,
            cache_path: self.cache_path.clone(),
        }
    }
}

fn embed_corpus(
    provider: &dyn EmbeddingProvider,
    descriptions: &[&str],
    cache_path: Option<&Path>,
) -> Result<Vec<Vec<f32>>> {
    let started = Instant::now();
    let embeddings = provider.embed_all(descriptions)?;
    let cache = EmbeddingCache::build(
        provider.name(),
        provider.dimension(),
        descriptions,
        embeddings,
    )?;
    tracing::info!(
        examples = descriptions.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        model = provider.name(),
        "embedded example descriptions"
    );

    if let Some(path) = cache_path {
        cache.save(path)?;
    }
    Ok(cache.into_embeddings())
}

#[derive(Debug, Clone, Serialize)]
pub struct EngineStatus {
    pub model: String,
    pub examples_count: usize,
    pub dimension: usize,
    pub threshold: f32,
    pub cache_path: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embed::HashEmbeddingProvider;
    use crate::knowledge::default_examples;
    use std::cell::Cell;
    use std::rc::Rc;

    /// Wraps the hash provider and counts every `embed` call, so tests can
    /// observe whether the corpus was re-embedded or served from cache.
    struct CountingProvider {
        inner: HashEmbeddingProvider,
        calls: Rc<Cell<usize>>,
    }

    impl CountingProvider {
        fn new(dim: usize) -> (Self, Rc<Cell<usize>>) {
            let calls = Rc::new(Cell::new(0));
            (
                Self {
                    inner: HashEmbeddingProvider::new(dim),
                    calls: Rc::clone(&calls),
                },
                calls,
            )
        }
    }

    impl EmbeddingProvider for CountingProvider {
        fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
            self.calls.set(self.calls.get() + 1);
            self.inner.embed(text)
        }

        fn name(&self) -> &str {
            self.inner.name()
        }

        fn dimension(&self) -> usize {
            self.inner.dimension()
        }
    }

    fn hash_engine() -> SolutionEngine {
        let kb = KnowledgeBase::from_examples(default_examples()).unwrap();
        SolutionEngine::new(kb, Box::new(HashEmbeddingProvider::new(256))).unwrap()
    }

    #[test]
    fn exact_description_is_a_confident_hit() {
        let engine = hash_engine();
        let description = default_examples()[0].description.clone();
        let report = BugReport::new("My component is stuck", description);

        let outcome = engine.analyze(&report).unwrap();
        assert_eq!(outcome.decision, crate::model::Decision::Hit);
        assert!(outcome.confidence > 0.9);

        let solution = engine.find_solution(&report).unwrap().unwrap();
        assert_eq!(solution.title, "Fix React State Mutation");
        assert_eq!(solution.source, "React Documentation - State Updates");
    }

    #[test]
    fn unrelated_text_is_a_miss_with_diagnostics() {
        let engine = hash_engine();
        let report = BugReport::new("???", "zebra quantum harpsichord travels sideways");

        let outcome = engine.analyze(&report).unwrap();
        assert_eq!(outcome.decision, crate::model::Decision::Miss);
        assert!(outcome.best_title.is_some());
        assert!(outcome.solution.is_none());
        assert!(engine.find_solution(&report).unwrap().is_none());
    }

    #[test]
    fn empty_description_is_rejected() {
        let engine = hash_engine();
        let report = BugReport::new("title only", "   ");

        let err = engine.analyze(&report).unwrap_err();
        assert_eq!(
            err.downcast_ref::<CodefixError>(),
            Some(&CodefixError::EmptyQuery)
        );
    }

    #[test]
    fn warm_cache_skips_corpus_embedding() {
        let dir = tempfile::tempdir().unwrap();
        let cache_path = dir.path().join("embeddings.json");
        let kb = KnowledgeBase::from_examples(default_examples()).unwrap();

        let (provider, calls) = CountingProvider::new(64);
        SolutionEngine::with_cache(
            kb.clone(),
            Box::new(provider),
            DEFAULT_CONFIDENCE_THRESHOLD,
            &cache_path,
        )
        .unwrap();
        assert_eq!(calls.get(), kb.len());
        assert!(cache_path.exists());

        let (provider, calls) = CountingProvider::new(64);
        SolutionEngine::with_cache(
            kb.clone(),
            Box::new(provider),
            DEFAULT_CONFIDENCE_THRESHOLD,
            &cache_path,
        )
        .unwrap();
        assert_eq!(calls.get(), 0, "warm cache must not re-embed the corpus");
    }

    #[test]
    fn stale_cache_is_rebuilt() {
        let dir = tempfile::tempdir().unwrap();
        let cache_path = dir.path().join("embeddings.json");
        let kb = KnowledgeBase::from_examples(default_examples()).unwrap();

        let (provider, _) = CountingProvider::new(64);
        SolutionEngine::with_cache(
            kb.clone(),
            Box::new(provider),
            DEFAULT_CONFIDENCE_THRESHOLD,
            &cache_path,
        )
        .unwrap();

        // Same cache file, edited knowledge base: position 0 changed.
        let mut examples = default_examples();
        examples[0].description = "completely different wording".to_string();
        let edited = KnowledgeBase::from_examples(examples).unwrap();

        let (provider, calls) = CountingProvider::new(64);
        SolutionEngine::with_cache(
            edited.clone(),
            Box::new(provider),
            DEFAULT_CONFIDENCE_THRESHOLD,
            &cache_path,
        )
        .unwrap();
        assert_eq!(calls.get(), edited.len(), "stale cache must be re-embedded");
    }

    #[test]
    fn truncated_cache_vectors_force_a_rebuild() {
        let dir = tempfile::tempdir().unwrap();
        let cache_path = dir.path().join("embeddings.json");
        let kb = KnowledgeBase::from_examples(default_examples()).unwrap();

        let (provider, _) = CountingProvider::new(64);
        SolutionEngine::with_cache(
            kb.clone(),
            Box::new(provider),
            DEFAULT_CONFIDENCE_THRESHOLD,
            &cache_path,
        )
        .unwrap();

        // Damage the file in place: envelope intact, one vector cut short.
        let mut cache = EmbeddingCache::load(&cache_path).unwrap();
        cache.entries[0].embedding.truncate(2);
        cache.save(&cache_path).unwrap();

        let (provider, calls) = CountingProvider::new(64);
        let engine = SolutionEngine::with_cache(
            kb.clone(),
            Box::new(provider),
            DEFAULT_CONFIDENCE_THRESHOLD,
            &cache_path,
        )
        .unwrap();
        assert_eq!(calls.get(), kb.len(), "damaged cache must be re-embedded");

        let report = BugReport::new("t", default_examples()[0].description.clone());
        let outcome = engine.analyze(&report).unwrap();
        assert_eq!(outcome.decision, crate::model::Decision::Hit);
        assert_eq!(
            outcome.best_title.as_deref(),
            Some("Fix React State Mutation")
        );
    }

    #[test]
    fn rebuild_embeddings_reembeds_and_rewrites() {
        let dir = tempfile::tempdir().unwrap();
        let cache_path = dir.path().join("embeddings.json");
        let kb = KnowledgeBase::from_examples(default_examples()).unwrap();

        let (provider, calls) = CountingProvider::new(64);
        let mut engine = SolutionEngine::with_cache(
            kb.clone(),
            Box::new(provider),
            DEFAULT_CONFIDENCE_THRESHOLD,
            &cache_path,
        )
        .unwrap();
        let after_build = calls.get();

        engine.rebuild_embeddings().unwrap();
        assert_eq!(calls.get(), after_build + kb.len());
        assert!(cache_path.exists());
    }

    #[test]
    fn wrong_dimension_query_embedding_is_caught() {
        /// Embeds correctly while the corpus loads, then returns malformed
        /// vectors for every query after it.
        struct DriftingProvider {
            inner: HashEmbeddingProvider,
            embeds_seen: Cell<usize>,
            corpus_size: usize,
        }

        impl EmbeddingProvider for DriftingProvider {
            fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
                let seen = self.embeds_seen.get();
                self.embeds_seen.set(seen + 1);
                if seen >= self.corpus_size {
                    return Ok(vec![0.5; 3]);
                }
                self.inner.embed(text)
            }

            fn name(&self) -> &str {
                self.inner.name()
            }

            fn dimension(&self) -> usize {
                self.inner.dimension()
            }
        }

        let kb = KnowledgeBase::from_examples(default_examples()).unwrap();
        let provider = DriftingProvider {
            inner: HashEmbeddingProvider::new(64),
            embeds_seen: Cell::new(0),
            corpus_size: kb.len(),
        };
        let engine = SolutionEngine::new(kb, Box::new(provider)).unwrap();

        let report = BugReport::new("t", "React state");
        let err = engine.analyze(&report).unwrap_err();
        assert_eq!(
            err.downcast_ref::<CodefixError>(),
            Some(&CodefixError::DimensionMismatch {
                expected: 64,
                actual: 3
            })
        );
    }

    #[test]
    fn status_reports_engine_shape() {
        let engine = hash_engine();
        let status = engine.status();

        assert_eq!(status.model, "hash-256");
        assert_eq!(status.examples_count, 3);
        assert_eq!(status.dimension, 256);
        assert_eq!(status.threshold, DEFAULT_CONFIDENCE_THRESHOLD);
        assert!(status.cache_path.is_none());
    }
}
