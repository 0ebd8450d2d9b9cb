pub mod embed;
pub mod engine;
pub mod error;
pub mod eval;
pub mod knowledge;
pub mod minilm_embed;
pub mod model;
pub mod orchestration;
pub mod retrieval;
pub mod storage;

pub use embed::{EmbeddingProvider, HashEmbeddingProvider};
pub use engine::{EngineStatus, SolutionEngine, DEFAULT_CACHE_PATH, DEFAULT_EXAMPLES_PATH};
pub use error::CodefixError;
pub use eval::{evaluate_cases, load_cases, EvalCase, EvalOutcome, EvalSummary};
pub use knowledge::{default_examples, KnowledgeBase};
pub use minilm_embed::{MiniLmEmbeddingProvider, EMBEDDING_DIM, MODEL_NAME};
pub use model::{BugExample, BugReport, BugSolution, Decision, MatchOutcome};
pub use orchestration::{EvaluationRun, RunStatus, DEFAULT_REQUIRED_PASS_RATE};
pub use retrieval::{
    confidence_from_similarity, cosine_similarity, decide, top_k, top_match,
    DEFAULT_CONFIDENCE_THRESHOLD,
};
pub use storage::{load_examples_json, CachedEmbedding, EmbeddingCache};
