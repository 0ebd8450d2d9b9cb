use thiserror::Error;

/// Semantic failures raised by the matcher itself. Filesystem and model
/// errors travel as `anyhow` errors with context attached; these are the
/// cases callers may want to match on.
#[derive(Debug, Error, PartialEq)]
pub enum CodefixError {
    #[error("bug report description is empty")]
    EmptyQuery,

    #[error("knowledge base has no examples")]
    EmptyKnowledgeBase,

    #[error("example '{title}' has an empty description")]
    BlankDescription { title: String },

    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}
