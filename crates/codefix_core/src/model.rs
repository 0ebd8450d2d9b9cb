use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A bug report submitted for analysis. Only `description` is embedded for
/// matching; the other fields travel with the report for the caller's sake.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BugReport {
    #[serde(default)]
    pub id: Option<i64>,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub steps_to_reproduce: Option<String>,
    #[serde(default)]
    pub expected_behavior: Option<String>,
    #[serde(default)]
    pub actual_behavior: Option<String>,
    #[serde(default)]
    pub code_snippet: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub resolved: bool,
}

impl BugReport {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: None,
            title: title.into(),
            description: description.into(),
            steps_to_reproduce: None,
            expected_behavior: None,
            actual_behavior: None,
            code_snippet: None,
            language: None,
            created_at: Utc::now(),
            resolved: false,
        }
    }
}

/// A hand-authored knowledge-base entry. Immutable after load; its position
/// in the loaded array is its identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BugExample {
    pub title: String,
    pub description: String,
    pub solution: String,
    pub code_example: String,
    pub source: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

/// The solution handed back on a confident match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BugSolution {
    pub title: String,
    pub solution: String,
    pub code_example: String,
    pub source: String,
    pub confidence: f32,
    pub tags: Vec<String>,
    pub similarity_score: f32,
}

impl BugSolution {
    pub fn from_example(example: &BugExample, confidence: f32, similarity: f32) -> Self {
        Self {
            title: example.title.clone(),
            solution: example.solution.clone(),
            code_example: example.code_example.clone(),
            source: example.source.clone(),
            confidence,
            tags: example.tags.clone(),
            similarity_score: similarity,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Hit,
    Miss,
}

/// Full result of matching one report against the knowledge base. A miss
/// still names the nearest candidate for diagnostics, but never carries its
/// solution body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchOutcome {
    pub decision: Decision,
    pub best_title: Option<String>,
    pub similarity: f32,
    pub confidence: f32,
    pub solution: Option<BugSolution>,
}
