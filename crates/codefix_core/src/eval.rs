use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::engine::SolutionEngine;
use crate::model::{BugReport, Decision};

/// One labelled bug description. `expected_title` and `min_confidence` are
/// optional extra assertions on top of the expected decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalCase {
    pub case_id: String,
    pub description: String,
    pub expected_decision: Decision,
    #[serde(default)]
    pub expected_title: Option<String>,
    #[serde(default)]
    pub min_confidence: Option<f32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EvalOutcome {
    pub case_id: String,
    pub expected_decision: Decision,
    pub actual_decision: Decision,
    pub expected_title: Option<String>,
    pub actual_title: Option<String>,
    pub similarity: f32,
    pub confidence: f32,
    pub passed: bool,
    pub latency_ms: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct EvalSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub pass_rate: f32,
    pub mean_latency_ms: f64,
    pub outcomes: Vec<EvalOutcome>,
}

pub fn load_cases(path: &Path) -> Result<Vec<EvalCase>> {
    let file = File::open(path)
        .with_context(|| format!("failed to open eval cases {}", path.display()))?;
    let cases: Vec<EvalCase> = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("failed to parse eval cases {}", path.display()))?;
    Ok(cases)
}

/// Run every case through the engine and grade it. A case passes when the
/// decision matches, the matched title matches (when one is expected), and
/// the confidence clears `min_confidence` (when one is set).
pub fn evaluate_cases(engine: &SolutionEngine, cases: &[EvalCase]) -> Result<EvalSummary> {
    let mut outcomes = Vec::with_capacity(cases.len());
    let mut passed = 0usize;
    let mut total_latency_ms = 0.0f64;

    for case in cases {
        let report = BugReport::new(&case.case_id, &case.description);
        let started = Instant::now();
        let outcome = engine
            .analyze(&report)
            .with_context(|| format!("eval case {} failed to run", case.case_id))?;
        let latency_ms = started.elapsed().as_secs_f64() * 1000.0;
        total_latency_ms += latency_ms;

        let decision_ok = outcome.decision == case.expected_decision;
        let title_ok = match &case.expected_title {
            Some(expected) => outcome.best_title.as_deref() == Some(expected.as_str()),
            None => true,
        };
        let confidence_ok = match case.min_confidence {
            Some(min) => outcome.confidence >= min,
            None => true,
        };
        let case_passed = decision_ok && title_ok && confidence_ok;
        if case_passed {
            passed += 1;
        } else {
            tracing::debug!(
                case_id = %case.case_id,
                expected = ?case.expected_decision,
                actual = ?outcome.decision,
                confidence = outcome.confidence,
                "eval case failed"
            );
        }

        outcomes.push(EvalOutcome {
            case_id: case.case_id.clone(),
            expected_decision: case.expected_decision,
            actual_decision: outcome.decision,
            expected_title: case.expected_title.clone(),
            actual_title: outcome.best_title,
            similarity: outcome.similarity,
            confidence: outcome.confidence,
            passed: case_passed,
            latency_ms,
        });
    }

    let total = cases.len();
    let failed = total - passed;
    let pass_rate = if total == 0 {
        0.0
    } else {
        passed as f32 / total as f32
    };
    let mean_latency_ms = if total == 0 {
        0.0
    } else {
        total_latency_ms / total as f64
    };

    Ok(EvalSummary {
        total,
        passed,
        failed,
        pass_rate,
        mean_latency_ms,
        outcomes,
    })
}
