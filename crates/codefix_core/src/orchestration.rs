use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::eval::EvalSummary;

/// Pass rate an evaluation run must reach to be considered healthy.
pub const DEFAULT_REQUIRED_PASS_RATE: f32 = 0.85;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    LoadingModel,
    Evaluating,
    Completed,
    Failed,
}

/// Audit record of one evaluation run, from model load through grading.
/// Transitions only move forward; a call that does not fit the current
/// status is ignored.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationRun {
    pub run_id: String,
    pub dataset: String,
    pub threshold: f32,
    pub required_pass_rate: f32,
    pub status: RunStatus,
    pub requested_at: DateTime<Utc>,
    pub model_ready_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub total_cases: usize,
    pub passed_cases: usize,
    pub failed_cases: usize,
    pub pass_rate: Option<f32>,
    pub error: Option<String>,
}

impl EvaluationRun {
    pub fn start(
        run_id: impl Into<String>,
        dataset: impl Into<String>,
        threshold: f32,
        required_pass_rate: f32,
    ) -> Self {
        Self {
            run_id: run_id.into(),
            dataset: dataset.into(),
            threshold,
            required_pass_rate,
            status: RunStatus::LoadingModel,
            requested_at: Utc::now(),
            model_ready_at: None,
            completed_at: None,
            total_cases: 0,
            passed_cases: 0,
            failed_cases: 0,
            pass_rate: None,
            error: None,
        }
    }

    pub fn on_model_ready(&mut self) {
        if self.status != RunStatus::LoadingModel {
            return;
        }
        self.status = RunStatus::Evaluating;
        self.model_ready_at = Some(Utc::now());
    }

    /// Abort the run. Valid while loading or evaluating; a finished run
    /// keeps its result.
    pub fn on_model_failed(&mut self, message: impl Into<String>) {
        if !matches!(self.status, RunStatus::LoadingModel | RunStatus::Evaluating) {
            return;
        }
        self.status = RunStatus::Failed;
        self.error = Some(message.into());
        self.completed_at = Some(Utc::now());
    }

    pub fn on_completed(&mut self, summary: &EvalSummary) {
        if self.status != RunStatus::Evaluating {
            return;
        }
        self.status = RunStatus::Completed;
        self.total_cases = summary.total;
        self.passed_cases = summary.passed;
        self.failed_cases = summary.failed;
        self.pass_rate = Some(summary.pass_rate);
        self.completed_at = Some(Utc::now());
    }

    pub fn meets_required_rate(&self) -> bool {
        match (self.status, self.pass_rate) {
            (RunStatus::Completed, Some(rate)) => rate >= self.required_pass_rate,
            _ => false,
        }
    }
}
