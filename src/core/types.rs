// src/core/types.rs — Core domain types

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::time::Duration;

use crate::evaluator::ConsensusResult;
use crate::provider::{Message, TokenUsage};

/// A benchmark task. Static and read-only once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Problem {
    pub id: String,
    pub name: String,
    pub prompt: String,
    pub harness: TestHarness,
}

/// Test file that imports the candidate under its canonical name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestHarness {
    pub file_name: String,
    pub source: String,
}

/// Classification of one sandbox execution.
///
/// Ordering is by `severity()`, not by declaration order:
/// pass < test_error < compile_error < timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Timeout,
    CompileError,
    TestError,
    Pass,
}

impl OutcomeKind {
    /// Rank used to pick the best-so-far result. Lower is better.
    pub fn severity(self) -> u8 {
        match self {
            OutcomeKind::Pass => 0,
            OutcomeKind::TestError => 1,
            OutcomeKind::CompileError => 2,
            OutcomeKind::Timeout => 3,
        }
    }

    /// The classification a run falls back to when nothing was observed.
    pub fn worst() -> Self {
        OutcomeKind::Timeout
    }

    pub fn is_pass(self) -> bool {
        self == OutcomeKind::Pass
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OutcomeKind::Pass => "pass",
            OutcomeKind::TestError => "test_error",
            OutcomeKind::CompileError => "compile_error",
            OutcomeKind::Timeout => "timeout",
        }
    }
}

impl Ord for OutcomeKind {
    fn cmp(&self, other: &Self) -> Ordering {
        self.severity().cmp(&other.severity())
    }
}

impl PartialOrd for OutcomeKind {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl std::fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of running the toolchain once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxOutcome {
    pub kind: OutcomeKind,
    /// Combined stdout and stderr of the toolchain.
    pub diagnostics: String,
}

impl SandboxOutcome {
    pub fn new(kind: OutcomeKind, diagnostics: impl Into<String>) -> Self {
        Self {
            kind,
            diagnostics: diagnostics.into(),
        }
    }
}

/// Append-only message log for one retry loop.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new(system: &str, prompt: &str) -> Self {
        let mut messages = Vec::with_capacity(2);
        if !system.trim().is_empty() {
            messages.push(Message::system(system));
        }
        messages.push(Message::user(prompt));
        Self { messages }
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Best observation for one (model, problem) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProblemResult {
    pub problem_id: String,
    pub problem_name: String,
    pub outcome: OutcomeKind,
    /// Diagnostics excerpt from the best attempt.
    pub diagnostics: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_code: Option<String>,
    pub lines_of_code: usize,
    /// For a pass: zero-based index of the passing attempt. Otherwise the
    /// number of re-dispatches made in the best run.
    pub retries_used: u32,
    /// Dispatches across every run.
    pub attempts: u32,
    #[serde(with = "duration_ms", rename = "latency_ms")]
    pub latency: Duration,
    pub usage: TokenUsage,
    pub cost_usd: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consensus: Option<ConsensusResult>,
}

impl ProblemResult {
    /// A result with nothing observed yet.
    pub fn empty(problem: &Problem) -> Self {
        Self {
            problem_id: problem.id.clone(),
            problem_name: problem.name.clone(),
            outcome: OutcomeKind::worst(),
            diagnostics: String::new(),
            best_code: None,
            lines_of_code: 0,
            retries_used: 0,
            attempts: 0,
            latency: Duration::ZERO,
            usage: TokenUsage::default(),
            cost_usd: 0.0,
            consensus: None,
        }
    }

    pub fn passed(&self) -> bool {
        self.outcome.is_pass()
    }
}

/// Aggregate across all problems for one model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelResult {
    pub model: String,
    pub problems: Vec<ProblemResult>,
    pub passed: usize,
    /// Size of the selected problem set, finished or not.
    #[serde(default)]
    pub total: usize,
    #[serde(with = "duration_ms", rename = "total_latency_ms")]
    pub total_latency: Duration,
    pub total_cost_usd: f64,
    pub usage: TokenUsage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<String>,
    /// Set when the model's job stopped early; `problems` holds what finished.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ModelResult {
    /// Aggregate `problems`. `total` starts at `problems.len()`; see `with_total`.
    pub fn from_problems(model: impl Into<String>, problems: Vec<ProblemResult>) -> Self {
        let passed = problems.iter().filter(|p| p.passed()).count();
        let total_latency = problems.iter().map(|p| p.latency).sum();
        // fold from +0.0: an empty f64 sum is -0.0
        let total_cost_usd = problems.iter().fold(0.0, |acc, p| acc + p.cost_usd);
        let usage = problems
            .iter()
            .fold(TokenUsage::default(), |acc, p| acc + p.usage);
        Self {
            model: model.into(),
            total: problems.len(),
            problems,
            passed,
            total_latency,
            total_cost_usd,
            usage,
            rating: None,
            error: None,
        }
    }

    /// Count problems that never finished towards the total.
    pub fn with_total(mut self, total: usize) -> Self {
        self.total = total.max(self.problems.len());
        self
    }
}

/// Count non-blank lines.
pub fn lines_of_code(code: &str) -> usize {
    code.lines().filter(|l| !l.trim().is_empty()).count()
}

/// How a single attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptStatus {
    /// The candidate reached the toolchain.
    Executed(OutcomeKind),
    /// The reply held no usable code block.
    NoCode,
    /// The gateway call failed.
    DispatchFailed,
    /// The sandbox could not run the toolchain; the model's job stops here.
    SandboxFailed,
}

impl std::fmt::Display for AttemptStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttemptStatus::Executed(kind) => write!(f, "{kind}"),
            AttemptStatus::NoCode => f.write_str("no code"),
            AttemptStatus::DispatchFailed => f.write_str("dispatch failed"),
            AttemptStatus::SandboxFailed => f.write_str("sandbox failed"),
        }
    }
}

/// Progress events emitted while a benchmark runs.
#[derive(Debug, Clone)]
pub enum BenchEvent {
    ModelStart {
        model: String,
        problems: usize,
    },
    AttemptStart {
        model: String,
        problem: String,
        run: u32,
        attempt: u32,
        max_attempts: u32,
    },
    AttemptEnd {
        model: String,
        problem: String,
        attempt: u32,
        status: AttemptStatus,
        latency: Duration,
    },
    ProblemDone {
        model: String,
        problem: String,
        outcome: OutcomeKind,
        retries_used: u32,
        cost: f64,
    },
    ModelDone {
        model: String,
        passed: usize,
        total: usize,
        cost: f64,
    },
    Consensus {
        model: String,
        problem: String,
        average: Option<f64>,
        judges: usize,
    },
}

/// Shared progress callback. Called from every worker.
pub type ProgressFn = std::sync::Arc<dyn Fn(BenchEvent) + Send + Sync>;

pub(crate) mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_order_is_explicit() {
        assert!(OutcomeKind::Pass < OutcomeKind::TestError);
        assert!(OutcomeKind::TestError < OutcomeKind::CompileError);
        assert!(OutcomeKind::CompileError < OutcomeKind::Timeout);
        assert_eq!(OutcomeKind::worst(), OutcomeKind::Timeout);
    }

    #[test]
    fn test_min_picks_best() {
        let kinds = [
            OutcomeKind::Timeout,
            OutcomeKind::CompileError,
            OutcomeKind::TestError,
        ];
        assert_eq!(kinds.iter().min(), Some(&OutcomeKind::TestError));
    }

    #[test]
    fn test_outcome_serde_snake_case() {
        let json = serde_json::to_string(&OutcomeKind::CompileError).unwrap();
        assert_eq!(json, "\"compile_error\"");
        assert_eq!(OutcomeKind::TestError.to_string(), "test_error");
    }

    #[test]
    fn test_conversation_appends() {
        let mut c = Conversation::new("sys", "task");
        assert_eq!(c.len(), 2);
        c.push(Message::assistant("code"));
        c.push(Message::user("fix it"));
        assert_eq!(c.len(), 4);
        assert_eq!(c.messages()[0], Message::system("sys"));
        assert_eq!(c.messages()[3].content, "fix it");
    }

    #[test]
    fn test_conversation_without_system() {
        let c = Conversation::new("  ", "task");
        assert_eq!(c.len(), 1);
        assert!(!c.is_empty());
    }

    #[test]
    fn test_lines_of_code_skips_blank() {
        assert_eq!(lines_of_code("a\n\n  \nb\n"), 2);
        assert_eq!(lines_of_code(""), 0);
    }

    fn problem_result(outcome: OutcomeKind, cost: f64, ms: u64) -> ProblemResult {
        ProblemResult {
            outcome,
            cost_usd: cost,
            latency: Duration::from_millis(ms),
            usage: TokenUsage::new(10, 5),
            ..ProblemResult::empty(&Problem {
                id: "p".into(),
                name: "P".into(),
                prompt: String::new(),
                harness: TestHarness {
                    file_name: "test.zig".into(),
                    source: String::new(),
                },
            })
        }
    }

    #[test]
    fn test_model_result_aggregates() {
        let m = ModelResult::from_problems(
            "m",
            vec![
                problem_result(OutcomeKind::Pass, 0.01, 100),
                problem_result(OutcomeKind::CompileError, 0.02, 200),
            ],
        );
        assert_eq!(m.passed, 1);
        assert_eq!(m.total_latency, Duration::from_millis(300));
        assert!((m.total_cost_usd - 0.03).abs() < 1e-12);
        assert_eq!(m.usage, TokenUsage::new(20, 10));
        assert!(m.rating.is_none());
        assert_eq!(m.total, 2);
    }

    #[test]
    fn test_empty_model_result_costs_positive_zero() {
        let m = ModelResult::from_problems("m", Vec::new()).with_total(5);
        assert_eq!(m.total, 5);
        assert!(m.total_cost_usd.is_sign_positive());
        assert_eq!(format!("${:.4}", m.total_cost_usd), "$0.0000");
    }

    #[test]
    fn test_attempt_status_display() {
        assert_eq!(
            AttemptStatus::Executed(OutcomeKind::CompileError).to_string(),
            "compile_error"
        );
        assert_eq!(AttemptStatus::NoCode.to_string(), "no code");
        assert_eq!(AttemptStatus::DispatchFailed.to_string(), "dispatch failed");
    }

    #[test]
    fn test_problem_result_json_latency_ms() {
        let p = problem_result(OutcomeKind::Pass, 0.0, 1500);
        let v = serde_json::to_value(&p).unwrap();
        assert_eq!(v["latency_ms"], 1500);
        assert_eq!(v["outcome"], "pass");
        assert!(v.get("best_code").is_none());
    }
}
