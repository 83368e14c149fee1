// src/core/feedback.rs — Retry-feedback loop for one (model, problem) pair
//
// Dispatch → Extract → Execute → Evaluate, repeated until a pass or until the
// attempt budget runs out. Failures are fed back as diagnostics in the same
// conversation.

use std::sync::Arc;
use std::time::{Duration, Instant};

use super::cost::RateTable;
use super::extractor::extract;
use super::types::*;
use crate::evaluator::{Sandbox, WorkspaceKey};
use crate::infra::config::{Config, MissingCodePolicy};
use crate::infra::errors::BenchError;
use crate::provider::{ChatRequest, Message, ModelProvider, TokenUsage};
use crate::util::truncate_str;

/// Upper bound on the diagnostic excerpt sent back to the model.
pub const FEEDBACK_BYTE_CAP: usize = 2000;

/// Knobs for the loop, lifted out of `Config`.
#[derive(Debug, Clone)]
pub struct LoopSettings {
    /// Dispatches per run. At least 1.
    pub max_retries: u32,
    /// Independent repeats per problem. At least 1.
    pub runs: u32,
    pub language: String,
    pub system_prompt: String,
    pub on_missing_code: MissingCodePolicy,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl LoopSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_retries: config.bench.max_retries,
            runs: config.bench.runs,
            language: config.bench.language.clone(),
            system_prompt: config.bench.system_prompt.clone(),
            on_missing_code: config.bench.on_missing_code,
            temperature: config.gateway.temperature,
            max_tokens: config.gateway.max_tokens,
        }
    }
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// An attempt whose code reached the sandbox.
#[derive(Debug, Clone)]
struct Observation {
    kind: OutcomeKind,
    diagnostics: String,
    code: String,
}

/// What one run produced.
#[derive(Debug, Default)]
struct RunReport {
    best: Option<Observation>,
    attempts: u32,
    latency: Duration,
    usage: TokenUsage,
    /// Set when the sandbox could not run; the run stopped there.
    aborted: Option<BenchError>,
}

impl RunReport {
    /// Re-dispatches made. For a pass this is the zero-based index of the
    /// passing attempt, since a pass ends the run.
    fn retries_used(&self) -> u32 {
        self.attempts.saturating_sub(1)
    }

    fn passed(&self) -> bool {
        self.best.as_ref().is_some_and(|b| b.kind.is_pass())
    }
}

/// Keep `current` unless `candidate` is strictly less severe.
fn better(current: Option<&Observation>, candidate: &Observation) -> bool {
    match current {
        None => true,
        Some(c) => candidate.kind < c.kind,
    }
}

fn format_reminder(language: &str) -> String {
    format!(
        "Your reply did not contain a fenced code block. Answer with the complete \
         solution file in a single ```{language} block."
    )
}

fn feedback_message(kind: OutcomeKind, diagnostics: &str, language: &str) -> String {
    let excerpt = truncate_str(diagnostics.trim(), FEEDBACK_BYTE_CAP);
    format!(
        "Your solution failed ({kind}). Toolchain output:\n```\n{excerpt}\n```\n\
         Fix the problem and reply with the complete corrected file in a single \
         ```{language} block."
    )
}

/// A problem cut short by a sandbox IO or spawn failure.
#[derive(Debug)]
pub struct ProblemAborted {
    /// Everything spent before the failure. Outcome stays at the worst
    /// classification unless an earlier attempt was observed.
    pub partial: Box<ProblemResult>,
    pub error: BenchError,
}

impl std::fmt::Display for ProblemAborted {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.partial.problem_id, self.error)
    }
}

/// Drives the bounded attempt loop. Shared by every worker.
pub struct FeedbackLoop {
    provider: Arc<dyn ModelProvider>,
    sandbox: Sandbox,
    rates: RateTable,
    settings: LoopSettings,
    on_progress: Option<ProgressFn>,
}

impl FeedbackLoop {
    pub fn new(
        provider: Arc<dyn ModelProvider>,
        sandbox: Sandbox,
        rates: RateTable,
        settings: LoopSettings,
    ) -> Self {
        Self {
            provider,
            sandbox,
            rates,
            settings,
            on_progress: None,
        }
    }

    pub fn with_progress(mut self, cb: ProgressFn) -> Self {
        self.on_progress = Some(cb);
        self
    }

    fn emit(&self, event: BenchEvent) {
        if let Some(ref cb) = self.on_progress {
            cb(event);
        }
    }

    /// Evaluate `problem` on `model` across every configured run and keep the
    /// best observation. Usage, cost and latency count every dispatch.
    ///
    /// Errors only for sandbox IO or toolchain spawn failures. The error
    /// still carries the usage and cost spent up to that point.
    pub async fn run_problem(
        &self,
        model: &str,
        problem: &Problem,
    ) -> Result<ProblemResult, ProblemAborted> {
        let mut result = ProblemResult::empty(problem);
        let mut best: Option<Observation> = None;
        let mut best_retries: Option<u32> = None;
        let mut aborted = None;

        for run in 0..self.settings.runs {
            let mut report = self.run_once(model, problem, run).await;

            result.attempts += report.attempts;
            result.latency += report.latency;
            result.usage += report.usage;

            if let Some(obs) = report.best.as_ref() {
                if better(best.as_ref(), obs) {
                    best = Some(obs.clone());
                    best_retries = Some(report.retries_used());
                }
            }
            if best_retries.is_none() && run == 0 {
                // Nothing reached the sandbox yet; report the first run's effort.
                result.retries_used = report.retries_used();
            }

            if let Some(e) = report.aborted.take() {
                aborted = Some(e);
                break;
            }
            if report.passed() {
                if run + 1 < self.settings.runs {
                    tracing::debug!(model, problem = %problem.id, run, "passed, skipping remaining runs");
                }
                break;
            }
        }

        if let Some(obs) = best {
            result.outcome = obs.kind;
            result.diagnostics = truncate_str(&obs.diagnostics, FEEDBACK_BYTE_CAP).to_string();
            result.lines_of_code = lines_of_code(&obs.code);
            result.best_code = Some(obs.code);
        }
        if let Some(r) = best_retries {
            result.retries_used = r;
        }
        result.cost_usd = self.rates.cost(model, &result.usage);

        if let Some(error) = aborted {
            tracing::warn!(
                model,
                problem = %problem.id,
                attempts = result.attempts,
                cost = result.cost_usd,
                "problem aborted: {error}"
            );
            return Err(ProblemAborted {
                partial: Box::new(result),
                error,
            });
        }

        tracing::info!(
            model,
            problem = %problem.id,
            outcome = %result.outcome,
            attempts = result.attempts,
            cost = result.cost_usd,
            "problem finished"
        );
        self.emit(BenchEvent::ProblemDone {
            model: model.to_string(),
            problem: problem.id.clone(),
            outcome: result.outcome,
            retries_used: result.retries_used,
            cost: result.cost_usd,
        });

        Ok(result)
    }

    async fn run_once(
        &self,
        model: &str,
        problem: &Problem,
        run: u32,
    ) -> RunReport {
        let max_attempts = self.settings.max_retries.max(1);
        let language = self.settings.language.as_str();
        let key = WorkspaceKey::new(model, &problem.id);
        let mut conversation = Conversation::new(&self.settings.system_prompt, &problem.prompt);
        let mut report = RunReport::default();

        for attempt in 0..max_attempts {
            let remaining = attempt + 1 < max_attempts;
            report.attempts += 1;
            self.emit(BenchEvent::AttemptStart {
                model: model.to_string(),
                problem: problem.id.clone(),
                run,
                attempt,
                max_attempts,
            });

            // Dispatch
            let started = Instant::now();
            let reply = self
                .provider
                .chat(ChatRequest {
                    model: model.to_string(),
                    messages: conversation.messages().to_vec(),
                    max_tokens: self.settings.max_tokens,
                    temperature: self.settings.temperature,
                })
                .await;
            let elapsed = started.elapsed();
            report.latency += elapsed;

            let content = match reply {
                Ok(response) => {
                    report.usage += response.usage;
                    Some(response.content)
                }
                Err(e) if e.is_response_format() => {
                    tracing::warn!(model, problem = %problem.id, attempt, "unusable reply: {e}");
                    None
                }
                Err(e) => {
                    // The attempt is spent; the conversation stays as it was.
                    if e.is_transport() {
                        tracing::warn!(model, problem = %problem.id, attempt, "dispatch failed: {e}");
                    } else {
                        tracing::error!(model, problem = %problem.id, attempt, "gateway call failed: {e}");
                    }
                    self.attempt_end(model, problem, attempt, AttemptStatus::DispatchFailed, elapsed);
                    continue;
                }
            };

            // Extract
            let code = content.as_deref().and_then(|text| extract(text, language));
            let Some(code) = code else {
                self.attempt_end(model, problem, attempt, AttemptStatus::NoCode, elapsed);
                match self.settings.on_missing_code {
                    MissingCodePolicy::Abort => {
                        tracing::warn!(model, problem = %problem.id, attempt, "no code block, ending run");
                        break;
                    }
                    MissingCodePolicy::Retry => {
                        tracing::debug!(model, problem = %problem.id, attempt, "no code block, reminding");
                        if remaining {
                            if let Some(text) = content.filter(|t| !t.trim().is_empty()) {
                                conversation.push(Message::assistant(text));
                            }
                            conversation.push(Message::user(format_reminder(language)));
                        }
                        continue;
                    }
                }
            };

            // Execute
            let outcome = match self.sandbox.execute(&key, &code, &problem.harness).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    self.attempt_end(model, problem, attempt, AttemptStatus::SandboxFailed, elapsed);
                    report.aborted = Some(e);
                    break;
                }
            };
            let status = AttemptStatus::Executed(outcome.kind);
            self.attempt_end(model, problem, attempt, status, elapsed);

            // Evaluate
            let observation = Observation {
                kind: outcome.kind,
                diagnostics: outcome.diagnostics,
                code,
            };
            let passed = observation.kind.is_pass();
            let diagnostics_empty = observation.diagnostics.trim().is_empty();
            let feedback = (!passed && remaining && !diagnostics_empty)
                .then(|| feedback_message(observation.kind, &observation.diagnostics, language));
            if better(report.best.as_ref(), &observation) {
                report.best = Some(observation);
            }

            if passed {
                break;
            }
            match feedback {
                Some(message) => {
                    if let Some(text) = content {
                        conversation.push(Message::assistant(text));
                    }
                    conversation.push(Message::user(message));
                }
                None => {
                    if diagnostics_empty && remaining {
                        tracing::debug!(model, problem = %problem.id, attempt, "no diagnostics to feed back, giving up");
                    }
                    break;
                }
            }
        }

        report
    }

    fn attempt_end(
        &self,
        model: &str,
        problem: &Problem,
        attempt: u32,
        status: AttemptStatus,
        latency: Duration,
    ) {
        self.emit(BenchEvent::AttemptEnd {
            model: model.to_string(),
            problem: problem.id.clone(),
            attempt,
            status,
            latency,
        });
    }
}
