// src/core/orchestrator.rs — Benchmark driver
//
// Fans model jobs out to a bounded pool of workers, collects one
// ModelResult per model, then runs the council over passing solutions.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use super::feedback::FeedbackLoop;
use super::types::*;
use crate::evaluator::{model_rating, ConsensusResult, Council};

/// One unit of work: every problem, sequentially, for a single model.
#[derive(Debug, Clone)]
struct ModelJob {
    index: usize,
    model: String,
}

pub struct Orchestrator {
    feedback: FeedbackLoop,
    council: Option<Council>,
    models: Vec<String>,
    parallel: usize,
    on_progress: Option<ProgressFn>,
}

impl Orchestrator {
    pub fn new(feedback: FeedbackLoop, models: Vec<String>, parallel: usize) -> Self {
        Self {
            feedback,
            council: None,
            models,
            parallel,
            on_progress: None,
        }
    }

    /// Review passing solutions with this council after the run.
    pub fn with_council(mut self, council: Council) -> Self {
        self.council = Some(council);
        self
    }

    /// Set a callback for progress events. Also handed to the feedback loop.
    pub fn with_progress(mut self, cb: ProgressFn) -> Self {
        self.feedback = self.feedback.with_progress(cb.clone());
        self.on_progress = Some(cb);
        self
    }

    /// Number of workers actually spawned.
    pub fn worker_count(&self) -> usize {
        self.parallel.max(1).min(self.models.len().max(1))
    }

    /// Run every problem for every model. Always returns one result per
    /// configured model, in configuration order.
    pub async fn run(self, problems: Vec<Problem>) -> Vec<ModelResult> {
        let workers = self.worker_count();
        let Orchestrator {
            feedback,
            council,
            models,
            on_progress,
            ..
        } = self;

        tracing::info!(
            models = models.len(),
            problems = problems.len(),
            workers,
            "starting benchmark"
        );

        let feedback = Arc::new(feedback);
        let problems = Arc::new(problems);

        let (job_tx, job_rx) = mpsc::channel::<ModelJob>(models.len().max(1));
        let (result_tx, mut result_rx) = mpsc::channel::<(usize, ModelResult)>(models.len().max(1));
        for (index, model) in models.iter().enumerate() {
            // Capacity equals the number of jobs, so this never waits.
            if job_tx
                .send(ModelJob {
                    index,
                    model: model.clone(),
                })
                .await
                .is_err()
            {
                break;
            }
        }
        drop(job_tx);

        let job_rx = Arc::new(Mutex::new(job_rx));
        let mut handles: Vec<JoinHandle<()>> = Vec::with_capacity(workers);
        for worker_id in 0..workers {
            let job_rx = job_rx.clone();
            let result_tx = result_tx.clone();
            let feedback = feedback.clone();
            let problems = problems.clone();
            let on_progress = on_progress.clone();

            handles.push(tokio::spawn(async move {
                loop {
                    let job = { job_rx.lock().await.recv().await };
                    let Some(job) = job else { break };
                    tracing::debug!(worker_id, model = %job.model, "picked up model job");
                    let result =
                        run_model(&feedback, &job.model, &problems, on_progress.as_ref()).await;
                    if result_tx.send((job.index, result)).await.is_err() {
                        break;
                    }
                }
            }));
        }
        drop(result_tx);

        let mut slots: Vec<Option<ModelResult>> = vec![None; models.len()];
        while let Some((index, result)) = result_rx.recv().await {
            if let Some(slot) = slots.get_mut(index) {
                *slot = Some(result);
            }
        }
        for handle in handles {
            if let Err(e) = handle.await {
                tracing::error!("benchmark worker failed: {e}");
            }
        }

        let mut results: Vec<ModelResult> = slots
            .into_iter()
            .zip(models.iter())
            .map(|(slot, model)| {
                slot.unwrap_or_else(|| {
                    let mut r = ModelResult::from_problems(model.clone(), Vec::new())
                        .with_total(problems.len());
                    r.error = Some("worker stopped before finishing this model".into());
                    r
                })
            })
            .collect();

        if let Some(council) = council {
            convene_council(&council, &problems, &mut results, on_progress.as_ref()).await;
        }

        results
    }
}

async fn run_model(
    feedback: &FeedbackLoop,
    model: &str,
    problems: &[Problem],
    on_progress: Option<&ProgressFn>,
) -> ModelResult {
    let emit = |event: BenchEvent| {
        if let Some(cb) = on_progress {
            cb(event);
        }
    };
    emit(BenchEvent::ModelStart {
        model: model.to_string(),
        problems: problems.len(),
    });

    let mut finished = Vec::with_capacity(problems.len());
    let mut error = None;
    for problem in problems {
        match feedback.run_problem(model, problem).await {
            Ok(result) => finished.push(result),
            Err(aborted) => {
                tracing::error!(model, "model job aborted: {aborted}");
                error = Some(aborted.to_string());
                // Keep what the gateway already billed for.
                finished.push(*aborted.partial);
                break;
            }
        }
    }

    let mut result = ModelResult::from_problems(model, finished).with_total(problems.len());
    result.error = error;
    emit(BenchEvent::ModelDone {
        model: model.to_string(),
        passed: result.passed,
        total: problems.len(),
        cost: result.total_cost_usd,
    });
    result
}

/// Judge every passing solution and attach model ratings.
async fn convene_council(
    council: &Council,
    problems: &[Problem],
    results: &mut [ModelResult],
    on_progress: Option<&ProgressFn>,
) {
    let prompts: HashMap<&str, &str> = problems
        .iter()
        .map(|p| (p.id.as_str(), p.prompt.as_str()))
        .collect();

    for model_result in results.iter_mut() {
        for problem_result in model_result.problems.iter_mut() {
            if !problem_result.passed() {
                continue;
            }
            let (Some(code), Some(prompt)) = (
                problem_result.best_code.as_deref(),
                prompts.get(problem_result.problem_id.as_str()),
            ) else {
                continue;
            };

            let consensus = council.convene(prompt, code).await;
            if let Some(cb) = on_progress {
                cb(BenchEvent::Consensus {
                    model: model_result.model.clone(),
                    problem: problem_result.problem_id.clone(),
                    average: consensus.as_ref().map(|c| c.average),
                    judges: consensus.as_ref().map_or(0, |c| c.verdicts.len()),
                });
            }
            problem_result.consensus = consensus;
        }

        let reviewed: Vec<&ConsensusResult> = model_result
            .problems
            .iter()
            .filter_map(|p| p.consensus.as_ref())
            .collect();
        model_result.rating = model_rating(&reviewed);
    }
}
