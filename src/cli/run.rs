// src/cli/run.rs — `koibench run`: wire the pipeline and print the report

use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::report::{render_json, render_table, RunMeta};
use super::RunArgs;
use crate::core::cost::RateTable;
use crate::core::feedback::{FeedbackLoop, LoopSettings};
use crate::core::orchestrator::Orchestrator;
use crate::core::types::ModelResult;
use crate::evaluator::{Council, Sandbox};
use crate::infra::config::Config;
use crate::infra::errors::BenchError;
use crate::problems::Registry;
use crate::provider::ModelProvider;

/// Fold command-line flags into the loaded config.
pub fn apply_overrides(config: &mut Config, args: &RunArgs) {
    if let Some(ref models) = args.models {
        config.bench.models = models.clone();
    }
    if let Some(ref problems) = args.problems {
        config.bench.problems = problems.clone();
    }
    if let Some(ref dir) = args.problems_dir {
        config.bench.problems_dir = Some(dir.clone());
    }
    if let Some(runs) = args.runs {
        config.bench.runs = runs;
    }
    if let Some(max_retries) = args.max_retries {
        config.bench.max_retries = max_retries;
    }
    if let Some(parallel) = args.parallel {
        config.bench.parallel = parallel;
    }
    if let Some(ref dir) = args.output_dir {
        config.bench.output_dir = dir.clone();
    }
    if args.council {
        config.council.enabled = true;
    }
}

/// Built-in problems, or the configured directory.
pub fn load_registry(problems_dir: Option<&str>) -> Result<Registry, BenchError> {
    match problems_dir {
        Some(dir) => Registry::load_dir(Path::new(dir)),
        None => Ok(Registry::builtin()),
    }
}

/// Make sure the toolchain binary can be found before spending tokens.
pub fn check_toolchain(config: &Config) -> Result<PathBuf, BenchError> {
    let program = config
        .sandbox
        .command
        .first()
        .ok_or_else(|| BenchError::Config("sandbox.command is empty".into()))?;
    which::which(program).map_err(|e| BenchError::Toolchain {
        command: program.clone(),
        message: e.to_string(),
    })
}

/// Run the benchmark described by `config` against `provider`.
pub async fn run_bench(
    config: &Config,
    provider: Arc<dyn ModelProvider>,
    quiet: bool,
) -> anyhow::Result<Vec<ModelResult>> {
    let registry = load_registry(config.bench.problems_dir.as_deref())?;
    let problems = registry.select(&config.bench.problems)?;

    let sandbox = Sandbox::new(&config.bench.output_dir, config.sandbox.clone());
    let feedback = FeedbackLoop::new(
        provider.clone(),
        sandbox,
        RateTable::with_overrides(config.pricing.clone()),
        LoopSettings::from_config(config),
    );

    let mut orchestrator =
        Orchestrator::new(feedback, config.bench.models.clone(), config.bench.parallel);
    if config.council.enabled {
        orchestrator = orchestrator.with_council(Council::new(
            provider,
            config.council.judges.clone(),
            config.bench.language.clone(),
        ));
    }
    if !quiet {
        orchestrator = orchestrator.with_progress(super::progress::terminal_progress());
        eprintln!(
            "[bench] {} model(s) x {} problem(s), {} attempt(s) per run, {} run(s)",
            config.bench.models.len(),
            problems.len(),
            config.bench.max_retries,
            config.bench.runs,
        );
    }

    Ok(orchestrator.run(problems).await)
}

/// Entry point for the `run` subcommand after config and provider are ready.
pub async fn run_command(
    config: &Config,
    provider: Arc<dyn ModelProvider>,
    args: &RunArgs,
) -> anyhow::Result<()> {
    let results = run_bench(config, provider, args.quiet).await?;

    println!("{}", render_table(&results));

    if let Some(ref path) = args.json {
        let problem_ids = results
            .first()
            .map(|r| r.problems.iter().map(|p| p.problem_id.clone()).collect())
            .unwrap_or_default();
        let meta = RunMeta::now(
            problem_ids,
            config.bench.runs,
            config.bench.max_retries,
            config.council.enabled,
        );
        std::fs::write(path, render_json(&meta, &results)?)?;
        if !args.quiet {
            eprintln!("[bench] JSON report written to {path}");
        }
    }

    Ok(())
}
