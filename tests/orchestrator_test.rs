// tests/orchestrator_test.rs — Integration test: full benchmark with a mock gateway
//
// A shell script stands in for the Zig toolchain so the tests run anywhere
// `sh` and `grep` exist.

#![cfg(unix)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use koibench::cli::report::{render_json, render_table, RunMeta};
use koibench::cli::run::run_bench;
use koibench::core::types::{BenchEvent, OutcomeKind};
use koibench::evaluator::judge::JudgePersona;
use koibench::infra::config::Config;
use koibench::infra::errors::BenchError;
use koibench::provider::*;

/// Alternates compile-error and passing code per model; judges always score 9.
struct MockGateway {
    calls: Mutex<HashMap<String, usize>>,
}

impl MockGateway {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(HashMap::new()),
        })
    }
}

#[async_trait]
impl ModelProvider for MockGateway {
    fn id(&self) -> &str {
        "mock"
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, BenchError> {
        if request.model.starts_with("judge/") {
            return Ok(ChatResponse {
                content: "SCORE: 9\nCORRECT: yes\nSAFE: yes\nIDIOMATIC: 9\nRATIONALE: clean".into(),
                usage: TokenUsage::new(50, 10),
                model: request.model,
                latency: Duration::from_millis(1),
            });
        }
        if request.model == "offline/model" {
            return Err(BenchError::Transport {
                provider: "mock".into(),
                message: "connection refused".into(),
                retriable: false,
            });
        }

        let n = {
            let mut calls = self.calls.lock().unwrap();
            let n = calls.entry(request.model.clone()).or_insert(0);
            *n += 1;
            *n
        };
        let body = if n % 2 == 1 { "COMPILE" } else { "PASS" };
        Ok(ChatResponse {
            content: format!("Sure:\n\n```zig\n// {body}\npub fn f() void {{}}\n```\n"),
            usage: TokenUsage::new(1000, 500),
            model: request.model,
            latency: Duration::from_millis(1),
        })
    }
}

fn write_problems(dir: &Path) {
    for id in ["alpha", "beta"] {
        let p = dir.join(id);
        std::fs::create_dir_all(&p).unwrap();
        std::fs::write(p.join("prompt.md"), format!("# Problem {id}\nDo {id}.")).unwrap();
        std::fs::write(p.join("test.zig"), "const s = @import(\"solution.zig\");").unwrap();
    }
}

fn config(root: &Path, models: &[&str]) -> Config {
    let problems = root.join("problems");
    write_problems(&problems);

    let mut config = Config::default();
    config.bench.models = models.iter().map(|m| m.to_string()).collect();
    config.bench.problems_dir = Some(problems.to_string_lossy().into_owned());
    config.bench.output_dir = root.join("out").to_string_lossy().into_owned();
    config.bench.max_retries = 4;
    config.sandbox.command = vec![
        "sh".into(),
        "-c".into(),
        "test -f {harness} || exit 2; \
         grep -q PASS solution.zig && exit 0; \
         echo 'solution.zig:1:1: error: expected expression'; exit 1"
            .into(),
    ];
    config.sandbox.timeout_secs = 30;
    config
}

#[tokio::test]
async fn test_compile_error_then_pass_end_to_end() {
    let tmp = tempfile::tempdir().unwrap();
    let config = config(tmp.path(), &["anthropic/claude-sonnet-4", "acme/coder"]);
    config.validate().unwrap();

    let results = run_bench(&config, MockGateway::new(), true).await.unwrap();
    assert_eq!(results.len(), 2);

    let sonnet = &results[0];
    assert_eq!(sonnet.model, "anthropic/claude-sonnet-4");
    assert_eq!(sonnet.passed, 2);
    assert!(sonnet.error.is_none());
    for p in &sonnet.problems {
        assert_eq!(p.outcome, OutcomeKind::Pass);
        assert_eq!(p.retries_used, 1);
        assert_eq!(p.attempts, 2);
        assert_eq!(p.usage, TokenUsage::new(2000, 1000));
        // (3.0, 15.0) $/Mtok
        assert!((p.cost_usd - 0.021).abs() < 1e-12);
        assert_eq!(p.lines_of_code, 2);
    }
    assert_eq!(sonnet.usage, TokenUsage::new(4000, 2000));

    // Unknown model falls back to (1.0, 2.0)
    let acme = &results[1];
    assert!((acme.total_cost_usd - 2.0 * 0.004).abs() < 1e-12);

    // Workspaces are per (model, problem) and keep the candidate file
    let ws = tmp
        .path()
        .join("out")
        .join("anthropic_claude-sonnet-4")
        .join("alpha");
    assert!(ws.join("candidate.zig").exists());
    assert!(ws.join("solution.zig").exists());
    assert!(ws.join("test.zig").exists());

    let table = render_table(&results);
    assert!(table.contains("2/2"));
}

#[tokio::test]
async fn test_transport_failures_do_not_stop_other_models() {
    let tmp = tempfile::tempdir().unwrap();
    let config = config(tmp.path(), &["offline/model", "acme/coder"]);

    let results = run_bench(&config, MockGateway::new(), true).await.unwrap();
    let offline = &results[0];
    assert_eq!(offline.passed, 0);
    assert_eq!(offline.problems.len(), 2);
    for p in &offline.problems {
        assert_eq!(p.outcome, OutcomeKind::Timeout);
        assert_eq!(p.attempts, 4);
        assert_eq!(p.usage, TokenUsage::default());
        assert_eq!(p.cost_usd, 0.0);
    }
    assert_eq!(results[1].passed, 2);
}

#[tokio::test]
async fn test_council_rates_passing_models() {
    let tmp = tempfile::tempdir().unwrap();
    let mut config = config(tmp.path(), &["acme/coder"]);
    config.council.enabled = true;
    config.council.judges = vec![
        JudgePersona::new("a", "judge/a", "strict"),
        JudgePersona::new("b", "judge/b", "lenient"),
    ];

    let results = run_bench(&config, MockGateway::new(), true).await.unwrap();
    let model = &results[0];
    assert_eq!(model.rating.as_deref(), Some("S"));
    for p in &model.problems {
        let c = p.consensus.as_ref().unwrap();
        assert_eq!(c.verdicts.len(), 2);
        assert_eq!(c.average, 9.0);
        assert_eq!(c.usage, TokenUsage::new(100, 20));
    }
    // Judge tokens are not charged to the model under test
    assert_eq!(model.usage, TokenUsage::new(4000, 2000));

    let meta = RunMeta::now(vec!["alpha".into(), "beta".into()], 1, 4, true);
    let json: serde_json::Value =
        serde_json::from_str(&render_json(&meta, &results).unwrap()).unwrap();
    assert_eq!(json["results"][0]["rating"], "S");
    assert_eq!(
        json["results"][0]["problems"][0]["consensus"]["verdicts"][0]["judge"],
        "a"
    );
}

#[tokio::test]
async fn test_progress_events_cover_lifecycle() {
    use koibench::core::cost::RateTable;
    use koibench::core::feedback::{FeedbackLoop, LoopSettings};
    use koibench::core::orchestrator::Orchestrator;
    use koibench::evaluator::Sandbox;
    use koibench::problems::Registry;

    let tmp = tempfile::tempdir().unwrap();
    let config = config(tmp.path(), &["acme/coder"]);
    let problems = Registry::load_dir(Path::new(config.bench.problems_dir.as_deref().unwrap()))
        .unwrap()
        .select(&[])
        .unwrap();

    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    let feedback = FeedbackLoop::new(
        MockGateway::new(),
        Sandbox::new(&config.bench.output_dir, config.sandbox.clone()),
        RateTable::new(),
        LoopSettings::from_config(&config),
    );
    Orchestrator::new(feedback, config.bench.models.clone(), 1)
        .with_progress(Arc::new(move |e| sink.lock().unwrap().push(e)))
        .run(problems)
        .await;

    let events = events.lock().unwrap();
    assert!(matches!(events.first(), Some(BenchEvent::ModelStart { problems: 2, .. })));
    assert!(matches!(
        events.last(),
        Some(BenchEvent::ModelDone {
            passed: 2,
            total: 2,
            ..
        })
    ));
    let done = events
        .iter()
        .filter(|e| matches!(e, BenchEvent::ProblemDone { .. }))
        .count();
    assert_eq!(done, 2);
}

#[tokio::test]
async fn test_unknown_problem_is_config_error() {
    let tmp = tempfile::tempdir().unwrap();
    let mut config = config(tmp.path(), &["acme/coder"]);
    config.bench.problems = vec!["gamma".into()];

    let err = run_bench(&config, MockGateway::new(), true)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("gamma"));
}
