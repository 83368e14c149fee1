// src/evaluator/sandbox.rs — Directory-isolated toolchain runs
//
// Materializes a candidate next to its test harness in a per-(model, problem)
// workspace, runs the configured toolchain there, and classifies the result.
// Isolation is by directory only; the toolchain runs with the caller's rights.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

use crate::core::types::{OutcomeKind, SandboxOutcome, TestHarness};
use crate::infra::config::SandboxConfig;
use crate::infra::errors::BenchError;
use crate::util::sanitize_component;

/// Placeholder in the toolchain argv that is replaced by the harness file name.
pub const HARNESS_PLACEHOLDER: &str = "{harness}";

/// Identifies the workspace owned by one (model, problem) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorkspaceKey {
    pub model: String,
    pub problem: String,
}

impl WorkspaceKey {
    pub fn new(model: impl Into<String>, problem: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            problem: problem.into(),
        }
    }

    /// `<root>/<sanitized model>/<sanitized problem>`
    pub fn dir_under(&self, root: &Path) -> PathBuf {
        root.join(sanitize_component(&self.model))
            .join(sanitize_component(&self.problem))
    }
}

/// Runs candidates through the external toolchain.
#[derive(Debug, Clone)]
pub struct Sandbox {
    root: PathBuf,
    config: SandboxConfig,
}

impl Sandbox {
    pub fn new(root: impl Into<PathBuf>, config: SandboxConfig) -> Self {
        Self {
            root: root.into(),
            config,
        }
    }

    fn deadline(&self) -> Option<Duration> {
        match self.config.timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// Create (or reuse) the workspace directory for `key`.
    pub async fn workspace(&self, key: &WorkspaceKey) -> Result<PathBuf, BenchError> {
        let dir = key.dir_under(&self.root);
        tokio::fs::create_dir_all(&dir).await?;
        Ok(dir)
    }

    /// Write the candidate and harness into the workspace, run the toolchain,
    /// and classify what happened.
    pub async fn execute(
        &self,
        key: &WorkspaceKey,
        code: &str,
        harness: &TestHarness,
    ) -> Result<SandboxOutcome, BenchError> {
        let dir = self.workspace(key).await?;

        let candidate = dir.join(&self.config.candidate_file);
        tokio::fs::write(&candidate, code).await?;

        // Copy, not rename: the candidate file stays for inspection.
        if self.config.candidate_file != self.config.solution_file {
            tokio::fs::copy(&candidate, dir.join(&self.config.solution_file)).await?;
        }

        tokio::fs::write(dir.join(&harness.file_name), &harness.source).await?;

        self.run_toolchain(&dir, &harness.file_name).await
    }

    async fn run_toolchain(
        &self,
        dir: &Path,
        harness_file: &str,
    ) -> Result<SandboxOutcome, BenchError> {
        let argv: Vec<String> = self
            .config
            .command
            .iter()
            .map(|a| a.replace(HARNESS_PLACEHOLDER, harness_file))
            .collect();
        let Some((program, args)) = argv.split_first() else {
            return Err(BenchError::Config("sandbox.command is empty".into()));
        };

        tracing::debug!(command = ?argv, dir = %dir.display(), "running toolchain");

        let child = Command::new(program)
            .args(args)
            .current_dir(dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| BenchError::Toolchain {
                command: program.clone(),
                message: e.to_string(),
            })?;

        let waited = match self.deadline() {
            Some(limit) => match tokio::time::timeout(limit, child.wait_with_output()).await {
                Ok(res) => res,
                Err(_) => {
                    // Dropping the future drops the child, which kills it.
                    tracing::warn!(
                        dir = %dir.display(),
                        timeout_secs = limit.as_secs(),
                        "toolchain exceeded deadline, killed"
                    );
                    return Ok(SandboxOutcome::new(
                        OutcomeKind::Timeout,
                        format!("toolchain did not finish within {}s", limit.as_secs()),
                    ));
                }
            },
            None => child.wait_with_output().await,
        };

        let output = match waited {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!(dir = %dir.display(), "could not reap toolchain: {e}");
                return Ok(SandboxOutcome::new(
                    OutcomeKind::Timeout,
                    format!("could not reap toolchain process: {e}"),
                ));
            }
        };

        let combined = combine_output(&output.stdout, &output.stderr);
        let kind = classify(
            output.status.success(),
            &combined,
            &self.config.error_marker,
        );

        tracing::debug!(
            dir = %dir.display(),
            exit_code = ?output.status.code(),
            outcome = %kind,
            "toolchain finished"
        );

        Ok(SandboxOutcome::new(kind, combined))
    }
}

/// Join stdout and stderr without dropping anything.
fn combine_output(stdout: &[u8], stderr: &[u8]) -> String {
    let stdout = String::from_utf8_lossy(stdout);
    let stderr = String::from_utf8_lossy(stderr);
    match (stdout.trim().is_empty(), stderr.trim().is_empty()) {
        (true, true) => String::new(),
        (false, true) => stdout.into_owned(),
        (true, false) => stderr.into_owned(),
        (false, false) => format!("{stdout}\n{stderr}"),
    }
}

/// Exit zero passes; otherwise the error marker separates compile failures
/// from test failures.
pub fn classify(success: bool, combined_output: &str, error_marker: &str) -> OutcomeKind {
    if success {
        OutcomeKind::Pass
    } else if !error_marker.is_empty() && combined_output.contains(error_marker) {
        OutcomeKind::CompileError
    } else {
        OutcomeKind::TestError
    }
}
