// src/infra/config.rs — Configuration loading (TOML)

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::evaluator::judge::{default_judges, JudgePersona};
use crate::infra::errors::BenchError;
use crate::infra::paths;
use crate::util::sanitize_component;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub bench: BenchConfig,

    #[serde(default)]
    pub sandbox: SandboxConfig,

    #[serde(default)]
    pub gateway: GatewayConfig,

    #[serde(default)]
    pub council: CouncilConfig,

    /// Per-model rate overrides in dollars per million tokens.
    #[serde(default)]
    pub pricing: HashMap<String, PriceEntry>,
}

/// What to do when a reply carries no fenced code block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingCodePolicy {
    /// Spend an attempt, remind the model of the format, and dispatch again.
    #[default]
    Retry,
    /// End the run immediately.
    Abort,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchConfig {
    pub models: Vec<String>,
    /// Problem ids to run; empty means the whole registry.
    #[serde(default)]
    pub problems: Vec<String>,
    /// Load problems from this directory instead of the built-in set.
    #[serde(default)]
    pub problems_dir: Option<String>,
    pub runs: u32,
    pub max_retries: u32,
    pub parallel: usize,
    /// Info-string tag of the fenced block to extract.
    pub language: String,
    #[serde(default)]
    pub on_missing_code: MissingCodePolicy,
    pub output_dir: String,
    pub system_prompt: String,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            models: vec![
                "anthropic/claude-sonnet-4".into(),
                "openai/gpt-4.1".into(),
                "google/gemini-2.5-pro".into(),
            ],
            problems: Vec::new(),
            problems_dir: None,
            runs: 1,
            max_retries: 3,
            parallel: 4,
            language: "zig".into(),
            on_missing_code: MissingCodePolicy::Retry,
            output_dir: paths::default_output_dir().to_string_lossy().into_owned(),
            system_prompt: "You are an expert Zig programmer. Reply with exactly one \
                            ```zig fenced code block containing the complete solution file."
                .into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    /// Toolchain argv; `{harness}` is replaced with the harness path.
    pub command: Vec<String>,
    /// Where the raw candidate is written.
    pub candidate_file: String,
    /// Canonical name the harness imports.
    pub solution_file: String,
    /// Marker that distinguishes a compile failure from a test failure.
    pub error_marker: String,
    /// Upper bound on one toolchain invocation; 0 disables the deadline.
    pub timeout_secs: u64,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            command: vec!["zig".into(), "test".into(), "{harness}".into()],
            candidate_file: "candidate.zig".into(),
            solution_file: "solution.zig".into(),
            error_marker: "error:".into(),
            timeout_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub base_url: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Backoff retries for rate limits and 5xx, per dispatch.
    pub max_retries: u32,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: "https://openrouter.ai/api/v1".into(),
            api_key_env: "OPENROUTER_API_KEY".into(),
            max_retries: 2,
            temperature: None,
            max_tokens: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CouncilConfig {
    pub enabled: bool,
    #[serde(default = "default_judges")]
    pub judges: Vec<JudgePersona>,
}

impl Default for CouncilConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            judges: default_judges(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceEntry {
    pub input: f64,
    pub output: f64,
}

impl Config {
    /// Load config from file, falling back to defaults.
    pub fn load() -> anyhow::Result<Self> {
        let path = paths::config_file_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Reject settings that would make a run meaningless. Called before any dispatch.
    pub fn validate(&self) -> Result<(), BenchError> {
        if self.bench.models.is_empty() {
            return Err(BenchError::Config("no models to benchmark".into()));
        }
        if self.bench.models.iter().any(|m| m.trim().is_empty()) {
            return Err(BenchError::Config("empty model identifier".into()));
        }
        // Each model owns `<output_dir>/<sanitized id>/`; two ids must never share it.
        let mut workspaces: HashMap<String, &str> = HashMap::new();
        for model in &self.bench.models {
            if let Some(other) = workspaces.insert(sanitize_component(model), model.as_str()) {
                return Err(BenchError::Config(if other == model.as_str() {
                    format!("model '{model}' is listed twice")
                } else {
                    format!("models '{other}' and '{model}' would share a workspace directory")
                }));
            }
        }
        if self.bench.max_retries == 0 {
            return Err(BenchError::Config("max_retries must be at least 1".into()));
        }
        if self.bench.runs == 0 {
            return Err(BenchError::Config("runs must be at least 1".into()));
        }
        if self.bench.parallel == 0 {
            return Err(BenchError::Config("parallel must be at least 1".into()));
        }
        if self.sandbox.command.is_empty() {
            return Err(BenchError::Config("sandbox.command is empty".into()));
        }
        if self.council.enabled && self.council.judges.is_empty() {
            return Err(BenchError::Config(
                "council is enabled but no judges are configured".into(),
            ));
        }
        Ok(())
    }

    /// Look up the gateway API key from the configured environment variable.
    pub fn api_key(&self) -> Result<String, BenchError> {
        match std::env::var(&self.gateway.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(BenchError::Config(format!(
                "{} is not set",
                self.gateway.api_key_env
            ))),
        }
    }
}
