// src/core/cost.rs — Token accounting and dollar cost

use std::collections::HashMap;

use crate::infra::config::PriceEntry;
use crate::provider::TokenUsage;

/// Rates applied to model ids the table does not recognize ($/Mtok).
pub const DEFAULT_RATES: (f64, f64) = (1.0, 2.0);

/// Accumulate one dispatch's usage into a running total.
pub fn add_usage(existing: TokenUsage, delta: TokenUsage) -> TokenUsage {
    existing + delta
}

/// Returns (input_price_per_mtok, output_price_per_mtok) for a known model,
/// or `None`. Matches on the part after the vendor prefix so both
/// `anthropic/claude-sonnet-4` and `claude-sonnet-4` resolve.
pub fn builtin_pricing(model: &str) -> Option<(f64, f64)> {
    let name = model.rsplit('/').next().unwrap_or(model);
    let rates = match name {
        // Anthropic
        m if m.contains("claude-opus") => (15.0, 75.0),
        m if m.contains("claude-sonnet") || m.contains("claude-3.7-sonnet") => (3.0, 15.0),
        m if m.contains("claude-3.5-haiku") || m.contains("claude-haiku") => (0.8, 4.0),

        // OpenAI
        m if m.contains("gpt-4.1-nano") => (0.1, 0.4),
        m if m.contains("gpt-4.1-mini") => (0.4, 1.6),
        m if m.contains("gpt-4.1") => (2.0, 8.0),
        m if m.contains("gpt-4o-mini") => (0.15, 0.6),
        m if m.contains("gpt-4o") => (2.5, 10.0),
        m if m.contains("o3-mini") || m.contains("o4-mini") => (1.1, 4.4),
        "o3" => (2.0, 8.0),

        // Google Gemini
        m if m.contains("gemini-2.5-pro") => (1.25, 10.0),
        m if m.contains("gemini-2.5-flash") => (0.3, 2.5),
        m if m.contains("gemini-2.0-flash") => (0.1, 0.4),

        // Open weights via hosted inference
        m if m.contains("deepseek-chat") || m.contains("deepseek-v3") => (0.27, 1.1),
        m if m.contains("deepseek-r1") => (0.55, 2.19),
        m if m.contains("qwen-2.5-coder") || m.contains("qwen2.5-coder") => (0.07, 0.16),
        m if m.contains("llama-3.3-70b") => (0.13, 0.4),

        _ => return None,
    };
    Some(rates)
}

/// Static rate table with optional per-model overrides from config.
#[derive(Debug, Clone, Default)]
pub struct RateTable {
    overrides: HashMap<String, PriceEntry>,
}

impl RateTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_overrides(overrides: HashMap<String, PriceEntry>) -> Self {
        Self { overrides }
    }

    /// (input, output) rates in dollars per million tokens.
    pub fn rates(&self, model: &str) -> (f64, f64) {
        if let Some(p) = self.overrides.get(model) {
            return (p.input, p.output);
        }
        builtin_pricing(model).unwrap_or(DEFAULT_RATES)
    }

    /// Dollar cost of `usage` on `model`. Not rounded.
    pub fn cost(&self, model: &str, usage: &TokenUsage) -> f64 {
        let (input_rate, output_rate) = self.rates(model);
        usage.prompt_tokens as f64 * input_rate / 1_000_000.0
            + usage.completion_tokens as f64 * output_rate / 1_000_000.0
    }
}

/// Cost against the built-in table only.
pub fn cost(model: &str, usage: &TokenUsage) -> f64 {
    RateTable::new().cost(model, usage)
}
