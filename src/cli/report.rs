// src/cli/report.rs — Text table and JSON report
//
// Pure formatting over finished ModelResults.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::core::types::ModelResult;
use crate::util::truncate_str;

const MODEL_COL: usize = 36;

/// Run metadata written alongside the results.
#[derive(Debug, Clone, Serialize)]
pub struct RunMeta {
    pub generated_at: DateTime<Utc>,
    pub version: String,
    pub problems: Vec<String>,
    pub runs: u32,
    pub max_retries: u32,
    pub council: bool,
}

impl RunMeta {
    pub fn now(problems: Vec<String>, runs: u32, max_retries: u32, council: bool) -> Self {
        Self {
            generated_at: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            problems,
            runs,
            max_retries,
            council,
        }
    }
}

#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    #[serde(flatten)]
    meta: &'a RunMeta,
    results: &'a [ModelResult],
}

pub fn render_json(meta: &RunMeta, results: &[ModelResult]) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(&JsonReport { meta, results })?)
}

fn format_tokens(n: u64) -> String {
    if n >= 1_000_000 {
        format!("{:.1}M", n as f64 / 1_000_000.0)
    } else if n >= 1_000 {
        format!("{:.1}k", n as f64 / 1_000.0)
    } else {
        n.to_string()
    }
}

/// Summary table followed by one detail line per problem.
pub fn render_table(results: &[ModelResult]) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:<MODEL_COL$} {:>7} {:>10} {:>8} {:>8} {:>6}\n",
        "MODEL", "PASS", "COST", "TOKENS", "TIME", "RATING"
    ));
    out.push_str(&"-".repeat(MODEL_COL + 44));
    out.push('\n');

    for r in results {
        out.push_str(&format!(
            "{:<MODEL_COL$} {:>7} {:>10} {:>8} {:>8} {:>6}\n",
            truncate_str(&r.model, MODEL_COL),
            format!("{}/{}", r.passed, r.total),
            format!("${:.4}", r.total_cost_usd),
            format_tokens(r.usage.total_tokens),
            format!("{:.1}s", r.total_latency.as_secs_f64()),
            r.rating.as_deref().unwrap_or("-"),
        ));
    }

    for r in results {
        out.push('\n');
        out.push_str(&r.model);
        out.push('\n');
        for p in &r.problems {
            let consensus = p
                .consensus
                .as_ref()
                .map(|c| format!("  council {:.2} ({})", c.average, c.rating))
                .unwrap_or_default();
            out.push_str(&format!(
                "  {:<20} {:<14} retries={} loc={} ${:.4}{}\n",
                p.problem_id, p.outcome, p.retries_used, p.lines_of_code, p.cost_usd, consensus,
            ));
        }
        if let Some(ref err) = r.error {
            out.push_str(&format!("  aborted: {err}\n"));
        }
    }
    out
}
