// src/cli/list.rs — `koibench problems` and `koibench judges`

use crate::evaluator::judge::JudgePersona;
use crate::problems::Registry;

pub fn format_problems(registry: &Registry) -> String {
    let mut out = String::new();
    for p in registry.all() {
        out.push_str(&format!("{:<20} {}\n", p.id, p.name));
    }
    out
}

pub fn format_judges(judges: &[JudgePersona], enabled: bool) -> String {
    let mut out = format!(
        "council: {}\n",
        if enabled { "enabled" } else { "disabled (use --council)" }
    );
    for j in judges {
        out.push_str(&format!("  {:<24} {}\n", j.name, j.model));
    }
    out
}
