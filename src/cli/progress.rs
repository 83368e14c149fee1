// src/cli/progress.rs — Terminal progress renderer for benchmark events

use std::sync::Arc;

use crate::core::types::{BenchEvent, ProgressFn};

/// One line per event. `None` for events that are not worth a line.
pub fn format_event(event: &BenchEvent) -> Option<String> {
    let line = match event {
        BenchEvent::ModelStart { model, problems } => {
            format!("[{model}] starting, {problems} problem(s)")
        }
        // Announced by the matching AttemptEnd.
        BenchEvent::AttemptStart { .. } => return None,
        BenchEvent::AttemptEnd {
            model,
            problem,
            attempt,
            status,
            latency,
        } => format!(
            "[{model}] {problem} attempt {} -> {status} ({:.1}s)",
            attempt + 1,
            latency.as_secs_f64(),
        ),
        BenchEvent::ProblemDone {
            model,
            problem,
            outcome,
            retries_used,
            cost,
        } => format!(
            "[{model}] {problem}: {outcome} after {retries_used} retr{} (${cost:.4})",
            if *retries_used == 1 { "y" } else { "ies" },
        ),
        BenchEvent::ModelDone {
            model,
            passed,
            total,
            cost,
        } => format!("[{model}] done {passed}/{total} passed (${cost:.4})"),
        BenchEvent::Consensus {
            model,
            problem,
            average: Some(avg),
            judges,
        } => format!("[council] {model} {problem}: {avg:.2} from {judges} judge(s)"),
        BenchEvent::Consensus {
            model,
            problem,
            average: None,
            ..
        } => format!("[council] {model} {problem}: no verdicts"),
    };
    Some(line)
}

/// Build a progress callback that writes formatted output to stderr.
///
/// All progress output goes to stderr so stdout remains clean for the report.
/// Returns a callback suitable for `Orchestrator::with_progress()`.
pub fn terminal_progress() -> ProgressFn {
    Arc::new(|event| {
        if let Some(line) = format_event(&event) {
            eprintln!("{line}");
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{AttemptStatus, OutcomeKind};
    use std::time::Duration;

    #[test]
    fn test_attempt_start_is_silent() {
        let event = BenchEvent::AttemptStart {
            model: "m".into(),
            problem: "p".into(),
            run: 0,
            attempt: 0,
            max_attempts: 3,
        };
        assert_eq!(format_event(&event), None);
    }

    #[test]
    fn test_attempt_end_format() {
        let line = format_event(&BenchEvent::AttemptEnd {
            model: "openai/gpt-4.1".into(),
            problem: "gcd".into(),
            attempt: 1,
            status: AttemptStatus::Executed(OutcomeKind::CompileError),
            latency: Duration::from_millis(2500),
        })
        .unwrap();
        assert_eq!(line, "[openai/gpt-4.1] gcd attempt 2 -> compile_error (2.5s)");
    }

    #[test]
    fn test_attempt_without_code() {
        let line = format_event(&BenchEvent::AttemptEnd {
            model: "m".into(),
            problem: "p".into(),
            attempt: 0,
            status: AttemptStatus::NoCode,
            latency: Duration::ZERO,
        })
        .unwrap();
        assert!(line.contains("no code"));
    }

    #[test]
    fn test_dispatch_failure_not_reported_as_missing_code() {
        let line = format_event(&BenchEvent::AttemptEnd {
            model: "m".into(),
            problem: "p".into(),
            attempt: 2,
            status: AttemptStatus::DispatchFailed,
            latency: Duration::from_millis(100),
        })
        .unwrap();
        assert_eq!(line, "[m] p attempt 3 -> dispatch failed (0.1s)");
        assert!(!line.contains("no code"));
    }

    #[test]
    fn test_problem_done_format() {
        let line = format_event(&BenchEvent::ProblemDone {
            model: "m".into(),
            problem: "fizzbuzz".into(),
            outcome: OutcomeKind::Pass,
            retries_used: 1,
            cost: 0.0105,
        })
        .unwrap();
        assert_eq!(line, "[m] fizzbuzz: pass after 1 retry ($0.0105)");
    }

    #[test]
    fn test_model_done_and_consensus() {
        let done = format_event(&BenchEvent::ModelDone {
            model: "m".into(),
            passed: 3,
            total: 5,
            cost: 0.2,
        })
        .unwrap();
        assert_eq!(done, "[m] done 3/5 passed ($0.2000)");

        let council = format_event(&BenchEvent::Consensus {
            model: "m".into(),
            problem: "gcd".into(),
            average: Some(7.0),
            judges: 2,
        })
        .unwrap();
        assert_eq!(council, "[council] m gcd: 7.00 from 2 judge(s)");

        let none = format_event(&BenchEvent::Consensus {
            model: "m".into(),
            problem: "gcd".into(),
            average: None,
            judges: 0,
        })
        .unwrap();
        assert!(none.ends_with("no verdicts"));
    }
}
