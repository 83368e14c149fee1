// src/evaluator/parser.rs — Parse judge replies into verdicts

use serde::{Deserialize, Serialize};

pub const DEFAULT_SCORE: f64 = 5.0;
pub const DEFAULT_IDIOM_SCORE: f64 = 5.0;
pub const DEFAULT_RATIONALE: &str = "Unparsable judge response";

/// One judge's structured opinion of a passing solution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgeVerdict {
    pub judge: String,
    /// Overall score, 0–10.
    pub score: f64,
    pub correct: bool,
    pub safe: bool,
    /// Idiomatic-style score, 0–10.
    pub idiom_score: f64,
    pub rationale: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Score,
    Correct,
    Safe,
    Idiomatic,
    Rationale,
}

const LABELS: [(&str, Field); 5] = [
    ("SCORE:", Field::Score),
    ("CORRECT:", Field::Correct),
    ("SAFE:", Field::Safe),
    ("IDIOMATIC:", Field::Idiomatic),
    ("RATIONALE:", Field::Rationale),
];

/// Parse a judge reply.
///
/// Expected format:
/// ```text
/// SCORE: 8.5
/// CORRECT: yes
/// SAFE: yes
/// IDIOMATIC: 7
/// RATIONALE: clear allocator handling, one redundant copy
/// ```
///
/// Every field falls back to its default on its own; a reply that matches
/// nothing still yields a verdict. The first occurrence of a label wins.
pub fn parse_verdict(judge: &str, response: &str) -> JudgeVerdict {
    let mut score = None;
    let mut correct = None;
    let mut safe = None;
    let mut idiom = None;
    let mut rationale: Option<String> = None;
    let mut in_rationale = false;

    for line in response.lines() {
        match split_label(line) {
            Some((field, rest)) => {
                in_rationale = false;
                match field {
                    Field::Score => {
                        if score.is_none() {
                            score = parse_score(rest);
                        }
                    }
                    Field::Correct => {
                        if correct.is_none() {
                            correct = parse_flag(rest);
                        }
                    }
                    Field::Safe => {
                        if safe.is_none() {
                            safe = parse_flag(rest);
                        }
                    }
                    Field::Idiomatic => {
                        if idiom.is_none() {
                            idiom = parse_score(rest);
                        }
                    }
                    Field::Rationale => {
                        if rationale.is_none() {
                            rationale = Some(rest.to_string());
                            in_rationale = true;
                        }
                    }
                }
            }
            None if in_rationale => {
                let trimmed = line.trim();
                if let (Some(text), false) = (rationale.as_mut(), trimmed.is_empty()) {
                    if !text.is_empty() {
                        text.push(' ');
                    }
                    text.push_str(trimmed);
                }
            }
            None => {}
        }
    }

    JudgeVerdict {
        judge: judge.to_string(),
        score: score.unwrap_or(DEFAULT_SCORE),
        correct: correct.unwrap_or(false),
        safe: safe.unwrap_or(false),
        idiom_score: idiom.unwrap_or(DEFAULT_IDIOM_SCORE),
        rationale: rationale
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_RATIONALE.to_string()),
    }
}

/// Match a labeled line, tolerating markdown emphasis and list markers
/// around the label (`**SCORE:** 8`, `- SAFE: yes`).
fn split_label(line: &str) -> Option<(Field, &str)> {
    let trimmed = line
        .trim()
        .trim_start_matches(|c: char| c == '*' || c == '-' || c == '#' || c.is_whitespace());

    for (label, field) in LABELS {
        let Some(head) = trimmed.get(..label.len()) else {
            continue;
        };
        if head.eq_ignore_ascii_case(label) {
            let rest = trimmed[label.len()..]
                .trim_start_matches('*')
                .trim();
            return Some((field, rest));
        }
    }
    None
}

/// `8`, `8.5`, `8.5/10`, `7 out of 10`. Clamped to 0–10.
fn parse_score(value: &str) -> Option<f64> {
    let token = value.split_whitespace().next()?;
    let token = token.split('/').next().unwrap_or(token);
    let token = token.trim_end_matches(|c: char| !c.is_ascii_digit());
    let score: f64 = token.parse().ok()?;
    score.is_finite().then(|| score.clamp(0.0, 10.0))
}

fn parse_flag(value: &str) -> Option<bool> {
    let word = value
        .split(|c: char| !c.is_ascii_alphabetic())
        .find(|w| !w.is_empty())?
        .to_ascii_lowercase();
    match word.as_str() {
        "yes" | "true" | "pass" | "y" => Some(true),
        "no" | "false" | "fail" | "n" => Some(false),
        _ => None,
    }
}
