// src/evaluator/judge.rs — Judge personas and single-judge calls

use minijinja::{context, Environment};
use serde::{Deserialize, Serialize};

use super::parser::{parse_verdict, JudgeVerdict};
use crate::infra::errors::BenchError;
use crate::provider::{ChatRequest, Message, ModelProvider, TokenUsage};

/// A reviewer: who it is, which model backs it, and how it grades.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgePersona {
    pub name: String,
    pub model: String,
    /// System prompt describing what this judge cares about.
    pub rubric: String,
}

impl JudgePersona {
    pub fn new(
        name: impl Into<String>,
        model: impl Into<String>,
        rubric: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
            rubric: rubric.into(),
        }
    }
}

const REPLY_FORMAT: &str = "Reply with exactly these lines:\n\
SCORE: <0-10>\n\
CORRECT: <yes|no>\n\
SAFE: <yes|no>\n\
IDIOMATIC: <0-10>\n\
RATIONALE: <one or two sentences>";

pub fn default_judges() -> Vec<JudgePersona> {
    vec![
        JudgePersona::new(
            "Correctness Auditor",
            "anthropic/claude-sonnet-4",
            format!(
                "You review solutions for correctness. Hunt for edge cases the tests \
                 might miss: empty input, overflow, off-by-one, error paths.\n\n{REPLY_FORMAT}"
            ),
        ),
        JudgePersona::new(
            "Safety Reviewer",
            "openai/gpt-4.1",
            format!(
                "You review solutions for memory and resource safety. Look for leaks, \
                 use-after-free, unchecked casts, and ignored errors.\n\n{REPLY_FORMAT}"
            ),
        ),
        JudgePersona::new(
            "Style Maintainer",
            "google/gemini-2.5-pro",
            format!(
                "You maintain a large codebase in this language. Grade how idiomatic \
                 and readable the solution is compared with the standard library.\n\n{REPLY_FORMAT}"
            ),
        ),
    ]
}

const JUDGE_TEMPLATE: &str = r#"## Problem
{{ problem }}

## Passing solution
```{{ language }}
{{ code }}
```

The solution already passes the test suite. Judge it on its merits."#;

pub fn render_judge_prompt(problem: &str, code: &str, language: &str) -> Result<String, BenchError> {
    let env = Environment::new();
    let rendered = env.render_str(
        JUDGE_TEMPLATE,
        context! { problem => problem, code => code, language => language },
    )?;
    Ok(rendered)
}

/// Ask one judge for its verdict. The conversation is single-turn and
/// shares nothing with other judges.
pub async fn ask_judge(
    provider: &dyn ModelProvider,
    persona: &JudgePersona,
    prompt: &str,
) -> Result<(JudgeVerdict, TokenUsage), BenchError> {
    let response = provider
        .chat(ChatRequest {
            model: persona.model.clone(),
            messages: vec![Message::system(&persona.rubric), Message::user(prompt)],
            max_tokens: Some(1000),
            temperature: Some(0.1),
        })
        .await?;

    Ok((parse_verdict(&persona.name, &response.content), response.usage))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_judges_distinct() {
        let judges = default_judges();
        assert_eq!(judges.len(), 3);
        assert!(judges.iter().all(|j| j.rubric.contains("SCORE:")));
        let mut names: Vec<_> = judges.iter().map(|j| j.name.as_str()).collect();
        names.dedup();
        assert_eq!(names.len(), 3);
    }

    #[test]
    fn test_render_embeds_problem_and_code() {
        let prompt = render_judge_prompt("Sum two ints.", "pub fn add() {}", "zig").unwrap();
        assert!(prompt.contains("## Problem\nSum two ints."));
        assert!(prompt.contains("```zig\npub fn add() {}\n```"));
    }

    #[test]
    fn test_render_does_not_escape_code() {
        let prompt = render_judge_prompt("p", "if (a < b and c > d) {}", "zig").unwrap();
        assert!(prompt.contains("a < b and c > d"));
    }
}
