// src/evaluator/mod.rs — Sandbox execution and the judge council

pub mod judge;
pub mod parser;
pub mod rating;
pub mod sandbox;

use std::sync::Arc;

use futures::future::join_all;
use serde::{Deserialize, Serialize};

use crate::provider::{ModelProvider, TokenUsage};
use judge::{ask_judge, render_judge_prompt, JudgePersona};
use parser::JudgeVerdict;

pub use sandbox::{Sandbox, WorkspaceKey};

/// Aggregated opinion of the judges that answered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusResult {
    pub verdicts: Vec<JudgeVerdict>,
    /// Mean score over `verdicts`.
    pub average: f64,
    pub rating: String,
    /// Tokens spent by the judges. Not charged to the model under test.
    pub usage: TokenUsage,
}

/// Panel of independent judges for passing solutions.
pub struct Council {
    provider: Arc<dyn ModelProvider>,
    judges: Vec<JudgePersona>,
    language: String,
}

impl Council {
    pub fn new(
        provider: Arc<dyn ModelProvider>,
        judges: Vec<JudgePersona>,
        language: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            judges,
            language: language.into(),
        }
    }

    pub fn judges(&self) -> &[JudgePersona] {
        &self.judges
    }

    /// Ask every judge concurrently and aggregate.
    ///
    /// Judges whose call fails are left out of the average. Returns `None`
    /// when no judge produced a verdict.
    pub async fn convene(&self, problem_prompt: &str, code: &str) -> Option<ConsensusResult> {
        let prompt = match render_judge_prompt(problem_prompt, code, &self.language) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!("could not render judge prompt: {e}");
                return None;
            }
        };

        let calls = self
            .judges
            .iter()
            .map(|persona| ask_judge(self.provider.as_ref(), persona, &prompt));
        let replies = join_all(calls).await;

        let mut verdicts = Vec::with_capacity(replies.len());
        let mut usage = TokenUsage::default();
        for (persona, reply) in self.judges.iter().zip(replies) {
            match reply {
                Ok((verdict, used)) => {
                    tracing::debug!(judge = %persona.name, score = verdict.score, "verdict");
                    usage += used;
                    verdicts.push(verdict);
                }
                Err(e) => {
                    tracing::warn!(judge = %persona.name, model = %persona.model, "judge failed: {e}");
                }
            }
        }

        let average = rating::mean(verdicts.iter().map(|v| v.score))?;
        Some(ConsensusResult {
            rating: rating::letter_rating(average).to_string(),
            verdicts,
            average,
            usage,
        })
    }
}

/// Letter for a model: the grade of the mean of its consensus averages.
pub fn model_rating(consensus: &[&ConsensusResult]) -> Option<String> {
    rating::mean(consensus.iter().map(|c| c.average))
        .map(|avg| rating::letter_rating(avg).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::errors::BenchError;
    use crate::provider::{ChatRequest, ChatResponse};
    use async_trait::async_trait;
    use std::time::Duration;

    /// Replies per judge model; models without a scripted reply fail.
    struct ScriptedJudges {
        replies: Vec<(&'static str, &'static str)>,
    }

    #[async_trait]
    impl ModelProvider for ScriptedJudges {
        fn id(&self) -> &str {
            "scripted"
        }

        async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, BenchError> {
            match self.replies.iter().find(|(m, _)| *m == request.model) {
                Some((_, reply)) => Ok(ChatResponse {
                    content: reply.to_string(),
                    usage: TokenUsage::new(100, 20),
                    model: request.model,
                    latency: Duration::from_millis(5),
                }),
                None => Err(BenchError::Server {
                    provider: "scripted".into(),
                    status: 503,
                    message: "unavailable".into(),
                }),
            }
        }
    }

    fn panel(models: &[&str]) -> Vec<JudgePersona> {
        models
            .iter()
            .map(|m| JudgePersona::new(format!("judge-{m}"), *m, "rubric"))
            .collect()
    }

    #[tokio::test]
    async fn test_failed_judge_excluded_from_average() {
        let provider = Arc::new(ScriptedJudges {
            replies: vec![("a", "SCORE: 8\nCORRECT: yes"), ("b", "SCORE: 6")],
        });
        let council = Council::new(provider, panel(&["a", "b", "c"]), "zig");

        let result = council.convene("problem", "code").await.unwrap();
        assert_eq!(result.verdicts.len(), 2);
        assert_eq!(result.average, 7.0);
        assert_eq!(result.rating, "B");
        assert_eq!(result.usage, TokenUsage::new(200, 40));
    }

    #[tokio::test]
    async fn test_all_judges_fail_is_none() {
        let provider = Arc::new(ScriptedJudges { replies: vec![] });
        let council = Council::new(provider, panel(&["a", "b"]), "zig");
        assert!(council.convene("problem", "code").await.is_none());
    }

    #[tokio::test]
    async fn test_unparsable_reply_still_counts() {
        let provider = Arc::new(ScriptedJudges {
            replies: vec![("a", "looks fine to me")],
        });
        let council = Council::new(provider, panel(&["a"]), "zig");
        let result = council.convene("problem", "code").await.unwrap();
        assert_eq!(result.average, parser::DEFAULT_SCORE);
        assert_eq!(result.rating, "D");
    }

    #[test]
    fn test_model_rating_mean_of_averages() {
        let c = |avg: f64| ConsensusResult {
            verdicts: vec![],
            average: avg,
            rating: rating::letter_rating(avg).into(),
            usage: TokenUsage::default(),
        };
        let (a, b) = (c(9.5), c(8.5));
        assert_eq!(model_rating(&[&a, &b]).as_deref(), Some("S"));
        assert_eq!(model_rating(&[]), None);
    }
}
