// src/provider/openai_compat.rs — OpenAI-compatible chat completions gateway
//
// Default target is OpenRouter, which fronts every benchmarked vendor behind
// one `/chat/completions` endpoint. Any compatible base URL works.

use async_trait::async_trait;
use std::time::{Duration, Instant};

use super::{ChatRequest, ChatResponse, ModelProvider, TokenUsage};
use crate::infra::errors::BenchError;

/// Per-request ceiling so a stalled connection surfaces as a transport error.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(600);

/// Provider for any OpenAI-compatible API endpoint (OpenRouter, vLLM, LiteLLM, ...)
pub struct OpenAICompatProvider {
    id_str: String,
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl OpenAICompatProvider {
    pub fn new(id: impl Into<String>, api_key: String, base_url: String) -> Self {
        Self {
            id_str: id.into(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn request_body(request: &ChatRequest) -> serde_json::Value {
        let messages: Vec<serde_json::Value> = request
            .messages
            .iter()
            .map(|m| {
                serde_json::json!({
                    "role": m.role.as_str(),
                    "content": m.content,
                })
            })
            .collect();

        let mut body = serde_json::json!({
            "model": request.model,
            "messages": messages,
        });
        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }
        if let Some(temp) = request.temperature {
            body["temperature"] = serde_json::json!(temp);
        }
        body
    }
}

/// Map a non-success HTTP status onto the gateway failure taxonomy.
pub(crate) fn classify_status(
    provider: &str,
    status: u16,
    body: String,
    retry_after_secs: Option<u64>,
) -> BenchError {
    match status {
        401 | 403 => BenchError::Unauthorized {
            provider: provider.to_string(),
            status,
        },
        429 => BenchError::RateLimited {
            provider: provider.to_string(),
            retry_after_ms: retry_after_secs.unwrap_or(0) * 1000,
        },
        500..=599 => BenchError::Server {
            provider: provider.to_string(),
            status,
            message: body,
        },
        _ => BenchError::Transport {
            provider: provider.to_string(),
            message: format!("HTTP {status}: {body}"),
            retriable: false,
        },
    }
}

/// Decode a `/chat/completions` body into a `ChatResponse`.
pub(crate) fn parse_chat_body(
    provider: &str,
    requested_model: &str,
    body: &str,
    latency: Duration,
) -> Result<ChatResponse, BenchError> {
    let resp: serde_json::Value =
        serde_json::from_str(body).map_err(|e| BenchError::MalformedResponse {
            provider: provider.to_string(),
            message: e.to_string(),
        })?;

    // OpenRouter reports upstream failures with HTTP 200 and an `error` object.
    if let Some(err) = resp.get("error") {
        let message = err["message"].as_str().unwrap_or("unknown error").to_string();
        let code = err["code"].as_u64().unwrap_or(0) as u16;
        return Err(classify_status(provider, code, message, None));
    }

    let choice = resp["choices"]
        .get(0)
        .ok_or_else(|| BenchError::MalformedResponse {
            provider: provider.to_string(),
            message: "response has no choices".into(),
        })?;

    let content = choice["message"]["content"]
        .as_str()
        .unwrap_or("")
        .to_string();
    if content.trim().is_empty() {
        return Err(BenchError::EmptyResponse {
            provider: provider.to_string(),
            model: requested_model.to_string(),
        });
    }

    let prompt = resp["usage"]["prompt_tokens"].as_u64().unwrap_or(0);
    let completion = resp["usage"]["completion_tokens"].as_u64().unwrap_or(0);
    let total = resp["usage"]["total_tokens"]
        .as_u64()
        .unwrap_or(prompt + completion);

    Ok(ChatResponse {
        content,
        usage: TokenUsage {
            prompt_tokens: prompt,
            completion_tokens: completion,
            total_tokens: total,
        },
        model: resp["model"]
            .as_str()
            .unwrap_or(requested_model)
            .to_string(),
        latency,
    })
}

#[async_trait]
impl ModelProvider for OpenAICompatProvider {
    fn id(&self) -> &str {
        &self.id_str
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, BenchError> {
        let body = Self::request_body(&request);
        let start = Instant::now();

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header(
                "User-Agent",
                format!("koibench/{}", env!("CARGO_PKG_VERSION")),
            )
            .timeout(REQUEST_TIMEOUT)
            .json(&body)
            .send()
            .await
            .map_err(|e| BenchError::Transport {
                provider: self.id_str.clone(),
                message: e.to_string(),
                retriable: e.is_timeout() || e.is_connect(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());
            let error_body = response.text().await.unwrap_or_default();
            return Err(classify_status(
                &self.id_str,
                status.as_u16(),
                error_body,
                retry_after,
            ));
        }

        let text = response.text().await.map_err(|e| BenchError::Transport {
            provider: self.id_str.clone(),
            message: format!("reading body: {e}"),
            retriable: false,
        })?;
        let latency = start.elapsed();

        tracing::debug!(
            provider = %self.id_str,
            model = %request.model,
            latency_ms = latency.as_millis() as u64,
            "chat completion received"
        );

        parse_chat_body(&self.id_str, &request.model, &text, latency)
    }
}
