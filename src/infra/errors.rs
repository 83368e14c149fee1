// src/infra/errors.rs — Error types for koibench

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BenchError {
    // Gateway transport errors
    #[error("Gateway '{provider}' rejected credentials (HTTP {status})")]
    Unauthorized { provider: String, status: u16 },

    #[error("Rate limited by '{provider}', retry after {retry_after_ms}ms")]
    RateLimited {
        provider: String,
        retry_after_ms: u64,
    },

    #[error("Gateway '{provider}' server error (HTTP {status}): {message}")]
    Server {
        provider: String,
        status: u16,
        message: String,
    },

    #[error("Gateway '{provider}' transport error: {message}")]
    Transport {
        provider: String,
        message: String,
        retriable: bool,
    },

    // Gateway response format errors
    #[error("Malformed response from '{provider}': {message}")]
    MalformedResponse { provider: String, message: String },

    #[error("Empty response from '{provider}' for model '{model}'")]
    EmptyResponse { provider: String, model: String },

    // Sandbox
    #[error("Toolchain '{command}' could not be started: {message}")]
    Toolchain { command: String, message: String },

    // User errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown problem '{id}'")]
    UnknownProblem { id: String },

    // Infra
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Template error: {0}")]
    Template(#[from] minijinja::Error),
}

impl BenchError {
    /// Transient gateway failures worth a backoff-and-resend.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            BenchError::RateLimited { .. }
                | BenchError::Server { .. }
                | BenchError::Transport {
                    retriable: true,
                    ..
                }
        )
    }

    /// Failures that consume one attempt of the feedback loop and nothing more.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            BenchError::Unauthorized { .. }
                | BenchError::RateLimited { .. }
                | BenchError::Server { .. }
                | BenchError::Transport { .. }
        )
    }

    /// The gateway answered, but with nothing usable.
    pub fn is_response_format(&self) -> bool {
        matches!(
            self,
            BenchError::MalformedResponse { .. } | BenchError::EmptyResponse { .. }
        )
    }
}
