//! Text-generation port.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Boxed future type alias used by [`TextGenerator`] to keep the trait dyn-compatible.
pub type GenerationFuture<'a> =
    Pin<Box<dyn Future<Output = Result<GenerationResponse, GenerationError>> + Send + 'a>>;

/// A request for one generated text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// The model identifier (e.g. `"claude-sonnet-4-20250514"`).
    pub model: String,
    /// Pipeline stage that issued the request (e.g. `"plan"`, `"generate:src/main.ts"`).
    ///
    /// Used for logging and for matching interactions during replay.
    pub label: String,
    /// System instruction.
    pub system: String,
    /// User instruction.
    pub prompt: String,
    /// Maximum number of tokens to generate.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
}

/// The response from a text-generation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResponse {
    /// The generated text.
    pub text: String,
    /// Number of prompt tokens consumed.
    pub prompt_tokens: u32,
    /// Number of completion tokens generated.
    pub completion_tokens: u32,
}

impl GenerationResponse {
    /// Wraps plain text with zero token accounting.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: text.into(), prompt_tokens: 0, completion_tokens: 0 }
    }
}

/// Failures of the text-generation service.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum GenerationError {
    /// The service could not be reached or answered with a retryable error.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
    /// The call did not complete in time.
    #[error("timed out after {}s", .0.as_secs())]
    Timeout(Duration),
    /// The service refused the request (auth, bad request, quota exhausted for good).
    #[error("request rejected: {0}")]
    Rejected(String),
    /// The service answered with nothing usable.
    #[error("empty response")]
    EmptyResponse,
}

impl GenerationError {
    /// Whether retrying the same request may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::ServiceUnavailable(_) | Self::Timeout(_))
    }
}

/// Generates text from a system and user instruction.
pub trait TextGenerator: Send + Sync {
    /// Generates text for the given request.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails (network, auth, rate-limit, etc.).
    fn generate(&self, request: &GenerationRequest) -> GenerationFuture<'_>;
}
