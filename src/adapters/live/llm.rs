//! Live adapter for the `TextGenerator` port using the Anthropic messages API.

use std::env;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ports::llm::{
    GenerationError, GenerationFuture, GenerationRequest, GenerationResponse, TextGenerator,
};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Live text generator that calls the Anthropic Claude API.
///
/// Deadlines and retries are applied by the caller; this adapter only maps
/// HTTP outcomes onto [`GenerationError`].
pub struct LiveTextGenerator {
    client: Client,
}

impl LiveTextGenerator {
    /// Creates a new live text generator.
    #[must_use]
    pub fn new() -> Self {
        Self { client: Client::new() }
    }
}

impl Default for LiveTextGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Request body sent to the Anthropic messages API.
#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: Vec<AnthropicMessage<'a>>,
}

/// A single message in the Anthropic API request.
#[derive(Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

/// Top-level response from the Anthropic messages API.
#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
    usage: Usage,
}

/// A content block in the Anthropic response.
#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

/// Token usage reported by the Anthropic API.
#[derive(Deserialize)]
struct Usage {
    input_tokens: u32,
    output_tokens: u32,
}

/// Error response from the Anthropic API.
#[derive(Deserialize)]
struct AnthropicError {
    error: AnthropicErrorDetail,
}

/// Detail inside an Anthropic error response.
#[derive(Deserialize)]
struct AnthropicErrorDetail {
    message: String,
}

/// Maps a non-success status onto the error taxonomy.
///
/// Rate limits, overload (529) and server errors are retryable; every
/// other client error is final.
fn classify_status(status: StatusCode, message: String) -> GenerationError {
    let detail = format!("Anthropic API error ({}): {message}", status.as_u16());
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        GenerationError::ServiceUnavailable(detail)
    } else {
        GenerationError::Rejected(detail)
    }
}

impl TextGenerator for LiveTextGenerator {
    fn generate(&self, request: &GenerationRequest) -> GenerationFuture<'_> {
        let request = request.clone();

        Box::pin(async move {
            let api_key = env::var("ANTHROPIC_API_KEY").map_err(|_| {
                GenerationError::Rejected("ANTHROPIC_API_KEY environment variable not set".into())
            })?;

            let body = AnthropicRequest {
                model: &request.model,
                max_tokens: request.max_tokens,
                temperature: request.temperature,
                system: Some(request.system.as_str()).filter(|s| !s.is_empty()),
                messages: vec![AnthropicMessage { role: "user", content: &request.prompt }],
            };

            debug!(label = %request.label, model = %request.model, "Sending generation request");

            let response = self
                .client
                .post(ANTHROPIC_API_URL)
                .header("x-api-key", &api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .json(&body)
                .send()
                .await
                .map_err(|e| {
                    GenerationError::ServiceUnavailable(format!("Anthropic API request failed: {e}"))
                })?;

            let status = response.status();
            let response_text = response.text().await.map_err(|e| {
                GenerationError::ServiceUnavailable(format!(
                    "Failed to read Anthropic API response: {e}"
                ))
            })?;

            if !status.is_success() {
                let msg = serde_json::from_str::<AnthropicError>(&response_text)
                    .map(|e| e.error.message)
                    .unwrap_or(response_text);
                return Err(classify_status(status, msg));
            }

            let api_response: AnthropicResponse =
                serde_json::from_str(&response_text).map_err(|e| {
                    GenerationError::ServiceUnavailable(format!(
                        "Failed to parse Anthropic API response: {e}"
                    ))
                })?;

            let text = api_response.content.into_iter().map(|block| block.text).collect::<String>();

            Ok(GenerationResponse {
                text,
                prompt_tokens: api_response.usage.input_tokens,
                completion_tokens: api_response.usage.output_tokens,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limits_and_server_errors_are_retryable() {
        let err = classify_status(StatusCode::TOO_MANY_REQUESTS, "slow down".into());
        assert!(err.is_transient());
        let err = classify_status(StatusCode::BAD_GATEWAY, "upstream".into());
        assert!(err.is_transient());
        let err = classify_status(StatusCode::from_u16(529).unwrap(), "overloaded".into());
        assert!(err.is_transient());
    }

    #[test]
    fn client_errors_are_final() {
        let err = classify_status(StatusCode::UNAUTHORIZED, "bad key".into());
        assert_eq!(
            err,
            GenerationError::Rejected("Anthropic API error (401): bad key".into())
        );
    }

    #[test]
    fn empty_system_is_omitted_from_body() {
        let body = AnthropicRequest {
            model: "m",
            max_tokens: 10,
            temperature: 0.0,
            system: None,
            messages: vec![AnthropicMessage { role: "user", content: "hi" }],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("system").is_none());
        assert_eq!(json["messages"][0]["content"], "hi");
    }
}
