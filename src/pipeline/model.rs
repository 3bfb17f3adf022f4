//! Deadline and retry policy around the text-generation port.

use tracing::{debug, warn};

use crate::config::Settings;
use crate::ports::{GenerationError, GenerationRequest, TextGenerator};

/// Text-generation client bound to the process settings.
///
/// Every call:
/// - is bounded by `generation_timeout`
/// - is retried up to `max_retries` times for transient failures
///   (`ServiceUnavailable`, `Timeout`), waiting `attempt * retry_backoff`
/// - treats a blank answer as `EmptyResponse`
pub struct Model<'a> {
    client: &'a dyn TextGenerator,
    settings: &'a Settings,
}

impl<'a> Model<'a> {
    /// Binds a client to settings.
    #[must_use]
    pub fn new(client: &'a dyn TextGenerator, settings: &'a Settings) -> Self {
        Self { client, settings }
    }

    /// The settings this model runs under.
    #[must_use]
    pub fn settings(&self) -> &Settings {
        self.settings
    }

    /// Sends one request and returns the generated text.
    ///
    /// # Errors
    ///
    /// Returns the last failure once retries are exhausted, or the first
    /// non-transient failure.
    pub async fn ask(
        &self,
        label: &str,
        system: &str,
        prompt: String,
        max_tokens: u32,
    ) -> Result<String, GenerationError> {
        let request = GenerationRequest {
            model: self.settings.model.clone(),
            label: label.to_string(),
            system: system.to_string(),
            prompt,
            max_tokens,
            temperature: self.settings.temperature,
        };

        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            let deadline = self.settings.generation_timeout;

            let outcome = match tokio::time::timeout(deadline, self.client.generate(&request)).await
            {
                Ok(result) => result,
                Err(_) => Err(GenerationError::Timeout(deadline)),
            };

            match outcome {
                Ok(response) if response.text.trim().is_empty() => {
                    return Err(GenerationError::EmptyResponse);
                }
                Ok(response) => {
                    debug!(
                        label,
                        attempt,
                        prompt_tokens = response.prompt_tokens,
                        completion_tokens = response.completion_tokens,
                        "Generation complete"
                    );
                    return Ok(response.text);
                }
                Err(error) if error.is_transient() && attempt <= self.settings.max_retries => {
                    warn!(label, attempt, error = %error, "Transient generation failure, will retry");
                    tokio::time::sleep(self.settings.retry_backoff * attempt).await;
                }
                Err(error) => return Err(error),
            }
        }
    }
}
