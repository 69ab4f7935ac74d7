//! LLM Provider Trait
//!
//! Defines the common interface for generative-model providers.

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::mpsc;

use super::types::{GenerationOptions, LlmError, LlmResponse, LlmResult, Message};
use sentilens_core::streaming::UnifiedStreamEvent;

/// Trait that all LLM providers must implement.
///
/// Provides a unified interface for:
/// - Single-shot completions (send_message)
/// - Streaming completions (stream_message)
/// - Health checking
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Returns the provider name for identification.
    fn name(&self) -> &'static str;

    /// Returns the current model being used.
    fn model(&self) -> &str;

    /// Returns whether the model accepts a thinking budget.
    fn supports_thinking(&self) -> bool;

    /// Send a conversation and get a complete response.
    ///
    /// # Arguments
    /// * `messages` - Conversation contents, oldest first
    /// * `system` - Optional system instruction
    /// * `options` - Sampling, thinking and structured-output settings
    async fn send_message(
        &self,
        messages: Vec<Message>,
        system: Option<String>,
        options: GenerationOptions,
    ) -> LlmResult<LlmResponse>;

    /// Stream a response via a channel.
    ///
    /// Text and thinking deltas are forwarded on `tx` as they arrive. Usage and
    /// completion are reported through the returned `LlmResponse`, not the
    /// channel; failures are reported through the `Err` return.
    async fn stream_message(
        &self,
        messages: Vec<Message>,
        system: Option<String>,
        tx: mpsc::Sender<UnifiedStreamEvent>,
        options: GenerationOptions,
    ) -> LlmResult<LlmResponse>;

    /// Check if the provider is reachable and the API key is accepted.
    async fn health_check(&self) -> LlmResult<()>;

    /// List available models (if supported by provider).
    async fn list_models(&self) -> LlmResult<Option<Vec<String>>> {
        Ok(None)
    }
}

/// Helper function to create an error for missing API key
pub fn missing_api_key_error(provider: &str) -> LlmError {
    LlmError::AuthenticationFailed {
        message: format!("API key not configured for {}", provider),
    }
}

#[derive(Deserialize)]
struct ErrorWrapper {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    status: Option<String>,
}

/// Pull `STATUS: message` out of a `{"error": {...}}` body, or return the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorWrapper>(body)
        .ok()
        .map(|wrapper| {
            let msg = wrapper.error.message.unwrap_or_else(|| body.to_string());
            match wrapper.error.status {
                Some(status) if !status.is_empty() => format!("{}: {}", status, msg),
                _ => msg,
            }
        })
        .unwrap_or_else(|| body.to_string())
}

/// Helper function to parse HTTP error status codes
pub fn parse_http_error(status: u16, body: &str, provider: &str) -> LlmError {
    let message = error_message(body);
    match status {
        401 => LlmError::AuthenticationFailed {
            message: format!("{}: Invalid API key", provider),
        },
        403 => LlmError::AuthenticationFailed {
            message: format!("{}: Access denied ({})", provider, message),
        },
        404 => LlmError::ModelNotFound { model: message },
        429 => LlmError::RateLimited {
            message,
            retry_after: None,
        },
        // The Gemini API reports a bad or missing key as 400 INVALID_ARGUMENT.
        400 if message.contains("API key") || message.contains("API_KEY") => {
            LlmError::AuthenticationFailed { message }
        }
        400 => LlmError::InvalidRequest { message },
        500..=599 => LlmError::ServerError {
            message,
            status: Some(status),
        },
        _ => LlmError::Other {
            message: format!("HTTP {}: {}", status, message),
        },
    }
}
