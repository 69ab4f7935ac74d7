//! Gemini Provider
//!
//! Implementation of the LlmProvider trait for the Gemini REST API
//! (`generateContent` and `streamGenerateContent`). Supports structured JSON
//! output via `responseSchema` and thinking budgets on 2.5+ models.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tracing::debug;

use super::provider::{missing_api_key_error, parse_http_error, LlmProvider};
use super::types::{
    GenerationOptions, LlmError, LlmResponse, LlmResult, Message, ProviderConfig, StopReason,
    UsageStats,
};
use crate::http_client::build_http_client;
use crate::streaming_adapters::GeminiAdapter;
use sentilens_core::streaming::{StreamAdapter, UnifiedStreamEvent};

use wire::{GenerateContentResponse, ModelList};

/// Default Gemini API endpoint (model collection)
const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Whether a Gemini model accepts `thinkingConfig`.
pub(crate) fn model_supports_thinking(model: &str) -> bool {
    let model = model.to_lowercase();
    model.contains("gemini-2.5") || model.contains("gemini-3")
}

/// Gemini provider
pub struct GeminiProvider {
    config: ProviderConfig,
    client: reqwest::Client,
}

impl GeminiProvider {
    /// Create a new Gemini provider with the given configuration
    pub fn new(config: ProviderConfig) -> LlmResult<Self> {
        let client = build_http_client(&config)?;
        Ok(Self { config, client })
    }

    fn base_url(&self) -> &str {
        self.config
            .base_url
            .as_deref()
            .unwrap_or(GEMINI_API_URL)
            .trim_end_matches('/')
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/{}:{}", self.base_url(), self.config.model, method)
    }

    fn api_key(&self) -> LlmResult<&str> {
        self.config
            .api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| missing_api_key_error("gemini"))
    }

    /// Build the request body for the API
    fn build_request_body(
        &self,
        messages: &[Message],
        system: Option<&str>,
        options: &GenerationOptions,
    ) -> LlmResult<serde_json::Value> {
        options.validate()?;

        let contents: Vec<serde_json::Value> = messages
            .iter()
            .map(|m| {
                serde_json::json!({
                    "role": m.role.as_str(),
                    "parts": [{ "text": m.text }]
                })
            })
            .collect();

        let mut body = serde_json::json!({ "contents": contents });

        if let Some(sys) = system {
            body["systemInstruction"] = serde_json::json!({
                "parts": [{ "text": sys }]
            });
        }

        let mut generation_config = serde_json::Map::new();
        if let Some(temperature) = options.temperature {
            generation_config.insert("temperature".into(), serde_json::json!(temperature));
        }
        if let Some(max_tokens) = options.max_output_tokens {
            generation_config.insert("maxOutputTokens".into(), serde_json::json!(max_tokens));
        }
        if let Some(budget) = options.thinking_budget {
            if !model_supports_thinking(&self.config.model) {
                debug!(model = %self.config.model, "thinking budget sent to a model without thinking support");
            }
            generation_config.insert(
                "thinkingConfig".into(),
                serde_json::json!({ "thinkingBudget": budget }),
            );
        }
        if let Some(mime) = &options.response_mime_type {
            generation_config.insert("responseMimeType".into(), serde_json::json!(mime));
        }
        if let Some(schema) = &options.response_schema {
            generation_config.insert(
                "responseSchema".into(),
                serde_json::to_value(schema).map_err(|e| LlmError::InvalidRequest {
                    message: format!("Unserializable response schema: {}", e),
                })?,
            );
        }
        if !generation_config.is_empty() {
            body["generationConfig"] = serde_json::Value::Object(generation_config);
        }

        Ok(body)
    }

    /// Parse a non-streaming response
    fn parse_response(&self, response: GenerateContentResponse) -> LlmResult<LlmResponse> {
        if let Some(error) = response.error {
            return Err(LlmError::ServerError {
                message: error.message.unwrap_or_default(),
                status: error.code.and_then(|c| u16::try_from(c).ok()),
            });
        }

        let usage = response
            .usage_metadata
            .map(|u| UsageStats {
                input_tokens: u.prompt_token_count,
                output_tokens: u.candidates_token_count,
                thinking_tokens: u.thoughts_token_count,
            })
            .unwrap_or_default();
        let model = response
            .model_version
            .unwrap_or_else(|| self.config.model.clone());

        let Some(candidate) = response.candidates.into_iter().next() else {
            let stop_reason = response
                .prompt_feedback
                .and_then(|f| f.block_reason)
                .map(|_| StopReason::Safety)
                .unwrap_or(StopReason::EndTurn);
            return Ok(LlmResponse {
                content: None,
                thinking: None,
                stop_reason,
                usage,
                model,
            });
        };

        let mut content = String::new();
        let mut thinking = String::new();
        for part in candidate.content.map(|c| c.parts).unwrap_or_default() {
            if let Some(text) = part.text {
                if part.thought {
                    thinking.push_str(&text);
                } else {
                    content.push_str(&text);
                }
            }
        }

        Ok(LlmResponse {
            content: (!content.is_empty()).then_some(content),
            thinking: (!thinking.is_empty()).then_some(thinking),
            stop_reason: candidate
                .finish_reason
                .as_deref()
                .map(StopReason::from)
                .unwrap_or(StopReason::EndTurn),
            usage,
            model,
        })
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.config.request_timeout_secs)
    }

    /// POST a JSON body and map non-success statuses to `LlmError`.
    ///
    /// `deadline` caps the whole exchange, body included; streams pass `None`
    /// and rely on the client's read timeout.
    async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
        deadline: Option<Duration>,
    ) -> LlmResult<reqwest::Response> {
        let api_key = self.api_key()?;

        let mut request = self
            .client
            .post(url)
            .header("x-goog-api-key", api_key)
            .header("Content-Type", "application/json")
            .json(body);
        if let Some(deadline) = deadline {
            request = request.timeout(deadline);
        }

        let response = request
            .send()
            .await
            .map_err(|e| LlmError::NetworkError {
                message: e.to_string(),
            })?;

        let status = response.status().as_u16();
        if status != 200 {
            let body_text = response.text().await.unwrap_or_default();
            return Err(parse_http_error(status, &body_text, "gemini"));
        }
        Ok(response)
    }
}

/// Running totals while a stream is consumed
struct StreamAccumulator {
    content: String,
    thinking: String,
    usage: UsageStats,
    stop_reason: Option<StopReason>,
}

impl StreamAccumulator {
    fn new() -> Self {
        Self {
            content: String::new(),
            thinking: String::new(),
            usage: UsageStats::default(),
            stop_reason: None,
        }
    }

    /// Record one adapted event and forward the deltas the caller renders.
    async fn absorb(
        &mut self,
        event: UnifiedStreamEvent,
        tx: &mpsc::Sender<UnifiedStreamEvent>,
    ) -> LlmResult<()> {
        match event {
            UnifiedStreamEvent::TextDelta { ref content } => {
                self.content.push_str(content);
            }
            UnifiedStreamEvent::ThinkingDelta { ref content, .. } => {
                self.thinking.push_str(content);
            }
            UnifiedStreamEvent::ThinkingStart { .. } | UnifiedStreamEvent::ThinkingEnd { .. } => {}
            UnifiedStreamEvent::Usage {
                input_tokens,
                output_tokens,
                thinking_tokens,
            } => {
                // Usage metadata is cumulative; keep the latest.
                self.usage = UsageStats {
                    input_tokens,
                    output_tokens,
                    thinking_tokens,
                };
                return Ok(());
            }
            UnifiedStreamEvent::Complete { stop_reason } => {
                self.stop_reason = Some(
                    stop_reason
                        .as_deref()
                        .map(StopReason::from)
                        .unwrap_or(StopReason::EndTurn),
                );
                return Ok(());
            }
            UnifiedStreamEvent::Error { message, code } => {
                let message = match code {
                    Some(code) => format!("{}: {}", code, message),
                    None => message,
                };
                return Err(LlmError::ServerError {
                    message,
                    status: None,
                });
            }
        }

        // A dropped receiver means nobody is listening any more; the call
        // still runs to completion.
        let _ = tx.send(event).await;
        Ok(())
    }

    fn into_response(self, model: String) -> LlmResponse {
        LlmResponse {
            content: (!self.content.is_empty()).then_some(self.content),
            thinking: (!self.thinking.is_empty()).then_some(self.thinking),
            stop_reason: self.stop_reason.unwrap_or(StopReason::EndTurn),
            usage: self.usage,
            model,
        }
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn name(&self) -> &'static str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    fn supports_thinking(&self) -> bool {
        model_supports_thinking(&self.config.model)
    }

    async fn send_message(
        &self,
        messages: Vec<Message>,
        system: Option<String>,
        options: GenerationOptions,
    ) -> LlmResult<LlmResponse> {
        let body = self.build_request_body(&messages, system.as_deref(), &options)?;

        let response = self
            .post_json(
                &self.endpoint("generateContent"),
                &body,
                Some(self.request_timeout()),
            )
            .await?;
        let body_text = response.text().await.map_err(|e| LlmError::NetworkError {
            message: e.to_string(),
        })?;

        let parsed: GenerateContentResponse =
            serde_json::from_str(&body_text).map_err(|e| LlmError::ParseError {
                message: format!("Failed to parse response: {}", e),
            })?;

        self.parse_response(parsed)
    }

    async fn stream_message(
        &self,
        messages: Vec<Message>,
        system: Option<String>,
        tx: mpsc::Sender<UnifiedStreamEvent>,
        options: GenerationOptions,
    ) -> LlmResult<LlmResponse> {
        let body = self.build_request_body(&messages, system.as_deref(), &options)?;

        let url = format!("{}?alt=sse", self.endpoint("streamGenerateContent"));
        let response = self.post_json(&url, &body, None).await?;

        let mut adapter = GeminiAdapter::new(&self.config.model);
        let mut acc = StreamAccumulator::new();
        let mut stream = response.bytes_stream();
        // Raw bytes, so a multi-byte character split across chunks survives.
        let mut buffer: Vec<u8> = Vec::new();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| LlmError::NetworkError {
                message: e.to_string(),
            })?;
            buffer.extend_from_slice(&chunk);

            while let Some(line_end) = buffer.iter().position(|b| *b == b'\n') {
                let line_bytes: Vec<u8> = buffer.drain(..=line_end).collect();
                let line = String::from_utf8_lossy(&line_bytes);
                if line.trim().is_empty() {
                    continue;
                }

                let events = adapter.adapt(&line).map_err(|e| LlmError::ParseError {
                    message: e.to_string(),
                })?;
                for event in events {
                    acc.absorb(event, &tx).await?;
                }
            }
        }

        let rest = String::from_utf8_lossy(&buffer);
        if !rest.trim().is_empty() {
            let events = adapter.adapt(&rest).map_err(|e| LlmError::ParseError {
                message: e.to_string(),
            })?;
            for event in events {
                acc.absorb(event, &tx).await?;
            }
        }

        if acc.stop_reason.is_none() {
            debug!(model = %self.config.model, "gemini stream ended without a finish reason");
        }

        Ok(acc.into_response(self.config.model.clone()))
    }

    async fn health_check(&self) -> LlmResult<()> {
        let api_key = self.api_key()?;

        let url = format!("{}/{}", self.base_url(), self.config.model);
        let response = self
            .client
            .get(url)
            .header("x-goog-api-key", api_key)
            .timeout(self.request_timeout())
            .send()
            .await
            .map_err(|e| LlmError::NetworkError {
                message: e.to_string(),
            })?;

        let status = response.status().as_u16();
        if status == 200 {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(parse_http_error(status, &body, "gemini"))
        }
    }

    async fn list_models(&self) -> LlmResult<Option<Vec<String>>> {
        let api_key = self.api_key()?;

        let response = self
            .client
            .get(self.base_url())
            .query(&[("pageSize", "1000")])
            .header("x-goog-api-key", api_key)
            .timeout(self.request_timeout())
            .send()
            .await
            .map_err(|e| LlmError::NetworkError {
                message: e.to_string(),
            })?;

        let status = response.status().as_u16();
        if status != 200 {
            let body = response.text().await.unwrap_or_default();
            return Err(parse_http_error(status, &body, "gemini"));
        }

        let list: ModelList = response.json().await.map_err(|e| LlmError::ParseError {
            message: e.to_string(),
        })?;

        Ok(Some(list.model_names()))
    }
}

/// Gemini wire format (response side), shared with the stream adapter.
pub(crate) mod wire {
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub(crate) struct GenerateContentResponse {
        #[serde(default)]
        pub candidates: Vec<Candidate>,
        #[serde(default)]
        pub usage_metadata: Option<UsageMetadata>,
        #[serde(default)]
        pub model_version: Option<String>,
        #[serde(default)]
        pub prompt_feedback: Option<PromptFeedback>,
        #[serde(default)]
        pub error: Option<ApiError>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub(crate) struct Candidate {
        #[serde(default)]
        pub content: Option<CandidateContent>,
        #[serde(default)]
        pub finish_reason: Option<String>,
    }

    #[derive(Debug, Deserialize)]
    pub(crate) struct CandidateContent {
        #[serde(default)]
        pub parts: Vec<ResponsePart>,
    }

    #[derive(Debug, Deserialize)]
    pub(crate) struct ResponsePart {
        #[serde(default)]
        pub text: Option<String>,
        #[serde(default)]
        pub thought: bool,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub(crate) struct UsageMetadata {
        #[serde(default)]
        pub prompt_token_count: u32,
        #[serde(default)]
        pub candidates_token_count: u32,
        #[serde(default)]
        pub thoughts_token_count: Option<u32>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub(crate) struct PromptFeedback {
        #[serde(default)]
        pub block_reason: Option<String>,
    }

    #[derive(Debug, Deserialize)]
    pub(crate) struct ApiError {
        #[serde(default)]
        pub code: Option<i32>,
        #[serde(default)]
        pub message: Option<String>,
        #[serde(default)]
        pub status: Option<String>,
    }

    #[derive(Debug, Deserialize)]
    pub(crate) struct ModelList {
        #[serde(default)]
        pub models: Vec<ModelEntry>,
    }

    #[derive(Debug, Deserialize)]
    pub(crate) struct ModelEntry {
        pub name: String,
    }

    impl ModelList {
        /// Model ids without the `models/` prefix, Gemini family only.
        pub(crate) fn model_names(self) -> Vec<String> {
            self.models
                .into_iter()
                .map(|m| m.name.trim_start_matches("models/").to_string())
                .filter(|id| id.starts_with("gemini"))
                .collect()
        }
    }
}
