//! Model Gateway
//!
//! The two operations the app needs from the generative model:
//! - `analyze`: one schema-constrained call returning an `AnalysisResult`
//! - `chat`: a streamed answer grounded in the analyzed reviews
//!
//! `LlmGateway` is the production implementation over two provider tiers
//! (fast and deep). It keeps no state between calls.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use sentilens_core::proxy::ProxyConfig;
use sentilens_core::streaming::UnifiedStreamEvent;
use sentilens_llm::{
    FragmentStream, GeminiProvider, GenerationOptions, LlmProvider, LlmResponse, Message,
    ProviderConfig, StreamError,
};

use crate::models::analysis::{analysis_response_schema, AnalysisResult};
use crate::models::chat::HistoryTurn;
use crate::models::settings::AppConfig;
use crate::utils::error::{AppError, AppResult};

/// Longest analysis input sent, in characters
pub const ANALYSIS_MAX_CHARS: usize = 100_000;

/// Longest review context embedded in the chat system instruction, in characters
pub const CHAT_CONTEXT_MAX_CHARS: usize = 50_000;

/// Thinking budget for deep-reasoning requests
pub const DEEP_THINKING_BUDGET: u32 = 32_768;

/// Sampling temperature for fast analysis
pub const ANALYSIS_TEMPERATURE: f32 = 0.5;

const ANALYSIS_PROMPT_PREFIX: &str = "Analyze the following customer reviews and extract sentiment trends, keywords, and an executive summary.\n\nREVIEWS:\n";

/// Buffered stream events between the provider task and the consumer
const STREAM_CHANNEL_CAPACITY: usize = 64;

/// Operations the orchestrators need from the model service.
#[async_trait]
pub trait ModelGateway: Send + Sync {
    /// Analyze feedback text into a structured result.
    async fn analyze(&self, text: &str, use_deep_reasoning: bool) -> AppResult<AnalysisResult>;

    /// Start a streamed chat answer.
    ///
    /// `Err` means the request failed before any text arrived; a failure
    /// after that is the stream's final item.
    async fn chat(
        &self,
        history: Vec<HistoryTurn>,
        new_message: &str,
        context_text: &str,
        use_deep_reasoning: bool,
    ) -> AppResult<FragmentStream>;

    /// Check that the model service is reachable with the configured key.
    async fn health_check(&self) -> AppResult<()> {
        Ok(())
    }

    /// Model ids the service offers, if it can list them.
    async fn list_models(&self) -> AppResult<Vec<String>> {
        Ok(Vec::new())
    }
}

/// Everything needed to build the production gateway.
#[derive(Clone)]
pub struct GatewayConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub fast_model: String,
    pub deep_model: String,
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub proxy: Option<ProxyConfig>,
}

impl GatewayConfig {
    /// Combine the resolved app configuration with the credential read at startup
    pub fn from_app_config(config: &AppConfig, api_key: Option<String>) -> AppResult<Self> {
        config.validate().map_err(AppError::validation)?;
        Ok(Self {
            api_key,
            base_url: config.base_url.clone(),
            fast_model: config.fast_model.clone(),
            deep_model: config.deep_model.clone(),
            request_timeout_secs: config.request_timeout_secs,
            connect_timeout_secs: config.connect_timeout_secs,
            proxy: config.proxy().map_err(AppError::config)?,
        })
    }

    fn provider_config(&self, model: &str) -> ProviderConfig {
        ProviderConfig {
            api_key: self.api_key.clone(),
            base_url: self.base_url.clone(),
            model: model.to_string(),
            proxy: self.proxy.clone(),
            request_timeout_secs: self.request_timeout_secs,
            connect_timeout_secs: self.connect_timeout_secs,
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        let app = AppConfig::default();
        Self {
            api_key: None,
            base_url: app.base_url,
            fast_model: app.fast_model,
            deep_model: app.deep_model,
            request_timeout_secs: app.request_timeout_secs,
            connect_timeout_secs: app.connect_timeout_secs,
            proxy: None,
        }
    }
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("fast_model", &self.fast_model)
            .field("deep_model", &self.deep_model)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("proxy", &self.proxy.as_ref().map(|p| p.url()))
            .finish()
    }
}

/// Gateway over a fast and a deep provider tier
pub struct LlmGateway {
    fast: Arc<dyn LlmProvider>,
    deep: Arc<dyn LlmProvider>,
}

impl LlmGateway {
    /// Build the Gemini-backed gateway
    pub fn new(config: &GatewayConfig) -> AppResult<Self> {
        let fast = GeminiProvider::new(config.provider_config(&config.fast_model))?;
        let deep = GeminiProvider::new(config.provider_config(&config.deep_model))?;
        info!(
            fast_model = %config.fast_model,
            deep_model = %config.deep_model,
            has_api_key = config.api_key.is_some(),
            "model gateway ready"
        );
        Ok(Self::with_providers(Arc::new(fast), Arc::new(deep)))
    }

    /// Build a gateway over arbitrary providers
    pub fn with_providers(fast: Arc<dyn LlmProvider>, deep: Arc<dyn LlmProvider>) -> Self {
        Self { fast, deep }
    }

    fn tier(&self, use_deep_reasoning: bool) -> &Arc<dyn LlmProvider> {
        if use_deep_reasoning {
            &self.deep
        } else {
            &self.fast
        }
    }
}

/// First `max_chars` characters of `text`.
///
/// Returns the slice and whether anything was cut.
pub fn truncate_chars(text: &str, max_chars: usize) -> (&str, bool) {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => (&text[..idx], true),
        None => (text, false),
    }
}

/// Prompt for the analysis call
pub fn build_analysis_prompt(reviews: &str) -> String {
    format!("{}{}", ANALYSIS_PROMPT_PREFIX, reviews)
}

/// System instruction grounding the chat in the reviews
pub fn build_chat_system_instruction(context: &str) -> String {
    format!(
        "You are a helpful AI assistant for a Customer Sentiment Dashboard. \
         You have access to the following raw customer reviews:\n---\n{}\n---\n\
         Answer the user's questions based specifically on these reviews. Be concise and insightful.",
        context
    )
}

/// Generation options for the analysis call.
///
/// Deep reasoning sets only a thinking budget; an output cap alongside it is
/// rejected by the provider.
pub fn analysis_options(use_deep_reasoning: bool) -> GenerationOptions {
    let options = GenerationOptions::json(analysis_response_schema());
    if use_deep_reasoning {
        options.with_thinking_budget(DEEP_THINKING_BUDGET)
    } else {
        options.with_temperature(ANALYSIS_TEMPERATURE)
    }
}

/// Generation options for a chat turn
pub fn chat_options(use_deep_reasoning: bool) -> GenerationOptions {
    let options = GenerationOptions::default();
    if use_deep_reasoning {
        options.with_thinking_budget(DEEP_THINKING_BUDGET)
    } else {
        options
    }
}

fn log_usage(operation: &str, response: &LlmResponse) {
    info!(
        operation,
        model = %response.model,
        input_tokens = response.usage.input_tokens,
        output_tokens = response.usage.output_tokens,
        thinking_tokens = response.usage.thinking_tokens.unwrap_or(0),
        stop_reason = response.stop_reason.as_str(),
        "model call finished"
    );
}

/// Map a failure seen before the first fragment back to an `AppError`.
fn setup_error(err: StreamError) -> AppError {
    match err.code.as_deref() {
        Some("parse_error") => AppError::malformed_response(err.message),
        Some("invalid_request") => AppError::config(err.message),
        _ => AppError::transport(err.message),
    }
}

#[async_trait]
impl ModelGateway for LlmGateway {
    async fn analyze(&self, text: &str, use_deep_reasoning: bool) -> AppResult<AnalysisResult> {
        if text.trim().is_empty() {
            return Err(AppError::invalid_input("No reviews provided"));
        }

        let (reviews, truncated) = truncate_chars(text, ANALYSIS_MAX_CHARS);
        if truncated {
            info!(
                limit = ANALYSIS_MAX_CHARS,
                "analysis input truncated"
            );
        }

        let provider = self.tier(use_deep_reasoning);
        debug!(
            model = provider.model(),
            chars = reviews.chars().count(),
            use_deep_reasoning,
            "starting analysis"
        );

        let response = provider
            .send_message(
                vec![Message::user(build_analysis_prompt(reviews))],
                None,
                analysis_options(use_deep_reasoning),
            )
            .await?;
        log_usage("analyze", &response);

        let content = response
            .content
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| AppError::empty_response("Empty response from model"))?;

        AnalysisResult::from_model_text(&content)
    }

    async fn chat(
        &self,
        history: Vec<HistoryTurn>,
        new_message: &str,
        context_text: &str,
        use_deep_reasoning: bool,
    ) -> AppResult<FragmentStream> {
        let options = chat_options(use_deep_reasoning);
        options.validate()?;

        let (context, truncated) = truncate_chars(context_text, CHAT_CONTEXT_MAX_CHARS);
        if truncated {
            debug!(limit = CHAT_CONTEXT_MAX_CHARS, "chat context truncated");
        }
        let system = build_chat_system_instruction(context);

        let mut messages: Vec<Message> = history.into_iter().map(Message::from).collect();
        messages.push(Message::user(new_message));

        // Chat always runs on the deep tier; the flag only adds thinking.
        let provider = Arc::clone(&self.deep);
        debug!(
            model = provider.model(),
            history_len = messages.len() - 1,
            use_deep_reasoning,
            "starting chat turn"
        );

        let (tx, rx) = mpsc::channel(STREAM_CHANNEL_CAPACITY);
        tokio::spawn(async move {
            let terminal = match provider
                .stream_message(messages, Some(system), tx.clone(), options)
                .await
            {
                Ok(response) => {
                    log_usage("chat", &response);
                    UnifiedStreamEvent::Complete {
                        stop_reason: Some(response.stop_reason.as_str().to_string()),
                    }
                }
                Err(e) => {
                    warn!(error = %e, "chat stream failed");
                    UnifiedStreamEvent::Error {
                        message: e.to_string(),
                        code: Some(e.code().to_string()),
                    }
                }
            };
            let _ = tx.send(terminal).await;
        });

        let mut stream = FragmentStream::new(rx);
        stream.prime().await.map_err(setup_error)?;
        Ok(stream)
    }

    async fn health_check(&self) -> AppResult<()> {
        self.fast.health_check().await?;
        if self.deep.model() != self.fast.model() {
            self.deep.health_check().await?;
        }
        Ok(())
    }

    async fn list_models(&self) -> AppResult<Vec<String>> {
        Ok(self.fast.list_models().await?.unwrap_or_default())
    }
}
