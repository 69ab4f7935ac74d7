//! Application State
//!
//! Global state shared by all commands: configuration, the model gateway and
//! the analysis and chat orchestrators.

use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::models::analysis::{AnalysisState, SubmitOutcome};
use crate::models::dashboard::DashboardSummary;
use crate::models::settings::{api_key_from_env, AppConfig, SettingsUpdate};
use crate::services::analysis::AnalysisOrchestrator;
use crate::services::chat::{ChatOrchestrator, ChatSnapshot};
use crate::services::gateway::{GatewayConfig, LlmGateway, ModelGateway};
use crate::storage::ConfigService;
use crate::utils::error::{AppError, AppResult};

fn env_lookup(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// Build the production gateway from the file config, the environment
/// overrides and the credential.
fn build_gateway(config: &ConfigService) -> AppResult<Arc<dyn ModelGateway>> {
    let resolved = config.resolved_config(env_lookup)?;
    let api_key = api_key_from_env(env_lookup);
    let gateway_config = GatewayConfig::from_app_config(&resolved, api_key)?;
    debug!(config = ?gateway_config, "building model gateway");
    Ok(Arc::new(LlmGateway::new(&gateway_config)?))
}

/// Application state shared by the commands
pub struct AppState {
    /// Configuration service for app settings
    config: Arc<RwLock<Option<ConfigService>>>,
    /// Gateway the orchestrators talk to
    gateway: Arc<RwLock<Option<Arc<dyn ModelGateway>>>>,
    analysis: Arc<RwLock<Option<Arc<AnalysisOrchestrator>>>>,
    /// Present only while the current analysis has succeeded
    chat: Arc<RwLock<Option<Arc<ChatOrchestrator>>>>,
    /// Whether the state has been initialized
    initialized: Arc<RwLock<bool>>,
}

impl AppState {
    /// Create a new uninitialized app state
    pub fn new() -> Self {
        Self {
            config: Arc::new(RwLock::new(None)),
            gateway: Arc::new(RwLock::new(None)),
            analysis: Arc::new(RwLock::new(None)),
            chat: Arc::new(RwLock::new(None)),
            initialized: Arc::new(RwLock::new(false)),
        }
    }

    /// Create an initialized state over the given services
    pub fn with_services(config: Option<ConfigService>, gateway: Arc<dyn ModelGateway>) -> Self {
        let analysis = Arc::new(AnalysisOrchestrator::new(gateway.clone()));
        Self {
            config: Arc::new(RwLock::new(config)),
            gateway: Arc::new(RwLock::new(Some(gateway))),
            analysis: Arc::new(RwLock::new(Some(analysis))),
            chat: Arc::new(RwLock::new(None)),
            initialized: Arc::new(RwLock::new(true)),
        }
    }

    /// Load configuration and build the gateway.
    ///
    /// The API key is read from the environment here, once. A missing key is
    /// not an error until the first model call.
    pub async fn initialize(&self) -> AppResult<()> {
        let mut initialized = self.initialized.write().await;
        if *initialized {
            return Ok(());
        }

        let config = ConfigService::new()?;
        let gateway = build_gateway(&config)?;
        info!(config_path = %config.path().display(), "application state initialized");

        let mut analysis = self.analysis.write().await;
        *self.config.write().await = Some(config);
        self.install_gateway(&mut analysis, gateway).await;

        *initialized = true;
        Ok(())
    }

    pub async fn is_initialized(&self) -> bool {
        *self.initialized.read().await
    }

    /// Swap in a gateway with fresh orchestrators.
    ///
    /// Takes the already-held analysis slot; locks are always taken in the
    /// order analysis, config, gateway, chat.
    async fn install_gateway(
        &self,
        analysis: &mut Option<Arc<AnalysisOrchestrator>>,
        gateway: Arc<dyn ModelGateway>,
    ) {
        *analysis = Some(Arc::new(AnalysisOrchestrator::new(gateway.clone())));
        *self.gateway.write().await = Some(gateway);
        *self.chat.write().await = None;
    }

    /// Check if config is healthy
    pub async fn is_config_healthy(&self) -> bool {
        match &*self.config.read().await {
            Some(config) => config.get_config().validate().is_ok(),
            None => false,
        }
    }

    pub async fn gateway(&self) -> AppResult<Arc<dyn ModelGateway>> {
        self.gateway
            .read()
            .await
            .clone()
            .ok_or_else(|| AppError::config("Model gateway not initialized"))
    }

    pub async fn analysis(&self) -> AppResult<Arc<AnalysisOrchestrator>> {
        self.analysis
            .read()
            .await
            .clone()
            .ok_or_else(|| AppError::config("Analysis service not initialized"))
    }

    /// Chat for the current successful analysis
    pub async fn chat(&self) -> AppResult<Arc<ChatOrchestrator>> {
        self.chat
            .read()
            .await
            .clone()
            .ok_or_else(|| AppError::invalid_state("Chat is available after a successful analysis"))
    }

    /// Submit feedback for analysis and wait for it to finish.
    ///
    /// A successful analysis opens a new chat grounded in the submitted
    /// text; any other finished submission closes the previous chat. If the
    /// settings changed meanwhile, the chat slot belongs to the new
    /// orchestrator and is left alone.
    pub async fn analyze_feedback(
        &self,
        text: &str,
        use_deep_reasoning: bool,
    ) -> AppResult<AnalysisState> {
        let analysis = self.analysis().await?;

        if analysis.submit(text, use_deep_reasoning).await == SubmitOutcome::Completed {
            let current = self.analysis.read().await;
            if !current.as_ref().is_some_and(|c| Arc::ptr_eq(c, &analysis)) {
                debug!("analysis replaced while running, leaving chat untouched");
                return Ok(analysis.snapshot());
            }
            let chat = match analysis.snapshot() {
                AnalysisState::Success { context_text, .. } => {
                    let gateway = self.gateway().await?;
                    debug!("opening chat for new analysis");
                    Some(Arc::new(ChatOrchestrator::new(gateway, context_text)))
                }
                _ => None,
            };
            *self.chat.write().await = chat;
        }

        Ok(analysis.snapshot())
    }

    pub async fn analysis_state(&self) -> AppResult<AnalysisState> {
        Ok(self.analysis().await?.snapshot())
    }

    /// Return to the input view, closing the chat
    pub async fn reset_analysis(&self) -> AppResult<AnalysisState> {
        let analysis = self.analysis().await?;
        analysis.reset()?;
        *self.chat.write().await = None;
        Ok(analysis.snapshot())
    }

    pub async fn dashboard(&self) -> AppResult<DashboardSummary> {
        let result = self
            .analysis()
            .await?
            .result()
            .ok_or_else(|| AppError::invalid_state("No analysis result to summarize"))?;
        Ok(DashboardSummary::from_result(&result))
    }

    /// Send a chat message and wait for the turn to settle
    pub async fn send_chat_message(&self, text: &str) -> AppResult<ChatSnapshot> {
        let chat = self.chat().await?;
        chat.send(text).await;
        Ok(chat.snapshot())
    }

    pub async fn chat_snapshot(&self) -> AppResult<ChatSnapshot> {
        Ok(self.chat().await?.snapshot())
    }

    pub async fn set_chat_deep_reasoning(&self, enabled: bool) -> AppResult<ChatSnapshot> {
        let chat = self.chat().await?;
        chat.set_deep_reasoning(enabled);
        Ok(chat.snapshot())
    }

    /// Get the current configuration
    pub async fn get_config(&self) -> AppResult<AppConfig> {
        let guard = self.config.read().await;
        match &*guard {
            Some(config) => Ok(config.get_config_clone()),
            None => Err(AppError::config("Config service not initialized")),
        }
    }

    /// Update and save the configuration, then rebuild the gateway.
    ///
    /// Rejected while an analysis is running. The current analysis and chat
    /// are discarded since they belong to the old gateway. The analysis slot
    /// stays write-locked from the check to the swap.
    pub async fn update_config(&self, update: SettingsUpdate) -> AppResult<AppConfig> {
        let mut analysis = self.analysis.write().await;
        let running = analysis
            .as_ref()
            .ok_or_else(|| AppError::config("Analysis service not initialized"))?
            .is_analyzing();
        if running {
            return Err(AppError::invalid_state(
                "cannot change settings while an analysis is running",
            ));
        }

        let (updated, gateway) = {
            let mut guard = self.config.write().await;
            let config = guard
                .as_mut()
                .ok_or_else(|| AppError::config("Config service not initialized"))?;
            let updated = config.update_config(update)?;
            (updated, build_gateway(config)?)
        };

        self.install_gateway(&mut analysis, gateway).await;
        info!("settings updated, model gateway rebuilt");
        Ok(updated)
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("initialized", &self.initialized)
            .finish()
    }
}
