//! Analysis Orchestrator
//!
//! Drives one feedback analysis at a time through
//! `Idle -> Running -> Success | Failed`. The state lives in a `watch`
//! channel so the presentation can observe it while the call is in flight.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::models::analysis::{AnalysisResult, AnalysisState, AnalysisStatus, SubmitOutcome};
use crate::services::gateway::ModelGateway;
use crate::utils::error::{AppError, AppResult};

/// Banner shown when an analysis fails. The cause is logged, not shown.
pub const ANALYSIS_FAILED_MESSAGE: &str = "Something went wrong during analysis. Please try again.";

pub struct AnalysisOrchestrator {
    gateway: Arc<dyn ModelGateway>,
    state: watch::Sender<AnalysisState>,
}

impl AnalysisOrchestrator {
    pub fn new(gateway: Arc<dyn ModelGateway>) -> Self {
        let (state, _) = watch::channel(AnalysisState::Idle);
        Self { gateway, state }
    }

    /// Run an analysis of `text`.
    ///
    /// Blank text, or a submit while another analysis is running, changes
    /// nothing and makes no model call. Otherwise the state passes through
    /// `Running` exactly once and ends in `Success` or `Failed`.
    pub async fn submit(&self, text: &str, use_deep_reasoning: bool) -> SubmitOutcome {
        if text.trim().is_empty() {
            debug!("ignoring blank analysis submission");
            return SubmitOutcome::Ignored;
        }

        let started = self.state.send_if_modified(|state| {
            if matches!(state, AnalysisState::Running { .. }) {
                return false;
            }
            *state = AnalysisState::Running { use_deep_reasoning };
            true
        });
        if !started {
            debug!("analysis already running, submission ignored");
            return SubmitOutcome::Ignored;
        }

        info!(
            chars = text.chars().count(),
            use_deep_reasoning, "analysis started"
        );

        let next = match self.gateway.analyze(text, use_deep_reasoning).await {
            Ok(result) => {
                info!(
                    trend_points = result.sentiment_trend.len(),
                    keywords = result.keywords.len(),
                    "analysis succeeded"
                );
                AnalysisState::Success {
                    result,
                    context_text: text.to_string(),
                }
            }
            Err(e) => {
                warn!(error = %e, "analysis failed");
                AnalysisState::Failed {
                    message: ANALYSIS_FAILED_MESSAGE.to_string(),
                    context_text: text.to_string(),
                }
            }
        };
        self.state.send_replace(next);

        SubmitOutcome::Completed
    }

    /// Return to `Idle`, discarding the result or failure.
    pub fn reset(&self) -> AppResult<()> {
        let mut from = AnalysisStatus::Idle;
        let reset = self.state.send_if_modified(|state| {
            from = state.status();
            if !from.is_terminal() {
                return false;
            }
            *state = AnalysisState::Idle;
            true
        });

        if reset {
            debug!(%from, "analysis reset");
            Ok(())
        } else {
            Err(AppError::invalid_state(format!(
                "cannot reset analysis while {}",
                from
            )))
        }
    }

    pub fn snapshot(&self) -> AnalysisState {
        self.state.borrow().clone()
    }

    pub fn status(&self) -> AnalysisStatus {
        self.state.borrow().status()
    }

    pub fn is_analyzing(&self) -> bool {
        self.status() == AnalysisStatus::Running
    }

    pub fn result(&self) -> Option<AnalysisResult> {
        match &*self.state.borrow() {
            AnalysisState::Success { result, .. } => Some(result.clone()),
            _ => None,
        }
    }

    /// Banner text while `Failed`
    pub fn error(&self) -> Option<String> {
        match &*self.state.borrow() {
            AnalysisState::Failed { message, .. } => Some(message.clone()),
            _ => None,
        }
    }

    /// Text of the last finished submission
    pub fn context_text(&self) -> Option<String> {
        match &*self.state.borrow() {
            AnalysisState::Success { context_text, .. }
            | AnalysisState::Failed { context_text, .. } => Some(context_text.clone()),
            _ => None,
        }
    }

    /// Receiver notified on every state change
    pub fn subscribe(&self) -> watch::Receiver<AnalysisState> {
        self.state.subscribe()
    }
}
