//! Chat Orchestrator
//!
//! Keeps the transcript of a chat grounded in one analyzed text and runs
//! turns through `Composing -> Sending -> Streaming -> Settled`.
//!
//! Streamed fragments are appended to a single placeholder message by the
//! task that called `send`, so the placeholder text only ever grows and every
//! observed value is a prefix of the final answer.

use std::sync::Arc;

use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::models::analysis::SubmitOutcome;
use crate::models::chat::{ChatMessage, ChatTurnState, HistoryTurn, TurnOutcome};
use crate::services::gateway::ModelGateway;
use crate::utils::error::AppError;

/// Everything the chat view renders
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSnapshot {
    pub messages: Vec<ChatMessage>,
    pub turn_state: ChatTurnState,
    pub use_deep_reasoning: bool,
}

impl ChatSnapshot {
    fn seeded() -> Self {
        Self {
            messages: vec![ChatMessage::greeting()],
            turn_state: ChatTurnState::Composing,
            use_deep_reasoning: false,
        }
    }

    fn placeholder_mut(&mut self, id: &str) -> Option<&mut ChatMessage> {
        self.messages.iter_mut().rev().find(|m| m.id == id)
    }
}

pub struct ChatOrchestrator {
    gateway: Arc<dyn ModelGateway>,
    /// Reviews the answers are grounded in
    context_text: String,
    state: watch::Sender<ChatSnapshot>,
}

impl ChatOrchestrator {
    pub fn new(gateway: Arc<dyn ModelGateway>, context_text: impl Into<String>) -> Self {
        let (state, _) = watch::channel(ChatSnapshot::seeded());
        Self {
            gateway,
            context_text: context_text.into(),
            state,
        }
    }

    /// Send a user message and stream the answer into the transcript.
    ///
    /// Blank text, or a send while a turn is in flight, is ignored. Failures
    /// never propagate: they end the turn with the apology message.
    pub async fn send(&self, user_text: &str) -> SubmitOutcome {
        if user_text.trim().is_empty() {
            return SubmitOutcome::Ignored;
        }

        let mut history: Vec<HistoryTurn> = Vec::new();
        let mut deep = false;
        let mut placeholder_id = String::new();

        let started = self.state.send_if_modified(|chat| {
            if chat.turn_state.is_busy() {
                return false;
            }
            // History is the transcript as rendered before this turn.
            history = chat.messages.iter().map(HistoryTurn::from).collect();
            deep = chat.use_deep_reasoning;

            chat.messages.push(ChatMessage::user(user_text));
            let placeholder = ChatMessage::placeholder(deep);
            placeholder_id = placeholder.id.clone();
            chat.messages.push(placeholder);
            chat.turn_state = ChatTurnState::Sending;
            true
        });
        if !started {
            debug!("chat turn in flight, message ignored");
            return SubmitOutcome::Ignored;
        }

        info!(history_len = history.len(), use_deep_reasoning = deep, "chat turn started");

        let outcome = match self
            .gateway
            .chat(history, user_text, &self.context_text, deep)
            .await
        {
            Ok(mut stream) => {
                self.state.send_modify(|chat| chat.turn_state = ChatTurnState::Streaming);

                let mut outcome = TurnOutcome::Completed;
                while let Some(item) = stream.next().await {
                    match item {
                        Ok(fragment) => self.append_fragment(&placeholder_id, &fragment),
                        Err(e) => {
                            let err = AppError::stream(e.message);
                            warn!(error = %err, code = ?e.code, "chat stream failed");
                            outcome = TurnOutcome::Failed;
                            break;
                        }
                    }
                }
                outcome
            }
            Err(e) => {
                warn!(error = %e, "chat request failed");
                TurnOutcome::Failed
            }
        };

        self.settle(&placeholder_id, outcome);
        SubmitOutcome::Completed
    }

    fn append_fragment(&self, placeholder_id: &str, fragment: &str) {
        self.state.send_if_modified(|chat| match chat.placeholder_mut(placeholder_id) {
            Some(message) => {
                message.text.push_str(fragment);
                true
            }
            None => false,
        });
    }

    fn settle(&self, placeholder_id: &str, outcome: TurnOutcome) {
        self.state.send_modify(|chat| {
            if outcome == TurnOutcome::Failed {
                // An empty placeholder is dropped; partial text stays.
                chat.messages
                    .retain(|m| m.id != placeholder_id || !m.text.is_empty());
                chat.messages.push(ChatMessage::apology());
            }
            chat.turn_state = ChatTurnState::Settled(outcome);
        });
        debug!(?outcome, "chat turn settled");
    }

    /// Toggle deep reasoning for subsequent sends
    pub fn set_deep_reasoning(&self, enabled: bool) {
        self.state.send_if_modified(|chat| {
            let changed = chat.use_deep_reasoning != enabled;
            chat.use_deep_reasoning = enabled;
            changed
        });
    }

    pub fn snapshot(&self) -> ChatSnapshot {
        self.state.borrow().clone()
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        self.state.borrow().messages.clone()
    }

    pub fn turn_state(&self) -> ChatTurnState {
        self.state.borrow().turn_state
    }

    pub fn is_loading(&self) -> bool {
        self.turn_state().is_busy()
    }

    pub fn use_deep_reasoning(&self) -> bool {
        self.state.borrow().use_deep_reasoning
    }

    /// True while a turn is in flight and no answer text has arrived yet
    pub fn is_awaiting_first_fragment(&self) -> bool {
        let chat = self.state.borrow();
        chat.turn_state.is_busy()
            && chat
                .messages
                .last()
                .map(|m| m.text.is_empty())
                .unwrap_or(false)
    }

    pub fn context_text(&self) -> &str {
        &self.context_text
    }

    /// Receiver notified on every transcript or turn change
    pub fn subscribe(&self) -> watch::Receiver<ChatSnapshot> {
        self.state.subscribe()
    }
}
