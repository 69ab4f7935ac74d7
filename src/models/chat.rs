//! Chat Models
//!
//! Transcript messages, the history sent on each turn, and the per-turn
//! state of the chat.

use serde::{Deserialize, Serialize};

pub use sentilens_llm::MessageRole as ChatRole;
use sentilens_llm::Message;

/// Greeting that seeds every transcript
pub const CHAT_GREETING: &str =
    "Hi! I analyzed the reviews. Ask me anything specific about customer feedback.";

/// Message appended when a turn fails
pub const CHAT_APOLOGY: &str = "Sorry, I encountered an error. Please try again.";

/// One message in the chat transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub role: ChatRole,
    pub text: String,
    /// Set on a model placeholder created while deep reasoning was on
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_thinking: Option<bool>,
}

impl ChatMessage {
    fn new(role: ChatRole, text: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role,
            text: text.into(),
            is_thinking: None,
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(ChatRole::User, text)
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self::new(ChatRole::Model, text)
    }

    /// Empty model message that streamed text is appended to
    pub fn placeholder(deep_reasoning: bool) -> Self {
        Self {
            is_thinking: deep_reasoning.then_some(true),
            ..Self::model("")
        }
    }

    pub fn greeting() -> Self {
        Self::model(CHAT_GREETING)
    }

    pub fn apology() -> Self {
        Self::model(CHAT_APOLOGY)
    }
}

/// A prior turn as sent to the model: role and text only
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryTurn {
    pub role: ChatRole,
    pub text: String,
}

impl From<&ChatMessage> for HistoryTurn {
    fn from(message: &ChatMessage) -> Self {
        Self {
            role: message.role,
            text: message.text.clone(),
        }
    }
}

impl From<HistoryTurn> for Message {
    fn from(turn: HistoryTurn) -> Self {
        Message::new(turn.role, turn.text)
    }
}

/// How a settled turn ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnOutcome {
    Completed,
    Failed,
}

/// State of the current chat turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "outcome", rename_all = "snake_case")]
pub enum ChatTurnState {
    /// No turn has been sent yet
    Composing,
    /// Request issued, no fragment received yet
    Sending,
    /// Fragments are being appended to the placeholder
    Streaming,
    /// Last turn finished; a new send is accepted
    Settled(TurnOutcome),
}

impl ChatTurnState {
    /// Whether a turn is in flight
    pub fn is_busy(&self) -> bool {
        matches!(self, ChatTurnState::Sending | ChatTurnState::Streaming)
    }
}

impl std::fmt::Display for ChatTurnState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChatTurnState::Composing => write!(f, "composing"),
            ChatTurnState::Sending => write!(f, "sending"),
            ChatTurnState::Streaming => write!(f, "streaming"),
            ChatTurnState::Settled(TurnOutcome::Completed) => write!(f, "settled(completed)"),
            ChatTurnState::Settled(TurnOutcome::Failed) => write!(f, "settled(failed)"),
        }
    }
}
