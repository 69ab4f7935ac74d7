//! Chat Commands
//!
//! Follow-up questions about the analyzed feedback. Available only while
//! the current analysis has succeeded.

use crate::models::response::CommandResponse;
use crate::services::chat::ChatSnapshot;
use crate::state::AppState;

/// Send a message and wait for the streamed answer to settle.
///
/// A failed turn still succeeds as a command: the transcript carries the
/// apology message.
pub async fn send_chat_message(
    state: &AppState,
    text: String,
) -> Result<CommandResponse<ChatSnapshot>, String> {
    Ok(state.send_chat_message(&text).await.into())
}

pub async fn get_chat_messages(state: &AppState) -> Result<CommandResponse<ChatSnapshot>, String> {
    Ok(state.chat_snapshot().await.into())
}

/// Toggle deep reasoning for later chat messages
pub async fn set_chat_deep_reasoning(
    state: &AppState,
    enabled: bool,
) -> Result<CommandResponse<ChatSnapshot>, String> {
    Ok(state.set_chat_deep_reasoning(enabled).await.into())
}
