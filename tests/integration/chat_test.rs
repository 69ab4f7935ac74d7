//! Chat Integration Tests
//!
//! Chat turns through the commands, on top of a successful analysis.

use sentilens::models::chat::{ChatRole, ChatTurnState, TurnOutcome, CHAT_APOLOGY, CHAT_GREETING};
use sentilens::services::gateway::DEEP_THINKING_BUDGET;
use sentilens::{
    analyze_feedback, get_chat_messages, reset_analysis, send_chat_message,
    set_chat_deep_reasoning,
};
use sentilens_llm::{LlmError, MessageRole};

use crate::support::{state_with, ScriptedProvider, VALID_RESULT};

const REVIEWS: &str = "2023-10-01: The app keeps crashing.\n2023-10-02: Love the interface.";

fn network_error() -> LlmError {
    LlmError::NetworkError {
        message: "connection reset".to_string(),
    }
}

#[tokio::test]
async fn test_chat_requires_successful_analysis() {
    let (state, _, _) = state_with(
        ScriptedProvider::new("fast-model").respond("{not json"),
        ScriptedProvider::new("deep-model"),
    );

    assert!(!get_chat_messages(&state).await.unwrap().success);

    analyze_feedback(&state, REVIEWS.to_string(), false).await.unwrap();
    let response = send_chat_message(&state, "Hi".to_string()).await.unwrap();
    assert!(!response.success);
}

#[tokio::test]
async fn test_streamed_answer_accumulates() {
    let (state, _, deep) = state_with(
        ScriptedProvider::new("fast-model").respond(VALID_RESULT),
        ScriptedProvider::new("deep-model").stream(&["Hel", "lo", " there"], None),
    );
    analyze_feedback(&state, REVIEWS.to_string(), false).await.unwrap();

    let snapshot = send_chat_message(&state, "Say hi".to_string())
        .await
        .unwrap()
        .data
        .unwrap();

    let last = snapshot.messages.last().unwrap();
    assert_eq!(last.role, ChatRole::Model);
    assert_eq!(last.text, "Hello there");
    assert_eq!(snapshot.turn_state, ChatTurnState::Settled(TurnOutcome::Completed));

    // Chat runs on the deep tier with the reviews in the system instruction.
    let call = &deep.calls()[0];
    assert!(call.streamed);
    assert!(call.system.as_deref().unwrap().contains(REVIEWS));
    assert!(call.options.thinking_budget.is_none());
}

#[tokio::test]
async fn test_history_sent_matches_transcript() {
    let (state, _, deep) = state_with(
        ScriptedProvider::new("fast-model").respond(VALID_RESULT),
        ScriptedProvider::new("deep-model")
            .stream(&["Mostly crashes."], None)
            .stream(&["Yes."], None),
    );
    analyze_feedback(&state, REVIEWS.to_string(), false).await.unwrap();

    send_chat_message(&state, "Top complaint?".to_string()).await.unwrap();
    send_chat_message(&state, "Anything else?".to_string()).await.unwrap();

    let sent: Vec<(MessageRole, String)> = deep.calls()[1]
        .messages
        .iter()
        .map(|m| (m.role, m.text.clone()))
        .collect();
    assert_eq!(
        sent,
        vec![
            (MessageRole::Model, CHAT_GREETING.to_string()),
            (MessageRole::User, "Top complaint?".to_string()),
            (MessageRole::Model, "Mostly crashes.".to_string()),
            (MessageRole::User, "Anything else?".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_mid_stream_failure_appends_apology() {
    let (state, _, _) = state_with(
        ScriptedProvider::new("fast-model").respond(VALID_RESULT),
        ScriptedProvider::new("deep-model").stream(&["Par"], Some(network_error())),
    );
    analyze_feedback(&state, REVIEWS.to_string(), false).await.unwrap();

    let snapshot = send_chat_message(&state, "Summary?".to_string())
        .await
        .unwrap()
        .data
        .unwrap();

    assert_eq!(snapshot.messages.last().unwrap().text, CHAT_APOLOGY);
    assert_eq!(snapshot.turn_state, ChatTurnState::Settled(TurnOutcome::Failed));
}

#[tokio::test]
async fn test_setup_failure_appends_apology_and_allows_retry() {
    let (state, _, _) = state_with(
        ScriptedProvider::new("fast-model").respond(VALID_RESULT),
        ScriptedProvider::new("deep-model")
            .stream(&[], Some(network_error()))
            .stream(&["Recovered."], None),
    );
    analyze_feedback(&state, REVIEWS.to_string(), false).await.unwrap();

    let failed = send_chat_message(&state, "Hello?".to_string())
        .await
        .unwrap()
        .data
        .unwrap();
    let texts: Vec<&str> = failed.messages.iter().map(|m| m.text.as_str()).collect();
    assert_eq!(texts, vec![CHAT_GREETING, "Hello?", CHAT_APOLOGY]);

    let retried = send_chat_message(&state, "Hello again?".to_string())
        .await
        .unwrap()
        .data
        .unwrap();
    assert_eq!(retried.messages.last().unwrap().text, "Recovered.");
    assert_eq!(retried.turn_state, ChatTurnState::Settled(TurnOutcome::Completed));
}

#[tokio::test]
async fn test_deep_reasoning_toggle() {
    let (state, _, deep) = state_with(
        ScriptedProvider::new("fast-model").respond(VALID_RESULT),
        ScriptedProvider::new("deep-model").stream(&["Thought about it."], None),
    );
    analyze_feedback(&state, REVIEWS.to_string(), false).await.unwrap();

    let snapshot = set_chat_deep_reasoning(&state, true).await.unwrap().data.unwrap();
    assert!(snapshot.use_deep_reasoning);

    let snapshot = send_chat_message(&state, "Why?".to_string())
        .await
        .unwrap()
        .data
        .unwrap();
    assert_eq!(snapshot.messages.last().unwrap().is_thinking, Some(true));
    assert_eq!(deep.calls()[0].options.thinking_budget, Some(DEEP_THINKING_BUDGET));
}

#[tokio::test]
async fn test_new_analysis_starts_fresh_chat() {
    let (state, _, _) = state_with(
        ScriptedProvider::new("fast-model")
            .respond(VALID_RESULT)
            .respond(VALID_RESULT),
        ScriptedProvider::new("deep-model").stream(&["Answer."], None),
    );
    analyze_feedback(&state, REVIEWS.to_string(), false).await.unwrap();
    send_chat_message(&state, "Question".to_string()).await.unwrap();
    assert_eq!(get_chat_messages(&state).await.unwrap().data.unwrap().messages.len(), 3);

    reset_analysis(&state).await.unwrap();
    assert!(!get_chat_messages(&state).await.unwrap().success);

    analyze_feedback(&state, "other reviews".to_string(), false).await.unwrap();
    let snapshot = get_chat_messages(&state).await.unwrap().data.unwrap();
    assert_eq!(snapshot.messages.len(), 1);
    assert_eq!(snapshot.messages[0].text, CHAT_GREETING);
    assert_eq!(snapshot.turn_state, ChatTurnState::Composing);
}
