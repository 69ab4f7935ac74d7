//! Analysis Integration Tests
//!
//! Submitting feedback through the commands and reading the resulting
//! state and dashboard.

use sentilens::models::analysis::{AnalysisState, AnalysisStatus};
use sentilens::models::dashboard::SentimentBand;
use sentilens::services::analysis::ANALYSIS_FAILED_MESSAGE;
use sentilens::services::gateway::{ANALYSIS_MAX_CHARS, DEEP_THINKING_BUDGET};
use sentilens::{analyze_feedback, get_analysis_state, get_dashboard, reset_analysis};
use sentilens_llm::{LlmError, MessageRole};

use crate::support::{state_with, ScriptedProvider, VALID_RESULT};

// ============================================================================
// Submission
// ============================================================================

#[tokio::test]
async fn test_submit_uses_fast_tier_without_thinking() {
    let (state, fast, deep) = state_with(
        ScriptedProvider::new("fast-model").respond(VALID_RESULT),
        ScriptedProvider::new("deep-model"),
    );

    let response = analyze_feedback(&state, "Great product!".to_string(), false)
        .await
        .unwrap();
    assert!(response.success);
    assert_eq!(response.data.unwrap().status(), AnalysisStatus::Success);

    let calls = fast.calls();
    assert_eq!(calls.len(), 1);
    assert!(deep.calls().is_empty());

    let call = &calls[0];
    assert_eq!(call.messages.len(), 1);
    assert_eq!(call.messages[0].role, MessageRole::User);
    assert!(call.messages[0].text.ends_with("REVIEWS:\nGreat product!"));
    assert!(call.system.is_none());
    assert!((call.options.temperature.unwrap() - 0.5).abs() < f32::EPSILON);
    assert!(call.options.thinking_budget.is_none());
    assert_eq!(call.options.response_mime_type.as_deref(), Some("application/json"));
    assert!(call.options.response_schema.is_some());
}

#[tokio::test]
async fn test_deep_submit_sets_budget_only() {
    let (state, fast, deep) = state_with(
        ScriptedProvider::new("fast-model"),
        ScriptedProvider::new("deep-model").respond(VALID_RESULT),
    );

    analyze_feedback(&state, "Great product!".to_string(), true)
        .await
        .unwrap();

    assert!(fast.calls().is_empty());
    let call = &deep.calls()[0];
    assert_eq!(call.options.thinking_budget, Some(DEEP_THINKING_BUDGET));
    assert!(call.options.max_output_tokens.is_none());
}

#[tokio::test]
async fn test_blank_submit_makes_no_call() {
    let (state, fast, deep) = state_with(
        ScriptedProvider::new("fast-model"),
        ScriptedProvider::new("deep-model"),
    );

    for blank in ["", "   ", "\n\t "] {
        let response = analyze_feedback(&state, blank.to_string(), false).await.unwrap();
        assert_eq!(response.data, Some(AnalysisState::Idle));
    }
    assert!(fast.calls().is_empty());
    assert!(deep.calls().is_empty());
}

#[tokio::test]
async fn test_long_input_truncated_to_limit() {
    let (state, fast, _) = state_with(
        ScriptedProvider::new("fast-model").respond(VALID_RESULT),
        ScriptedProvider::new("deep-model"),
    );

    let input = "é".repeat(ANALYSIS_MAX_CHARS + 5);
    analyze_feedback(&state, input.clone(), false).await.unwrap();

    let sent = &fast.calls()[0].messages[0].text;
    let reviews = sent.rsplit("REVIEWS:\n").next().unwrap();
    assert_eq!(reviews.chars().count(), ANALYSIS_MAX_CHARS);

    // The chat is grounded in the full submitted text.
    let state_after = get_analysis_state(&state).await.unwrap().data.unwrap();
    match state_after {
        AnalysisState::Success { context_text, .. } => assert_eq!(context_text, input),
        other => panic!("unexpected state: {:?}", other),
    }
}

// ============================================================================
// Results and failures
// ============================================================================

#[tokio::test]
async fn test_all_empty_result_renders_dashboard() {
    let empty = r#"{"sentimentTrend": [], "keywords": [], "summary": {"overview": "", "actionableAreas": []}}"#;
    let (state, _, _) = state_with(
        ScriptedProvider::new("fast-model").respond(empty),
        ScriptedProvider::new("deep-model"),
    );

    analyze_feedback(&state, "meh".to_string(), false).await.unwrap();

    let dashboard = get_dashboard(&state).await.unwrap().data.unwrap();
    assert_eq!(dashboard.data_points, 0);
    assert_eq!(dashboard.average_sentiment, 0.0);
    assert_eq!(dashboard.sentiment_band, SentimentBand::Neutral);
    assert!(dashboard.trend.is_empty());
    assert!(dashboard.keyword_cloud.is_empty());
    assert!(dashboard.actionable_areas.is_empty());
}

#[tokio::test]
async fn test_dashboard_from_result() {
    let (state, _, _) = state_with(
        ScriptedProvider::new("fast-model").respond(VALID_RESULT),
        ScriptedProvider::new("deep-model"),
    );

    analyze_feedback(&state, "reviews".to_string(), false).await.unwrap();

    let dashboard = get_dashboard(&state).await.unwrap().data.unwrap();
    assert_eq!(dashboard.data_points, 3);
    assert_eq!(dashboard.top_complaint, "crashing");
    assert_eq!(dashboard.top_praise, "interface");
    assert_eq!(dashboard.keyword_cloud[0].text, "crashing");
    assert_eq!(dashboard.trend[0].label, "10-01");
}

#[tokio::test]
async fn test_malformed_response_fails_with_banner() {
    let (state, _, _) = state_with(
        ScriptedProvider::new("fast-model").respond("{not json"),
        ScriptedProvider::new("deep-model"),
    );

    let response = analyze_feedback(&state, "reviews".to_string(), false)
        .await
        .unwrap();
    assert!(response.success);
    match response.data.unwrap() {
        AnalysisState::Failed { message, context_text } => {
            assert!(!message.is_empty());
            assert_eq!(message, ANALYSIS_FAILED_MESSAGE);
            assert_eq!(context_text, "reviews");
        }
        other => panic!("unexpected state: {:?}", other),
    }

    let dashboard = get_dashboard(&state).await.unwrap();
    assert!(!dashboard.success);
}

#[tokio::test]
async fn test_transport_failure_fails_with_banner() {
    let (state, _, _) = state_with(
        ScriptedProvider::new("fast-model").fail(LlmError::AuthenticationFailed {
            message: "API key not valid".to_string(),
        }),
        ScriptedProvider::new("deep-model"),
    );

    let response = analyze_feedback(&state, "reviews".to_string(), false)
        .await
        .unwrap();
    assert_eq!(response.data.unwrap().status(), AnalysisStatus::Failed);
}

#[tokio::test]
async fn test_reset_returns_to_idle() {
    let (state, _, _) = state_with(
        ScriptedProvider::new("fast-model").respond(VALID_RESULT),
        ScriptedProvider::new("deep-model"),
    );

    // Nothing to reset yet.
    assert!(!reset_analysis(&state).await.unwrap().success);

    analyze_feedback(&state, "reviews".to_string(), false).await.unwrap();
    let response = reset_analysis(&state).await.unwrap();
    assert_eq!(response.data, Some(AnalysisState::Idle));
    assert!(!get_dashboard(&state).await.unwrap().success);
}
