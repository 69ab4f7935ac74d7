//! Analysis Commands
//!
//! Submitting feedback, reading the analysis state and the dashboard built
//! from a successful result.

use crate::models::analysis::{sample_feedback, AnalysisState};
use crate::models::dashboard::DashboardSummary;
use crate::models::response::CommandResponse;
use crate::state::AppState;

/// Analyze feedback text and wait for the result.
///
/// Blank text leaves the state untouched. A failed analysis is reported
/// through the returned state, not as an error response.
pub async fn analyze_feedback(
    state: &AppState,
    text: String,
    use_deep_reasoning: bool,
) -> Result<CommandResponse<AnalysisState>, String> {
    Ok(state.analyze_feedback(&text, use_deep_reasoning).await.into())
}

pub async fn get_analysis_state(
    state: &AppState,
) -> Result<CommandResponse<AnalysisState>, String> {
    Ok(state.analysis_state().await.into())
}

/// Discard the result or failure and return to the input view
pub async fn reset_analysis(state: &AppState) -> Result<CommandResponse<AnalysisState>, String> {
    Ok(state.reset_analysis().await.into())
}

/// Derived dashboard figures for the current result
pub async fn get_dashboard(state: &AppState) -> Result<CommandResponse<DashboardSummary>, String> {
    Ok(state.dashboard().await.into())
}

/// The built-in sample dataset for the input view
pub fn load_sample_feedback() -> CommandResponse<String> {
    CommandResponse::ok(sample_feedback().to_string())
}
