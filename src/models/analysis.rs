//! Analysis Models
//!
//! The structured result of one feedback analysis, the output schema the
//! model is constrained to, and the bundled sample feedback.

use serde::{Deserialize, Serialize};

use sentilens_llm::ResponseSchema;

use crate::utils::error::{AppError, AppResult};

/// One point of the sentiment trend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentPoint {
    /// Date label, nominally `YYYY-MM-DD`
    pub date: String,
    /// Score from -1.0 (negative) to 1.0 (positive). Not clamped.
    pub sentiment: f64,
}

/// Whether a keyword signals a complaint, praise or neither
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeywordType {
    Complaint,
    Praise,
    Neutral,
}

impl KeywordType {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeywordType::Complaint => "complaint",
            KeywordType::Praise => "praise",
            KeywordType::Neutral => "neutral",
        }
    }
}

impl std::fmt::Display for KeywordType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A keyword or phrase with its frequency/importance score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordEntry {
    pub text: String,
    /// Nominally 1-100; advisory only.
    pub value: f64,
    #[serde(rename = "type")]
    pub keyword_type: KeywordType,
}

/// Executive summary of the feedback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutiveSummary {
    pub overview: String,
    pub actionable_areas: Vec<String>,
}

/// Result of one successful analysis call. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub sentiment_trend: Vec<SentimentPoint>,
    pub keywords: Vec<KeywordEntry>,
    pub summary: ExecutiveSummary,
}

impl AnalysisResult {
    /// Parse the model's JSON answer.
    ///
    /// Tolerates a markdown code fence around the object. Missing required
    /// fields or non-JSON text are `MalformedResponse`; nothing is recovered
    /// from a partial object.
    pub fn from_model_text(text: &str) -> AppResult<Self> {
        if text.trim().is_empty() {
            return Err(AppError::empty_response("model returned no text"));
        }

        let trimmed = text.trim();
        match serde_json::from_str(trimmed) {
            Ok(result) => Ok(result),
            Err(e) => match strip_code_fence(trimmed) {
                Some(inner) => serde_json::from_str(inner).map_err(|e| {
                    AppError::malformed_response(format!("analysis JSON: {}", e))
                }),
                None => Err(AppError::malformed_response(format!("analysis JSON: {}", e))),
            },
        }
    }
}

/// Body of a text that is entirely one ```json fence, without the fence.
fn strip_code_fence(trimmed: &str) -> Option<&str> {
    let inner = trimmed.strip_prefix("```")?.strip_suffix("```")?;
    // Skip optional language identifier (e.g., "json")
    let body = match inner.split_once('\n') {
        Some((_, body)) if !inner.trim_start().starts_with('{') => body,
        _ => inner,
    };
    Some(body.trim())
}

/// Output schema for the analysis call.
///
/// Field order is pinned with `propertyOrdering` so the model emits the trend
/// before the keywords and the summary last.
pub fn analysis_response_schema() -> ResponseSchema {
    let sentiment_point = ResponseSchema::object(
        None,
        vec![
            ("date", ResponseSchema::string(Some("Date in YYYY-MM-DD format"))),
            (
                "sentiment",
                ResponseSchema::number(Some(
                    "Sentiment score from -1.0 (negative) to 1.0 (positive)",
                )),
            ),
        ],
        &["date", "sentiment"],
    );

    let keyword = ResponseSchema::object(
        None,
        vec![
            ("text", ResponseSchema::string(None)),
            (
                "value",
                ResponseSchema::number(Some("Frequency or importance score (1-100)")),
            ),
            (
                "type",
                ResponseSchema::string_enum(None, &["complaint", "praise", "neutral"]),
            ),
        ],
        &["text", "value", "type"],
    );

    let summary = ResponseSchema::object(
        None,
        vec![
            (
                "overview",
                ResponseSchema::string(Some("A high-level executive summary of the feedback.")),
            ),
            (
                "actionableAreas",
                ResponseSchema::array(
                    Some("Top 3 specific, actionable areas for improvement."),
                    ResponseSchema::string(None),
                ),
            ),
        ],
        &["overview", "actionableAreas"],
    );

    ResponseSchema::object(
        None,
        vec![
            (
                "sentimentTrend",
                ResponseSchema::array(
                    Some("Daily average sentiment scores derived from the text. If dates are missing, infer a logical timeline."),
                    sentiment_point,
                ),
            ),
            (
                "keywords",
                ResponseSchema::array(
                    Some("Most frequent keywords or phrases indicating complaints or praise."),
                    keyword,
                ),
            ),
            ("summary", summary),
        ],
        &["sentimentTrend", "keywords", "summary"],
    )
}

/// Coarse status of the analysis flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    /// Input view, nothing submitted
    Idle,
    /// Waiting on the model
    Running,
    /// Dashboard view
    Success,
    /// Input view with the failure banner
    Failed,
}

impl AnalysisStatus {
    /// Check if this status ends a submission
    pub fn is_terminal(&self) -> bool {
        matches!(self, AnalysisStatus::Success | AnalysisStatus::Failed)
    }
}

impl std::fmt::Display for AnalysisStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnalysisStatus::Idle => write!(f, "idle"),
            AnalysisStatus::Running => write!(f, "running"),
            AnalysisStatus::Success => write!(f, "success"),
            AnalysisStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Full state of the analysis flow, as observed by the presentation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum AnalysisState {
    Idle,
    Running {
        use_deep_reasoning: bool,
    },
    Success {
        result: AnalysisResult,
        /// Raw text the result was produced from; grounds the chat
        context_text: String,
    },
    Failed {
        /// User-facing banner text
        message: String,
        context_text: String,
    },
}

impl AnalysisState {
    pub fn status(&self) -> AnalysisStatus {
        match self {
            AnalysisState::Idle => AnalysisStatus::Idle,
            AnalysisState::Running { .. } => AnalysisStatus::Running,
            AnalysisState::Success { .. } => AnalysisStatus::Success,
            AnalysisState::Failed { .. } => AnalysisStatus::Failed,
        }
    }
}

/// Outcome of a submit request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitOutcome {
    /// The analysis ran to `Success` or `Failed`
    Completed,
    /// Blank input, or an analysis was already running
    Ignored,
}

const SAMPLE_FEEDBACK: &str = "\
2023-10-01: I absolutely love the new interface! It's so clean and intuitive. (Sentiment: Positive)
2023-10-02: The app keeps crashing when I try to upload a photo. Please fix this ASAP. (Sentiment: Negative)
2023-10-03: Customer support was helpful, but the wait time was way too long. 45 minutes on hold! (Sentiment: Neutral)
2023-10-05: Best purchase I've made all year. The battery life is incredible. (Sentiment: Positive)
2023-10-06: I'm disappointed with the shipping speed. It took two weeks to arrive. (Sentiment: Negative)
2023-10-07: Great features, but the subscription price is a bit steep for what you get. (Sentiment: Neutral)
2023-10-08: The latest update broke the login functionality. I can't access my account. (Sentiment: Negative)
2023-10-09: Amazing build quality! Feels very premium in the hand. (Sentiment: Positive)
2023-10-10: Why did you remove the dark mode? My eyes are burning. (Sentiment: Negative)
2023-10-12: The AI suggestions are actually surprisingly good. Saved me a lot of time. (Sentiment: Positive)";

/// Built-in sample feedback the input view can load.
pub fn sample_feedback() -> &'static str {
    SAMPLE_FEEDBACK
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"{
        "sentimentTrend": [
            {"date": "2023-10-01", "sentiment": 0.9},
            {"date": "2023-10-02", "sentiment": -0.7}
        ],
        "keywords": [
            {"text": "crashing", "value": 80, "type": "complaint"},
            {"text": "interface", "value": 65, "type": "praise"}
        ],
        "summary": {
            "overview": "Mixed feedback with stability issues.",
            "actionableAreas": ["Fix upload crash", "Restore dark mode", "Speed up shipping"]
        }
    }"#;

    #[test]
    fn test_parse_valid_result() {
        let result = AnalysisResult::from_model_text(VALID).unwrap();
        assert_eq!(result.sentiment_trend.len(), 2);
        assert_eq!(result.sentiment_trend[1].sentiment, -0.7);
        assert_eq!(result.keywords[0].keyword_type, KeywordType::Complaint);
        assert_eq!(result.keywords[1].value, 65.0);
        assert_eq!(result.summary.actionable_areas.len(), 3);
    }

    #[test]
    fn test_parse_tolerates_out_of_range_values() {
        let text = r#"{"sentimentTrend": [{"date": "d1", "sentiment": 3.5}],
            "keywords": [{"text": "x", "value": 250, "type": "neutral"}],
            "summary": {"overview": "", "actionableAreas": []}}"#;
        let result = AnalysisResult::from_model_text(text).unwrap();
        assert_eq!(result.sentiment_trend[0].sentiment, 3.5);
        assert_eq!(result.keywords[0].value, 250.0);
        assert!(result.summary.actionable_areas.is_empty());
    }

    #[test]
    fn test_parse_fenced_json() {
        let fenced = format!("```json\n{}\n```", VALID);
        assert!(AnalysisResult::from_model_text(&fenced).is_ok());
    }

    #[test]
    fn test_parse_backticks_inside_string_value() {
        let text = r#"{"sentimentTrend": [], "keywords": [], "summary": {"overview": "Users say ```code``` blocks break", "actionableAreas": []}}"#;
        let result = AnalysisResult::from_model_text(text).unwrap();
        assert_eq!(result.summary.overview, "Users say ```code``` blocks break");

        let fenced = format!("```json\n{}\n```", text);
        let result = AnalysisResult::from_model_text(&fenced).unwrap();
        assert_eq!(result.summary.overview, "Users say ```code``` blocks break");
    }

    #[test]
    fn test_parse_fence_without_language_line() {
        let fenced = format!("```{}```", VALID);
        assert!(AnalysisResult::from_model_text(&fenced).is_ok());
        // A fence that does not wrap the whole text is not stripped.
        let trailing = format!("{}\n```", VALID);
        assert!(matches!(
            AnalysisResult::from_model_text(&trailing),
            Err(AppError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_parse_empty_text_is_empty_response() {
        assert!(matches!(
            AnalysisResult::from_model_text("   "),
            Err(AppError::EmptyResponse(_))
        ));
    }

    #[test]
    fn test_parse_missing_summary_is_malformed() {
        let text = r#"{"sentimentTrend": [], "keywords": []}"#;
        assert!(matches!(
            AnalysisResult::from_model_text(text),
            Err(AppError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_parse_non_json_is_malformed() {
        assert!(matches!(
            AnalysisResult::from_model_text("The reviews are mostly positive."),
            Err(AppError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_parse_unknown_keyword_type_is_malformed() {
        let text = r#"{"sentimentTrend": [],
            "keywords": [{"text": "x", "value": 1, "type": "angry"}],
            "summary": {"overview": "o", "actionableAreas": []}}"#;
        assert!(matches!(
            AnalysisResult::from_model_text(text),
            Err(AppError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_wire_names_are_camel_case() {
        let result = AnalysisResult::from_model_text(VALID).unwrap();
        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("sentimentTrend").is_some());
        assert_eq!(json["keywords"][0]["type"], "complaint");
        assert!(json["summary"].get("actionableAreas").is_some());
    }

    #[test]
    fn test_schema_shape() {
        let schema = serde_json::to_value(analysis_response_schema()).unwrap();
        assert_eq!(schema["type"], "OBJECT");
        assert_eq!(
            schema["required"],
            serde_json::json!(["sentimentTrend", "keywords", "summary"])
        );
        assert_eq!(
            schema["propertyOrdering"],
            serde_json::json!(["sentimentTrend", "keywords", "summary"])
        );

        let trend_item = &schema["properties"]["sentimentTrend"]["items"];
        assert_eq!(trend_item["required"], serde_json::json!(["date", "sentiment"]));
        assert_eq!(trend_item["properties"]["sentiment"]["type"], "NUMBER");

        let keyword_item = &schema["properties"]["keywords"]["items"];
        assert_eq!(
            keyword_item["properties"]["type"]["enum"],
            serde_json::json!(["complaint", "praise", "neutral"])
        );

        let summary = &schema["properties"]["summary"];
        assert_eq!(summary["properties"]["actionableAreas"]["type"], "ARRAY");
        assert_eq!(summary["properties"]["actionableAreas"]["items"]["type"], "STRING");
    }

    #[test]
    fn test_analysis_state_status() {
        assert_eq!(AnalysisState::Idle.status(), AnalysisStatus::Idle);
        let running = AnalysisState::Running {
            use_deep_reasoning: true,
        };
        assert_eq!(running.status(), AnalysisStatus::Running);
        assert!(!running.status().is_terminal());

        let failed = AnalysisState::Failed {
            message: "banner".to_string(),
            context_text: "reviews".to_string(),
        };
        assert!(failed.status().is_terminal());
        assert_eq!(failed.status().to_string(), "failed");

        let json = serde_json::to_value(&failed).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["contextText"], "reviews");
        assert!(json.get("context_text").is_none());

        let json = serde_json::to_value(&running).unwrap();
        assert_eq!(json["status"], "running");
        assert_eq!(json["useDeepReasoning"], true);
    }

    #[test]
    fn test_sample_feedback() {
        let sample = sample_feedback();
        assert_eq!(sample.lines().count(), 10);
        assert!(sample.starts_with("2023-10-01:"));
        assert!(sample.ends_with("Saved me a lot of time. (Sentiment: Positive)"));
        assert_eq!(sample, sample.trim());
    }
}
