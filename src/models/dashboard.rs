//! Dashboard View Model
//!
//! Figures derived from an `AnalysisResult` for rendering. Presentation-neutral:
//! no colors or layout, only the numbers and labels the views show.

use serde::{Deserialize, Serialize};

use super::analysis::{AnalysisResult, KeywordEntry, KeywordType};

const NO_COMPLAINTS: &str = "No major complaints";
const NO_PRAISES: &str = "No major praises";

/// Keywords shown in the cloud
const KEYWORD_CLOUD_LIMIT: usize = 30;

/// Band boundary for the average sentiment
const SENTIMENT_BAND_THRESHOLD: f64 = 0.2;

/// Coarse label for the average sentiment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentBand {
    Positive,
    Neutral,
    Negative,
}

impl SentimentBand {
    pub fn from_score(score: f64) -> Self {
        if score > SENTIMENT_BAND_THRESHOLD {
            SentimentBand::Positive
        } else if score < -SENTIMENT_BAND_THRESHOLD {
            SentimentBand::Negative
        } else {
            SentimentBand::Neutral
        }
    }
}

/// One chart point with its short axis label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendPoint {
    pub date: String,
    /// `MM-DD` for ISO dates, otherwise the raw date
    pub label: String,
    pub sentiment: f64,
}

/// One keyword-cloud entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudWord {
    pub text: String,
    pub value: f64,
    #[serde(rename = "type")]
    pub keyword_type: KeywordType,
    /// Position of `value` between the cloud's min and max, in [0, 1]
    pub weight: f64,
    /// Relative font scale, `0.8 + 1.5 * weight`
    pub scale: f64,
}

/// Everything the dashboard renders
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub average_sentiment: f64,
    pub sentiment_band: SentimentBand,
    pub data_points: usize,
    pub top_complaint: String,
    pub top_praise: String,
    pub trend: Vec<TrendPoint>,
    pub keyword_cloud: Vec<CloudWord>,
    pub overview: String,
    pub actionable_areas: Vec<String>,
}

impl DashboardSummary {
    pub fn from_result(result: &AnalysisResult) -> Self {
        let data_points = result.sentiment_trend.len();
        let total: f64 = result.sentiment_trend.iter().map(|p| p.sentiment).sum();
        let average_sentiment = total / data_points.max(1) as f64;

        Self {
            average_sentiment,
            sentiment_band: SentimentBand::from_score(average_sentiment),
            data_points,
            top_complaint: first_of_type(&result.keywords, KeywordType::Complaint, NO_COMPLAINTS),
            top_praise: first_of_type(&result.keywords, KeywordType::Praise, NO_PRAISES),
            trend: result
                .sentiment_trend
                .iter()
                .map(|p| TrendPoint {
                    date: p.date.clone(),
                    label: axis_label(&p.date),
                    sentiment: p.sentiment,
                })
                .collect(),
            keyword_cloud: keyword_cloud(&result.keywords),
            overview: result.summary.overview.clone(),
            actionable_areas: result.summary.actionable_areas.clone(),
        }
    }
}

fn first_of_type(keywords: &[KeywordEntry], wanted: KeywordType, fallback: &str) -> String {
    keywords
        .iter()
        .find(|k| k.keyword_type == wanted)
        .map(|k| k.text.as_str())
        .filter(|text| !text.is_empty())
        .unwrap_or(fallback)
        .to_string()
}

/// Drop the `YYYY-` prefix of an ISO date.
fn axis_label(date: &str) -> String {
    match date.char_indices().nth(5) {
        Some((idx, _)) => date[idx..].to_string(),
        None => date.to_string(),
    }
}

/// Top keywords by value, weighted relative to each other.
fn keyword_cloud(keywords: &[KeywordEntry]) -> Vec<CloudWord> {
    let mut sorted: Vec<&KeywordEntry> = keywords.iter().collect();
    // Stable, so equal values keep their original order.
    sorted.sort_by(|a, b| {
        b.value
            .partial_cmp(&a.value)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    sorted.truncate(KEYWORD_CLOUD_LIMIT);

    let max = sorted.iter().map(|k| k.value).fold(f64::NEG_INFINITY, f64::max);
    let min = sorted.iter().map(|k| k.value).fold(f64::INFINITY, f64::min);
    let range = if max - min == 0.0 { 1.0 } else { max - min };

    sorted
        .into_iter()
        .map(|k| {
            let weight = (k.value - min) / range;
            CloudWord {
                text: k.text.clone(),
                value: k.value,
                keyword_type: k.keyword_type,
                weight,
                scale: 0.8 + 1.5 * weight,
            }
        })
        .collect()
}
