//! Gemini API Adapter
//!
//! Handles the SSE format returned by `streamGenerateContent?alt=sse`. Every
//! `data:` line carries a complete `GenerateContentResponse` chunk; text parts
//! flagged `thought: true` are thought summaries rather than answer text.

use crate::gemini::wire::GenerateContentResponse;
use sentilens_core::streaming::{AdapterError, StreamAdapter, UnifiedStreamEvent};

/// Adapter for Gemini API SSE format
pub struct GeminiAdapter {
    model: String,
    in_thinking: bool,
}

impl GeminiAdapter {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            in_thinking: false,
        }
    }

    fn close_thinking(&mut self, events: &mut Vec<UnifiedStreamEvent>) {
        if self.in_thinking {
            self.in_thinking = false;
            events.push(UnifiedStreamEvent::ThinkingEnd { thinking_id: None });
        }
    }
}

impl StreamAdapter for GeminiAdapter {
    fn provider_name(&self) -> &'static str {
        "gemini"
    }

    fn supports_thinking(&self) -> bool {
        crate::gemini::model_supports_thinking(&self.model)
    }

    fn adapt(&mut self, input: &str) -> Result<Vec<UnifiedStreamEvent>, AdapterError> {
        let trimmed = input.trim();

        // SSE streams may also carry event:, id:, retry: and comment lines.
        let json_str = if let Some(rest) = trimmed.strip_prefix("data:") {
            rest.trim_start()
        } else if trimmed.starts_with('{') {
            trimmed
        } else {
            return Ok(vec![]);
        };

        if json_str.is_empty() || json_str == "[DONE]" {
            return Ok(vec![]);
        }

        let chunk: GenerateContentResponse =
            serde_json::from_str(json_str).map_err(|e| AdapterError::ParseError(e.to_string()))?;

        let mut events = Vec::new();

        if let Some(error) = chunk.error {
            self.close_thinking(&mut events);
            events.push(UnifiedStreamEvent::Error {
                message: error
                    .message
                    .unwrap_or_else(|| "Gemini stream reported an error".to_string()),
                code: error.status,
            });
            return Ok(events);
        }

        let mut finish_reason = None;
        if let Some(candidate) = chunk.candidates.into_iter().next() {
            if let Some(content) = candidate.content {
                for part in content.parts {
                    let Some(text) = part.text else { continue };
                    if text.is_empty() {
                        continue;
                    }
                    if part.thought {
                        if !self.in_thinking {
                            self.in_thinking = true;
                            events.push(UnifiedStreamEvent::ThinkingStart { thinking_id: None });
                        }
                        events.push(UnifiedStreamEvent::ThinkingDelta {
                            content: text,
                            thinking_id: None,
                        });
                    } else {
                        self.close_thinking(&mut events);
                        events.push(UnifiedStreamEvent::TextDelta { content: text });
                    }
                }
            }
            finish_reason = candidate.finish_reason;
        } else if let Some(reason) = chunk.prompt_feedback.and_then(|f| f.block_reason) {
            // A blocked prompt arrives as a chunk with no candidates.
            events.push(UnifiedStreamEvent::Error {
                message: format!("Prompt blocked: {}", reason),
                code: Some("BLOCKED".to_string()),
            });
            return Ok(events);
        }

        if let Some(usage) = chunk.usage_metadata {
            events.push(UnifiedStreamEvent::Usage {
                input_tokens: usage.prompt_token_count,
                output_tokens: usage.candidates_token_count,
                thinking_tokens: usage.thoughts_token_count,
            });
        }

        if let Some(reason) = finish_reason {
            self.close_thinking(&mut events);
            events.push(UnifiedStreamEvent::Complete {
                stop_reason: Some(reason),
            });
        }

        Ok(events)
    }
}
