//! Scripted LLM provider and state builders for integration tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sentilens::services::gateway::LlmGateway;
use sentilens::AppState;
use sentilens_core::streaming::UnifiedStreamEvent;
use sentilens_llm::{
    GenerationOptions, LlmError, LlmProvider, LlmResponse, LlmResult, Message, StopReason,
    UsageStats,
};
use tokio::sync::mpsc;

pub const VALID_RESULT: &str = r#"{
    "sentimentTrend": [
        {"date": "2023-10-01", "sentiment": 0.9},
        {"date": "2023-10-02", "sentiment": -0.7},
        {"date": "2023-10-03", "sentiment": 0.1}
    ],
    "keywords": [
        {"text": "crashing", "value": 85, "type": "complaint"},
        {"text": "interface", "value": 70, "type": "praise"},
        {"text": "support", "value": 40, "type": "neutral"}
    ],
    "summary": {
        "overview": "Customers like the design but report stability issues.",
        "actionableAreas": ["Fix the upload crash", "Restore dark mode"]
    }
}"#;

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub messages: Vec<Message>,
    pub system: Option<String>,
    pub options: GenerationOptions,
    pub streamed: bool,
}

/// One scripted streaming answer: fragments, then an optional failure
pub type StreamScript = (Vec<String>, Option<LlmError>);

/// Provider answering from queues and recording every call
pub struct ScriptedProvider {
    model: String,
    responses: Mutex<Vec<LlmResult<String>>>,
    streams: Mutex<Vec<StreamScript>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedProvider {
    pub fn new(model: &str) -> Self {
        Self {
            model: model.to_string(),
            responses: Mutex::new(Vec::new()),
            streams: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn respond(self, text: &str) -> Self {
        self.responses.lock().unwrap().push(Ok(text.to_string()));
        self
    }

    pub fn fail(self, error: LlmError) -> Self {
        self.responses.lock().unwrap().push(Err(error));
        self
    }

    pub fn stream(self, fragments: &[&str], failure: Option<LlmError>) -> Self {
        self.streams.lock().unwrap().push((
            fragments.iter().map(|f| f.to_string()).collect(),
            failure,
        ));
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, messages: Vec<Message>, system: Option<String>, options: GenerationOptions, streamed: bool) {
        self.calls.lock().unwrap().push(RecordedCall {
            messages,
            system,
            options,
            streamed,
        });
    }

    fn response(&self, content: String) -> LlmResponse {
        LlmResponse {
            content: Some(content),
            thinking: None,
            stop_reason: StopReason::EndTurn,
            usage: UsageStats::default(),
            model: self.model.clone(),
        }
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn supports_thinking(&self) -> bool {
        true
    }

    async fn send_message(
        &self,
        messages: Vec<Message>,
        system: Option<String>,
        options: GenerationOptions,
    ) -> LlmResult<LlmResponse> {
        options.validate()?;
        self.record(messages, system, options, false);
        let next = {
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                Err(LlmError::Other {
                    message: "No more scripted responses".to_string(),
                })
            } else {
                responses.remove(0)
            }
        };
        next.map(|text| self.response(text))
    }

    async fn stream_message(
        &self,
        messages: Vec<Message>,
        system: Option<String>,
        tx: mpsc::Sender<UnifiedStreamEvent>,
        options: GenerationOptions,
    ) -> LlmResult<LlmResponse> {
        options.validate()?;
        self.record(messages, system, options, true);
        let (fragments, failure) = {
            let mut streams = self.streams.lock().unwrap();
            if streams.is_empty() {
                (Vec::new(), Some(LlmError::NetworkError {
                    message: "No more scripted streams".to_string(),
                }))
            } else {
                streams.remove(0)
            }
        };

        let mut full = String::new();
        for fragment in fragments {
            full.push_str(&fragment);
            let _ = tx.send(UnifiedStreamEvent::TextDelta { content: fragment }).await;
        }
        match failure {
            Some(err) => Err(err),
            None => Ok(self.response(full)),
        }
    }

    async fn health_check(&self) -> LlmResult<()> {
        Ok(())
    }
}

/// App state over a gateway built from the two scripted tiers
pub fn state_with(
    fast: ScriptedProvider,
    deep: ScriptedProvider,
) -> (AppState, Arc<ScriptedProvider>, Arc<ScriptedProvider>) {
    let fast = Arc::new(fast);
    let deep = Arc::new(deep);
    let gateway = LlmGateway::with_providers(fast.clone(), deep.clone());
    (AppState::with_services(None, Arc::new(gateway)), fast, deep)
}
