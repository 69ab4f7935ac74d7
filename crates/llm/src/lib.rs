//! Sentilens LLM
//!
//! Provider abstraction for generative-model calls, with the Gemini
//! implementation:
//! - single-shot and schema-constrained generation
//! - streamed generation with optional thinking budget
//!
//! Also includes the Gemini stream adapter, the fragment stream handed to
//! callers, and the HTTP client factory.

pub mod fragment_stream;
pub mod gemini;
pub mod http_client;
pub mod provider;
pub mod streaming_adapters;
pub mod types;

// Re-export main types
pub use fragment_stream::{FragmentStream, StreamError};
pub use gemini::GeminiProvider;
pub use http_client::build_http_client;
pub use provider::LlmProvider;
pub use types::*;

// Re-export streaming adapters
pub use streaming_adapters::GeminiAdapter;
