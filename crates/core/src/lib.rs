//! Sentilens Core
//!
//! Foundational types shared by the Sentilens workspace crates. This crate has
//! no dependency on HTTP clients, async runtimes or the model gateway.
//!
//! ## Module Organization
//!
//! - `error` - Core error types (`CoreError`, `CoreResult`)
//! - `proxy` - Proxy configuration shared by every HTTP-using crate
//! - `streaming` - Unified stream event types and adapter trait

pub mod error;
pub mod proxy;
pub mod streaming;

// ── Error Types ────────────────────────────────────────────────────────
pub use error::{CoreError, CoreResult};

// ── Proxy Types ────────────────────────────────────────────────────────
pub use proxy::{ProxyConfig, ProxyProtocol};

// ── Streaming Types ────────────────────────────────────────────────────
pub use streaming::{AdapterError, StreamAdapter, UnifiedStreamEvent};
