//! Storage Layer
//!
//! The optional JSON configuration file. Analyses and chats are never persisted.

pub mod config;

pub use config::ConfigService;
