//! Sentilens - Customer Feedback Analysis Backend
//!
//! This library provides the backend for the Sentilens application.
//! It includes:
//! - Command handlers for the presentation layer
//! - The model gateway and the analysis and chat orchestrators
//! - Storage for the optional configuration file
//! - Data models and utilities

pub mod commands;
pub mod models;
pub mod services;
pub mod state;
pub mod storage;
pub mod utils;

// Re-export commonly used items from commands
pub use commands::{
    // Init commands
    init_app, get_version,
    // Health commands
    get_health, list_models,
    // Settings commands
    get_settings, update_settings,
    // Analysis commands
    analyze_feedback, get_analysis_state, reset_analysis, get_dashboard, load_sample_feedback,
    // Chat commands
    send_chat_message, get_chat_messages, set_chat_deep_reasoning,
};
// Re-export models (avoiding settings module conflict)
pub use models::response::*;
pub use models::settings::{AppConfig, SettingsUpdate};
pub use services::{ChatSnapshot, GatewayConfig, ModelGateway};
pub use state::AppState;
pub use utils::error::{AppError, AppResult};
