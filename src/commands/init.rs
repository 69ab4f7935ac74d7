//! Initialization Commands
//!
//! Commands for application initialization and setup.

use crate::models::response::CommandResponse;
use crate::state::AppState;

/// Load configuration and build the model gateway
pub async fn init_app(state: &AppState) -> Result<CommandResponse<String>, String> {
    match state.initialize().await {
        Ok(_) => Ok(CommandResponse::ok(
            "Application initialized successfully".to_string(),
        )),
        Err(e) => Ok(CommandResponse::err(e.to_string())),
    }
}

/// Get the application version
pub fn get_version() -> CommandResponse<String> {
    CommandResponse::ok(env!("CARGO_PKG_VERSION").to_string())
}
