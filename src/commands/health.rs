//! Health Check Commands
//!
//! Commands for checking the configuration and the model service.

use crate::models::response::{CommandResponse, HealthResponse};
use crate::state::AppState;

/// Get the health status of the configuration and the model gateway
pub async fn get_health(state: &AppState) -> Result<CommandResponse<HealthResponse>, String> {
    let mut health = HealthResponse::default();

    health.config = state.is_config_healthy().await;

    match state.gateway().await {
        Ok(gateway) => match gateway.health_check().await {
            Ok(()) => health.gateway = true,
            Err(e) => health.detail = Some(e.to_string()),
        },
        Err(e) => health.detail = Some(e.to_string()),
    }

    health.status = if health.gateway && health.config {
        "healthy".to_string()
    } else {
        "degraded".to_string()
    };

    Ok(CommandResponse::ok(health))
}

/// List the model ids the service offers
pub async fn list_models(state: &AppState) -> Result<CommandResponse<Vec<String>>, String> {
    let result = match state.gateway().await {
        Ok(gateway) => gateway.list_models().await,
        Err(e) => Err(e),
    };
    Ok(result.into())
}
