//! Settings Integration Tests
//!
//! The configuration file and settings commands.

use std::sync::Arc;

use sentilens::models::settings::{AppConfig, SettingsUpdate};
use sentilens::services::gateway::LlmGateway;
use sentilens::storage::ConfigService;
use sentilens::{get_health, get_settings, update_settings, AppState};
use tempfile::TempDir;

use crate::support::ScriptedProvider;

fn state_with_config(dir: &TempDir) -> AppState {
    let config = ConfigService::with_path(dir.path().join("config.json")).unwrap();
    let gateway = LlmGateway::with_providers(
        Arc::new(ScriptedProvider::new("fast-model")),
        Arc::new(ScriptedProvider::new("deep-model")),
    );
    AppState::with_services(Some(config), Arc::new(gateway))
}

#[tokio::test]
async fn test_defaults_without_file() {
    let dir = TempDir::new().unwrap();
    let state = state_with_config(&dir);

    let config = get_settings(&state).await.unwrap().data.unwrap();
    assert_eq!(config, AppConfig::default());
    assert!(!dir.path().join("config.json").exists());
}

#[tokio::test]
async fn test_update_persists_and_reloads() {
    let dir = TempDir::new().unwrap();
    let state = state_with_config(&dir);

    let update = SettingsUpdate {
        fast_model: Some("gemini-2.5-flash-lite".to_string()),
        request_timeout_secs: Some(60),
        ..Default::default()
    };
    let response = update_settings(&state, update).await.unwrap();
    assert!(response.success, "{:?}", response.error);
    assert_eq!(response.data.unwrap().fast_model, "gemini-2.5-flash-lite");

    let reloaded = ConfigService::with_path(dir.path().join("config.json")).unwrap();
    assert_eq!(reloaded.get_config().fast_model, "gemini-2.5-flash-lite");
    assert_eq!(reloaded.get_config().request_timeout_secs, 60);
}

#[tokio::test]
async fn test_invalid_update_rejected() {
    let dir = TempDir::new().unwrap();
    let state = state_with_config(&dir);

    let update = SettingsUpdate {
        deep_model: Some(String::new()),
        ..Default::default()
    };
    let response = update_settings(&state, update).await.unwrap();
    assert!(!response.success);

    let config = get_settings(&state).await.unwrap().data.unwrap();
    assert_eq!(config.deep_model, AppConfig::default().deep_model);
}

#[tokio::test]
async fn test_health_with_scripted_gateway() {
    let dir = TempDir::new().unwrap();
    let state = state_with_config(&dir);

    let health = get_health(&state).await.unwrap().data.unwrap();
    assert!(health.config);
    assert!(health.gateway);
    assert_eq!(health.status, "healthy");
}
