//! JSON Configuration Management
//!
//! Handles reading and writing the optional configuration file and overlaying
//! environment variables on top of it.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::models::settings::{AppConfig, SettingsUpdate};
use crate::utils::error::{AppError, AppResult};
use crate::utils::paths::{config_path, ensure_dir};

/// Configuration service for managing app settings
#[derive(Debug)]
pub struct ConfigService {
    config_path: PathBuf,
    config: AppConfig,
}

impl ConfigService {
    /// Load `~/.sentilens/config.json`, or defaults if the file is absent.
    ///
    /// The file is not created until settings are first saved.
    pub fn new() -> AppResult<Self> {
        Self::with_path(config_path()?)
    }

    /// Load configuration from an explicit path, or defaults if it is absent
    pub fn with_path(config_path: PathBuf) -> AppResult<Self> {
        let config = if config_path.exists() {
            info!(path = %config_path.display(), "loading config file");
            Self::load_from_file(&config_path)?
        } else {
            debug!(path = %config_path.display(), "no config file, using defaults");
            AppConfig::default()
        };

        Ok(Self {
            config_path,
            config,
        })
    }

    /// Load configuration from a file
    fn load_from_file(path: &Path) -> AppResult<AppConfig> {
        let content = fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&content)?;
        config.validate().map_err(AppError::validation)?;
        Ok(config)
    }

    /// Save configuration to a file with pretty formatting
    fn save_to_file(path: &Path, config: &AppConfig) -> AppResult<()> {
        config.validate().map_err(AppError::validation)?;
        if let Some(parent) = path.parent() {
            ensure_dir(parent)?;
        }
        let content = serde_json::to_string_pretty(config)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Get the current configuration
    pub fn get_config(&self) -> &AppConfig {
        &self.config
    }

    /// Get a clone of the current configuration
    pub fn get_config_clone(&self) -> AppConfig {
        self.config.clone()
    }

    /// File configuration with `SENTILENS_*` environment overrides applied.
    ///
    /// Overrides are never written back to the file.
    pub fn resolved_config<F>(&self, lookup: F) -> AppResult<AppConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = self.config.clone();
        config.apply_env_overrides(lookup).map_err(AppError::config)?;
        config.validate().map_err(AppError::validation)?;
        Ok(config)
    }

    /// Update the configuration with a partial update
    ///
    /// Nothing changes, in memory or on disk, if the result does not validate.
    pub fn update_config(&mut self, update: SettingsUpdate) -> AppResult<AppConfig> {
        let mut updated = self.config.clone();
        updated.apply_update(update);
        Self::save_to_file(&self.config_path, &updated)?;
        self.config = updated;
        Ok(self.config.clone())
    }

    /// Path the configuration is read from and saved to
    pub fn path(&self) -> &Path {
        &self.config_path
    }
}
