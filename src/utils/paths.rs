//! Cross-Platform Path Utilities
//!
//! Resolves the Sentilens config directory (~/.sentilens/).

use std::path::{Path, PathBuf};

use crate::utils::error::{AppError, AppResult};

/// Get the user's home directory
pub fn home_dir() -> AppResult<PathBuf> {
    dirs::home_dir().ok_or_else(|| AppError::config("Could not determine home directory"))
}

/// Get the Sentilens directory (~/.sentilens/)
pub fn sentilens_dir() -> AppResult<PathBuf> {
    Ok(home_dir()?.join(".sentilens"))
}

/// Get the config file path (~/.sentilens/config.json)
pub fn config_path() -> AppResult<PathBuf> {
    Ok(sentilens_dir()?.join("config.json"))
}

/// Ensure a directory exists, creating it if necessary
pub fn ensure_dir(path: &Path) -> AppResult<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}
