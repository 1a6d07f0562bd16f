//! Merkledrop Settings
//!
//! Application configuration management for merkledrop tooling.
//!
//! ## Features
//!
//! - Storage settings (data directory, state file)
//! - Distribution defaults (issuer identity, recipients file)
//! - Cross-platform config file storage
//! - JSON serialization
//!
//! ## Usage
//!
//! ```no_run
//! use merkledrop_settings::Settings;
//!
//! // Load or create default settings
//! let settings = Settings::load_or_default()?;
//!
//! // Modify settings
//! let mut settings = settings;
//! settings.storage.state_file = "airdrop.json".to_string();
//!
//! // Save settings
//! settings.save()?;
//! # Ok::<(), merkledrop_settings::SettingsError>(())
//! ```

mod config;

pub use config::{DistributionSettings, Settings, StorageSettings};

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Failed to read settings: {0}")]
    ReadError(std::io::Error),

    #[error("Failed to write settings: {0}")]
    WriteError(std::io::Error),

    #[error("Failed to parse settings: {0}")]
    ParseError(serde_json::Error),

    #[error("Failed to create config directory: {0}")]
    CreateDirError(std::io::Error),
}

pub type Result<T> = std::result::Result<T, SettingsError>;

/// Get the default config directory
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("merkledrop")
}

/// Get the default settings file path
pub fn default_settings_path() -> PathBuf {
    default_config_dir().join("settings.json")
}
