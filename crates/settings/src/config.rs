//! Configuration types

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{default_config_dir, default_settings_path, Result, SettingsError};

/// Main settings structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Storage settings
    #[serde(default)]
    pub storage: StorageSettings,

    /// Distribution defaults
    #[serde(default)]
    pub distribution: DistributionSettings,

    /// Custom settings file path (not serialized)
    #[serde(skip)]
    config_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            storage: StorageSettings::default(),
            distribution: DistributionSettings::default(),
            config_path: None,
        }
    }
}

impl Settings {
    /// Load settings from the default path, or create defaults
    pub fn load_or_default() -> Result<Self> {
        Self::load_from(&default_settings_path())
    }

    /// Load settings from a specific path, or create defaults
    pub fn load_from(path: &PathBuf) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path).map_err(SettingsError::ReadError)?;
            let mut settings: Settings =
                serde_json::from_str(&content).map_err(SettingsError::ParseError)?;
            settings.config_path = Some(path.clone());
            info!("Loaded settings from {:?}", path);
            Ok(settings)
        } else {
            let mut settings = Self::default();
            settings.config_path = Some(path.clone());
            Ok(settings)
        }
    }

    /// Save settings to the configured path
    pub fn save(&self) -> Result<()> {
        let path = self.config_path.clone().unwrap_or_else(default_settings_path);
        self.save_to(&path)
    }

    /// Save settings to a specific path
    pub fn save_to(&self, path: &PathBuf) -> Result<()> {
        // Create parent directory if needed
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent).map_err(SettingsError::CreateDirError)?;
            }
        }

        let content = serde_json::to_string_pretty(self).map_err(SettingsError::ParseError)?;
        std::fs::write(path, content).map_err(SettingsError::WriteError)?;
        info!("Saved settings to {:?}", path);
        Ok(())
    }

    /// Full path of the settlement state file
    pub fn state_path(&self) -> PathBuf {
        self.storage.data_dir.join(&self.storage.state_file)
    }
}

/// Storage settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Directory holding settlement state and generated artifacts
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Settlement state file name, relative to `data_dir`
    #[serde(default = "default_state_file")]
    pub state_file: String,
}

fn default_data_dir() -> PathBuf {
    default_config_dir().join("data")
}

fn default_state_file() -> String {
    "settlement.json".to_string()
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            state_file: default_state_file(),
        }
    }
}

/// Distribution defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributionSettings {
    /// Default issuer identity, hex-encoded (64 hex chars)
    #[serde(default)]
    pub issuer: Option<String>,

    /// Default recipients file path
    #[serde(default)]
    pub recipients_file: Option<PathBuf>,
}

impl Default for DistributionSettings {
    fn default() -> Self {
        Self {
            issuer: None,
            recipients_file: None,
        }
    }
}
