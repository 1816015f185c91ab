use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: String,

    #[serde(default = "default_session_path")]
    pub session_path: String,

    #[serde(default = "default_care_type")]
    pub default_care_type: String,

    #[serde(default = "default_care_frequency_days")]
    pub default_care_frequency_days: u32,
}

fn data_dir() -> PathBuf {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("giardino");
    std::fs::create_dir_all(&data_dir).ok();
    data_dir
}

fn default_db_path() -> String {
    data_dir().join("giardino.db").to_string_lossy().to_string()
}

fn default_session_path() -> String {
    data_dir().join("session.json").to_string_lossy().to_string()
}

fn default_care_type() -> String {
    "water".to_string()
}

fn default_care_frequency_days() -> u32 {
    3
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            session_path: default_session_path(),
            default_care_type: default_care_type(),
            default_care_frequency_days: default_care_frequency_days(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            let config = Config::default();
            config.save()?;
            Ok(config)
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Keep all state (database and session slot) under `dir`.
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            db_path: dir.join("giardino.db").to_string_lossy().to_string(),
            session_path: dir.join("session.json").to_string_lossy().to_string(),
            default_care_type: default_care_type(),
            default_care_frequency_days: default_care_frequency_days(),
        }
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("giardino")
            .join("config.toml")
    }

    fn validate(&self) -> Result<()> {
        if self.default_care_frequency_days == 0 {
            return Err(AppError::Config(
                "default_care_frequency_days must be at least 1".to_string(),
            ));
        }
        if self.default_care_type.trim().is_empty() {
            return Err(AppError::Config("default_care_type must not be empty".to_string()));
        }
        Ok(())
    }
}
