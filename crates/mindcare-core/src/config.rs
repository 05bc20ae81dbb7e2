use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Result, anyhow};

use crate::error::ConfigurationError;

pub const API_KEY_VAR: &str = "API_KEY";
pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Optional on-disk overrides. Every field falls back to a built-in default.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub web_search: Option<bool>,
    pub base_url: Option<String>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&config_content)
            .map_err(|e| anyhow!("Invalid config file {}: {}", path.display(), e))?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    pub fn settings(&self) -> ChatSettings {
        let defaults = ChatSettings::default();
        ChatSettings {
            model: self.model.clone().unwrap_or(defaults.model),
            temperature: self.temperature.unwrap_or(defaults.temperature),
            web_search: self.web_search.unwrap_or(defaults.web_search),
            base_url: self.base_url.clone().unwrap_or(defaults.base_url),
        }
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("mindcare").join("config.json"))
    }
}

/// Resolved request settings handed to a streaming adapter.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatSettings {
    pub model: String,
    pub temperature: f32,
    pub web_search: bool,
    pub base_url: String,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            web_search: true,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

/// A validated API key. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn from_env() -> Result<Self, ConfigurationError> {
        Self::validate(std::env::var(API_KEY_VAR).ok())
    }

    /// Reject keys that are absent or are leftovers from a template.
    pub fn validate(raw: Option<String>) -> Result<Self, ConfigurationError> {
        let raw = raw.ok_or(ConfigurationError::MissingApiKey { var: API_KEY_VAR })?;
        let key = raw.trim();
        if key.is_empty() {
            return Err(ConfigurationError::MissingApiKey { var: API_KEY_VAR });
        }
        if key == "undefined" || key == "null" || key.starts_with("YOUR_") {
            return Err(ConfigurationError::PlaceholderApiKey { var: API_KEY_VAR });
        }
        Ok(Self(key.to_string()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

/// Outcome of the launch-time configuration check.
#[derive(Debug, Clone)]
pub enum Startup {
    Ready(ApiKey),
    SetupRequired(ConfigurationError),
}

impl Startup {
    pub fn from_env() -> Self {
        Self::from_key(std::env::var(API_KEY_VAR).ok())
    }

    pub fn from_key(raw: Option<String>) -> Self {
        match ApiKey::validate(raw) {
            Ok(key) => Startup::Ready(key),
            Err(e) => Startup::SetupRequired(e),
        }
    }
}
