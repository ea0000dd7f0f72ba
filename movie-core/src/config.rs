use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ConfigError;

/// Environment variable holding the TMDB bearer token.
pub const ACCESS_TOKEN_ENV: &str = "TMDB_ACCESS_TOKEN";

const APP_DIR: &str = "moviedeck";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub provider: ProviderConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub base_url: String,
    pub image_base_url: String,
    pub language: String,
    pub request_timeout_seconds: u64,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
    // usually left out of the file and supplied through the environment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Where favorites are kept; defaults to the platform data dir.
    pub data_dir: Option<PathBuf>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.themoviedb.org/3".to_owned(),
            image_base_url: "https://image.tmdb.org/t/p".to_owned(),
            language: "en-US".to_owned(),
            request_timeout_seconds: 10,
            max_retries: 1,
            retry_backoff_ms: 250,
            access_token: None,
        }
    }
}

impl ProviderConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    /// Applies [`ACCESS_TOKEN_ENV`] over whatever the file said.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(token) = std::env::var(ACCESS_TOKEN_ENV) {
            if !token.trim().is_empty() {
                self.access_token = Some(token.trim().to_owned());
            }
        }
        self
    }
}

impl StorageConfig {
    pub fn resolved_data_dir(&self) -> PathBuf {
        match &self.data_dir {
            Some(dir) => dir.clone(),
            None => dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(APP_DIR),
        }
    }
}

impl AppConfig {
    /// `<config_dir>/moviedeck/config.json`
    pub fn config_file_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join(APP_DIR).join("config.json"))
    }

    /// Loads the user config, falling back to (and trying to save) defaults.
    /// Environment overrides are applied in both cases.
    pub fn load() -> Self {
        let config = match Self::config_file_path().and_then(|path| Self::load_from(&path)) {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %e, "unable to load configuration, using defaults");
                let default_config = Self::default();
                if let Err(save_err) = default_config.save() {
                    warn!(error = %save_err, "unable to save default configuration");
                }
                default_config
            }
        };
        config.with_env_overrides()
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_file_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn with_env_overrides(mut self) -> Self {
        self.provider = self.provider.with_env_overrides();
        self
    }
}
