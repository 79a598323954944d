//! Configuration management for the hearth CLI

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::error::{HearthError, Result};
use crate::ui::UI;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Base URL of the platform API (identity + document store)
    pub api_endpoint: String,
    /// Base URL of the object storage service
    pub storage_endpoint: String,
    /// HTTP timeout in seconds
    pub timeout: u64,
    pub verbose: bool,
    pub storage_dir: PathBuf,
    pub session_storage_enabled: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_endpoint: "https://api.hearth.homes/v1".to_string(),
            storage_endpoint: "https://storage.hearth.homes/v1".to_string(),
            timeout: 30,
            verbose: false,
            storage_dir: default_storage_dir(),
            session_storage_enabled: true,
        }
    }
}

impl AppConfig {
    pub async fn load() -> Result<Self> {
        Self::load_from(&default_config_path()).await
    }

    /// Load configuration from the given path, writing defaults on first run
    /// or when the file fails to parse.
    pub async fn load_from(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            let content = fs::read_to_string(config_path).await?;
            match serde_json::from_str::<Self>(&content) {
                Ok(config) => {
                    config.validate()?;
                    Ok(config)
                }
                Err(_) => {
                    let config = Self::default();
                    config.save(config_path).await?;
                    Ok(config)
                }
            }
        } else {
            let config = Self::default();
            config.save(config_path).await?;
            Ok(config)
        }
    }

    pub async fn save(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(config_path, content).await?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        for endpoint in [&self.api_endpoint, &self.storage_endpoint] {
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                return Err(HearthError::invalid_endpoint(format!(
                    "endpoint must be an http(s) URL: {}",
                    endpoint
                )));
            }
        }
        if self.timeout == 0 {
            return Err(HearthError::config("timeout must be greater than zero"));
        }
        Ok(())
    }

    /// API base URL without a trailing slash
    pub fn api_url(&self) -> String {
        self.api_endpoint.trim_end_matches('/').to_string()
    }

    /// Storage base URL without a trailing slash
    pub fn storage_url(&self) -> String {
        self.storage_endpoint.trim_end_matches('/').to_string()
    }

    /// Path of the persisted session file
    pub fn session_path(&self) -> PathBuf {
        self.storage_dir.join("session.json")
    }

    /// Log level for the tracing filter: the `-v` flag or the persisted
    /// `verbose` setting raises it to debug
    pub fn log_level(&self, verbose_flag: bool) -> &'static str {
        if verbose_flag || self.verbose {
            "debug"
        } else {
            "info"
        }
    }
}

pub fn default_storage_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".hearth")
}

pub fn default_config_path() -> PathBuf {
    default_storage_dir().join("config.json")
}

/// Service backing the `config` subcommand
pub struct ConfigService {
    config: AppConfig,
    config_path: PathBuf,
    ui: UI,
}

impl ConfigService {
    pub fn new(config: AppConfig) -> Self {
        Self::with_config_path(config, default_config_path())
    }

    pub fn with_config_path(config: AppConfig, config_path: PathBuf) -> Self {
        Self {
            config,
            config_path,
            ui: UI::new(),
        }
    }

    pub fn show(&self) {
        self.ui.card(
            "Configuration",
            vec![
                ("API endpoint", self.config.api_endpoint.clone()),
                ("Storage endpoint", self.config.storage_endpoint.clone()),
                ("Timeout", format!("{}s", self.config.timeout)),
                ("Verbose", self.config.verbose.to_string()),
                (
                    "Storage dir",
                    self.config.storage_dir.display().to_string(),
                ),
                (
                    "Session storage",
                    self.config.session_storage_enabled.to_string(),
                ),
            ],
        );
    }

    pub async fn set_api_endpoint(&mut self, url: String) -> Result<()> {
        self.config.api_endpoint = url;
        self.persist().await
    }

    pub async fn set_storage_endpoint(&mut self, url: String) -> Result<()> {
        self.config.storage_endpoint = url;
        self.persist().await
    }

    pub async fn set_timeout(&mut self, seconds: u64) -> Result<()> {
        self.config.timeout = seconds;
        self.persist().await
    }

    pub async fn set_verbose(&mut self, enabled: bool) -> Result<()> {
        self.config.verbose = enabled;
        self.persist().await
    }

    pub async fn reset(&mut self) -> Result<()> {
        self.config = AppConfig::default();
        self.config.save(&self.config_path).await?;
        self.ui.success("Configuration reset to defaults");
        Ok(())
    }

    async fn persist(&self) -> Result<()> {
        self.config.validate()?;
        self.config.save(&self.config_path).await?;
        self.ui.success("Configuration updated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::utils::test_helpers::create_temp_dir;

    #[tokio::test]
    async fn load_writes_defaults_on_first_run() {
        let dir = create_temp_dir();
        let path = dir.path().join("config.json");

        let config = AppConfig::load_from(&path).await.unwrap();
        assert!(path.exists());
        assert_eq!(config.timeout, AppConfig::default().timeout);
        assert_eq!(config.api_endpoint, AppConfig::default().api_endpoint);
    }

    #[tokio::test]
    async fn load_recovers_from_corrupt_file() {
        let dir = create_temp_dir();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();

        let config = AppConfig::load_from(&path).await.unwrap();
        assert_eq!(config.api_endpoint, AppConfig::default().api_endpoint);
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let dir = create_temp_dir();
        let path = dir.path().join("config.json");

        let mut config = AppConfig::default();
        config.timeout = 77;
        config.api_endpoint = "http://localhost:8080".to_string();
        config.save(&path).await.unwrap();

        let loaded = AppConfig::load_from(&path).await.unwrap();
        assert_eq!(loaded.timeout, 77);
        assert_eq!(loaded.api_url(), "http://localhost:8080");
    }

    #[test]
    fn stored_verbose_setting_raises_the_log_level() {
        let mut config = AppConfig::default();
        assert_eq!(config.log_level(false), "info");
        assert_eq!(config.log_level(true), "debug");

        config.verbose = true;
        assert_eq!(config.log_level(false), "debug");
    }

    #[test]
    fn validate_rejects_bad_endpoint() {
        let mut config = AppConfig::default();
        config.storage_endpoint = "ftp://nope".to_string();
        assert!(config.validate().is_err());
    }
}
