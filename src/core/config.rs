use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;

use log::warn;

use super::alerts::engine::AlertEngineConfig;

pub const API_URL_ENV: &str = "ADMIN_API_URL";
pub const API_TOKEN_ENV: &str = "ADMIN_API_TOKEN";

/// Watcher settings, persisted in settings.json.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Settings {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Bearer token sent with every feed request
    #[serde(default)]
    pub api_token: Option<String>,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    /// Alert system configuration
    #[serde(default)]
    pub alert_settings: AlertEngineConfig,
}

fn default_api_base_url() -> String {
    "http://localhost:8000/api/v1".to_string()
}

fn default_poll_interval() -> u64 {
    8
}

fn default_request_timeout() -> u64 {
    8
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            api_token: None,
            poll_interval_seconds: default_poll_interval(),
            request_timeout_seconds: default_request_timeout(),
            alert_settings: AlertEngineConfig::default_enabled(),
        }
    }
}

impl Settings {
    /// Environment variables win over the file.
    pub fn apply_env(&mut self) {
        self.apply_overrides(
            std::env::var(API_URL_ENV).ok(),
            std::env::var(API_TOKEN_ENV).ok(),
        );
    }

    fn apply_overrides(&mut self, api_url: Option<String>, api_token: Option<String>) {
        if let Some(url) = api_url.map(|u| u.trim().to_string()).filter(|u| !u.is_empty()) {
            self.api_base_url = url;
        }
        if let Some(token) = api_token.map(|t| t.trim().to_string()).filter(|t| !t.is_empty()) {
            self.api_token = Some(token);
        }
    }
}

pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    pub fn new(app_config_dir: PathBuf) -> Self {
        Self {
            config_path: app_config_dir.join("settings.json"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    pub fn load(&self) -> Settings {
        if self.config_path.exists() {
            match fs::read_to_string(&self.config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(settings) => return settings,
                    Err(e) => warn!("Ignoring unreadable {:?}: {}", self.config_path, e),
                },
                Err(e) => warn!("Failed to read {:?}: {}", self.config_path, e),
            }
        }
        Settings::default()
    }

    pub fn save(&self, settings: &Settings) -> io::Result<()> {
        // Ensure directory exists
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(settings)?;
        fs::write(&self.config_path, content)
    }
}
