// SPDX-License-Identifier: GPL-3.0-only

use crate::constants::{CameraFacing, capture, storage};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Directory name under the user config directory
const CONFIG_DIR_NAME: &str = "qa-camera";

/// File name inside [`CONFIG_DIR_NAME`]
const CONFIG_FILE_NAME: &str = "config.toml";

/// Project-local config file, checked before the user config
const LOCAL_CONFIG_FILE: &str = "qa-camera.toml";

/// Environment variables that override the gateway URL, in priority order
const URL_ENV_VARS: &[&str] = &["QA_CAMERA_GATEWAY_URL", "SUPABASE_URL"];

/// Environment variables that override the gateway key, in priority order
const KEY_ENV_VARS: &[&str] = &["QA_CAMERA_GATEWAY_KEY", "SUPABASE_ANON_KEY"];

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Remote catalog settings
    pub gateway: GatewayConfig,
    /// Capture device settings
    pub camera: CameraConfig,
}

/// Remote catalog (PostgREST + object storage) settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Project base URL, e.g. `https://xyz.supabase.co`
    pub url: Option<String>,
    /// Anonymous API key sent as `apikey` and bearer token
    pub api_key: Option<String>,
    /// Storage bucket for product photos
    pub bucket: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            bucket: storage::DEFAULT_BUCKET.to_string(),
        }
    }
}

impl GatewayConfig {
    /// URL and key, or an error naming the first missing setting
    pub fn credentials(&self) -> Result<(&str, &str), ConfigError> {
        let url = self
            .url
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConfigError::MissingSetting("gateway.url"))?;
        let key = self
            .api_key
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConfigError::MissingSetting("gateway.api_key"))?;
        Ok((url, key))
    }
}

/// Capture device settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Explicit device path (e.g. `/dev/video2`); picked by facing when unset
    pub device: Option<String>,
    /// Requested capture width
    pub width: u32,
    /// Requested capture height
    pub height: u32,
    /// Preferred facing when choosing among several devices
    pub facing: CameraFacing,
    /// Readiness fallback timeout in milliseconds
    pub ready_timeout_ms: u64,
    /// JPEG quality (1-100)
    pub jpeg_quality: u8,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device: None,
            width: capture::IDEAL_WIDTH,
            height: capture::IDEAL_HEIGHT,
            facing: CameraFacing::default(),
            ready_timeout_ms: capture::READY_TIMEOUT.as_millis() as u64,
            jpeg_quality: capture::JPEG_QUALITY,
        }
    }
}

impl CameraConfig {
    pub fn ready_timeout(&self) -> Duration {
        Duration::from_millis(self.ready_timeout_ms)
    }

    /// Quality clamped to the range the encoder accepts
    pub fn jpeg_quality(&self) -> u8 {
        self.jpeg_quality.clamp(1, 100)
    }
}

/// Standard config file location (`$XDG_CONFIG_HOME/qa-camera/config.toml`)
pub fn get_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(path.to_path_buf(), e.to_string()))?;

        toml::from_str(&content)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))
    }

    /// Load configuration from default locations, then apply environment overrides
    ///
    /// Search order:
    /// 1. ./qa-camera.toml
    /// 2. $XDG_CONFIG_HOME/qa-camera/config.toml
    ///
    /// Defaults are used when neither exists.
    pub fn load_default() -> Result<Self, ConfigError> {
        let mut config = match Self::active_config_path() {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// First existing config file in the search order
    pub fn active_config_path() -> Option<PathBuf> {
        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            return Some(local);
        }
        get_config_path().filter(|path| path.exists())
    }

    /// Override gateway credentials from environment variables
    ///
    /// `lookup` maps a variable name to its value; empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let first = |names: &[&str]| {
            names
                .iter()
                .filter_map(|name| lookup(name))
                .find(|value| !value.trim().is_empty())
        };

        if let Some(url) = first(URL_ENV_VARS) {
            self.gateway.url = Some(url);
        }
        if let Some(key) = first(KEY_ENV_VARS) {
            self.gateway.api_key = Some(key);
        }
    }

    /// Save configuration to a TOML file, creating parent directories
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .map_err(|e| ConfigError::WriteError(parent.to_path_buf(), e.to_string()))?;
        }

        fs::write(path, content)
            .map_err(|e| ConfigError::WriteError(path.to_path_buf(), e.to_string()))
    }
}

/// Configuration error types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Configuration file was not found at the specified path
    FileNotFound(PathBuf),
    /// Failed to read the configuration file
    ReadError(PathBuf, String),
    /// Failed to parse the configuration file (invalid TOML)
    ParseError(PathBuf, String),
    /// Failed to serialize configuration to TOML
    SerializeError(String),
    /// Failed to write configuration file
    WriteError(PathBuf, String),
    /// A setting needed for the requested operation is not configured
    MissingSetting(&'static str),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::FileNotFound(path) => {
                write!(f, "Configuration file not found: {}", path.display())
            }
            ConfigError::ReadError(path, err) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), err)
            }
            ConfigError::ParseError(path, err) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), err)
            }
            ConfigError::SerializeError(err) => {
                write!(f, "Failed to serialize configuration: {}", err)
            }
            ConfigError::WriteError(path, err) => {
                write!(f, "Failed to write config file '{}': {}", path.display(), err)
            }
            ConfigError::MissingSetting(key) => write!(
                f,
                "Missing setting '{}'. Set it in qa-camera.toml or via {}",
                key,
                if *key == "gateway.url" {
                    URL_ENV_VARS[0]
                } else {
                    KEY_ENV_VARS[0]
                }
            ),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for crate::errors::AppError {
    fn from(err: ConfigError) -> Self {
        crate::errors::AppError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: Config = toml::from_str("[camera]\nwidth = 640\n").unwrap();
        assert_eq!(config.camera.width, 640);
        assert_eq!(config.camera.height, capture::IDEAL_HEIGHT);
        assert_eq!(config.gateway.bucket, storage::DEFAULT_BUCKET);
    }

    #[test]
    fn test_env_prefers_app_specific_names() {
        let mut config = Config::default();
        config.apply_env(|name| match name {
            "QA_CAMERA_GATEWAY_URL" => Some("https://a.example".into()),
            "SUPABASE_URL" => Some("https://b.example".into()),
            "SUPABASE_ANON_KEY" => Some("anon".into()),
            _ => None,
        });
        assert_eq!(config.gateway.url.as_deref(), Some("https://a.example"));
        assert_eq!(config.gateway.api_key.as_deref(), Some("anon"));
    }

    #[test]
    fn test_missing_credentials() {
        let config = Config::default();
        assert_eq!(
            config.gateway.credentials(),
            Err(ConfigError::MissingSetting("gateway.url"))
        );
    }

    #[test]
    fn test_quality_clamped() {
        let camera = CameraConfig {
            jpeg_quality: 0,
            ..Default::default()
        };
        assert_eq!(camera.jpeg_quality(), 1);
    }
}
