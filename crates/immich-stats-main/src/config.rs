// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of immich-stats.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Shortest accepted polling interval
const MIN_UPDATE_INTERVAL_SECS: u64 = 60;

fn default_update_interval_secs() -> u64 {
    3600
}

fn default_request_timeout_secs() -> u64 {
    10
}

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub immich: ImmichConfig,

    /// Optional Home Assistant state publisher
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home_assistant: Option<HomeAssistantConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImmichConfig {
    /// Server base URL, e.g. "http://immich.local:2283"
    pub url: String,

    pub api_key: String,

    /// How often to poll statistics (seconds)
    #[serde(default = "default_update_interval_secs")]
    pub update_interval_secs: u64,

    /// Per-request transport timeout (seconds)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ImmichConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            api_key: String::new(),
            update_interval_secs: default_update_interval_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl ImmichConfig {
    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(self.update_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HomeAssistantConfig {
    pub base_url: String,
    pub token: String,
}

impl AppConfig {
    /// Load configuration from the given file, `config.toml`, or the environment.
    ///
    /// An explicitly given path must exist. Without one, a missing
    /// `config.toml` falls back to environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_PATH))?
            }
            None => {
                warn!("No configuration file found, using environment variables");
                Self::from_env_with(|key| std::env::var(key).ok())
            }
        };

        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        let config: AppConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Build configuration from environment-style lookups
    pub fn from_env_with<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("IMMICH_URL") {
            config.immich.url = url;
        }
        if let Some(api_key) = lookup("IMMICH_API_KEY") {
            config.immich.api_key = api_key;
        }
        if let Some(secs) = lookup("IMMICH_UPDATE_INTERVAL_SECS").and_then(|v| v.parse::<u64>().ok())
        {
            config.immich.update_interval_secs = secs;
        }
        if let Some(secs) = lookup("IMMICH_REQUEST_TIMEOUT_SECS").and_then(|v| v.parse::<u64>().ok())
        {
            config.immich.request_timeout_secs = secs;
        }

        if let (Some(base_url), Some(token)) = (lookup("HA_BASE_URL"), lookup("HA_TOKEN")) {
            config.home_assistant = Some(HomeAssistantConfig { base_url, token });
        }

        config
    }

    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        check_url("immich.url", &self.immich.url, &mut errors);
        if self.immich.api_key.trim().is_empty() {
            errors.push("immich.api_key: API key must not be empty".to_owned());
        }
        if self.immich.update_interval_secs < MIN_UPDATE_INTERVAL_SECS {
            errors.push(format!(
                "immich.update_interval_secs: must be at least {MIN_UPDATE_INTERVAL_SECS}"
            ));
        }
        if self.immich.request_timeout_secs == 0 {
            errors.push("immich.request_timeout_secs: must be greater than 0".to_owned());
        }

        if let Some(ha) = &self.home_assistant {
            check_url("home_assistant.base_url", &ha.base_url, &mut errors);
            if ha.token.trim().is_empty() {
                errors.push("home_assistant.token: token must not be empty".to_owned());
            }
        }

        if !errors.is_empty() {
            bail!("Invalid configuration:\n  - {}", errors.join("\n  - "));
        }
        Ok(())
    }
}

fn check_url(field: &str, url: &str, errors: &mut Vec<String>) {
    if url.trim().is_empty() {
        errors.push(format!("{field}: URL must not be empty"));
    } else if !(url.starts_with("http://") || url.starts_with("https://")) {
        errors.push(format!("{field}: URL must start with http:// or https://"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn valid_config() -> AppConfig {
        AppConfig {
            immich: ImmichConfig {
                url: "http://immich.local:2283".to_owned(),
                api_key: "key".to_owned(),
                ..ImmichConfig::default()
            },
            home_assistant: None,
        }
    }

    #[test]
    fn test_defaults() {
        let config = ImmichConfig::default();
        assert_eq!(config.update_interval(), Duration::from_secs(3600));
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_from_file_applies_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[immich]
url = "https://photos.example.com"
api_key = "abc"

[home_assistant]
base_url = "http://homeassistant.local:8123"
token = "ha-token"
"#
        )
        .unwrap();

        let config = AppConfig::from_file(file.path()).unwrap();
        assert_eq!(config.immich.url, "https://photos.example.com");
        assert_eq!(config.immich.update_interval_secs, 3600);
        assert_eq!(config.immich.request_timeout_secs, 10);
        assert_eq!(config.home_assistant.unwrap().token, "ha-token");
    }

    #[test]
    fn test_load_explicit_missing_file_fails() {
        let result = AppConfig::load(Some(Path::new("/nonexistent/immich-stats.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_validates_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[immich]\nurl = \"immich.local\"\napi_key = \"\"").unwrap();

        let err = AppConfig::load(Some(file.path())).unwrap_err().to_string();
        assert!(err.contains("immich.url"));
        assert!(err.contains("immich.api_key"));
    }

    #[test]
    fn test_from_env_with() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("IMMICH_URL", "http://immich:2283"),
            ("IMMICH_API_KEY", "secret"),
            ("IMMICH_UPDATE_INTERVAL_SECS", "900"),
            ("HA_BASE_URL", "http://ha:8123"),
            ("HA_TOKEN", "token"),
        ]);

        let config = AppConfig::from_env_with(|key| env.get(key).map(|v| (*v).to_owned()));
        assert_eq!(config.immich.url, "http://immich:2283");
        assert_eq!(config.immich.api_key, "secret");
        assert_eq!(config.immich.update_interval_secs, 900);
        assert_eq!(config.immich.request_timeout_secs, 10);
        assert!(config.home_assistant.is_some());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_home_assistant_requires_url_and_token() {
        let env: HashMap<&str, &str> = HashMap::from([("HA_BASE_URL", "http://ha:8123")]);
        let config = AppConfig::from_env_with(|key| env.get(key).map(|v| (*v).to_owned()));
        assert!(config.home_assistant.is_none());
    }

    #[test]
    fn test_validate() {
        assert!(valid_config().validate().is_ok());

        let mut too_fast = valid_config();
        too_fast.immich.update_interval_secs = 10;
        assert!(too_fast.validate().is_err());

        let mut no_timeout = valid_config();
        no_timeout.immich.request_timeout_secs = 0;
        assert!(no_timeout.validate().is_err());

        let mut bad_ha = valid_config();
        bad_ha.home_assistant = Some(HomeAssistantConfig {
            base_url: "ftp://ha".to_owned(),
            token: " ".to_owned(),
        });
        let err = bad_ha.validate().unwrap_err().to_string();
        assert!(err.contains("home_assistant.base_url"));
        assert!(err.contains("home_assistant.token"));
    }
}
