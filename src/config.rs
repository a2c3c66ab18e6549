//! TOML configuration.
//!
//! All settings have working defaults, so the config file is optional; a
//! missing file means "all defaults". The pipeline itself stays stateless —
//! configuration is plumbed into each call, never cached globally.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

/// correspSearch API settings.
#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// The API's fixed page size.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Safety cap on paginated fetches; reaching it truncates, not errors.
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    /// Retries per request on network-level failure.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            page_size: default_page_size(),
            max_results: default_max_results(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_base_url() -> String {
    "https://correspsearch.net/api/v1.1/tei-json.xml".to_string()
}
fn default_page_size() -> usize {
    10
}
fn default_max_results() -> usize {
    10_000
}
fn default_max_retries() -> u32 {
    3
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;
    let config: Config = toml::from_str(&content)
        .with_context(|| format!("failed to parse config file: {}", path.display()))?;
    Ok(config)
}

impl Config {
    /// Load the file if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> Result<Config> {
        if path.exists() {
            load_config(path)
        } else {
            Ok(Config::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_api_contract() {
        let config = Config::default();
        assert_eq!(config.api.page_size, 10);
        assert_eq!(config.api.max_results, 10_000);
        assert_eq!(config.api.max_retries, 3);
        assert!(config.api.base_url.contains("correspsearch.net"));
        assert_eq!(config.http.timeout_secs, 30);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let config: Config = toml::from_str("[api]\npage_size = 25\n").unwrap();
        assert_eq!(config.api.page_size, 25);
        assert_eq!(config.api.max_results, 10_000);
        assert_eq!(config.http.timeout_secs, 30);
    }
}
