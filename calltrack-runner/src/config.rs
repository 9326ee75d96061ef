//! Analyzer configuration, loaded from an optional TOML file.
//!
//! Every section and field has a default, so a partial file (or no file at
//! all) is valid. CLI flags are applied on top by the caller.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use calltrack_core::data::YahooOptions;

/// Environment variable consulted when no Alpha Vantage key is configured.
pub const API_KEY_ENV: &str = "ALPHA_VANTAGE_API_KEY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub provider: ProviderConfig,
    pub batch: BatchConfig,
    pub data: DataConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub symbol_suffix: String,
    pub request_delay_ms: u64,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub alpha_vantage_api_key: Option<String>,
    pub circuit_breaker_cooldown_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            symbol_suffix: ".NS".into(),
            request_delay_ms: 1000,
            timeout_secs: 15,
            max_retries: 3,
            alpha_vantage_api_key: None,
            circuit_breaker_cooldown_secs: 30 * 60,
        }
    }
}

impl ProviderConfig {
    pub fn yahoo_options(&self) -> YahooOptions {
        YahooOptions {
            symbol_suffix: self.symbol_suffix.clone(),
            request_delay: self.request_delay(),
            timeout: self.timeout(),
            max_retries: self.max_retries,
            ..YahooOptions::default()
        }
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn circuit_breaker_cooldown(&self) -> Duration {
        Duration::from_secs(self.circuit_breaker_cooldown_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// 1 evaluates sequentially; more runs a bounded pool of that size.
    pub workers: usize,
    pub price_analysis: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            workers: 1,
            price_analysis: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub cache_dir: PathBuf,
    /// Serve prices from the cache only.
    pub offline: bool,
    /// Fall back to generated prices when every real source fails.
    pub synthetic: bool,
    pub synthetic_seed: u64,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("data"),
            offline: false,
            synthetic: false,
            synthetic_seed: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub output_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("results"),
        }
    }
}

impl AnalyzerConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if given, otherwise defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch.workers == 0 {
            return Err(ConfigError::Invalid("batch.workers must be at least 1".into()));
        }
        if self.provider.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "provider.timeout_secs must be at least 1".into(),
            ));
        }
        if self.data.offline && self.provider.alpha_vantage_api_key.is_some() {
            log::debug!("offline mode: Alpha Vantage key is ignored");
        }
        Ok(())
    }

    /// Configured API key, else the environment, ignoring blank values.
    pub fn resolved_api_key(&self) -> Option<String> {
        self.provider
            .alpha_vantage_api_key
            .clone()
            .or_else(|| std::env::var(API_KEY_ENV).ok())
            .filter(|key| !key.trim().is_empty())
    }
}
