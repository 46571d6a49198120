//! Application configuration.
//!
//! Loaded from a TOML file where every field has a default, then overridden
//! by `KLINEFEED_*` environment variables.

use crate::data::{binance, yahoo, DefaultRangePolicy, Pacing};
use crate::domain::Interval;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for {name}: '{value}'")]
    InvalidEnv { name: String, value: String },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub exchange: ExchangeConfig,
    pub fetch: FetchConfig,
    pub quote: QuoteConfig,
    pub model: ModelConfig,
    pub training: TrainingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".into(),
            port: 8000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExchangeConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            base_url: binance::DEFAULT_BASE_URL.into(),
            timeout_secs: 30,
        }
    }
}

impl ExchangeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub cache_dir: PathBuf,
    /// Rows per kline page; `None` leaves the parameter off the request.
    pub page_limit: Option<u32>,
    pub chunk_span_days: u32,
    pub page_delay_ms: u64,
    pub symbol_delay_ms: u64,
    pub default_range: DefaultRangePolicy,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("data/sets"),
            page_limit: Some(binance::MAX_PAGE_LIMIT),
            chunk_span_days: 30,
            page_delay_ms: 200,
            symbol_delay_ms: 1000,
            default_range: DefaultRangePolicy::default(),
        }
    }
}

impl FetchConfig {
    pub fn pacing(&self) -> Pacing {
        Pacing::new(
            Duration::from_millis(self.page_delay_ms),
            Duration::from_millis(self.symbol_delay_ms),
        )
    }

    pub fn chunk_span_ms(&self) -> i64 {
        i64::from(self.chunk_span_days) * crate::data::fetcher::DAY_MS
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuoteConfig {
    pub base_url: String,
    pub ticker: String,
    pub lookback_days: u32,
    pub timeout_secs: u64,
}

impl Default for QuoteConfig {
    fn default() -> Self {
        Self {
            base_url: yahoo::DEFAULT_BASE_URL.into(),
            ticker: "ETH-USD".into(),
            lookback_days: 5,
            timeout_secs: 30,
        }
    }
}

impl QuoteConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Registry name of the model served by the HTTP endpoints.
    pub active: String,
    pub artifact_dir: PathBuf,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            active: crate::model::DriftModel::NAME.into(),
            artifact_dir: PathBuf::from("models"),
        }
    }
}

/// Data used by `/update-model/` when the request carries none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub symbol: String,
    pub interval: Interval,
    pub lookback_days: u32,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            symbol: "ETHUSDT".into(),
            interval: Interval::OneDay,
            lookback_days: 90,
        }
    }
}

impl AppConfig {
    /// Load a config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse a config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// File (when given) or defaults, then the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Apply `KLINEFEED_*` overrides from `lookup`. Blank values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(v) = get("KLINEFEED_BIND") {
            self.server.bind = v;
        }
        if let Some(v) = get("KLINEFEED_PORT") {
            self.server.port = v.parse().map_err(|_| ConfigError::InvalidEnv {
                name: "KLINEFEED_PORT".into(),
                value: v.clone(),
            })?;
        }
        if let Some(v) = get("KLINEFEED_BASE_URL") {
            self.exchange.base_url = v;
        }
        if let Some(v) = get("KLINEFEED_CACHE_DIR") {
            self.fetch.cache_dir = PathBuf::from(v);
        }
        if let Some(v) = get("KLINEFEED_MODEL") {
            self.model.active = v;
        }
        if let Some(v) = get("KLINEFEED_ARTIFACT_DIR") {
            self.model.artifact_dir = PathBuf::from(v);
        }
        Ok(())
    }
}
