//! Importer configuration
//!
//! Loaded from an optional JSON file, then overridden from the environment.

use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

pub const ALL_STOCKS_CSV_URL: &str = "https://archives.nseindia.com/content/equities/EQUITY_L.csv";
pub const SYM_CHANGE_CSV_URL: &str =
    "https://archives.nseindia.com/content/equities/symbolchange.csv";

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database_path: PathBuf,
    pub feeds: FeedConfig,
    pub http: HttpConfig,
    pub log: LogConfig,
}

/// Exchange feed endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub all_stocks_url: String,
    pub symbol_change_url: String,
}

/// HTTP client settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
}

/// Logging settings for the console and file layers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub console_level: String,
    pub file_level: String,
    /// `None` disables the file layer
    pub file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("tickerplot.db"),
            feeds: FeedConfig::default(),
            http: HttpConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            all_stocks_url: ALL_STOCKS_CSV_URL.to_string(),
            symbol_change_url: SYM_CHANGE_CSV_URL.to_string(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: "Mozilla/5.0 (X11; Linux x86_64) tickerplot".to_string(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            console_level: "warn".to_string(),
            file_level: "info".to_string(),
            file: Some(PathBuf::from("tickerplot.log")),
        }
    }
}

impl Config {
    /// Load configuration: file (if any), then environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => {
                let raw = std::fs::read_to_string(p)?;
                serde_json::from_str(&raw)?
            }
            None => Config::default(),
        };

        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;

        tracing::debug!("Configuration loaded: db={}", config.database_path.display());
        Ok(config)
    }

    /// Apply `TICKERPLOT_*` overrides from the given lookup
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(db) = lookup("TICKERPLOT_DB") {
            self.database_path = PathBuf::from(db);
        }
        if let Some(url) = lookup("TICKERPLOT_ALL_STOCKS_URL") {
            self.feeds.all_stocks_url = url;
        }
        if let Some(url) = lookup("TICKERPLOT_SYM_CHANGE_URL") {
            self.feeds.symbol_change_url = url;
        }
        if let Some(file) = lookup("TICKERPLOT_LOG_FILE") {
            self.log.file = if file.is_empty() {
                None
            } else {
                Some(PathBuf::from(file))
            };
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.http.timeout_secs == 0 {
            return Err(AppError::Config("http.timeout_secs must be positive".to_string()));
        }

        for (name, value) in [
            ("feeds.all_stocks_url", &self.feeds.all_stocks_url),
            ("feeds.symbol_change_url", &self.feeds.symbol_change_url),
        ] {
            Url::parse(value)
                .map_err(|e| AppError::Config(format!("{} '{}': {}", name, value, e)))?;
        }

        Ok(())
    }
}
