//! Engine configuration.
//!
//! Precedence, lowest to highest: defaults, YAML file, environment, explicit
//! `with_*` overrides (the CLI applies its flags last).
//!
//! | Variable | Description |
//! |----------|-------------|
//! | `PICS_PARSER_URL` | Base URL of the condition-parsing service (unset: offline) |
//! | `PICS_PARSER_TOKEN` | Bearer token for the parsing service |
//! | `PICS_PARSER_TIMEOUT` | Request timeout in seconds (default: 30) |
//! | `PICS_PARSER_MAX_RETRIES` | Retries for transient failures (default: 3) |
//! | `PICS_BATCH_SIZE` | Unique expressions per fallback batch (default: 10) |
//! | `PICS_DATABASE` | Path of the SQLite condition store |

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Condition-parsing service settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParserConfig {
    /// Base URL; `None` runs the engine with the offline parser.
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub token: Option<String>,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_timeout() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            url: None,
            token: None,
            timeout_secs: default_timeout(),
            max_retries: default_max_retries(),
        }
    }
}

/// Top-level engine settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub parser: ParserConfig,

    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// SQLite condition store used for `specification_id` requests.
    #[serde(default)]
    pub database: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            parser: ParserConfig::default(),
            batch_size: default_batch_size(),
            database: None,
        }
    }
}

impl EngineConfig {
    /// Defaults overlaid with the environment.
    pub fn from_env() -> Self {
        Self::default().merge_env()
    }

    /// Read a YAML file, then overlay the environment.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let cfg: Self = serde_yaml::from_str(&text)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        Ok(cfg.merge_env())
    }

    fn merge_env(mut self) -> Self {
        if let Ok(url) = std::env::var("PICS_PARSER_URL") {
            if !url.trim().is_empty() {
                self.parser.url = Some(url);
            }
        }
        if let Ok(token) = std::env::var("PICS_PARSER_TOKEN") {
            self.parser.token = Some(token);
        }
        if let Some(v) = env_parse("PICS_PARSER_TIMEOUT") {
            self.parser.timeout_secs = v;
        }
        if let Some(v) = env_parse("PICS_PARSER_MAX_RETRIES") {
            self.parser.max_retries = v;
        }
        if let Some(v) = env_parse::<usize>("PICS_BATCH_SIZE") {
            self.batch_size = v.max(1);
        }
        if let Ok(db) = std::env::var("PICS_DATABASE") {
            self.database = Some(PathBuf::from(db));
        }
        self
    }

    pub fn with_parser_url(mut self, url: impl Into<String>) -> Self {
        self.parser.url = Some(url.into());
        self
    }

    pub fn with_parser_token(mut self, token: impl Into<String>) -> Self {
        self.parser.token = Some(token.into());
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_database(mut self, path: impl Into<PathBuf>) -> Self {
        self.database = Some(path.into());
        self
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}
