//! Config - 設定の読み込みと検証
//!
//! 読み込み順（後勝ち）:
//! 1. `config/default.{toml,yaml,json}`（任意）
//! 2. 環境変数 `FERRY_<SECTION>__<KEY>`（例: `FERRY_QUEUE__URL`）

use std::time::Duration;

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::app::PollerConfig;
use crate::impls::sqs_queue::{SQS_MAX_BATCH, SQS_MAX_WAIT_SECS};

pub const DEFAULT_CONFIG_PATH: &str = "config/default";
pub const ENV_PREFIX: &str = "FERRY";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    pub queue: QueueSettings,
    #[serde(default)]
    pub downstream: DownstreamSettings,
    #[serde(default)]
    pub poller: PollerSettings,
    #[serde(default)]
    pub log: LogSettings,
}

/// Source queue.
#[derive(Debug, Clone, Deserialize)]
pub struct QueueSettings {
    pub url: String,
    #[serde(default)]
    pub region: Option<String>,
    /// Override for LocalStack and similar.
    #[serde(default)]
    pub endpoint_url: Option<String>,
    #[serde(default)]
    pub dead_letter_url: Option<String>,
}

/// Downstream REST API.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DownstreamSettings {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for DownstreamSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            timeout_secs: 30,
        }
    }
}

impl DownstreamSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Poll loop constants.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PollerSettings {
    pub batch_size: usize,
    pub wait_time_secs: u64,
    pub retry_backoff_ms: u64,
    /// None のときは再配送の上限をキュー側の redrive policy に任せる
    pub max_receive_count: Option<u32>,
}

impl Default for PollerSettings {
    fn default() -> Self {
        let defaults = PollerConfig::default();
        Self {
            batch_size: defaults.batch_size,
            wait_time_secs: defaults.wait_time.as_secs(),
            retry_backoff_ms: defaults.retry_backoff.as_millis() as u64,
            max_receive_count: defaults.max_receive_count,
        }
    }
}

impl From<&PollerSettings> for PollerConfig {
    fn from(settings: &PollerSettings) -> Self {
        PollerConfig {
            batch_size: settings.batch_size,
            wait_time: Duration::from_secs(settings.wait_time_secs),
            retry_backoff: Duration::from_millis(settings.retry_backoff_ms),
            max_receive_count: settings.max_receive_count,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub level: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl RelayConfig {
    pub fn poller_config(&self) -> PollerConfig {
        PollerConfig::from(&self.poller)
    }

    /// 範囲外の値や矛盾する組み合わせを拒否する
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queue.url.trim().is_empty() {
            return Err(ConfigError::Invalid("queue.url must not be empty".into()));
        }
        if self.downstream.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "downstream.base_url must not be empty".into(),
            ));
        }
        if self.downstream.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "downstream.timeout_secs must be greater than 0".into(),
            ));
        }
        if !(1..=SQS_MAX_BATCH).contains(&self.poller.batch_size) {
            return Err(ConfigError::Invalid(format!(
                "poller.batch_size must be between 1 and {SQS_MAX_BATCH} (got {})",
                self.poller.batch_size
            )));
        }
        if self.poller.wait_time_secs > SQS_MAX_WAIT_SECS {
            return Err(ConfigError::Invalid(format!(
                "poller.wait_time_secs must be at most {SQS_MAX_WAIT_SECS} (got {})",
                self.poller.wait_time_secs
            )));
        }
        if self.poller.retry_backoff_ms == 0 {
            return Err(ConfigError::Invalid(
                "poller.retry_backoff_ms must be greater than 0".into(),
            ));
        }
        match self.poller.max_receive_count {
            Some(0) => {
                return Err(ConfigError::Invalid(
                    "poller.max_receive_count must be at least 1".into(),
                ));
            }
            Some(_) if self.queue.dead_letter_url.is_none() => {
                return Err(ConfigError::Invalid(
                    "poller.max_receive_count requires queue.dead_letter_url".into(),
                ));
            }
            _ => {}
        }
        Ok(())
    }
}

/// 既定のパスと環境変数から読み込む
pub fn load_config() -> Result<RelayConfig, ConfigError> {
    load_config_from(DEFAULT_CONFIG_PATH)
}

/// `path`（拡張子なし）と環境変数から読み込み、検証する
pub fn load_config_from(path: &str) -> Result<RelayConfig, ConfigError> {
    let builder = Config::builder()
        .add_source(File::with_name(path).required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

    let config: RelayConfig = builder.build()?.try_deserialize()?;
    config.validate()?;
    Ok(config)
}
