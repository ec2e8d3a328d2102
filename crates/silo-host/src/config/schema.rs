use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use silo_core::error::{Result, SiloError};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    pub version: u32,

    pub app: AppSection,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub jobs: JobsConfig,

    #[serde(default)]
    pub ops: OpsConfig,

    /// Free-form sections bound by name with [`AppConfig::section`].
    #[serde(default)]
    pub sections: BTreeMap<String, serde_yaml::Value>,
}

impl AppConfig {
    /// Minimal valid config, mostly for tests and embedding.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            version: 1,
            app: AppSection { name: name.into() },
            logging: LoggingConfig::default(),
            jobs: JobsConfig::default(),
            ops: OpsConfig::default(),
            sections: BTreeMap::new(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(SiloError::Config(format!(
                "unsupported config version {}",
                self.version
            )));
        }
        if self.app.name.trim().is_empty() {
            return Err(SiloError::Config("app.name must not be empty".into()));
        }

        self.jobs.validate()?;
        self.ops.validate()?;
        Ok(())
    }

    /// Deserialize the named free-form section into `T`.
    pub fn section<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        let raw = self
            .sections
            .get(name)
            .ok_or_else(|| SiloError::Config(format!("missing section: {name}")))?;
        serde_yaml::from_value(raw.clone())
            .map_err(|e| SiloError::Config(format!("section {name}: {e}")))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppSection {
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// `EnvFilter` directive; `RUST_LOG` wins when set.
    #[serde(default = "default_log_filter")]
    pub filter: String,

    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            format: LogFormat::default(),
        }
    }
}

fn default_log_filter() -> String {
    "info".into()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobsConfig {
    #[serde(default = "default_workers")]
    pub workers: usize,

    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Attempts per job before it is dropped; 1 means no retry.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    #[serde(default = "default_drain_timeout_ms")]
    pub drain_timeout_ms: u64,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            queue_capacity: default_queue_capacity(),
            max_attempts: default_max_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
            drain_timeout_ms: default_drain_timeout_ms(),
        }
    }
}

impl JobsConfig {
    pub fn validate(&self) -> Result<()> {
        if !(1..=256).contains(&self.workers) {
            return Err(SiloError::Config(
                "jobs.workers must be between 1 and 256".into(),
            ));
        }
        if !(1..=1_000_000).contains(&self.queue_capacity) {
            return Err(SiloError::Config(
                "jobs.queue_capacity must be between 1 and 1000000".into(),
            ));
        }
        if !(1..=100).contains(&self.max_attempts) {
            return Err(SiloError::Config(
                "jobs.max_attempts must be between 1 and 100".into(),
            ));
        }
        if self.retry_backoff_ms > 3_600_000 {
            return Err(SiloError::Config(
                "jobs.retry_backoff_ms must be at most 3600000".into(),
            ));
        }
        if !(100..=600_000).contains(&self.drain_timeout_ms) {
            return Err(SiloError::Config(
                "jobs.drain_timeout_ms must be between 100 and 600000".into(),
            ));
        }
        Ok(())
    }
}

fn default_workers() -> usize {
    4
}
fn default_queue_capacity() -> usize {
    1024
}
fn default_max_attempts() -> u32 {
    1
}
fn default_retry_backoff_ms() -> u64 {
    1000
}
fn default_drain_timeout_ms() -> u64 {
    10_000
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OpsConfig {
    #[serde(default = "default_ops_enabled")]
    pub enabled: bool,

    #[serde(default = "default_ops_listen")]
    pub listen: String,
}

impl Default for OpsConfig {
    fn default() -> Self {
        Self {
            enabled: default_ops_enabled(),
            listen: default_ops_listen(),
        }
    }
}

impl OpsConfig {
    pub fn validate(&self) -> Result<()> {
        if self.enabled && self.listen.parse::<std::net::SocketAddr>().is_err() {
            return Err(SiloError::Config(
                "ops.listen must be a valid socket address".into(),
            ));
        }
        Ok(())
    }
}

fn default_ops_enabled() -> bool {
    true
}
fn default_ops_listen() -> String {
    "127.0.0.1:9090".into()
}
