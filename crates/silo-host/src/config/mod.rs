//! Host configuration: strict YAML, validated before anything is wired.
//!
//! Path precedence: explicit argument, then `$SILO_CONFIG`, then
//! [`DEFAULT_PATH`].

pub mod schema;

use std::path::{Path, PathBuf};

use silo_core::error::{Result, SiloError};

pub use schema::{AppConfig, AppSection, JobsConfig, LogFormat, LoggingConfig, OpsConfig};

pub const DEFAULT_PATH: &str = "silo.yaml";
pub const PATH_ENV: &str = "SILO_CONFIG";

/// Pick the config file. `env` is the value of [`PATH_ENV`], if set.
pub fn resolve_path(arg: Option<String>, env: Option<String>) -> PathBuf {
    arg.or(env)
        .filter(|p| !p.trim().is_empty())
        .map_or_else(|| PathBuf::from(DEFAULT_PATH), PathBuf::from)
}

pub fn load_from_file(path: impl AsRef<Path>) -> Result<AppConfig> {
    let path = path.as_ref();
    let src = std::fs::read_to_string(path)
        .map_err(|e| SiloError::Config(format!("cannot read {}: {e}", path.display())))?;
    load_from_str(&src).map_err(|e| match e {
        SiloError::Config(msg) => SiloError::Config(format!("{}: {msg}", path.display())),
        other => other,
    })
}

pub fn load_from_str(src: &str) -> Result<AppConfig> {
    let cfg: AppConfig =
        serde_yaml::from_str(src).map_err(|e| SiloError::Config(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
