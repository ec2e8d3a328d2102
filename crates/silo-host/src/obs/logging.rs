//! Subscriber setup.

use tracing_subscriber::{fmt, EnvFilter};

use silo_core::error::{Result, SiloError};

use crate::config::{LogFormat, LoggingConfig};

/// Install the global subscriber. `RUST_LOG` overrides `logging.filter`.
pub fn init(cfg: &LoggingConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) => EnvFilter::try_new(&cfg.filter)
            .map_err(|e| SiloError::Config(format!("logging.filter: {e}")))?,
    };

    let res = match cfg.format {
        LogFormat::Pretty => fmt().with_env_filter(filter).try_init(),
        LogFormat::Json => fmt().json().with_env_filter(filter).try_init(),
    };
    res.map_err(|e| SiloError::Internal(format!("tracing init failed: {e}")))
}
