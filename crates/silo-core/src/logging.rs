//! Logger factory service backed by `tracing`.
//!
//! Components that prefer a named logger over bare `tracing` macros ask the
//! factory for one per category. Events carry the category as a structured
//! field, so subscriber filtering and JSON output keep working.

use std::sync::Arc;

pub trait LoggerFactory: Send + Sync {
    fn create_logger(&self, category: &str) -> Logger;
}

/// Category-scoped logger.
#[derive(Debug, Clone)]
pub struct Logger {
    category: Arc<str>,
}

impl Logger {
    pub fn new(category: impl Into<Arc<str>>) -> Self {
        Self {
            category: category.into(),
        }
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn trace(&self, msg: &str) {
        tracing::trace!(category = %self.category, "{msg}");
    }

    pub fn debug(&self, msg: &str) {
        tracing::debug!(category = %self.category, "{msg}");
    }

    pub fn info(&self, msg: &str) {
        tracing::info!(category = %self.category, "{msg}");
    }

    pub fn warn(&self, msg: &str) {
        tracing::warn!(category = %self.category, "{msg}");
    }

    pub fn error(&self, msg: &str) {
        tracing::error!(category = %self.category, "{msg}");
    }
}

/// Default factory: every logger writes through the global subscriber.
#[derive(Debug, Default, Clone)]
pub struct TracingLoggerFactory {
    prefix: Option<Arc<str>>,
}

impl TracingLoggerFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prefix every category, e.g. with the application name.
    pub fn with_prefix(prefix: impl Into<Arc<str>>) -> Self {
        Self {
            prefix: Some(prefix.into()),
        }
    }
}

impl LoggerFactory for TracingLoggerFactory {
    fn create_logger(&self, category: &str) -> Logger {
        match &self.prefix {
            Some(p) => Logger::new(format!("{p}::{category}")),
            None => Logger::new(category),
        }
    }
}
