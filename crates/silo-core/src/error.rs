//! Shared error type across silo crates.

use thiserror::Error;

/// Stable error codes (safe to log, match on, or surface to operators).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Store lookup on a key that was never set.
    KeyNotFound,
    /// Stored value has a different type than requested.
    TypeMismatch,
    /// Well-known service entry is absent.
    ServiceNotConfigured,
    /// An on-start callback faulted.
    StartupFault,
    /// An on-stop callback faulted.
    ShutdownFault,
    /// A background job faulted.
    JobFault,
    /// Job queue is saturated.
    QueueFull,
    /// Job intake is closed.
    ShuttingDown,
    /// Lifecycle operation called out of order.
    InvalidPhase,
    /// Invalid configuration.
    Config,
    /// Internal error.
    Internal,
}

impl ErrorCode {
    /// String representation used in logs and ops responses.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::KeyNotFound => "KEY_NOT_FOUND",
            ErrorCode::TypeMismatch => "TYPE_MISMATCH",
            ErrorCode::ServiceNotConfigured => "SERVICE_NOT_CONFIGURED",
            ErrorCode::StartupFault => "STARTUP_FAULT",
            ErrorCode::ShutdownFault => "SHUTDOWN_FAULT",
            ErrorCode::JobFault => "JOB_FAULT",
            ErrorCode::QueueFull => "QUEUE_FULL",
            ErrorCode::ShuttingDown => "SHUTTING_DOWN",
            ErrorCode::InvalidPhase => "INVALID_PHASE",
            ErrorCode::Config => "CONFIG",
            ErrorCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, SiloError>;

/// Unified error type used by core and host.
#[derive(Debug, Error)]
pub enum SiloError {
    #[error("key not found: {key}")]
    KeyNotFound { key: String },
    #[error("type mismatch for key {key}: expected {expected}, stored {found}")]
    TypeMismatch {
        key: String,
        expected: &'static str,
        found: &'static str,
    },
    #[error("service not configured: {service}")]
    ServiceNotConfigured { service: &'static str },
    #[error("startup callback '{callback}' failed: {source}")]
    StartupFault {
        callback: String,
        #[source]
        source: Box<SiloError>,
    },
    #[error("shutdown callback '{callback}' failed: {reason}")]
    ShutdownFault { callback: String, reason: String },
    #[error("job '{job}' failed: {reason}")]
    JobFault { job: String, reason: String },
    #[error("job queue full")]
    QueueFull,
    #[error("job intake closed")]
    ShuttingDown,
    #[error("cannot {op} while {phase}")]
    InvalidPhase { op: &'static str, phase: &'static str },
    #[error("config: {0}")]
    Config(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl SiloError {
    /// Map to a stable code.
    pub fn code(&self) -> ErrorCode {
        match self {
            SiloError::KeyNotFound { .. } => ErrorCode::KeyNotFound,
            SiloError::TypeMismatch { .. } => ErrorCode::TypeMismatch,
            SiloError::ServiceNotConfigured { .. } => ErrorCode::ServiceNotConfigured,
            SiloError::StartupFault { .. } => ErrorCode::StartupFault,
            SiloError::ShutdownFault { .. } => ErrorCode::ShutdownFault,
            SiloError::JobFault { .. } => ErrorCode::JobFault,
            SiloError::QueueFull => ErrorCode::QueueFull,
            SiloError::ShuttingDown => ErrorCode::ShuttingDown,
            SiloError::InvalidPhase { .. } => ErrorCode::InvalidPhase,
            SiloError::Config(_) => ErrorCode::Config,
            SiloError::Internal(_) => ErrorCode::Internal,
        }
    }

    /// Shorthand for job bodies that fail with a plain message.
    pub fn job(job: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        SiloError::JobFault {
            job: job.into(),
            reason: reason.to_string(),
        }
    }

    /// Rewrite a raw store miss as a missing well-known service.
    pub fn into_service_error(self, service: &'static str) -> Self {
        match self {
            SiloError::KeyNotFound { .. } => SiloError::ServiceNotConfigured { service },
            other => other,
        }
    }
}

/// Best-effort text for a caught panic payload.
pub fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}
