use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use silo_core::error::Result;

use crate::lifecycle::CancelToken;

/// Identity of one submitted job (or one recurring schedule).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A unit of deferred work. `run` may be called again on retry.
#[async_trait]
pub trait Job: Send + Sync + 'static {
    fn name(&self) -> &str;
    async fn run(&self, ctx: JobContext) -> Result<()>;
}

/// Per-attempt context handed to a running job.
#[derive(Clone, Debug)]
pub struct JobContext {
    id: JobId,
    name: Arc<str>,
    attempt: u32,
    cancel: CancelToken,
}

impl JobContext {
    pub(crate) fn new(id: JobId, name: Arc<str>, attempt: u32, cancel: CancelToken) -> Self {
        Self {
            id,
            name,
            attempt,
            cancel,
        }
    }

    pub fn id(&self) -> JobId { self.id }
    pub fn name(&self) -> &str { &self.name }
    /// 1-based attempt number.
    pub fn attempt(&self) -> u32 { self.attempt }

    /// True once shutdown has begun; long jobs should wind down.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub async fn cancelled(&self) {
        self.cancel.cancelled().await
    }
}

/// Per-submission overrides. Unset fields fall back to `jobs.*` config.
#[derive(Debug, Clone, Default)]
pub struct JobOptions {
    pub delay: Option<Duration>,
    pub max_attempts: Option<u32>,
    pub retry_backoff: Option<Duration>,
}

impl JobOptions {
    pub fn delayed(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn with_retries(mut self, max_attempts: u32, backoff: Duration) -> Self {
        self.max_attempts = Some(max_attempts);
        self.retry_backoff = Some(backoff);
        self
    }
}

/// Adapter turning an async closure into a [`Job`].
pub struct FnJob<F> {
    name: String,
    f: F,
}

impl<F> FnJob<F> {
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

#[async_trait]
impl<F, Fut> Job for FnJob<F>
where
    F: Fn(JobContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, ctx: JobContext) -> Result<()> {
        (self.f)(ctx).await
    }
}
