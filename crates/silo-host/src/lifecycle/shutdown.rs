//! Process cancellation signal.

use tokio_util::sync::CancellationToken;

/// Cloneable cancellation flag shared by the app, the job pool, and jobs.
///
/// Waiters that subscribe after [`CancelToken::cancel`] resolve immediately.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    inner: CancellationToken,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trigger cancellation. Idempotent.
    pub fn cancel(&self) {
        self.inner.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.is_cancelled()
    }

    /// Resolves once [`CancelToken::cancel`] has been called.
    pub async fn cancelled(&self) {
        self.inner.cancelled().await;
    }
}
