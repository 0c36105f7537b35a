//! Run-scoped cancellation signal

use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Cloneable flag shared by every stage of one run
///
/// Blocking code polls `is_cancelled`; async code can await `cancelled`.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: CancellationToken,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        if !self.inner.is_cancelled() {
            tracing::info!("cancellation requested");
        }
        self.inner.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.is_cancelled()
    }

    /// Resolve once `cancel` has been called
    pub async fn cancelled(&self) {
        self.inner.cancelled().await
    }

    /// Cancel this token once `timeout` elapses
    ///
    /// The timer lives as long as the returned guard.
    pub fn cancel_after(&self, timeout: Duration) -> DeadlineGuard {
        let token = self.clone();
        DeadlineGuard {
            timer: tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                tracing::warn!(timeout_ms = timeout.as_millis() as u64, "run deadline expired");
                token.cancel();
            }),
        }
    }
}

/// Aborts the deadline timer when dropped
#[derive(Debug)]
pub struct DeadlineGuard {
    timer: JoinHandle<()>,
}

impl Drop for DeadlineGuard {
    fn drop(&mut self) {
        self.timer.abort();
    }
}
