//! Per-call deadline and cancellation handle threaded through every store and
//! cache operation.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Interrupted {
    #[error("operation cancelled by caller")]
    Cancelled,
    #[error("operation deadline exceeded")]
    DeadlineExceeded,
}

/// Cheap to clone; clones share the same cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    deadline: Option<Instant>,
    cancelled: Arc<AtomicBool>,
}

impl CallContext {
    /// No deadline, never cancelled unless `cancel` is called.
    pub fn background() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Fails when the context is already cancelled or past its deadline.
    pub fn check(&self) -> Result<(), Interrupted> {
        if self.is_cancelled() {
            return Err(Interrupted::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(Interrupted::DeadlineExceeded),
            _ => Ok(()),
        }
    }

    /// Runs one I/O round-trip under this context. The future is never polled
    /// when `check` fails.
    pub async fn run<F>(&self, operation: F) -> Result<F::Output, Interrupted>
    where
        F: Future,
    {
        self.check()?;
        match self.deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, operation)
                .await
                .map_err(|_| Interrupted::DeadlineExceeded),
            None => Ok(operation.await),
        }
    }
}
