//! Cancellation and deadline context for database calls.
//!
//! Every executor takes a [`QueryContext`]. The driver future is raced against
//! the context; whichever finishes first wins, and a losing driver future is
//! dropped, which makes sqlx abandon the in-flight statement.

use crate::error::{DbError, DbResult, translate};
use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{Instant, sleep_until};

/// Why a context is done.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextError {
    Canceled,
    DeadlineExceeded,
}

impl std::fmt::Display for ContextError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Canceled => write!(f, "context canceled"),
            Self::DeadlineExceeded => write!(f, "deadline exceeded"),
        }
    }
}

impl std::error::Error for ContextError {}

/// Deadline plus optional cancellation signal. Cheap to clone; clones share
/// the cancellation signal.
#[derive(Debug, Clone, Default)]
pub struct QueryContext {
    deadline: Option<Instant>,
    cancel: Option<watch::Receiver<bool>>,
}

/// Cancels every context derived from the one it was created with.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

impl QueryContext {
    /// A context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Self::default()
    }

    /// Derive a context whose deadline is at most `timeout` from now.
    /// An earlier existing deadline is kept.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Derive a context with the given deadline, keeping an earlier one.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(current) if current <= deadline => current,
            _ => deadline,
        };
        Self {
            deadline: Some(deadline),
            cancel: self.cancel.clone(),
        }
    }

    /// Derive a cancellable context.
    ///
    /// The derived context is done when either the returned handle or any
    /// parent handle cancels.
    pub fn with_cancel(&self) -> (Self, CancelHandle) {
        let (tx, rx) = watch::channel(self.is_cancelled());
        if let Some(parent) = self.cancel.clone() {
            let child = tx.clone();
            tokio::spawn(forward_cancel(parent, child));
        }
        (
            Self {
                deadline: self.deadline,
                cancel: Some(rx),
            },
            CancelHandle { tx },
        )
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Why the context is done, or `None` while it is still live.
    pub fn err(&self) -> Option<ContextError> {
        if self.is_cancelled() {
            return Some(ContextError::Canceled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(ContextError::DeadlineExceeded),
            _ => None,
        }
    }

    /// Resolves once the context is cancelled or its deadline passes.
    /// Never resolves for a background context.
    pub async fn done(&self) -> ContextError {
        let deadline = async {
            match self.deadline {
                Some(deadline) => sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };
        let cancelled = async {
            match self.cancel.clone() {
                Some(mut rx) => {
                    // A dropped handle can never cancel.
                    if rx.wait_for(|cancelled| *cancelled).await.is_err() {
                        std::future::pending::<()>().await;
                    }
                }
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = cancelled => ContextError::Canceled,
            _ = deadline => ContextError::DeadlineExceeded,
        }
    }

    /// Run a driver future under this context, translating driver errors.
    pub async fn run<F, T>(&self, operation: &str, fut: F) -> DbResult<T>
    where
        F: Future<Output = Result<T, sqlx::Error>>,
    {
        if let Some(cause) = self.err() {
            return Err(DbError::cancelled(operation, cause));
        }

        tokio::select! {
            biased;
            cause = self.done() => Err(DbError::cancelled(operation, cause)),
            result = fut => result.map_err(|e| translate(operation, e)),
        }
    }
}

async fn forward_cancel(mut parent: watch::Receiver<bool>, child: watch::Sender<bool>) {
    tokio::select! {
        res = parent.wait_for(|cancelled| *cancelled) => {
            if res.is_ok() {
                child.send_replace(true);
            }
        }
        _ = child.closed() => {}
    }
}
