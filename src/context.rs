//! Cancellation and deadline propagation for backend calls
//!
//! Every client operation takes a [`Context`]. Cancelling it, or letting its deadline
//! pass, makes any in-flight wait fail with [`ClientError::Cancelled`] or
//! [`ClientError::DeadlineExceeded`].

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

use crate::error::{ClientError, ClientResult};

/// Cancellation-aware context passed to every backend call
#[derive(Debug, Clone)]
pub struct Context {
    cancel: watch::Receiver<bool>,
    deadline: Option<Instant>,
}

/// Cancels the contexts derived from [`Context::with_cancel`]
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}

impl Context {
    /// A context that is never cancelled and has no deadline
    pub fn background() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self {
            cancel: rx,
            deadline: None,
        }
    }

    /// A fresh context plus the handle that cancels it
    pub fn with_cancel() -> (Self, CancelHandle) {
        let (tx, rx) = watch::channel(false);
        (
            Self {
                cancel: rx,
                deadline: None,
            },
            CancelHandle { tx },
        )
    }

    /// Derive a context that expires after `timeout`, keeping any earlier deadline
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let deadline = Instant::now() + timeout;
        Self {
            cancel: self.cancel.clone(),
            deadline: Some(self.deadline.map_or(deadline, |d| d.min(deadline))),
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// The error this context would fail with right now, if any
    pub fn err(&self) -> Option<ClientError> {
        if *self.cancel.borrow() {
            return Some(ClientError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(ClientError::DeadlineExceeded),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.err().is_some()
    }

    /// Resolves once the context is cancelled or expired
    pub async fn done(&self) -> ClientError {
        let mut rx = self.cancel.clone();
        let cancelled = async move {
            loop {
                let flagged = *rx.borrow_and_update();
                if flagged {
                    return;
                }
                if rx.changed().await.is_err() {
                    // Sender gone without cancelling: this context can only expire.
                    std::future::pending::<()>().await;
                }
            }
        };

        match self.deadline {
            Some(deadline) => tokio::select! {
                biased;
                _ = cancelled => ClientError::Cancelled,
                _ = tokio::time::sleep_until(deadline) => ClientError::DeadlineExceeded,
            },
            None => {
                cancelled.await;
                ClientError::Cancelled
            }
        }
    }

    /// Suspend for `duration` unless the context ends first
    pub async fn sleep(&self, duration: Duration) -> ClientResult<()> {
        if let Some(err) = self.err() {
            return Err(err);
        }
        tokio::select! {
            biased;
            err = self.done() => Err(err),
            _ = tokio::time::sleep(duration) => Ok(()),
        }
    }
}
