//! Cooperative cancellation for resource-owned work.

use std::future::Future;
use std::sync::Arc;

use fitfind_core::FitFindError;
use tokio::sync::watch;

/// Cancellation token shared by a resource and the tasks it starts.
///
/// Clones observe the same state. Once cancelled a scope stays cancelled.
#[derive(Debug, Clone)]
pub struct CancelScope {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for CancelScope {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelScope {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once the scope is cancelled.
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so `wait_for` cannot fail here.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }

    /// `Err(Cancelled)` once the scope has been cancelled.
    ///
    /// # Errors
    /// Returns `FitFindError::Cancelled` when cancelled.
    pub fn check(&self) -> Result<(), FitFindError> {
        if self.is_cancelled() { Err(FitFindError::Cancelled) } else { Ok(()) }
    }

    /// Run `fut` unless the scope is cancelled first.
    ///
    /// # Errors
    /// Returns `FitFindError::Cancelled` if cancellation wins the race.
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output, FitFindError> {
        self.check()?;
        tokio::select! {
            biased;
            () = self.cancelled() => Err(FitFindError::Cancelled),
            out = fut => Ok(out),
        }
    }
}
