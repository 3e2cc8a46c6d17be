//! Cooperative cancellation for long-running server calls.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;

/// A cloneable cancellation signal.
///
/// All clones share one flag: cancelling any clone cancels every pending
/// [`CancelSignal::run`] on all of them. A signal never resets.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for CancelSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelSignal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once the signal has been cancelled.
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives as long as `self`, so this only returns on cancel.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }

    /// Drive `fut` to completion unless the signal fires first, in which
    /// case `fut` is dropped and `None` is returned.
    pub async fn run<F: Future>(&self, fut: F) -> Option<F::Output> {
        if self.is_cancelled() {
            return None;
        }
        tokio::select! {
            biased;
            _ = self.cancelled() => None,
            output = fut => Some(output),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_run_completes_without_cancel() {
        let signal = CancelSignal::new();
        assert_eq!(signal.run(async { 7 }).await, Some(7));
    }

    #[tokio::test]
    async fn test_cancelled_before_run() {
        let signal = CancelSignal::new();
        signal.cancel();
        assert!(signal.is_cancelled());
        assert_eq!(signal.run(async { 7 }).await, None);
    }

    #[tokio::test]
    async fn test_clone_cancels_pending_run() {
        let signal = CancelSignal::new();
        let remote = signal.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            remote.cancel();
        });

        let result = signal
            .run(tokio::time::sleep(Duration::from_secs(30)))
            .await;
        assert!(result.is_none());
    }
}
