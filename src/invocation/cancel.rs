//! Caller-initiated cancellation for an in-flight `Invocation::run_with`
//! call.

use tokio::sync::watch;

/// A cloneable handle that can cancel one in-flight `Invocation::run_with`
/// call. Cancelling kills the subprocess and runs through the same
/// cleanup stack as every other exit path, with `killed_by_inactivity`
/// left `false` so the caller can tell a deliberate cancel apart from an
/// inactivity timeout.
#[derive(Clone)]
pub struct CancelHandle {
    sender: std::sync::Arc<watch::Sender<bool>>,
    receiver: watch::Receiver<bool>,
}

impl Default for CancelHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelHandle {
    /// Create a fresh, not-yet-cancelled handle.
    #[must_use]
    pub fn new() -> Self {
        let (sender, receiver) = watch::channel(false);
        Self {
            sender: std::sync::Arc::new(sender),
            receiver,
        }
    }

    /// Request cancellation. Idempotent, and safe to call after the run
    /// it was given to has already finished.
    pub fn cancel(&self) {
        let _ = self.sender.send(true);
    }

    /// Whether `cancel` has already been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolve once `cancel` has been called (immediately if it already
    /// has, even if that happened before this call started).
    pub async fn cancelled(&self) {
        let mut receiver = self.receiver.clone();
        if *receiver.borrow() {
            return;
        }
        while receiver.changed().await.is_ok() {
            if *receiver.borrow() {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn cancelled_resolves_immediately_once_already_cancelled() {
        let handle = CancelHandle::new();
        handle.cancel();
        tokio::time::timeout(Duration::from_millis(50), handle.cancelled())
            .await
            .expect("cancelled() must resolve immediately once already cancelled");
    }

    #[tokio::test]
    async fn cancelled_resolves_after_a_later_cancel_call() {
        let handle = CancelHandle::new();
        let waiter = handle.clone();
        let task = tokio::spawn(async move { waiter.cancelled().await });
        tokio::time::sleep(Duration::from_millis(10)).await;
        handle.cancel();
        tokio::time::timeout(Duration::from_millis(200), task)
            .await
            .expect("task must complete")
            .expect("task must not panic");
    }

    #[test]
    fn is_cancelled_reflects_state() {
        let handle = CancelHandle::new();
        assert!(!handle.is_cancelled());
        handle.cancel();
        assert!(handle.is_cancelled());
    }
}
