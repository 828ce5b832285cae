//! Dual inactivity watchdog: an initial threshold before any byte is seen,
//! and a looser steady-state threshold between bytes thereafter.

use std::time::Duration;

use tokio::sync::mpsc;

use crate::error::Result;

/// Outcome of one watchdog poll.
pub enum WatchdogEvent {
    /// A message arrived before the deadline.
    Message(Result<serde_json::Value>),
    /// The channel closed (reader task finished, EOF or error already sent).
    Closed,
    /// No message arrived before the active deadline elapsed.
    Inactive,
}

/// Wraps the Driver's message receiver, applying the initial deadline until
/// the first message arrives and the steady-state deadline afterward.
pub struct InactivityWatchdog {
    rx: mpsc::UnboundedReceiver<Result<serde_json::Value>>,
    initial: Duration,
    steady_state: Duration,
    seen_first: bool,
}

impl InactivityWatchdog {
    /// Wrap a receiver with the given deadlines.
    #[must_use]
    pub const fn new(
        rx: mpsc::UnboundedReceiver<Result<serde_json::Value>>,
        initial: Duration,
        steady_state: Duration,
    ) -> Self {
        Self {
            rx,
            initial,
            steady_state,
            seen_first: false,
        }
    }

    /// Await the next message, racing against the currently active
    /// deadline.
    pub async fn next(&mut self) -> WatchdogEvent {
        let deadline = if self.seen_first {
            self.steady_state
        } else {
            self.initial
        };

        match tokio::time::timeout(deadline, self.rx.recv()).await {
            Ok(Some(message)) => {
                self.seen_first = true;
                WatchdogEvent::Message(message)
            }
            Ok(None) => WatchdogEvent::Closed,
            Err(_) => WatchdogEvent::Inactive,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fires_initial_deadline_when_nothing_arrives() {
        let (_tx, rx) = mpsc::unbounded_channel();
        let mut watchdog =
            InactivityWatchdog::new(rx, Duration::from_millis(10), Duration::from_secs(30));
        assert!(matches!(watchdog.next().await, WatchdogEvent::Inactive));
    }

    #[tokio::test]
    async fn switches_to_steady_state_after_first_message() {
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(Ok(serde_json::json!({"type": "system"}))).unwrap();
        let mut watchdog =
            InactivityWatchdog::new(rx, Duration::from_millis(10), Duration::from_millis(50));
        assert!(matches!(watchdog.next().await, WatchdogEvent::Message(_)));
        // No further sends: the steady-state deadline (50ms) should still
        // be what's applied, not the shorter initial one.
        let start = std::time::Instant::now();
        assert!(matches!(watchdog.next().await, WatchdogEvent::Inactive));
        assert!(start.elapsed() >= Duration::from_millis(40));
    }
}
