//! Shared state for one Invocation's Tunnel: the single connected
//! observer's outbound channel, and prompt requests awaiting a reply.

use std::collections::HashMap;
use std::sync::Mutex as StdMutex;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::error::{Result, TimError};

use super::protocol::TunnelEvent;

/// Default wait for a remote prompt reply before falling back, mirroring
/// the Broker's own interactive-prompt timeout default.
pub const DEFAULT_TUNNEL_PROMPT_TIMEOUT: Duration = Duration::from_secs(120);

/// State shared by the Tunnel's accept loop, its connection handler, and
/// the `PromptCoordinator` the Broker may be wired up to use.
pub struct TunnelState {
    outbound: StdMutex<Option<mpsc::UnboundedSender<TunnelEvent>>>,
    pending: StdMutex<HashMap<String, std::sync::mpsc::Sender<serde_json::Value>>>,
    pub prompt_timeout: Duration,
}

impl TunnelState {
    #[must_use]
    pub fn new() -> Self {
        Self {
            outbound: StdMutex::new(None),
            pending: StdMutex::new(HashMap::new()),
            prompt_timeout: DEFAULT_TUNNEL_PROMPT_TIMEOUT,
        }
    }

    /// Register the newly accepted connection as the active observer,
    /// replacing any previous one. Only one tunnel client is expected at a
    /// time; an Invocation never creates a second tunnel while already
    /// inside one, which would otherwise loop.
    pub fn set_outbound(&self, sender: mpsc::UnboundedSender<TunnelEvent>) {
        *self.outbound.lock().expect("tunnel outbound lock poisoned") = Some(sender);
    }

    /// Clear the observer once its connection closes.
    pub fn clear_outbound(&self) {
        *self.outbound.lock().expect("tunnel outbound lock poisoned") = None;
    }

    /// Send an event to the connected observer, if any. Silently dropped
    /// when no observer is connected.
    pub fn send_event(&self, event: TunnelEvent) {
        let guard = self.outbound.lock().expect("tunnel outbound lock poisoned");
        if let Some(sender) = guard.as_ref() {
            let _ = sender.send(event);
        }
    }

    /// Whether an observer is currently connected.
    #[must_use]
    pub fn has_observer(&self) -> bool {
        self.outbound.lock().expect("tunnel outbound lock poisoned").is_some()
    }

    /// Register `request_id` as awaiting a reply, returning the blocking
    /// receiver the caller waits on.
    pub fn register_pending(&self, request_id: String) -> std::sync::mpsc::Receiver<serde_json::Value> {
        let (tx, rx) = std::sync::mpsc::channel();
        self.pending
            .lock()
            .expect("tunnel pending lock poisoned")
            .insert(request_id, tx);
        rx
    }

    /// Deliver an inbound `PromptResponse`'s detail to whichever blocking
    /// waiter registered `request_id`, if still pending.
    pub fn resolve_pending(&self, request_id: &str, detail: serde_json::Value) {
        if let Some(sender) = self
            .pending
            .lock()
            .expect("tunnel pending lock poisoned")
            .remove(request_id)
        {
            let _ = sender.send(detail);
        }
    }

    /// Drop a pending registration that timed out, so a late reply is
    /// silently ignored instead of leaking the channel forever.
    pub fn forget_pending(&self, request_id: &str) {
        self.pending.lock().expect("tunnel pending lock poisoned").remove(request_id);
    }
}

impl Default for TunnelState {
    fn default() -> Self {
        Self::new()
    }
}

/// Block the calling thread for a reply to `request_id`, up to
/// `state.prompt_timeout`. Intended to run inside `spawn_blocking`, mirroring
/// the Broker's own prompt-dispatch discipline.
pub fn wait_for_reply(state: &TunnelState, request_id: &str, rx: std::sync::mpsc::Receiver<serde_json::Value>) -> Result<serde_json::Value> {
    match rx.recv_timeout(state.prompt_timeout) {
        Ok(detail) => Ok(detail),
        Err(_) => {
            state.forget_pending(request_id);
            Err(TimError::timeout("tunnel prompt reply"))
        }
    }
}
