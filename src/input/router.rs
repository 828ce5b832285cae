//! Routes follow-up user messages from one of three mutually exclusive
//! sources into the agent's stdin.
//!
//! Each follow-up is written as one stream-json user message line:
//! `{"type":"user","message":{"role":"user","content":<string>}}\n`.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::json;
use tokio::sync::Mutex;

use crate::error::Result;
use crate::subprocess::SubprocessDriver;

use super::terminal::TerminalReader;

/// Which of the three input sources currently owns follow-up delivery.
enum ActiveSource {
    None,
    /// Holds the live reader so a second `start_terminal_reader` call can
    /// stop it cleanly.
    Terminal(TerminalReader),
    Tunnel,
    Gui,
}

/// Shared router instance; held behind `Arc` since the terminal reader's
/// background task and external callers (tunnel, GUI adapters) all need a
/// handle to call back into it.
pub struct InputRouter {
    driver: Arc<Mutex<SubprocessDriver>>,
    closed: AtomicBool,
    active: Mutex<ActiveSource>,
}

impl InputRouter {
    /// Create a router over a live driver. Call sites that never enable any
    /// input source behave as single-prompt mode: the first `close()` call
    /// closes stdin with nothing else to stop.
    #[must_use]
    pub fn new(driver: Arc<Mutex<SubprocessDriver>>) -> Arc<Self> {
        Arc::new(Self {
            driver,
            closed: AtomicBool::new(false),
            active: Mutex::new(ActiveSource::None),
        })
    }

    /// Start (or restart) the terminal input source. Stops any existing
    /// active source first, preserving its partially typed line across the
    /// transient pause if it was itself a terminal reader.
    pub async fn start_terminal_reader(self: &Arc<Self>) -> Result<()> {
        let carried_buffer = self.stop_active_source_for_restart().await;

        let on_line_router = Arc::clone(self);
        let on_close_router = Arc::clone(self);

        let reader = TerminalReader::start(
            carried_buffer,
            move |line| {
                let router = Arc::clone(&on_line_router);
                tokio::spawn(async move {
                    let _ = router.send_follow_up(line).await;
                });
            },
            move || {
                tokio::spawn(async move {
                    let _ = on_close_router.close().await;
                });
            },
        )?;

        *self.active.lock().await = ActiveSource::Terminal(reader);
        Ok(())
    }

    /// Register the tunnel as the active source, stopping any running
    /// terminal reader. The tunnel calls [`Self::send_follow_up`] directly
    /// as content arrives; this just enforces mutual exclusion.
    pub async fn register_tunnel(self: &Arc<Self>) {
        self.stop_active_source_for_restart().await;
        *self.active.lock().await = ActiveSource::Tunnel;
    }

    /// Register a headless/GUI adapter as the active source, same
    /// semantics as [`Self::register_tunnel`].
    pub async fn register_gui(self: &Arc<Self>) {
        self.stop_active_source_for_restart().await;
        *self.active.lock().await = ActiveSource::Gui;
    }

    /// Stop whatever source is active, returning a terminal reader's
    /// buffered partial line (empty for any other source or none).
    async fn stop_active_source_for_restart(&self) -> String {
        let previous = std::mem::replace(&mut *self.active.lock().await, ActiveSource::None);
        match previous {
            ActiveSource::Terminal(reader) => reader.pause().await,
            ActiveSource::Tunnel | ActiveSource::Gui | ActiveSource::None => String::new(),
        }
    }

    /// Send one follow-up message to the agent's stdin. A no-op once the
    /// router has closed: a follow-up write attempted after the guard has
    /// tripped is silently dropped. After the Invocation's stdin has closed,
    /// tunnel/GUI-sourced calls become no-ops too, since they share the same
    /// guard.
    pub async fn send_follow_up(&self, content: String) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Ok(());
        }

        let line = format!(
            "{}\n",
            json!({
                "type": "user",
                "message": { "role": "user", "content": content },
            })
        );

        let mut driver = self.driver.lock().await;
        if let Err(e) = driver.write_line(&line).await {
            log::warn!("input: failed to write follow-up, closing router: {e}");
            drop(driver);
            self.close().await?;
        }
        Ok(())
    }

    /// Trip the close guard for non-interactive (single-prompt) callers: the
    /// prompt itself is sent as a CLI argument and stdin is already shut
    /// down directly by `SubprocessDriver::connect`, so this just brings the
    /// router's own guard in sync so any later `send_follow_up` is a
    /// documented no-op rather than a surprise.
    pub async fn run_single_prompt(&self) -> Result<()> {
        self.close().await
    }

    /// Idempotent stdin close: the first caller across any exit path wins,
    /// every subsequent call is a no-op.
    pub async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let previous = std::mem::replace(&mut *self.active.lock().await, ActiveSource::None);
        if let ActiveSource::Terminal(reader) = previous {
            reader.stop().await;
        }

        self.driver.lock().await.end_input().await
    }

    /// Whether the close guard has already tripped.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}
