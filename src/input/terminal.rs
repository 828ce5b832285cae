//! Raw-mode terminal line reader with pause/resume, built on `crossterm`'s
//! character-level key events.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use crossterm::event::{Event, KeyCode, KeyModifiers};
use tokio::task::JoinHandle;

use crate::error::{Result, TimError};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// A running terminal reader. Dropping without calling [`Self::pause`] or
/// [`Self::stop`] leaves raw mode disabled on the next poll timeout.
pub struct TerminalReader {
    stop: Arc<AtomicBool>,
    buffer: Arc<StdMutex<String>>,
    task: Option<JoinHandle<()>>,
}

impl TerminalReader {
    /// Enable raw mode and start reading key events, seeding the visible
    /// line with `initial_buffer` (used to restore partially typed input
    /// after a resume). `on_line` fires once per submitted (non-empty)
    /// line; `on_close` fires once on Ctrl-D.
    pub fn start<FLine, FClose>(
        initial_buffer: String,
        on_line: FLine,
        on_close: FClose,
    ) -> Result<Self>
    where
        FLine: Fn(String) + Send + 'static,
        FClose: FnOnce() + Send + 'static,
    {
        crossterm::terminal::enable_raw_mode()
            .map_err(|e| TimError::transport(format!("failed to enable raw mode: {e}")))?;

        print!("{initial_buffer}");
        let _ = std::io::stdout().flush();

        let stop = Arc::new(AtomicBool::new(false));
        let buffer = Arc::new(StdMutex::new(initial_buffer));

        let stop_clone = Arc::clone(&stop);
        let buffer_clone = Arc::clone(&buffer);
        let task = tokio::task::spawn_blocking(move || {
            read_loop(&stop_clone, &buffer_clone, on_line, on_close);
        });

        Ok(Self {
            stop,
            buffer,
            task: Some(task),
        })
    }

    /// Stop reading and return the partially typed line, preserving its
    /// contents for a subsequent [`Self::start`] to re-inject.
    pub async fn pause(mut self) -> String {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
        let _ = crossterm::terminal::disable_raw_mode();
        self.buffer.lock().map(|b| b.clone()).unwrap_or_default()
    }

    /// Stop reading permanently, discarding any partial line.
    pub async fn stop(mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
        let _ = crossterm::terminal::disable_raw_mode();
    }
}

fn read_loop<FLine, FClose>(
    stop: &Arc<AtomicBool>,
    buffer: &Arc<StdMutex<String>>,
    on_line: FLine,
    on_close: FClose,
) where
    FLine: Fn(String),
    FClose: FnOnce(),
{
    let mut on_close = Some(on_close);

    while !stop.load(Ordering::SeqCst) {
        match crossterm::event::poll(POLL_INTERVAL) {
            Ok(true) => {}
            Ok(false) => continue,
            Err(_) => break,
        }

        let Ok(Event::Key(key)) = crossterm::event::read() else {
            continue;
        };

        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('d') {
            if let Some(on_close) = on_close.take() {
                on_close();
            }
            break;
        }

        match key.code {
            KeyCode::Enter => {
                let line = buffer
                    .lock()
                    .map(std::mem::take)
                    .unwrap_or_default();
                print!("\r\n");
                let _ = std::io::stdout().flush();
                if !line.trim().is_empty() {
                    on_line(line);
                }
            }
            KeyCode::Char(c) => {
                if let Ok(mut b) = buffer.lock() {
                    b.push(c);
                }
                print!("{c}");
                let _ = std::io::stdout().flush();
            }
            KeyCode::Backspace => {
                let popped = buffer.lock().ok().and_then(|mut b| b.pop());
                if popped.is_some() {
                    print!("\u{8} \u{8}");
                    let _ = std::io::stdout().flush();
                }
            }
            _ => {}
        }
    }

    let _ = crossterm::terminal::disable_raw_mode();
}
