//! Background stdout reader: accumulates stream-json lines with a max
//! buffer guard.

use tokio::io::AsyncBufReadExt;
use tokio::sync::mpsc;

use crate::error::{Result, TimError};

use super::driver::SubprocessDriver;

/// Spawn the background task that reads stdout line-by-line, accumulating
/// partial JSON, and sends parsed values (or errors) to the returned
/// receiver. Leaves the child process itself owned by the `Driver`, which
/// reaps its real exit code via `close`/`kill` once this task's channel
/// closes.
pub(super) fn spawn_reader(
    driver: &mut SubprocessDriver,
) -> mpsc::UnboundedReceiver<Result<serde_json::Value>> {
    let (tx, rx) = mpsc::unbounded_channel();

    let stdout = driver.take_stdout();
    let max_buffer_size = driver.max_buffer_size();

    let task = tokio::spawn(async move {
        let Some(mut stdout) = stdout else {
            let _ = tx.send(Err(TimError::connection("stdout not available")));
            return;
        };
        let mut json_buffer = String::new();

        // No read-level timeout here: the caller wraps this channel in an
        // `InactivityWatchdog` with the Invocation's configured initial and
        // steady-state deadlines. A fixed timeout on every single read
        // would fire spuriously long before a legitimate multi-minute
        // steady-state deadline ever gets a chance to apply.
        loop {
            let mut line = String::new();
            match stdout.read_line(&mut line).await {
                Ok(0) => break,
                Ok(_) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }

                    json_buffer.push_str(line);

                    if json_buffer.len() > max_buffer_size {
                        let _ = tx.send(Err(TimError::message_parse(
                            format!("JSON line exceeded max buffer size of {max_buffer_size} bytes"),
                            None,
                        )));
                        json_buffer.clear();
                        continue;
                    }

                    if let Ok(data) = serde_json::from_str::<serde_json::Value>(&json_buffer) {
                        json_buffer.clear();
                        if tx.send(Ok(data)).is_err() {
                            break;
                        }
                    }
                }
                Err(e) => {
                    let _ = tx.send(Err(TimError::Io(e)));
                    break;
                }
            }
        }
    });

    driver.set_reader_task(task);
    rx
}
