//! Newline-delimited JSON framing shared by the Broker's and the Tunnel's
//! Unix-domain sockets.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::unix::OwnedWriteHalf;
use tokio::net::UnixListener;

use crate::error::{Result, TimError};

/// Bind a Unix-domain socket at `path`, removing a stale file left behind
/// by a crashed prior run and restricting permissions to the owner before
/// anything can connect. Shared bind discipline for the Broker and the
/// Tunnel.
pub fn bind_unix_listener(path: &Path) -> Result<UnixListener> {
    if path.exists() {
        fs::remove_file(path).map_err(TimError::Io)?;
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(TimError::Io)?;
    }

    let listener =
        UnixListener::bind(path).map_err(|e| TimError::broker(format!("bind {}: {e}", path.display())))?;

    fs::set_permissions(path, fs::Permissions::from_mode(0o700)).map_err(TimError::Io)?;

    Ok(listener)
}

/// Read one newline-delimited JSON frame from `reader`, tolerating partial
/// final lines (the caller calls this in a loop; a partial line stays
/// buffered inside `BufReader` until the next read completes it).
///
/// Returns `Ok(None)` on EOF. A line that fails to parse as JSON is
/// reported back via `Err` so the caller can decide to silently skip it:
/// malformed lines are dropped, not fatal to the connection.
pub async fn read_frame<R, T>(reader: &mut BufReader<R>) -> Result<Option<FrameOutcome<T>>>
where
    R: tokio::io::AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let mut line = String::new();
    let bytes_read = reader
        .read_line(&mut line)
        .await
        .map_err(TimError::Io)?;

    if bytes_read == 0 {
        return Ok(None);
    }

    let line = line.trim();
    if line.is_empty() {
        return Ok(Some(FrameOutcome::Malformed));
    }

    match serde_json::from_str::<T>(line) {
        Ok(value) => Ok(Some(FrameOutcome::Parsed(value))),
        Err(_) => Ok(Some(FrameOutcome::Malformed)),
    }
}

/// Result of attempting to parse one line.
pub enum FrameOutcome<T> {
    /// The line parsed as valid JSON matching `T`.
    Parsed(T),
    /// The line was empty or failed to parse; the caller should silently
    /// skip it and keep reading.
    Malformed,
}

/// Write one value as a newline-terminated JSON frame.
pub async fn write_frame<T: Serialize>(writer: &mut OwnedWriteHalf, value: &T) -> Result<()> {
    let mut line = serde_json::to_string(value).map_err(TimError::JsonDecode)?;
    line.push('\n');
    writer
        .write_all(line.as_bytes())
        .await
        .map_err(TimError::Io)?;
    writer.flush().await.map_err(TimError::Io)?;
    Ok(())
}
