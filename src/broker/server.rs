//! The Broker's `UnixListener`: bind-before-spawn so the socket exists
//! before the agent CLI is launched pointing at it, accept loop spawning
//! one connection handler per peer.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::net::UnixListener;
use tokio::task::JoinHandle;

use crate::error::Result;
use crate::framing::bind_unix_listener;

use super::config::BrokerState;
use super::connection::handle_connection;

/// An accepted and bound Broker socket, with its accept loop running as a
/// background task.
pub struct BrokerServer {
    socket_path: PathBuf,
    accept_loop: JoinHandle<()>,
}

impl BrokerServer {
    /// Bind the socket at `socket_path`, removing any stale file left
    /// behind by a crashed prior run, then spawn the accept loop.
    pub fn bind(socket_path: PathBuf, state: Arc<BrokerState>) -> Result<Self> {
        let listener = bind_unix_listener(&socket_path)?;
        let accept_loop = tokio::spawn(accept_loop(listener, state));

        Ok(Self {
            socket_path,
            accept_loop,
        })
    }

    /// Path the agent CLI's MCP config should point at.
    #[must_use]
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Stop accepting new connections and remove the socket file. Already
    /// open connections finish independently; this does not wait for them.
    pub async fn shutdown(self) {
        self.accept_loop.abort();
        let _ = fs::remove_file(&self.socket_path);
    }
}

impl Drop for BrokerServer {
    /// Backstop for a caller that drops the server without calling
    /// `shutdown` (e.g. an Invocation cancelled mid-setup): stop the accept
    /// loop and remove the socket file. Safe to run again after an explicit
    /// `shutdown` already did the same.
    fn drop(&mut self) {
        self.accept_loop.abort();
        let _ = fs::remove_file(&self.socket_path);
    }
}

async fn accept_loop(listener: UnixListener, state: Arc<BrokerState>) {
    loop {
        match listener.accept().await {
            Ok((stream, _addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(handle_connection(stream, state));
            }
            Err(e) => {
                log::warn!("broker: accept failed: {e}");
                break;
            }
        }
    }
}
