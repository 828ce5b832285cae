//! The Tunnel's `UnixListener`, mirroring the Broker's bind-before-spawn
//! shape over the shared socket-framing helpers.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::net::UnixListener;
use tokio::task::JoinHandle;

use crate::error::Result;
use crate::framing::bind_unix_listener;
use crate::input::InputRouter;

use super::connection::handle_connection;
use super::state::TunnelState;

/// Environment variable the agent subprocess sees the Tunnel's socket path
/// under, and the gate an Invocation checks before creating its own Tunnel:
/// a new one is created only if a globally visible tunnel-client is not
/// already active, avoiding nested-invocation loops.
pub const TUNNEL_SOCKET_ENV_VAR: &str = "TIM_TUNNEL_SOCKET";

const SOCKET_FILE_NAME: &str = "tunnel.sock";

/// Whether this process is already running inside another Invocation's
/// tunnel (its socket path is exported in the environment).
#[must_use]
pub fn already_active() -> bool {
    std::env::var(TUNNEL_SOCKET_ENV_VAR).is_ok()
}

/// Default path for the Tunnel's socket, inside the Invocation's temp
/// directory.
#[must_use]
pub fn default_socket_path(temp_dir: &Path) -> PathBuf {
    temp_dir.join(SOCKET_FILE_NAME)
}

/// An accepted and bound Tunnel socket, with its accept loop running as a
/// background task.
pub struct TunnelServer {
    socket_path: PathBuf,
    state: Arc<TunnelState>,
    accept_loop: JoinHandle<()>,
}

impl TunnelServer {
    /// Bind the socket and spawn the accept loop. Each accepted connection
    /// becomes the active observer, registering itself with `input_router`
    /// as an input source (mutually exclusive with the terminal reader).
    pub fn bind(socket_path: PathBuf, input_router: Arc<InputRouter>) -> Result<Self> {
        let listener = bind_unix_listener(&socket_path)?;
        let state = Arc::new(TunnelState::new());

        let accept_loop = tokio::spawn(accept_loop(listener, Arc::clone(&state), input_router));

        Ok(Self {
            socket_path,
            state,
            accept_loop,
        })
    }

    /// Path the agent subprocess's environment should carry.
    #[must_use]
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Shared state, handed to a [`super::coordinator::TunnelPromptCoordinator`]
    /// the Broker can be configured to use.
    #[must_use]
    pub fn state(&self) -> Arc<TunnelState> {
        Arc::clone(&self.state)
    }

    /// Stop accepting new connections and remove the socket file.
    pub async fn shutdown(self) {
        self.accept_loop.abort();
        let _ = fs::remove_file(&self.socket_path);
    }
}

impl Drop for TunnelServer {
    /// Same backstop as [`super::super::broker::BrokerServer`]'s `Drop`.
    fn drop(&mut self) {
        self.accept_loop.abort();
        let _ = fs::remove_file(&self.socket_path);
    }
}

async fn accept_loop(listener: UnixListener, state: Arc<TunnelState>, input_router: Arc<InputRouter>) {
    loop {
        match listener.accept().await {
            Ok((stream, _addr)) => {
                let state = Arc::clone(&state);
                let input_router = Arc::clone(&input_router);
                tokio::spawn(handle_connection(stream, state, input_router));
            }
            Err(e) => {
                log::warn!("tunnel: accept failed: {e}");
                break;
            }
        }
    }
}
