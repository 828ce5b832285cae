//! Tunnel / Output Forwarder: an optional per-Invocation sidecar socket
//! mirroring structured events to a remote observer and
//! accepting follow-up input back, sharing the Broker's socket-framing
//! code and registering itself with the Input Router as a source.

mod connection;
mod coordinator;
mod protocol;
mod state;
mod server;

pub use coordinator::TunnelPromptCoordinator;
pub use protocol::{TunnelEvent, TunnelInbound};
pub use server::{already_active, default_socket_path, TunnelServer, TUNNEL_SOCKET_ENV_VAR};
pub use state::TunnelState;
