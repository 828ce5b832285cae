//! The Permission Broker: one Unix-domain socket per Invocation that
//! mediates every tool-use permission request the agent CLI's MCP hook
//! sends it, resolving via allowlist, the `rm` auto-approval probe, or an
//! interactive prompt.

mod autotrack;
mod config;
mod connection;
mod prompt;
mod server;

pub use autotrack::auto_approves_rm;
pub use config::{default_socket_path, BrokerState, DEFAULT_PROMPT_TIMEOUT, DEFAULT_PROMPT_TIMEOUT_APPROVES};
pub use prompt::{FourChoice, NullPromptCoordinator, PromptCoordinator, TerminalPromptCoordinator};
pub use server::BrokerServer;
