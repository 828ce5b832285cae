#![warn(missing_docs)]
#![warn(clippy::all)]

//! # tim-agent-core
//!
//! The Agent Execution Core for `tim`: spawns and supervises one coding
//! agent CLI subprocess per invocation, mediates its tool-use permission
//! requests over a local Unix-domain socket, formats its streamed output,
//! and composes orchestration prompts for multi-phase workflows.
//!
//! ## Quick start
//!
//! ```no_run
//! use tim_agent_core::{Invocation, InvocationOptions, subprocess::Executor};
//!
//! #[tokio::main]
//! async fn main() -> tim_agent_core::Result<()> {
//!     let options = InvocationOptions::builder("List the files in this directory")
//!         .build();
//!
//!     let result = Invocation::run(options, Executor::Claude, None).await?;
//!     log::info!("finished: success={}", result.success);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`subprocess`]: spawns the agent CLI, writes its stdin, parses its
//!   streamed stdout, and kills it on inactivity.
//! - [`broker`]: the Permission Broker socket the agent CLI's MCP hook
//!   talks to for every tool-use approval.
//! - [`input`]: routes follow-up user messages into the agent's stdin from
//!   whichever of terminal, tunnel, or GUI is active.
//! - [`tunnel`]: optional sidecar socket mirroring output to, and accepting
//!   input from, a remote observer.
//! - [`formatter`]: turns raw stream-json lines into [`types::FormattedMessage`]s
//!   and detects buried `FAILED:` reports.
//! - [`prompt`]: composes the orchestration system prompt for each execution
//!   mode and subagent executor.
//! - [`invocation`]: ties all of the above into one `Invocation::run` call,
//!   owning the temp directory and the cleanup stack.
//! - [`settings`]: repo-local and shared cross-worktree permission rule
//!   persistence.
//! - [`framing`]: the newline-delimited JSON framing shared by the Broker
//!   and Tunnel sockets.
//! - [`types`]: the crate's public data model.
//! - [`error`]: the crate's error type.
//!
//! ## Error handling
//!
//! All fallible operations return [`Result<T>`]. The crate uses `thiserror`
//! for error types with full context; see [`error::TimError`] for the
//! complete set of failure classes and how each is surfaced per
//! [`invocation`]'s error-handling rules (subprocess spawn failure and a
//! non-zero exit in review mode are fatal; a non-zero exit otherwise, and a
//! buried `FAILED:` report, are both surfaced in [`InvocationResult`]
//! instead).

pub mod broker;
pub mod cli;
pub mod error;
pub mod formatter;
pub mod framing;
pub mod input;
pub mod invocation;
pub mod prompt;
pub mod settings;
pub mod subprocess;
pub mod tunnel;
pub mod types;

pub use error::{Result, TimError};
pub use invocation::{CancelHandle, Invocation, InvocationResult};
pub use types::{
    CapturePolicy, ExecutionMode, InputSourcePolicy, InvocationOptions, InvocationOptionsBuilder,
    OrchestrationOptions, SubagentExecutor,
};

/// Crate version, as set in `Cargo.toml`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
