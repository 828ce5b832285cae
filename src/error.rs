//! Error types for the tim agent execution core

use thiserror::Error;

/// Main error type for the agent execution core
#[derive(Error, Debug)]
pub enum TimError {
    /// Agent CLI (claude / codex) not found or not installed
    #[error("agent CLI not found: {0}")]
    CliNotFound(String),

    /// Connection error when spawning or talking to the agent subprocess
    #[error("connection error: {0}")]
    Connection(String),

    /// Process exited with a non-zero code
    #[error("process error (exit code {exit_code:?}): {message}")]
    Process {
        /// Error message
        message: String,
        /// Process exit code, if known
        exit_code: Option<i32>,
        /// Whether the process was killed due to inactivity
        killed_by_inactivity: bool,
    },

    /// JSON decode error
    #[error("JSON decode error: {0}")]
    JsonDecode(#[from] serde_json::Error),

    /// Message parse error with optional raw data
    #[error("message parse error: {message}")]
    MessageParse {
        /// Error message
        message: String,
        /// Raw message data that failed to parse
        data: Option<serde_json::Value>,
    },

    /// Transport layer error
    #[error("transport error: {0}")]
    Transport(String),

    /// Permission broker error
    #[error("broker error: {0}")]
    Broker(String),

    /// Tunnel forwarder error
    #[error("tunnel error: {0}")]
    Tunnel(String),

    /// Settings persistence error (repo-local or shared store)
    #[error("settings error: {0}")]
    Settings(String),

    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Timeout error
    #[error("timeout: {0}")]
    Timeout(String),

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias for this crate
pub type Result<T> = std::result::Result<T, TimError>;

impl TimError {
    /// Create a CLI-not-found error
    #[must_use]
    pub fn cli_not_found(which: impl Into<String>) -> Self {
        let which = which.into();
        Self::CliNotFound(format!(
            "could not find `{which}` on PATH or in common install locations"
        ))
    }

    /// Create a connection error
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Create a process error
    #[must_use]
    pub fn process(
        msg: impl Into<String>,
        exit_code: Option<i32>,
        killed_by_inactivity: bool,
    ) -> Self {
        Self::Process {
            message: msg.into(),
            exit_code,
            killed_by_inactivity,
        }
    }

    /// Create a message parse error
    pub fn message_parse(msg: impl Into<String>, data: Option<serde_json::Value>) -> Self {
        Self::MessageParse {
            message: msg.into(),
            data,
        }
    }

    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a broker error
    pub fn broker(msg: impl Into<String>) -> Self {
        Self::Broker(msg.into())
    }

    /// Create a tunnel error
    pub fn tunnel(msg: impl Into<String>) -> Self {
        Self::Tunnel(msg.into())
    }

    /// Create a settings error
    pub fn settings(msg: impl Into<String>) -> Self {
        Self::Settings(msg.into())
    }

    /// Create a timeout error
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// Create an invalid configuration error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}
