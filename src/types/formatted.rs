//! Types produced by the Message Formatter.
//!
//! `FormattedMessage` is the deterministic product of parsing one
//! stream-json line; it is what `processFormattedMessages` callers receive,
//! never the raw [`super::messages::Message`].

use serde::{Deserialize, Serialize};

/// Discriminates a `FormattedMessage`'s origin line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormattedMessageType {
    Assistant,
    User,
    System,
    Result,
    ParseError,
    /// Line produced no renderable content (e.g. an empty stream event).
    Empty,
}

/// One structured sub-event extracted while rendering a message, handed to
/// callers alongside the rendered text for mode-specific bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StructuredEvent {
    /// A `Write`/`Edit`/`MultiEdit` tool use touched this file.
    FileWrite { path: String },
    /// A `Bash` tool result completed with this exit status.
    CommandResult { command: String, is_error: bool },
    /// A `TodoWrite` tool use replaced the todo list.
    TodoUpdate { items: Vec<String> },
    /// Any tool invocation, recorded regardless of kind.
    LlmToolUse { tool_name: String, tool_use_id: String },
    /// A subagent's `Task` tool result completed.
    AgentSessionEnd { tool_use_id: String, is_error: bool },
    /// A non-tool status update worth surfacing (e.g. thinking block).
    LlmStatus { text: String },
}

/// The deterministic product of parsing one stream-json line.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FormattedMessage {
    /// Origin line kind.
    #[serde(rename = "type", default = "default_message_type")]
    pub message_type: Option<FormattedMessageType>,
    /// Human-rendered text, ready for terminal display.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rendered: Option<String>,
    /// Raw assistant text, when this line carried any (used by the failure
    /// detector to scan for `FAILED:` lines).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_text: Option<String>,
    /// Absolute paths touched by this message's tool use, if any.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub affected_files: Vec<String>,
    /// Set when the raw text contained a `FAILED:` line.
    #[serde(default)]
    pub failed: bool,
    /// One-line summary of the failure, present iff `failed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_summary: Option<String>,
    /// Structured sub-events extracted while rendering.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub structured_events: Vec<StructuredEvent>,
}

fn default_message_type() -> Option<FormattedMessageType> {
    None
}

impl FormattedMessage {
    /// Build a parse-error placeholder, preserving as much raw text as was
    /// recoverable for diagnostics.
    #[must_use]
    pub fn parse_error(raw_text: impl Into<String>) -> Self {
        Self {
            message_type: Some(FormattedMessageType::ParseError),
            raw_text: Some(raw_text.into()),
            ..Self::default()
        }
    }

    /// Build the placeholder for a line that rendered to nothing.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            message_type: Some(FormattedMessageType::Empty),
            ..Self::default()
        }
    }
}
