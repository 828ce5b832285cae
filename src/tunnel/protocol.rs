//! Wire shapes for the Tunnel's socket, carried over the same
//! newline-delimited JSON framing as the Broker.

use serde::{Deserialize, Serialize};

use crate::types::formatted::StructuredEvent;

/// Server -> client frames.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TunnelEvent {
    /// Mirrors one of the Formatter's structured sub-events to the remote
    /// observer.
    Structured { event: StructuredEvent },
    /// Echoes content the local Input Router (TTY/GUI) sent to the agent,
    /// so a remote observer sees the full conversation even when it wasn't
    /// the source of this particular message.
    UserInputEcho { content: String },
    /// Solicits a decision the Permission Broker needs when the local user
    /// is unavailable. `kind` is one of `"four_choice"`,
    /// `"prefix_selection"`, `"ask_user_question"`; `detail` carries the
    /// kind-specific payload (tool name + input, candidate prefixes,
    /// questions).
    PromptRequest {
        request_id: String,
        kind: String,
        detail: serde_json::Value,
    },
}

/// Client -> server frames.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TunnelInbound {
    /// A follow-up message typed by the remote observer, to be forwarded
    /// into the agent's stdin exactly as a local terminal line would be.
    UserInput { content: String },
    /// The remote observer's answer to an outstanding `PromptRequest`.
    /// `detail` shape mirrors the request's `kind`: `{"choice": "allow"}`,
    /// `{"text": "..."}`, or `{"answers": {...}}`.
    PromptResponse {
        request_id: String,
        detail: serde_json::Value,
    },
}
