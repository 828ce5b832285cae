//! `PromptCoordinator` implementation backed by the Tunnel, for when the
//! Broker needs a decision but no local terminal is available, forwarding
//! the request through the `onPromptRequest` hook.

use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use crate::broker::{FourChoice, PromptCoordinator};
use crate::error::{Result, TimError};
use crate::types::Question;

use super::protocol::TunnelEvent;
use super::state::{wait_for_reply, TunnelState};

/// Solicits Broker decisions from whichever client is connected to the
/// Tunnel. Blocks the calling thread, exactly like
/// [`crate::broker::TerminalPromptCoordinator`] — the Broker dispatches
/// through `spawn_blocking` regardless of which coordinator is wired in.
pub struct TunnelPromptCoordinator {
    state: Arc<TunnelState>,
}

impl TunnelPromptCoordinator {
    #[must_use]
    pub fn new(state: Arc<TunnelState>) -> Self {
        Self { state }
    }

    fn round_trip(&self, kind: &str, detail: serde_json::Value) -> Result<serde_json::Value> {
        if !self.state.has_observer() {
            return Err(TimError::tunnel("no tunnel observer connected"));
        }

        let request_id = Uuid::new_v4().to_string();
        let rx = self.state.register_pending(request_id.clone());
        self.state.send_event(TunnelEvent::PromptRequest {
            request_id: request_id.clone(),
            kind: kind.to_string(),
            detail,
        });
        wait_for_reply(&self.state, &request_id, rx)
    }
}

impl PromptCoordinator for TunnelPromptCoordinator {
    fn prompt_four_choice(&self, tool_name: &str, input_yaml: &str) -> Result<FourChoice> {
        let reply = self.round_trip(
            "four_choice",
            serde_json::json!({ "tool_name": tool_name, "input_yaml": input_yaml }),
        )?;
        let choice = reply.get("choice").and_then(|v| v.as_str()).unwrap_or("disallow");
        Ok(match choice {
            "allow" => FourChoice::Allow,
            "allow_session" => FourChoice::AllowForSession,
            "always_allow" => FourChoice::AlwaysAllow,
            _ => FourChoice::Disallow,
        })
    }

    fn prompt_prefix_selection(&self, candidates: &[String]) -> Result<String> {
        let reply = self.round_trip("prefix_selection", serde_json::json!({ "candidates": candidates }))?;
        reply
            .get("text")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .or_else(|| candidates.last().cloned())
            .ok_or_else(|| TimError::broker("prefix selection with no candidates"))
    }

    fn prompt_ask_user_question(&self, questions: &[Question]) -> Result<HashMap<String, String>> {
        let reply = self.round_trip("ask_user_question", serde_json::json!({ "questions": questions }))?;
        let answers = reply
            .get("answers")
            .cloned()
            .and_then(|v| serde_json::from_value::<HashMap<String, String>>(v).ok())
            .unwrap_or_default();
        Ok(answers)
    }
}
