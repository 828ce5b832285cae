//! Per-kind rendering of one stream-json line into a [`FormattedMessage`].
//!
//! The `tool_use_id -> tool_name` cache lives on the `Formatter` value
//! itself, bound to one `Invocation` and reset at construction — never
//! module-global.

use std::collections::HashMap;

use colored::Colorize;
use similar::{ChangeTag, TextDiff};

use crate::types::formatted::{FormattedMessage, FormattedMessageType, StructuredEvent};
use crate::types::messages::{AssistantMessageContent, ContentBlock, ContentValue, Message, UserContent};

use super::failure::detect_failure;
use super::parser::parse_message;

const DEBUG_PREFIX: &str = "[DEBUG]";
const TRUNCATE_LINES: usize = 10;

/// Renders stream-json lines into [`FormattedMessage`]s, one `Formatter`
/// per `Invocation`.
#[derive(Debug, Default)]
pub struct Formatter {
    tool_use_names: HashMap<String, String>,
}

impl Formatter {
    /// Start with an empty `tool_use_id -> tool_name` cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Render one raw stdout line (already split on `\n`, not yet
    /// JSON-parsed) into a [`FormattedMessage`].
    pub fn format_line(&mut self, line: &str) -> FormattedMessage {
        let trimmed = line.trim();
        if trimmed.starts_with(DEBUG_PREFIX) {
            return FormattedMessage::empty();
        }

        let value: serde_json::Value = match serde_json::from_str(trimmed) {
            Ok(v) => v,
            Err(_) => {
                let mut msg = FormattedMessage::parse_error(trimmed);
                msg.structured_events.push(StructuredEvent::LlmStatus {
                    text: "llm.parse_error".to_string(),
                });
                return msg;
            }
        };

        let message = match parse_message(value) {
            Ok(m) => m,
            Err(_) => {
                let mut msg = FormattedMessage::parse_error(trimmed);
                msg.structured_events.push(StructuredEvent::LlmStatus {
                    text: "llm.parse_error".to_string(),
                });
                return msg;
            }
        };

        match message {
            Message::System { subtype, data } => self.render_system(&subtype, &data),
            Message::Result {
                subtype,
                duration_ms,
                is_error,
                num_turns,
                session_id,
                total_cost_usd,
                ..
            } => self.render_result(&subtype, duration_ms, is_error, num_turns, session_id.as_str(), total_cost_usd),
            Message::Assistant { message, .. } => self.render_assistant(&message),
            Message::User { message, .. } => self.render_user(message.content.as_ref()),
            Message::StreamEvent { .. } => FormattedMessage::empty(),
        }
    }

    fn render_system(&self, subtype: &str, data: &serde_json::Value) -> FormattedMessage {
        match subtype {
            "init" => {
                let session_id = data.get("session_id").and_then(|v| v.as_str()).unwrap_or("?");
                let tools = data
                    .get("tools")
                    .and_then(|v| v.as_array())
                    .map(|arr| arr.iter().filter_map(|t| t.as_str()).collect::<Vec<_>>().join(", "))
                    .unwrap_or_default();
                let mcp_servers = data
                    .get("mcp_servers")
                    .and_then(|v| v.as_array())
                    .map(|arr| arr.iter().filter_map(|t| t.as_str()).collect::<Vec<_>>().join(", "))
                    .unwrap_or_default();
                let rendered = format!(
                    "{}\n  session: {session_id}\n  tools: {tools}\n  mcp servers: {mcp_servers}",
                    "Starting".bold().green()
                );
                text_message(rendered)
            }
            "task_notification" => {
                let text = data.get("message").and_then(|v| v.as_str()).unwrap_or("");
                text_message(format!("{}\n{text}", "Task".bold().cyan()))
            }
            "status" => {
                if data.get("status").map(serde_json::Value::is_null).unwrap_or(true) {
                    FormattedMessage::empty()
                } else {
                    let status = data.get("status").and_then(|v| v.as_str()).unwrap_or("");
                    text_message(format!("{}\n{status}", "Status".bold().cyan()))
                }
            }
            "compact_boundary" => text_message(format!("{}", "Context compacted".bold().yellow())),
            _ => FormattedMessage::empty(),
        }
    }

    fn render_result(
        &self,
        subtype: &str,
        duration_ms: u64,
        is_error: bool,
        num_turns: u32,
        session_id: &str,
        total_cost_usd: Option<f64>,
    ) -> FormattedMessage {
        if subtype != "success" && subtype != "error_max_turns" {
            return FormattedMessage::empty();
        }

        let cost = total_cost_usd.unwrap_or(0.0);
        let seconds = duration_ms as f64 / 1000.0;
        let mut rendered = format!(
            "{}\n  cost: ${cost:.4}\n  duration: {seconds:.1}s\n  turns: {num_turns}",
            "Done".bold().green()
        );
        if subtype == "error_max_turns" {
            rendered.push_str("\n  max turns reached");
        }

        let mut msg = FormattedMessage {
            message_type: Some(FormattedMessageType::Result),
            rendered: Some(rendered),
            ..FormattedMessage::default()
        };
        msg.structured_events.push(StructuredEvent::AgentSessionEnd {
            tool_use_id: session_id.to_string(),
            is_error,
        });
        msg
    }

    fn render_assistant(&mut self, message: &AssistantMessageContent) -> FormattedMessage {
        let mut msg = FormattedMessage {
            message_type: Some(FormattedMessageType::Assistant),
            ..FormattedMessage::default()
        };
        let mut raw_parts = Vec::new();
        let mut rendered_parts = Vec::new();

        for block in &message.content {
            self.render_content_block(block, &mut msg, &mut rendered_parts, &mut raw_parts);
        }

        finish_text_message(&mut msg, rendered_parts, raw_parts)
    }

    fn render_user(&mut self, content: Option<&UserContent>) -> FormattedMessage {
        let mut msg = FormattedMessage {
            message_type: Some(FormattedMessageType::User),
            ..FormattedMessage::default()
        };
        let mut raw_parts = Vec::new();
        let mut rendered_parts = Vec::new();

        match content {
            Some(UserContent::String(text)) => {
                rendered_parts.push(text.clone());
                raw_parts.push(text.clone());
            }
            Some(UserContent::Blocks(blocks)) => {
                for block in blocks {
                    self.render_content_block(block, &mut msg, &mut rendered_parts, &mut raw_parts);
                }
            }
            None => {}
        }

        finish_text_message(&mut msg, rendered_parts, raw_parts)
    }

    fn render_content_block(
        &mut self,
        block: &ContentBlock,
        msg: &mut FormattedMessage,
        rendered_parts: &mut Vec<String>,
        raw_parts: &mut Vec<String>,
    ) {
        match block {
            ContentBlock::Text { text } => {
                rendered_parts.push(format!("{}\n{text}", "Text".bold().white()));
                raw_parts.push(text.clone());
            }
            ContentBlock::Thinking { thinking, .. } => {
                rendered_parts.push(format!("{}\n{thinking}", "Thinking".dimmed()));
            }
            ContentBlock::ToolUse { id, name, input } => {
                self.tool_use_names.insert(id.clone(), name.clone());
                rendered_parts.push(render_tool_use(name, input, msg));
                msg.structured_events.push(StructuredEvent::LlmToolUse {
                    tool_name: name.clone(),
                    tool_use_id: id.clone(),
                });
            }
            ContentBlock::ToolResult {
                tool_use_id,
                content,
                is_error,
            } => {
                let name = self
                    .tool_use_names
                    .get(tool_use_id)
                    .cloned()
                    .unwrap_or_else(|| "unknown".to_string());
                rendered_parts.push(render_tool_result(&name, content.as_ref(), *is_error));
                if name == "Task" {
                    msg.structured_events.push(StructuredEvent::AgentSessionEnd {
                        tool_use_id: tool_use_id.clone(),
                        is_error: is_error.unwrap_or(false),
                    });
                } else if name == "Bash" {
                    let command_text = content
                        .as_ref()
                        .map(content_value_to_string)
                        .unwrap_or_default();
                    msg.structured_events.push(StructuredEvent::CommandResult {
                        command: command_text,
                        is_error: is_error.unwrap_or(false),
                    });
                }
            }
        }
    }
}

fn render_tool_use(name: &str, input: &serde_json::Value, msg: &mut FormattedMessage) -> String {
    match name {
        "Write" => {
            let path = input.get("file_path").and_then(|v| v.as_str()).unwrap_or("?");
            let lines = input
                .get("content")
                .and_then(|v| v.as_str())
                .map(|c| c.lines().count())
                .unwrap_or(0);
            msg.affected_files.push(path.to_string());
            msg.structured_events.push(StructuredEvent::FileWrite { path: path.to_string() });
            format!("{}\n  {path} ({lines} lines)", "Write".bold().green())
        }
        "Edit" => {
            let path = input.get("file_path").and_then(|v| v.as_str()).unwrap_or("?");
            let old = input.get("old_string").and_then(|v| v.as_str()).unwrap_or("");
            let new = input.get("new_string").and_then(|v| v.as_str()).unwrap_or("");
            msg.affected_files.push(path.to_string());
            msg.structured_events.push(StructuredEvent::FileWrite { path: path.to_string() });
            format!("{}\n  {path}\n{}", "Edit".bold().yellow(), render_diff(old, new))
        }
        "MultiEdit" => {
            let path = input.get("file_path").and_then(|v| v.as_str()).unwrap_or("?");
            msg.affected_files.push(path.to_string());
            msg.structured_events.push(StructuredEvent::FileWrite { path: path.to_string() });
            let yaml = to_yaml(input);
            format!("{}\n  {path}\n{yaml}", "MultiEdit".bold().yellow())
        }
        "TodoWrite" => {
            let items: Vec<String> = input
                .get("todos")
                .and_then(|v| v.as_array())
                .map(|todos| {
                    todos
                        .iter()
                        .filter_map(|t| t.get("content").and_then(|c| c.as_str()))
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default();
            let rendered_list = items
                .iter()
                .map(|i| format!("  - {i}"))
                .collect::<Vec<_>>()
                .join("\n");
            msg.structured_events.push(StructuredEvent::TodoUpdate { items: items.clone() });
            format!("{}\n{rendered_list}", "Todo".bold().magenta())
        }
        "Task" => format!("{}\n{}", "Task".red(), to_yaml(input)),
        _ => format!("{}\n{}", name.bold(), to_yaml(input)),
    }
}

fn render_tool_result(name: &str, content: Option<&ContentValue>, is_error: Option<bool>) -> String {
    match name {
        "Read" => {
            let line_count = content
                .map(content_value_to_string)
                .map(|s| s.lines().count())
                .unwrap_or(0);
            format!("{}\n  {line_count} lines", "Read".dimmed())
        }
        "Bash" => {
            let text = content.map(content_value_to_string).unwrap_or_default();
            let (stdout, stderr) = split_stdout_stderr(&text);
            let header = if is_error.unwrap_or(false) {
                "Bash (error)".red()
            } else {
                "Bash".green()
            };
            format!("{header}\n{}\n{}", stdout.trim(), stderr.trim())
        }
        "LS" | "Glob" => {
            let text = content.map(content_value_to_string).unwrap_or_default();
            truncate_lines(&text, TRUNCATE_LINES)
        }
        _ => match content {
            Some(ContentValue::String(s)) => s.clone(),
            Some(ContentValue::Blocks(blocks)) => to_yaml(&serde_json::Value::Array(blocks.clone())),
            None => String::new(),
        },
    }
}

fn content_value_to_string(value: &ContentValue) -> String {
    match value {
        ContentValue::String(s) => s.clone(),
        ContentValue::Blocks(blocks) => blocks
            .iter()
            .filter_map(|b| b.get("text").and_then(|t| t.as_str()))
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

fn split_stdout_stderr(text: &str) -> (String, String) {
    match text.split_once("\n---stderr---\n") {
        Some((stdout, stderr)) => (stdout.to_string(), stderr.to_string()),
        None => (text.to_string(), String::new()),
    }
}

fn truncate_lines(text: &str, limit: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    if lines.len() <= limit {
        text.to_string()
    } else {
        let mut out = lines[..limit].join("\n");
        out.push_str(&format!("\n... ({} more lines)", lines.len() - limit));
        out
    }
}

fn render_diff(old: &str, new: &str) -> String {
    let diff = TextDiff::from_lines(old, new);
    let mut out = String::new();
    for change in diff.iter_all_changes() {
        let line = change.value();
        match change.tag() {
            ChangeTag::Delete => out.push_str(&format!("{}{line}", "-".red())),
            ChangeTag::Insert => out.push_str(&format!("{}{line}", "+".green())),
            ChangeTag::Equal => out.push_str(&format!(" {line}")),
        }
    }
    out
}

fn to_yaml(value: &serde_json::Value) -> String {
    serde_yaml::to_string(value).unwrap_or_else(|_| value.to_string())
}

fn text_message(rendered: String) -> FormattedMessage {
    FormattedMessage {
        message_type: Some(FormattedMessageType::System),
        rendered: Some(rendered),
        ..FormattedMessage::default()
    }
}

fn finish_text_message(msg: &mut FormattedMessage, rendered_parts: Vec<String>, raw_parts: Vec<String>) -> FormattedMessage {
    if !rendered_parts.is_empty() {
        msg.rendered = Some(rendered_parts.join("\n\n"));
    }
    let raw_text = raw_parts.join("\n");
    if !raw_text.is_empty() {
        if let Some(report) = detect_failure(&raw_text) {
            msg.failed = true;
            msg.failed_summary = Some(report.summary.clone());
        }
        msg.raw_text = Some(raw_text);
    }
    std::mem::take(msg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_line_renders_empty() {
        let mut formatter = Formatter::new();
        let msg = formatter.format_line("[DEBUG] something happened");
        assert_eq!(msg.message_type, Some(FormattedMessageType::Empty));
    }

    #[test]
    fn malformed_json_yields_parse_error() {
        let mut formatter = Formatter::new();
        let msg = formatter.format_line("not json at all {");
        assert_eq!(msg.message_type, Some(FormattedMessageType::ParseError));
        assert!(matches!(msg.structured_events.first(), Some(StructuredEvent::LlmStatus { .. })));
    }

    #[test]
    fn assistant_text_is_captured_in_raw_text() {
        let mut formatter = Formatter::new();
        let line = serde_json::json!({
            "type": "assistant",
            "message": {
                "model": "claude-sonnet",
                "content": [{"type": "text", "text": "FAILED: build broke\nProblems:\n- missing dep"}]
            }
        })
        .to_string();
        let msg = formatter.format_line(&line);
        assert!(msg.failed);
        assert_eq!(msg.failed_summary.as_deref(), Some("build broke"));
    }

    #[test]
    fn tool_use_then_tool_result_labels_by_cached_name() {
        let mut formatter = Formatter::new();
        let tool_use = serde_json::json!({
            "type": "assistant",
            "message": {
                "model": "claude-sonnet",
                "content": [{"type": "tool_use", "id": "t1", "name": "Read", "input": {"file_path": "a.rs"}}]
            }
        })
        .to_string();
        formatter.format_line(&tool_use);

        let tool_result = serde_json::json!({
            "type": "user",
            "message": {
                "role": "user",
                "content": [{"type": "tool_result", "tool_use_id": "t1", "content": "line one\nline two", "is_error": false}]
            }
        })
        .to_string();
        let msg = formatter.format_line(&tool_result);
        assert!(msg.rendered.unwrap().contains("Read"));
    }

    #[test]
    fn write_tool_use_tracks_affected_file() {
        let mut formatter = Formatter::new();
        let line = serde_json::json!({
            "type": "assistant",
            "message": {
                "model": "claude-sonnet",
                "content": [{"type": "tool_use", "id": "t2", "name": "Write", "input": {"file_path": "/tmp/x.rs", "content": "fn main() {}\n"}}]
            }
        })
        .to_string();
        let msg = formatter.format_line(&line);
        assert_eq!(msg.affected_files, vec!["/tmp/x.rs".to_string()]);
    }

    #[test]
    fn result_message_renders_done_header() {
        let mut formatter = Formatter::new();
        let line = serde_json::json!({
            "type": "result",
            "subtype": "success",
            "duration_ms": 1500,
            "duration_api_ms": 1200,
            "is_error": false,
            "num_turns": 3,
            "session_id": "abc123",
            "total_cost_usd": 0.25
        })
        .to_string();
        let msg = formatter.format_line(&line);
        let rendered = msg.rendered.expect("rendered");
        assert!(rendered.contains("0.2500"));
        assert!(rendered.contains("1.5s"));
    }
}
