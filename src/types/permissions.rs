//! Permission-related type definitions
//!
//! Types for the wire protocol between the agent's tool-approval hook and
//! the Permission Broker: requests, responses, and the allow-rule data
//! model the Broker consults before ever prompting a human.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::identifiers::RequestId;

/// Permission mode passed through to the agent CLI's `--permission-mode`
/// flag, independent of the Broker's own allow/deny decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PermissionMode {
    /// CLI prompts for dangerous tools (routed to the Broker).
    Default,
    /// Auto-accept file edits.
    AcceptEdits,
    /// Plan mode: no tool execution, only planning output.
    Plan,
    /// Allow all tools. Use with caution; bypasses the Broker entirely.
    BypassPermissions,
}

/// Which settings files the agent CLI should load, via `--setting-sources`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettingSource {
    User,
    Project,
    Local,
}

// ============================================================================
// Allow rules
// ============================================================================

/// How long an approval rule should live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleLifetime {
    /// In-memory for the current `Invocation` only.
    Session,
    /// Written to the repo's local settings file and the shared
    /// per-project store, keyed by repository identity.
    ProjectPersistent,
    /// Baked-in list, never mutated at runtime.
    Default,
}

/// The set of rules approved for a single tool.
///
/// For `Bash`, `AllowAll` means every command is pre-approved; `Prefixes`
/// holds an ordered list of distinct command-string prefixes, any one of
/// which approves a command that starts with it. For any other tool, only
/// `AllowAll` is meaningful (a tool either has blanket approval or it
/// doesn't — there's no notion of a "prefix" for non-Bash tools).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolRule {
    /// All invocations of this tool are approved.
    AllowAll,
    /// Only `Bash` commands whose text starts with one of these prefixes
    /// are approved. Invariant: entries are distinct and insertion-ordered.
    Prefixes(Vec<String>),
}

impl ToolRule {
    /// Add a prefix to a `Prefixes` rule (or turn a fresh rule into one).
    /// No-op if the prefix is already present or the rule is `AllowAll`.
    pub fn add_prefix(&mut self, prefix: impl Into<String>) {
        let prefix = prefix.into();
        match self {
            Self::AllowAll => {}
            Self::Prefixes(prefixes) => {
                if !prefixes.contains(&prefix) {
                    prefixes.push(prefix);
                }
            }
        }
    }
}

/// Per-Invocation map of tool name to its approval rule.
///
/// Invariant: for `Bash`, the map holds either `AllowAll` or an ordered list
/// of distinct prefixes; for any other tool, `AllowAll` or absent.
#[derive(Debug, Clone, Default)]
pub struct RuleMap {
    rules: HashMap<String, ToolRule>,
}

impl RuleMap {
    /// Create an empty rule map.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rules: HashMap::new(),
        }
    }

    /// Seed the map from a flat allowlist, as produced by e.g. the CLI's
    /// `--allowedTools` flag or a settings file's `permissions.allow[]`
    /// array. Entries of the shape `Bash(prefix)` add a Bash prefix; bare
    /// tool names grant `AllowAll` for that tool.
    #[must_use]
    pub fn from_allow_strings<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut map = Self::new();
        for entry in entries {
            map.apply_allow_string(entry.as_ref());
        }
        map
    }

    /// Parse one `permissions.allow[]`-style string (`Edit`,
    /// `Bash(git status)`) and fold it into the map.
    pub fn apply_allow_string(&mut self, entry: &str) {
        if let Some(inner) = entry
            .strip_prefix("Bash(")
            .and_then(|s| s.strip_suffix(')'))
        {
            self.allow_bash_prefix(inner);
        } else {
            self.allow_all(entry);
        }
    }

    /// Grant blanket approval for a tool.
    pub fn allow_all(&mut self, tool_name: impl Into<String>) {
        self.rules.insert(tool_name.into(), ToolRule::AllowAll);
    }

    /// Add a Bash prefix rule, upgrading a missing entry into `Prefixes`.
    pub fn allow_bash_prefix(&mut self, prefix: impl Into<String>) {
        let prefix = prefix.into();
        self.rules
            .entry("Bash".to_string())
            .and_modify(|rule| rule.add_prefix(prefix.clone()))
            .or_insert_with(|| ToolRule::Prefixes(vec![prefix]));
    }

    /// Check whether a request is approved by the current rule set.
    #[must_use]
    pub fn is_approved(&self, tool_name: &str, command: Option<&str>) -> bool {
        match self.rules.get(tool_name) {
            Some(ToolRule::AllowAll) => true,
            Some(ToolRule::Prefixes(prefixes)) => match command {
                Some(command) => prefixes.iter().any(|p| command.starts_with(p.as_str())),
                None => false,
            },
            None => false,
        }
    }

    /// Serialize the map back to `permissions.allow[]`-style strings, for
    /// writing to the repo-local settings file or the CLI's `--allowedTools`
    /// flag.
    #[must_use]
    pub fn to_allow_strings(&self) -> Vec<String> {
        let mut out = Vec::new();
        for (tool, rule) in &self.rules {
            match rule {
                ToolRule::AllowAll => out.push(tool.clone()),
                ToolRule::Prefixes(prefixes) => {
                    for prefix in prefixes {
                        out.push(format!("Bash({prefix})"));
                    }
                }
            }
        }
        out.sort();
        out
    }

    /// Merge another rule map's entries into this one (used to fold the
    /// baked-in default list and the project-persistent store into the
    /// session map at `Invocation` start).
    pub fn merge(&mut self, other: &Self) {
        for (tool, rule) in &other.rules {
            match rule {
                ToolRule::AllowAll => {
                    self.rules.insert(tool.clone(), ToolRule::AllowAll);
                }
                ToolRule::Prefixes(prefixes) => {
                    for prefix in prefixes {
                        self.allow_bash_prefix(prefix.clone());
                    }
                }
            }
        }
    }
}

// ============================================================================
// Wire protocol
// ============================================================================

/// One AskUserQuestion option.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionOption {
    /// Option label shown to the user.
    pub label: String,
    /// Short description of the option.
    #[serde(default)]
    pub description: String,
}

/// One AskUserQuestion question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    /// The question text.
    pub question: String,
    /// Short header/title for the question.
    #[serde(default)]
    pub header: String,
    /// Selectable options (a trailing "Free text" option is implied and not
    /// listed here).
    pub options: Vec<QuestionOption>,
    /// Whether more than one option may be selected.
    #[serde(default, rename = "multiSelect")]
    pub multi_select: bool,
}

/// `PermissionRequest.input` for the `AskUserQuestion` tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskUserQuestionInput {
    /// Non-empty list of questions to ask the user in order.
    pub questions: Vec<Question>,
}

/// A permission request read off the Broker socket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionRequest {
    /// Type discriminator, always `"permission_request"` on the wire.
    #[serde(rename = "type")]
    pub message_type: String,
    /// Correlates the eventual response.
    pub request_id: RequestId,
    /// Name of the tool being requested.
    pub tool_name: String,
    /// Free-form tool input. For `Bash`, `input.command` is the command
    /// string. For `AskUserQuestion`, `input.questions` is the question
    /// list.
    pub input: serde_json::Value,
}

/// Updated input carried back on an `AskUserQuestion` approval: a mapping
/// from question text to the collected answer string.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AskUserQuestionUpdatedInput {
    /// Original questions, echoed back verbatim.
    #[serde(default)]
    pub questions: Vec<Question>,
    /// `question -> answer` mapping.
    #[serde(default)]
    pub answers: HashMap<String, String>,
}

/// A permission response written back onto the Broker socket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionResponse {
    /// Type discriminator, always `"permission_response"` on the wire.
    #[serde(rename = "type")]
    pub message_type: String,
    /// Echoes the request's `requestId`.
    pub request_id: RequestId,
    /// Whether the tool use is approved.
    pub approved: bool,
    /// Present only for the `AskUserQuestion` case.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_input: Option<serde_json::Value>,
}

impl PermissionResponse {
    /// Build a plain allow/deny response with no updated input.
    #[must_use]
    pub fn simple(request_id: RequestId, approved: bool) -> Self {
        Self {
            message_type: "permission_response".to_string(),
            request_id,
            approved,
            updated_input: None,
        }
    }

    /// Build an `AskUserQuestion` response carrying collected answers.
    #[must_use]
    pub fn with_answers(
        request_id: RequestId,
        questions: Vec<Question>,
        answers: HashMap<String, String>,
    ) -> Self {
        let updated = AskUserQuestionUpdatedInput { questions, answers };
        Self {
            message_type: "permission_response".to_string(),
            request_id,
            approved: true,
            updated_input: serde_json::to_value(updated).ok(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bash_prefix_match() {
        let mut rules = RuleMap::new();
        rules.allow_bash_prefix("git status");
        assert!(rules.is_approved("Bash", Some("git status --short")));
        assert!(!rules.is_approved("Bash", Some("git log")));
    }

    #[test]
    fn allow_all_non_bash() {
        let mut rules = RuleMap::new();
        rules.allow_all("Edit");
        assert!(rules.is_approved("Edit", None));
        assert!(!rules.is_approved("Write", None));
    }

    #[test]
    fn from_allow_strings_mixed() {
        let rules = RuleMap::from_allow_strings(["Edit", "Bash(git status)", "Bash(git log)"]);
        assert!(rules.is_approved("Edit", None));
        assert!(rules.is_approved("Bash", Some("git status --short")));
        assert!(rules.is_approved("Bash", Some("git log -1")));
        assert!(!rules.is_approved("Bash", Some("rm -rf /")));
    }

    #[test]
    fn round_trip_to_allow_strings() {
        let rules = RuleMap::from_allow_strings(["Edit", "Bash(git status)"]);
        let strings = rules.to_allow_strings();
        assert!(strings.contains(&"Edit".to_string()));
        assert!(strings.contains(&"Bash(git status)".to_string()));
    }

    #[test]
    fn merge_never_removes_existing_approval() {
        let mut session = RuleMap::from_allow_strings(["Edit"]);
        let defaults = RuleMap::from_allow_strings(["Bash(git status)"]);
        session.merge(&defaults);
        assert!(session.is_approved("Edit", None));
        assert!(session.is_approved("Bash", Some("git status --short")));
    }
}
