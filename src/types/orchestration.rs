//! Orchestration-prompt configuration.
//!
//! `OrchestrationOptions` is the enumerated-field configuration record the
//! Orchestration-Prompt Renderer consumes. All fields default conservatively
//! when absent.

use serde::{Deserialize, Serialize};

/// Which subagent CLI the rendered prompt instructs the orchestrator to
/// dispatch work to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SubagentExecutor {
    CodexCli,
    ClaudeCode,
    /// Absent is equivalent to this: the renderer includes an "Executor
    /// Selection" block letting the orchestrator agent pick at runtime.
    #[default]
    Dynamic,
}

/// Execution mode for an `Invocation`, selecting which CLI argument dialect
/// and prompt variant apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    #[default]
    Normal,
    Simple,
    Tdd,
    Review,
}

/// Configuration record consumed by the Orchestration-Prompt Renderer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrchestrationOptions {
    /// Whether the rendered prompt should include the batch-mode section.
    #[serde(default)]
    pub batch_mode: bool,
    /// Path to a plan file, if the orchestrator is working from one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_file_path: Option<String>,
    /// Override executor used specifically for the review phase.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_executor: Option<String>,
    /// Whether to render the abbreviated simple-mode prompt variant.
    #[serde(default)]
    pub simple_mode: bool,
    /// Which executor subagents should be dispatched to.
    #[serde(default)]
    pub subagent_executor: SubagentExecutor,
    /// Free-text instructions included when `subagent_executor` is dynamic.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dynamic_subagent_instructions: Option<String>,
}

impl OrchestrationOptions {
    /// Whether the rendered prompt should carry the `-x <exec>` flag for
    /// subagent dispatch: true iff `subagent_executor` is `codex-cli` or
    /// `claude-code`.
    #[must_use]
    pub fn wants_explicit_executor_flag(&self) -> bool {
        matches!(
            self.subagent_executor,
            SubagentExecutor::CodexCli | SubagentExecutor::ClaudeCode
        )
    }

    /// Whether the rendered prompt should carry an "Executor Selection"
    /// block (iff `subagent_executor` is dynamic or was left absent).
    #[must_use]
    pub fn wants_executor_selection_block(&self) -> bool {
        matches!(self.subagent_executor, SubagentExecutor::Dynamic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_subagent_executor_is_dynamic() {
        let opts = OrchestrationOptions::default();
        assert!(opts.wants_executor_selection_block());
        assert!(!opts.wants_explicit_executor_flag());
    }

    #[test]
    fn explicit_executor_suppresses_selection_block() {
        let opts = OrchestrationOptions {
            subagent_executor: SubagentExecutor::ClaudeCode,
            ..Default::default()
        };
        assert!(opts.wants_explicit_executor_flag());
        assert!(!opts.wants_executor_selection_block());
    }
}
