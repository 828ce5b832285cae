//! `InvocationOptions`: the configuration record a caller builds before
//! starting an `Invocation`.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use super::identifiers::{SessionId, ToolName};
use super::orchestration::ExecutionMode;
use super::permissions::{PermissionMode, SettingSource};

/// How much of an `Invocation`'s stdout the caller wants preserved for
/// programmatic inspection after the run completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapturePolicy {
    /// Discard everything once rendered; only the final success/failure
    /// status is retained.
    #[default]
    None,
    /// Retain every `FormattedMessage` produced during the run.
    All,
    /// Retain only the terminal `result` message.
    ResultOnly,
}

use serde::{Deserialize, Serialize};

/// Which source the Interactive Input Router should read follow-up user
/// input from. Exactly one applies at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputSourcePolicy {
    /// No interactive input; the Invocation runs to completion unattended.
    #[default]
    None,
    /// Read from the controlling terminal.
    Terminal,
    /// Route through an active tunnel observer.
    Tunnel,
}

/// Configuration for one `Invocation`, built by the caller (library consumer
/// or the `tim` binary) before the run starts.
#[derive(Clone, Default)]
pub struct InvocationOptions {
    /// The prompt text sent to the agent at startup.
    pub prompt: String,
    /// Working directory for the agent subprocess.
    pub cwd: Option<PathBuf>,
    /// Execution mode selecting CLI dialect and prompt variant.
    pub mode: ExecutionMode,
    /// Model hint passed to the agent CLI (e.g. `--model`).
    pub model: Option<String>,
    /// How long to wait for the first stdout line before treating the
    /// subprocess as hung.
    pub initial_inactivity_deadline: Duration,
    /// How long to wait between subsequent stdout lines once output has
    /// started flowing.
    pub steady_state_inactivity_deadline: Duration,
    /// How much output to retain for the caller after the run completes.
    pub capture_policy: CapturePolicy,
    /// Which interactive input source, if any, this Invocation accepts.
    pub input_source: InputSourcePolicy,
    /// Tools pre-approved for the whole run.
    pub allowed_tools: Vec<ToolName>,
    /// Tools never approved for the whole run, checked before any broker
    /// rule lookup.
    pub disallowed_tools: Vec<ToolName>,
    /// Permission mode passed to the agent CLI.
    pub permission_mode: Option<PermissionMode>,
    /// Maximum number of turns before the agent CLI stops on its own.
    pub max_turns: Option<u32>,
    /// Resume a prior session instead of starting fresh.
    pub resume: Option<SessionId>,
    /// Continue the most recent conversation in this directory.
    pub continue_conversation: bool,
    /// Path to a settings file to layer over defaults.
    pub settings: Option<PathBuf>,
    /// Which settings sources the agent CLI should load.
    pub setting_sources: Option<Vec<SettingSource>>,
    /// Additional directories added to the agent's context.
    pub add_dirs: Vec<PathBuf>,
    /// Extra environment variables for the subprocess (filtered against the
    /// dangerous-variable denylist before use).
    pub env: HashMap<String, String>,
    /// Extra CLI flags, gated by an explicit allowlist.
    pub extra_args: HashMap<String, Option<String>>,
    /// Maximum buffered bytes for one not-yet-newline-terminated JSON line.
    pub max_buffer_size: Option<usize>,
    /// Whether auto-approval of `rm` on tracked files is enabled.
    pub auto_approve_created_file_deletion: bool,
    /// Mirrors the `ALLOW_ALL_TOOLS` environment variable: bypass the
    /// Broker entirely and pass the agent CLI's dangerous-skip flag.
    pub allow_all_tools: bool,
    /// Whether observing a `result`-type message on the agent's stdout
    /// stream should proactively close its stdin. Defaults to `true`; a
    /// caller that wants to keep feeding follow-up messages after a
    /// `result` (e.g. a long-lived interactive session) can opt out.
    pub close_stdin_on_result: bool,
}

impl InvocationOptions {
    /// Create a new builder seeded with the given prompt text.
    #[must_use]
    pub fn builder(prompt: impl Into<String>) -> InvocationOptionsBuilder {
        InvocationOptionsBuilder::new(prompt)
    }
}

impl std::fmt::Debug for InvocationOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvocationOptions")
            .field("prompt", &self.prompt)
            .field("cwd", &self.cwd)
            .field("mode", &self.mode)
            .field("model", &self.model)
            .field(
                "initial_inactivity_deadline",
                &self.initial_inactivity_deadline,
            )
            .field(
                "steady_state_inactivity_deadline",
                &self.steady_state_inactivity_deadline,
            )
            .field("capture_policy", &self.capture_policy)
            .field("input_source", &self.input_source)
            .field("allowed_tools", &self.allowed_tools)
            .field("disallowed_tools", &self.disallowed_tools)
            .field("permission_mode", &self.permission_mode)
            .field("max_turns", &self.max_turns)
            .field("resume", &self.resume)
            .field("continue_conversation", &self.continue_conversation)
            .field("settings", &self.settings)
            .field("setting_sources", &self.setting_sources)
            .field("add_dirs", &self.add_dirs)
            .field("env", &self.env)
            .field("extra_args", &self.extra_args)
            .field("max_buffer_size", &self.max_buffer_size)
            .field(
                "auto_approve_created_file_deletion",
                &self.auto_approve_created_file_deletion,
            )
            .field("allow_all_tools", &self.allow_all_tools)
            .field("close_stdin_on_result", &self.close_stdin_on_result)
            .finish()
    }
}

/// Default initial inactivity deadline: generous, since the agent CLI may
/// need to warm up a model connection before it prints anything.
const DEFAULT_INITIAL_INACTIVITY: Duration = Duration::from_secs(120);
/// Default steady-state inactivity deadline: tighter, once the agent is
/// known to be actively producing output.
const DEFAULT_STEADY_STATE_INACTIVITY: Duration = Duration::from_secs(300);

/// Builder for [`InvocationOptions`].
#[derive(Debug)]
pub struct InvocationOptionsBuilder {
    options: InvocationOptions,
}

impl InvocationOptionsBuilder {
    /// Start a builder for the given prompt text, with spec defaults for
    /// inactivity deadlines and capture policy.
    #[must_use]
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            options: InvocationOptions {
                prompt: prompt.into(),
                initial_inactivity_deadline: DEFAULT_INITIAL_INACTIVITY,
                steady_state_inactivity_deadline: DEFAULT_STEADY_STATE_INACTIVITY,
                close_stdin_on_result: true,
                ..InvocationOptions::default()
            },
        }
    }

    /// Set the working directory.
    #[must_use]
    pub fn cwd(mut self, path: impl Into<PathBuf>) -> Self {
        self.options.cwd = Some(path.into());
        self
    }

    /// Set the execution mode.
    #[must_use]
    pub const fn mode(mut self, mode: ExecutionMode) -> Self {
        self.options.mode = mode;
        self
    }

    /// Set the model hint.
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.options.model = Some(model.into());
        self
    }

    /// Override the initial inactivity deadline.
    #[must_use]
    pub const fn initial_inactivity_deadline(mut self, deadline: Duration) -> Self {
        self.options.initial_inactivity_deadline = deadline;
        self
    }

    /// Override the steady-state inactivity deadline.
    #[must_use]
    pub const fn steady_state_inactivity_deadline(mut self, deadline: Duration) -> Self {
        self.options.steady_state_inactivity_deadline = deadline;
        self
    }

    /// Set the capture policy.
    #[must_use]
    pub const fn capture_policy(mut self, policy: CapturePolicy) -> Self {
        self.options.capture_policy = policy;
        self
    }

    /// Set the interactive input source.
    #[must_use]
    pub const fn input_source(mut self, source: InputSourcePolicy) -> Self {
        self.options.input_source = source;
        self
    }

    /// Set the pre-approved tool allowlist.
    #[must_use]
    pub fn allowed_tools(mut self, tools: Vec<impl Into<ToolName>>) -> Self {
        self.options.allowed_tools = tools.into_iter().map(Into::into).collect();
        self
    }

    /// Set the never-approved tool list.
    #[must_use]
    pub fn disallowed_tools(mut self, tools: Vec<impl Into<ToolName>>) -> Self {
        self.options.disallowed_tools = tools.into_iter().map(Into::into).collect();
        self
    }

    /// Set the CLI permission mode.
    #[must_use]
    pub const fn permission_mode(mut self, mode: PermissionMode) -> Self {
        self.options.permission_mode = Some(mode);
        self
    }

    /// Set the max-turns bound.
    ///
    /// # Panics
    /// Panics if `turns` exceeds 1000.
    #[must_use]
    pub fn max_turns(mut self, turns: u32) -> Self {
        const MAX_ALLOWED_TURNS: u32 = 1000;
        assert!(
            turns <= MAX_ALLOWED_TURNS,
            "max_turns {turns} exceeds maximum allowed: {MAX_ALLOWED_TURNS}"
        );
        self.options.max_turns = Some(turns);
        self
    }

    /// Resume a prior session.
    #[must_use]
    pub fn resume(mut self, session_id: impl Into<SessionId>) -> Self {
        self.options.resume = Some(session_id.into());
        self
    }

    /// Continue the most recent conversation in the working directory.
    #[must_use]
    pub const fn continue_conversation(mut self, value: bool) -> Self {
        self.options.continue_conversation = value;
        self
    }

    /// Set a settings file path.
    #[must_use]
    pub fn settings(mut self, path: impl Into<PathBuf>) -> Self {
        self.options.settings = Some(path.into());
        self
    }

    /// Add a context directory.
    #[must_use]
    pub fn add_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.options.add_dirs.push(path.into());
        self
    }

    /// Set an environment variable for the subprocess.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.env.insert(key.into(), value.into());
        self
    }

    /// Set the max JSON line buffer size.
    #[must_use]
    pub const fn max_buffer_size(mut self, bytes: usize) -> Self {
        self.options.max_buffer_size = Some(bytes);
        self
    }

    /// Enable or disable the created-file-deletion auto-approver.
    #[must_use]
    pub const fn auto_approve_created_file_deletion(mut self, value: bool) -> Self {
        self.options.auto_approve_created_file_deletion = value;
        self
    }

    /// Set whether to bypass the Broker entirely (`ALLOW_ALL_TOOLS`).
    #[must_use]
    pub const fn allow_all_tools(mut self, value: bool) -> Self {
        self.options.allow_all_tools = value;
        self
    }

    /// Opt out of closing stdin automatically when a `result`-type message
    /// is observed on the agent's stdout stream. Defaults to `true`.
    #[must_use]
    pub const fn close_stdin_on_result(mut self, value: bool) -> Self {
        self.options.close_stdin_on_result = value;
        self
    }

    /// Finish building.
    #[must_use]
    pub fn build(self) -> InvocationOptions {
        self.options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_applies_defaults() {
        let options = InvocationOptions::builder("do the thing").build();
        assert_eq!(options.prompt, "do the thing");
        assert_eq!(options.capture_policy, CapturePolicy::None);
        assert_eq!(options.input_source, InputSourcePolicy::None);
        assert_eq!(
            options.initial_inactivity_deadline,
            DEFAULT_INITIAL_INACTIVITY
        );
        assert!(options.close_stdin_on_result);
    }

    #[test]
    fn close_stdin_on_result_can_be_opted_out() {
        let options = InvocationOptions::builder("x")
            .close_stdin_on_result(false)
            .build();
        assert!(!options.close_stdin_on_result);
    }

    #[test]
    #[should_panic(expected = "exceeds maximum allowed")]
    fn max_turns_rejects_absurd_values() {
        let _ = InvocationOptions::builder("x").max_turns(5000);
    }
}
