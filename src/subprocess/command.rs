//! CLI argument assembly for the agent subprocess.
//!
//! Handles the dialect switch between the `claude` and `codex` binaries'
//! flag sets.

use std::path::Path;

use tokio::process::Command;

use crate::types::agent::SystemPrompt;
use crate::types::options::InvocationOptions;
use crate::types::orchestration::ExecutionMode;
use crate::types::permissions::{PermissionMode, RuleMap, SettingSource};

use super::config::{ALLOWED_EXTRA_FLAGS, Executor, KNOWN_MODELS, PromptInput};

/// Assembles the `tokio::process::Command` for one `Invocation`.
pub struct CommandBuilder<'a> {
    cli_path: &'a Path,
    executor: Executor,
    prompt: &'a PromptInput,
    options: &'a InvocationOptions,
    resolved_allow: &'a RuleMap,
    mcp_config_path: &'a Path,
}

impl<'a> CommandBuilder<'a> {
    /// Create a new command builder.
    pub fn new(
        cli_path: &'a Path,
        executor: Executor,
        prompt: &'a PromptInput,
        options: &'a InvocationOptions,
        resolved_allow: &'a RuleMap,
        mcp_config_path: &'a Path,
    ) -> Self {
        Self {
            cli_path,
            executor,
            prompt,
            options,
            resolved_allow,
            mcp_config_path,
        }
    }

    /// Build the complete CLI command with all arguments.
    pub fn build(&self, system_prompt: Option<&SystemPrompt>) -> Command {
        let mut cmd = Command::new(self.cli_path);

        cmd.arg("--print")
            .arg("--output-format")
            .arg("stream-json")
            .arg("--verbose")
            .arg("--input-format")
            .arg("stream-json");

        if let Some(prompt) = system_prompt {
            match prompt {
                SystemPrompt::String(s) => {
                    cmd.arg("--system-prompt").arg(s);
                }
                SystemPrompt::Preset(preset) => {
                    if let Some(ref append) = preset.append {
                        cmd.arg("--append-system-prompt").arg(append);
                    }
                }
            }
        }

        self.add_tool_args(&mut cmd);
        self.add_configuration_args(&mut cmd);
        self.add_session_args(&mut cmd);
        self.add_mcp_args(&mut cmd);
        self.add_extra_args(&mut cmd);

        if self.options.mode == ExecutionMode::Review {
            // Review mode's prompt text is already embedded in the
            // `--print <text>` argument `add_review_args` appends; passing
            // it again as a trailing positional would give the CLI two
            // conflicting prompt sources on one command line.
            self.add_review_args(&mut cmd);
        } else if let PromptInput::String(ref text) = self.prompt {
            cmd.arg("--").arg(text);
        }

        cmd
    }

    /// Allowlist / disallowlist, or the dangerous bypass flag when the
    /// caller opted into `allowAllTools`.
    fn add_tool_args(&self, cmd: &mut Command) {
        if self.options.allow_all_tools {
            cmd.arg(self.executor.dangerous_skip_flag());
            return;
        }

        let allow = self.resolved_allow.to_allow_strings();
        if !allow.is_empty() {
            cmd.arg("--allowedTools").arg(allow.join(","));
        }

        if !self.options.disallowed_tools.is_empty() {
            let tools: Vec<&str> = self
                .options
                .disallowed_tools
                .iter()
                .map(|t| t.as_str())
                .collect();
            cmd.arg("--disallowedTools").arg(tools.join(","));
        }
    }

    /// Model, max turns, permission-prompt-tool, permission mode.
    fn add_configuration_args(&self, cmd: &mut Command) {
        if let Some(max_turns) = self.options.max_turns {
            cmd.arg("--max-turns").arg(max_turns.to_string());
        }

        if let Some(ref model) = self.options.model {
            let model = if KNOWN_MODELS.contains(&model.as_str()) {
                model.as_str()
            } else {
                log::warn!("unrecognized model {model:?}, falling back to CLI default");
                return;
            };
            cmd.arg("--model").arg(model);
        }

        cmd.arg("--permission-prompt-tool")
            .arg("mcp__permissions__approval_prompt");

        if let Some(mode) = self.options.permission_mode {
            let mode_str = match mode {
                PermissionMode::Default => "default",
                PermissionMode::AcceptEdits => "acceptEdits",
                PermissionMode::Plan => "plan",
                PermissionMode::BypassPermissions => "bypassPermissions",
            };
            cmd.arg("--permission-mode").arg(mode_str);
        }
    }

    /// Session resume/continue, settings, add-dirs, session persistence.
    fn add_session_args(&self, cmd: &mut Command) {
        if self.options.continue_conversation {
            cmd.arg("--continue");
        }

        if let Some(ref session_id) = self.options.resume {
            cmd.arg("--resume").arg(session_id.as_str());
        }

        if let Some(ref settings) = self.options.settings {
            cmd.arg("--settings").arg(settings);
        }

        for dir in &self.options.add_dirs {
            cmd.arg("--add-dir").arg(dir);
        }

        // Session persistence is disabled: every Invocation is independent.
        cmd.arg("--session-id").arg("");
    }

    /// Point the agent at the Broker's generated MCP config file.
    fn add_mcp_args(&self, cmd: &mut Command) {
        cmd.arg("--mcp-config").arg(self.mcp_config_path);
    }

    /// Setting sources and allowlisted extra flags.
    fn add_extra_args(&self, cmd: &mut Command) {
        if let Some(ref sources) = self.options.setting_sources {
            let sources_str: Vec<&str> = sources
                .iter()
                .map(|s| match s {
                    SettingSource::User => "user",
                    SettingSource::Project => "project",
                    SettingSource::Local => "local",
                })
                .collect();
            cmd.arg("--setting-sources").arg(sources_str.join(","));
        }

        for (flag, value) in &self.options.extra_args {
            if ALLOWED_EXTRA_FLAGS.contains(&flag.as_str()) {
                if let Some(v) = value {
                    cmd.arg(format!("--{flag}")).arg(v);
                } else {
                    cmd.arg(format!("--{flag}"));
                }
            }
        }
    }

    /// Review mode additionally passes a JSON-schema flag and an explicit
    /// `--print <text>` invocation embedding context plus a
    /// structured-output instruction.
    fn add_review_args(&self, cmd: &mut Command) {
        cmd.arg("--output-schema").arg(review_output_schema());
        cmd.arg("--print").arg(format!(
            "{}\n\nRespond with structured JSON matching the schema above.",
            self.options.prompt
        ));
    }
}

impl Executor {
    /// The flag that bypasses all tool-permission checks entirely.
    #[must_use]
    pub const fn dangerous_skip_flag(self) -> &'static str {
        match self {
            Self::Claude => "--dangerously-skip-permissions",
            Self::Codex => "--dangerously-bypass-approvals-and-sandbox",
        }
    }
}

fn review_output_schema() -> String {
    serde_json::json!({
        "type": "object",
        "properties": {
            "verdict": {"type": "string", "enum": ["approve", "request_changes"]},
            "summary": {"type": "string"},
            "comments": {"type": "array", "items": {"type": "string"}}
        },
        "required": ["verdict", "summary"]
    })
    .to_string()
}
