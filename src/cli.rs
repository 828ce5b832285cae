//! Command-line flag surface for the `tim` binary: layers `clap`-parsed
//! flags over [`InvocationOptions`]'s built-in defaults.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::subprocess::Executor;
use crate::types::{
    CapturePolicy, ExecutionMode, InputSourcePolicy, InvocationOptions, PermissionMode, ToolName,
};

/// Run one coding-agent invocation to completion, streaming its rendered
/// output to stdout as it arrives.
#[derive(Debug, Parser)]
#[command(name = "tim", version, about)]
pub struct Cli {
    /// Prompt text to send the agent.
    pub prompt: String,

    /// Working directory for the agent subprocess. Defaults to the current
    /// directory.
    #[arg(long)]
    pub cwd: Option<PathBuf>,

    /// Which agent CLI dialect to launch.
    #[arg(long, value_enum, default_value_t = ExecutorArg::Claude)]
    pub executor: ExecutorArg,

    /// Path to the agent CLI binary, if not discoverable on `PATH` or in
    /// common install locations.
    #[arg(long)]
    pub cli_path: Option<PathBuf>,

    /// Execution mode: plain run, TDD-test generation, or review (fatal on
    /// non-zero exit).
    #[arg(long, value_enum, default_value_t = ModeArg::Normal)]
    pub mode: ModeArg,

    /// Model hint passed through to the agent CLI.
    #[arg(long)]
    pub model: Option<String>,

    /// Pre-approved tools, e.g. `Edit` or `Bash(git status)`. Repeatable.
    #[arg(long = "allow", value_name = "TOOL")]
    pub allowed_tools: Vec<String>,

    /// Tools the agent may never use. Repeatable.
    #[arg(long = "disallow", value_name = "TOOL")]
    pub disallowed_tools: Vec<String>,

    /// Bypass the Permission Broker entirely and let every tool run.
    /// Equivalent to the agent CLI's own dangerous-skip-permissions flag.
    #[arg(long)]
    pub allow_all_tools: bool,

    /// Read follow-up prompts from the terminal after the initial prompt,
    /// instead of exiting once the agent's first turn completes.
    #[arg(long)]
    pub interactive: bool,

    /// Cap the number of agent turns.
    #[arg(long)]
    pub max_turns: Option<u32>,

    /// How much of the agent's rendered output to retain in the returned
    /// result, beyond what was already streamed to stdout.
    #[arg(long, value_enum, default_value_t = CapturePolicyArg::None)]
    pub capture: CapturePolicyArg,
}

impl Cli {
    /// Translate parsed flags into [`InvocationOptions`].
    #[must_use]
    pub fn into_options(self) -> InvocationOptions {
        let mut builder = InvocationOptions::builder(self.prompt)
            .mode(self.mode.into())
            .capture_policy(self.capture.into())
            .input_source(if self.interactive {
                InputSourcePolicy::Terminal
            } else {
                InputSourcePolicy::None
            })
            .allow_all_tools(self.allow_all_tools)
            .allowed_tools(self.allowed_tools.into_iter().map(ToolName::new).collect())
            .disallowed_tools(self.disallowed_tools.into_iter().map(ToolName::new).collect())
            .permission_mode(if self.allow_all_tools {
                PermissionMode::BypassPermissions
            } else {
                PermissionMode::Default
            });

        if let Some(cwd) = self.cwd {
            builder = builder.cwd(cwd);
        }
        if let Some(model) = self.model {
            builder = builder.model(model);
        }
        if let Some(max_turns) = self.max_turns {
            builder = builder.max_turns(max_turns);
        }

        builder.build()
    }

    /// Translate the parsed executor flag into [`Executor`].
    #[must_use]
    pub const fn executor(&self) -> Executor {
        self.executor.into_executor()
    }
}

/// `clap`-facing mirror of [`Executor`]; kept separate so `subprocess`
/// itself never depends on `clap`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExecutorArg {
    /// Claude Code CLI.
    Claude,
    /// Codex CLI.
    Codex,
}

impl ExecutorArg {
    const fn into_executor(self) -> Executor {
        match self {
            Self::Claude => Executor::Claude,
            Self::Codex => Executor::Codex,
        }
    }
}

/// `clap`-facing mirror of [`ExecutionMode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    /// Plain run.
    Normal,
    /// A single simple turn, no orchestration scaffolding.
    Simple,
    /// Generate failing tests only.
    Tdd,
    /// Review an existing change; a non-zero exit is fatal.
    Review,
}

impl From<ModeArg> for ExecutionMode {
    fn from(value: ModeArg) -> Self {
        match value {
            ModeArg::Normal => Self::Normal,
            ModeArg::Simple => Self::Simple,
            ModeArg::Tdd => Self::Tdd,
            ModeArg::Review => Self::Review,
        }
    }
}

/// `clap`-facing mirror of [`CapturePolicy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CapturePolicyArg {
    /// Retain nothing beyond what was streamed to the caller.
    None,
    /// Retain every rendered message.
    All,
    /// Retain only the terminal result message.
    ResultOnly,
}

impl From<CapturePolicyArg> for CapturePolicy {
    fn from(value: CapturePolicyArg) -> Self {
        match value {
            CapturePolicyArg::None => Self::None,
            CapturePolicyArg::All => Self::All,
            CapturePolicyArg::ResultOnly => Self::ResultOnly,
        }
    }
}
