//! Type definitions for the agent execution core.
//!
//! Organized into logical submodules matching `SPEC_FULL.md` §3's data
//! model:
//!
//! - [`identifiers`] - type-safe ID wrappers (`InvocationId`, `SessionId`, `ToolName`, `RequestId`)
//! - [`permissions`] - Broker wire protocol: requests, responses, allow rules
//! - [`mcp`] - the permissions MCP server config file shape
//! - [`messages`] - raw stream-json message and content-block types
//! - [`formatted`] - `FormattedMessage`, the Formatter's output
//! - [`failure`] - `FailureReport`, failure-detection types
//! - [`agent`] - system prompt and subagent definitions
//! - [`orchestration`] - `OrchestrationOptions` for the prompt renderer
//! - [`options`] - `InvocationOptions`, the per-run configuration record

pub mod agent;
pub mod failure;
pub mod formatted;
pub mod identifiers;
pub mod mcp;
pub mod messages;
pub mod options;
pub mod orchestration;
pub mod permissions;
pub mod tracked_files;

pub use agent::{AgentDefinition, SystemPrompt, SystemPromptPreset};
pub use failure::{FailureReport, SourceAgent};
pub use formatted::{FormattedMessage, FormattedMessageType, StructuredEvent};
pub use identifiers::{InvocationId, RequestId, SessionId, ToolName};
pub use mcp::{McpConfigFile, McpStdioServerConfig};
pub use options::{CapturePolicy, InputSourcePolicy, InvocationOptions, InvocationOptionsBuilder};
pub use orchestration::{ExecutionMode, OrchestrationOptions, SubagentExecutor};
pub use permissions::{
    AskUserQuestionInput, AskUserQuestionUpdatedInput, PermissionMode, PermissionRequest,
    PermissionResponse, Question, QuestionOption, RuleLifetime, RuleMap, SettingSource, ToolRule,
};
pub use tracked_files::TrackedFiles;
