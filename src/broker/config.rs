//! Configuration and shared state for one Invocation's Permission Broker.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use crate::settings::{NullSharedRuleStore, SharedRuleStore};
use crate::types::{RuleMap, TrackedFiles};

use super::prompt::{NullPromptCoordinator, PromptCoordinator};

/// Default action taken when an interactive prompt times out: configurable,
/// default `no`.
pub const DEFAULT_PROMPT_TIMEOUT_APPROVES: bool = false;

/// Default wait before a stalled interactive prompt is treated as timed out.
pub const DEFAULT_PROMPT_TIMEOUT: Duration = Duration::from_secs(120);

/// Socket file name created under the Invocation's temp directory.
pub const SOCKET_FILE_NAME: &str = "permissions.sock";

/// Default path for the Broker's socket, inside the Invocation's temp
/// directory.
#[must_use]
pub fn default_socket_path(temp_dir: &std::path::Path) -> PathBuf {
    temp_dir.join(SOCKET_FILE_NAME)
}

/// State shared by every connection accepted on one Invocation's Broker
/// socket. Cheap to clone (an `Arc` wrapper); one instance lives for the
/// lifetime of the Invocation.
pub struct BrokerState {
    /// Session rule map, pre-seeded from the default list and the
    /// project-persistent store at Invocation start, mutated in place as
    /// "Allow for Session" / "Always Allow" decisions accumulate.
    pub rule_map: Mutex<RuleMap>,
    /// Files the agent itself has written or edited this run.
    pub tracked_files: Arc<Mutex<TrackedFiles>>,
    /// Invocation's working directory, used to resolve `rm` targets.
    pub cwd: PathBuf,
    /// Project root the repo-local settings file and shared-store identity
    /// are keyed from.
    pub project_root: PathBuf,
    /// Whether the `rm`-of-tracked-files auto-approval probe is active.
    pub auto_approve_created_file_deletion: bool,
    /// Drives the four-choice prompt, the prefix-selection sub-prompt, and
    /// AskUserQuestion.
    pub prompt_coordinator: Arc<dyn PromptCoordinator>,
    /// Cross-worktree shared rule store.
    pub shared_store: Arc<dyn SharedRuleStore>,
    /// How long an interactive prompt waits before timing out.
    pub prompt_timeout: Duration,
    /// Decision applied when a prompt times out.
    pub prompt_timeout_approves: bool,
    /// Serializes every call into `prompt_coordinator` across connections:
    /// two concurrent connections competing for the user both block on the
    /// user, FIFO by arrival.
    pub prompt_lock: Mutex<()>,
}

impl BrokerState {
    /// Build state for a non-interactive (headless) run: prompts always
    /// resolve to the timeout default instead of blocking on a TTY.
    #[must_use]
    pub fn new(cwd: PathBuf, project_root: PathBuf, rule_map: RuleMap) -> Self {
        Self {
            rule_map: Mutex::new(rule_map),
            tracked_files: Arc::new(Mutex::new(TrackedFiles::new())),
            cwd,
            project_root,
            auto_approve_created_file_deletion: false,
            prompt_coordinator: Arc::new(NullPromptCoordinator::new(DEFAULT_PROMPT_TIMEOUT_APPROVES)),
            shared_store: Arc::new(NullSharedRuleStore),
            prompt_timeout: DEFAULT_PROMPT_TIMEOUT,
            prompt_timeout_approves: DEFAULT_PROMPT_TIMEOUT_APPROVES,
            prompt_lock: Mutex::new(()),
        }
    }

    /// Swap in a real interactive prompt coordinator (dialoguer-backed).
    #[must_use]
    pub fn with_prompt_coordinator(mut self, coordinator: Arc<dyn PromptCoordinator>) -> Self {
        self.prompt_coordinator = coordinator;
        self
    }

    /// Swap in a real cross-worktree shared store.
    #[must_use]
    pub fn with_shared_store(mut self, store: Arc<dyn SharedRuleStore>) -> Self {
        self.shared_store = store;
        self
    }

    /// Enable the `rm`-of-tracked-files auto-approval probe.
    #[must_use]
    pub fn with_auto_approve_created_file_deletion(mut self, enabled: bool) -> Self {
        self.auto_approve_created_file_deletion = enabled;
        self
    }

    /// Share this Invocation's `TrackedFiles` with the Formatter, which
    /// inserts into it as `Write`/`Edit`/`MultiEdit` tool-use events arrive.
    #[must_use]
    pub fn tracked_files_handle(&self) -> Arc<Mutex<TrackedFiles>> {
        Arc::clone(&self.tracked_files)
    }
}
