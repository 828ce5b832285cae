//! `Invocation::run`: the entry point tying the Subprocess Driver, Permission
//! Broker, Interactive Input Router, optional Tunnel, and Message Formatter
//! together for one end-to-end agent run.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::broker::{
    BrokerServer, BrokerState, NullPromptCoordinator, PromptCoordinator, TerminalPromptCoordinator,
    DEFAULT_PROMPT_TIMEOUT_APPROVES,
};
use crate::error::{Result, TimError};
use crate::formatter::{detect_failure, Formatter};
use crate::input::InputRouter;
use crate::settings::{self, NullSharedRuleStore, SharedRuleStore};
use crate::subprocess::{Executor, InactivityWatchdog, PromptInput, SubprocessDriver, WatchdogEvent};
use crate::tunnel::{self, TunnelPromptCoordinator, TunnelServer};
use crate::types::{
    CapturePolicy, ExecutionMode, FormattedMessage, FormattedMessageType, InputSourcePolicy,
    InvocationOptions, McpConfigFile, McpStdioServerConfig, RuleMap,
};

use super::cancel::CancelHandle;
use super::result::InvocationResult;

/// Owns nothing itself — `run`/`run_with` are the only entry points. Kept as
/// a unit struct so call sites read `Invocation::run(...)`, mirroring how
/// the rest of this crate names its top-level components.
pub struct Invocation;

impl Invocation {
    /// Run to completion with no caller-supplied shared rule store and no
    /// per-message callback. The common case for a one-shot, non-interactive
    /// run.
    pub async fn run(
        options: InvocationOptions,
        executor: Executor,
        cli_path: Option<PathBuf>,
    ) -> Result<InvocationResult> {
        Self::run_with(
            options,
            executor,
            cli_path,
            Arc::new(NullSharedRuleStore),
            |_msgs| {},
            CancelHandle::new(),
        )
        .await
    }

    /// Run to completion, wiring in a real cross-worktree shared rule store
    /// and a `processFormattedMessages`-style callback invoked with each
    /// batch (here, always length 1) of rendered output as it arrives.
    /// `on_messages` must not block: it runs inline on the message loop.
    ///
    /// `cancel` lets a caller holding a clone of the same [`CancelHandle`]
    /// stop this run from another task: the subprocess is killed and the
    /// usual cleanup stack runs, with `killed_by_inactivity=false` in the
    /// result. Pass a fresh, never-cancelled `CancelHandle::new()` if the
    /// caller has no use for this.
    pub async fn run_with<F>(
        mut options: InvocationOptions,
        executor: Executor,
        cli_path: Option<PathBuf>,
        shared_store: Arc<dyn SharedRuleStore>,
        on_messages: F,
        cancel: CancelHandle,
    ) -> Result<InvocationResult>
    where
        F: Fn(&[FormattedMessage]) + Send + Sync + 'static,
    {
        let project_root = match options.cwd.clone() {
            Some(path) => path,
            None => std::env::current_dir().map_err(TimError::Io)?,
        };
        let temp_dir = tempfile::tempdir().map_err(TimError::Io)?;

        let broker_socket_path = crate::broker::default_socket_path(temp_dir.path());
        let tunnel_socket_path = tunnel::default_socket_path(temp_dir.path());
        let tunnel_enabled =
            matches!(options.input_source, InputSourcePolicy::Tunnel) && !tunnel::already_active();
        if tunnel_enabled {
            options.env.insert(
                tunnel::TUNNEL_SOCKET_ENV_VAR.to_string(),
                tunnel_socket_path.to_string_lossy().into_owned(),
            );
        }

        let resolved_allow = Self::resolve_allow(&options, &project_root, shared_store.as_ref());

        if !options.allow_all_tools {
            Self::write_mcp_config(&temp_dir, &broker_socket_path)?;
        }
        let mcp_config_path = temp_dir.path().join("mcp-config.json");

        let input_source = options.input_source;
        let mode = options.mode;
        let prompt_text = options.prompt.clone();
        let auto_approve = options.auto_approve_created_file_deletion;
        let allow_all_tools = options.allow_all_tools;
        let initial_deadline = options.initial_inactivity_deadline;
        let steady_deadline = options.steady_state_inactivity_deadline;
        let capture_policy = options.capture_policy;
        let close_stdin_on_result = options.close_stdin_on_result;

        let prompt_input = match input_source {
            InputSourcePolicy::None => PromptInput::String(prompt_text.clone()),
            InputSourcePolicy::Terminal | InputSourcePolicy::Tunnel => PromptInput::Stream,
        };

        let driver = SubprocessDriver::new(
            options,
            executor,
            prompt_input,
            mcp_config_path,
            resolved_allow.clone(),
            None,
            cli_path,
        )?;
        let driver = Arc::new(Mutex::new(driver));
        let input_router = InputRouter::new(Arc::clone(&driver));

        let tunnel_server = if tunnel_enabled {
            Some(TunnelServer::bind(tunnel_socket_path, Arc::clone(&input_router))?)
        } else {
            None
        };

        let prompt_coordinator: Arc<dyn PromptCoordinator> = match input_source {
            InputSourcePolicy::Terminal => Arc::new(TerminalPromptCoordinator::new()),
            InputSourcePolicy::Tunnel => match &tunnel_server {
                Some(server) => Arc::new(TunnelPromptCoordinator::new(server.state())),
                None => Arc::new(NullPromptCoordinator::new(DEFAULT_PROMPT_TIMEOUT_APPROVES)),
            },
            InputSourcePolicy::None => Arc::new(NullPromptCoordinator::new(DEFAULT_PROMPT_TIMEOUT_APPROVES)),
        };

        let broker_state = Arc::new(
            BrokerState::new(project_root.clone(), project_root.clone(), resolved_allow)
                .with_prompt_coordinator(prompt_coordinator)
                .with_shared_store(Arc::clone(&shared_store))
                .with_auto_approve_created_file_deletion(auto_approve),
        );

        let broker_server = if allow_all_tools {
            None
        } else {
            Some(BrokerServer::bind(broker_socket_path, Arc::clone(&broker_state))?)
        };

        if let Err(e) = driver.lock().await.connect().await {
            Self::cleanup(broker_server, tunnel_server, input_router, temp_dir).await;
            return Err(e);
        }

        if let Err(e) = Self::start_input_source(input_source, &input_router, &prompt_text).await {
            Self::cleanup(broker_server, tunnel_server, input_router, temp_dir).await;
            return Err(e);
        }

        let rx = driver.lock().await.read_messages();
        let mut watchdog = InactivityWatchdog::new(rx, initial_deadline, steady_deadline);

        let mut formatter = Formatter::new();
        let mut exit_code = None;
        let mut killed_by_inactivity = false;
        let mut failure = None;
        let mut captured = Vec::new();

        loop {
            tokio::select! {
                event = watchdog.next() => match event {
                    WatchdogEvent::Message(Ok(value)) => {
                        let msg = formatter.format_line(&value.to_string());

                        if !msg.affected_files.is_empty() {
                            let tracked = broker_state.tracked_files_handle();
                            let mut tracked = tracked.lock().await;
                            for path in &msg.affected_files {
                                tracked.insert(path.clone());
                            }
                        }

                        if msg.failed {
                            if let Some(raw) = msg.raw_text.as_deref() {
                                failure = detect_failure(raw);
                            }
                        }

                        let is_result = msg.message_type == Some(FormattedMessageType::Result);

                        Self::retain(&mut captured, capture_policy, &msg);
                        on_messages(std::slice::from_ref(&msg));

                        // A `result`-type message triggers stdin close unless the
                        // caller opted out. This only matters for sources that
                        // otherwise leave stdin open for follow-ups (Terminal/
                        // Tunnel); closing is idempotent
                        // either way.
                        if is_result && close_stdin_on_result {
                            let _ = input_router.close().await;
                        }
                    }
                    WatchdogEvent::Message(Err(TimError::Process {
                        exit_code: code,
                        killed_by_inactivity: k,
                        ..
                    })) => {
                        exit_code = code;
                        killed_by_inactivity = killed_by_inactivity || k;
                    }
                    WatchdogEvent::Message(Err(e)) => {
                        log::warn!("invocation: stream error: {e}");
                    }
                    WatchdogEvent::Inactive => {
                        killed_by_inactivity = true;
                        exit_code = driver.lock().await.kill().await.unwrap_or(None);
                        log::error!(
                            "invocation: killed agent process after inactivity (initial {initial_deadline:?}, steady-state {steady_deadline:?})"
                        );
                        break;
                    }
                    WatchdogEvent::Closed => break,
                },
                () = cancel.cancelled() => {
                    exit_code = driver.lock().await.kill().await.unwrap_or(None);
                    log::info!("invocation: cancelled by caller");
                    break;
                }
            }
        }

        if exit_code.is_none() {
            exit_code = driver.lock().await.close().await.unwrap_or(None);
        }

        Self::cleanup(broker_server, tunnel_server, input_router, temp_dir).await;

        if mode == ExecutionMode::Review
            && !killed_by_inactivity
            && exit_code.map(|c| c != 0).unwrap_or(false)
        {
            return Err(TimError::process(
                "agent exited non-zero in review mode",
                exit_code,
                false,
            ));
        }

        Ok(InvocationResult {
            exit_code,
            killed_by_inactivity,
            success: failure.is_none() && !killed_by_inactivity,
            failure,
            captured,
        })
    }

    /// Fold the session allowlist (`InvocationOptions::allowed_tools`), the
    /// repo-local settings file, and the shared cross-worktree store into
    /// one map. Merge never removes an approval already present, so order
    /// only affects which source "wins" on a genuine conflict, which cannot
    /// happen for this union-only operation.
    fn resolve_allow(
        options: &InvocationOptions,
        project_root: &std::path::Path,
        shared_store: &dyn SharedRuleStore,
    ) -> RuleMap {
        let mut rule_map =
            RuleMap::from_allow_strings(options.allowed_tools.iter().map(|t| t.as_str()));

        match settings::read_local_rules(project_root) {
            Ok(local) => rule_map.merge(&local),
            Err(e) => log::debug!("invocation: failed to read repo-local rules: {e}"),
        }

        let identity = settings::repo_identity(project_root);
        match shared_store.rules_for(&identity) {
            Ok(rules) => rule_map.merge(&RuleMap::from_allow_strings(rules)),
            Err(e) => log::debug!("invocation: failed to read shared rule store: {e}"),
        }

        rule_map
    }

    fn write_mcp_config(temp_dir: &tempfile::TempDir, broker_socket_path: &std::path::Path) -> Result<()> {
        let command = std::env::current_exe()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_else(|_| "tim".to_string());
        let server =
            McpStdioServerConfig::permissions_server(command, broker_socket_path.to_string_lossy().into_owned());
        let config = McpConfigFile::with_permissions_server(server);
        let serialized = serde_json::to_string_pretty(&config).map_err(TimError::JsonDecode)?;
        std::fs::write(temp_dir.path().join("mcp-config.json"), serialized).map_err(TimError::Io)
    }

    /// Write the initial prompt as the first follow-up message for the two
    /// input sources that leave stdin open: a non-interactive run already
    /// sent its prompt as a CLI positional argument and closed stdin
    /// directly inside `SubprocessDriver::connect`, so here we only need to
    /// trip the router's own close guard to match single-prompt mode.
    async fn start_input_source(
        input_source: InputSourcePolicy,
        input_router: &Arc<InputRouter>,
        prompt_text: &str,
    ) -> Result<()> {
        match input_source {
            InputSourcePolicy::None => input_router.run_single_prompt().await,
            InputSourcePolicy::Terminal => {
                input_router.send_follow_up(prompt_text.to_string()).await?;
                input_router.start_terminal_reader().await
            }
            InputSourcePolicy::Tunnel => input_router.send_follow_up(prompt_text.to_string()).await,
        }
    }

    fn retain(captured: &mut Vec<FormattedMessage>, policy: CapturePolicy, msg: &FormattedMessage) {
        match policy {
            CapturePolicy::None => {}
            CapturePolicy::All => captured.push(msg.clone()),
            CapturePolicy::ResultOnly => {
                if msg.message_type == Some(FormattedMessageType::Result) {
                    captured.clear();
                    captured.push(msg.clone());
                }
            }
        }
    }

    /// Reverse-order cleanup stack: close the broker socket server, close
    /// the tunnel server, then close the Input Router
    /// (which itself stops any terminal reader before closing agent stdin),
    /// then let the temp directory drop. Every step here is already
    /// idempotent on its own (`BrokerServer`/`TunnelServer`'s `Drop` impls,
    /// `InputRouter::close`'s guard), so cleanup is safe to call even after
    /// a partial setup failure.
    async fn cleanup(
        broker_server: Option<BrokerServer>,
        tunnel_server: Option<TunnelServer>,
        input_router: Arc<InputRouter>,
        temp_dir: tempfile::TempDir,
    ) {
        if let Some(server) = broker_server {
            server.shutdown().await;
        }
        if let Some(server) = tunnel_server {
            server.shutdown().await;
        }
        let _ = input_router.close().await;
        if let Err(e) = temp_dir.close() {
            log::debug!("invocation: failed to remove temp directory: {e}");
        }
    }
}
