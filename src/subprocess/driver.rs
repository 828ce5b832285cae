//! The Subprocess Driver: launches the agent CLI, streams stdout, and
//! resolves with `{exitCode, killedByInactivity}`.
//!
//! Stdio is piped with stderr never inherited, environment variables are
//! filtered against a dangerous-variable denylist, and shutdown is
//! graceful-close-then-kill. Also handles the CLI-dialect switch
//! (`Executor`) and the dual inactivity watchdog (`super::watchdog`).

use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::io::{AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::{Result, TimError};
use crate::types::agent::SystemPrompt;
use crate::types::options::InvocationOptions;
use crate::types::permissions::RuleMap;

use super::command::CommandBuilder;
use super::config::{DANGEROUS_ENV_VARS, DEFAULT_MAX_BUFFER_SIZE, Executor, PromptInput};

/// Outcome of a completed (or killed) agent run.
#[derive(Debug, Clone)]
pub struct DriverResult {
    /// Process exit code, if the process actually exited.
    pub exit_code: Option<i32>,
    /// Set when the Driver killed the process for inactivity rather than
    /// the agent exiting on its own.
    pub killed_by_inactivity: bool,
}

/// Spawns and owns the agent CLI subprocess for one `Invocation`.
pub struct SubprocessDriver {
    options: InvocationOptions,
    executor: Executor,
    prompt: PromptInput,
    cli_path: PathBuf,
    mcp_config_path: PathBuf,
    resolved_allow: RuleMap,
    system_prompt: Option<SystemPrompt>,
    process: Option<Child>,
    stdin: Option<ChildStdin>,
    stdout: Option<BufReader<ChildStdout>>,
    ready: Arc<AtomicBool>,
    max_buffer_size: usize,
    reader_task: Option<JoinHandle<()>>,
    stderr_task: Option<JoinHandle<()>>,
}

impl SubprocessDriver {
    /// Create a new driver. Resolves the CLI binary path via `which` and
    /// common install locations if not already known.
    pub fn new(
        options: InvocationOptions,
        executor: Executor,
        prompt: PromptInput,
        mcp_config_path: PathBuf,
        resolved_allow: RuleMap,
        system_prompt: Option<SystemPrompt>,
        cli_path: Option<PathBuf>,
    ) -> Result<Self> {
        let cli_path = match cli_path {
            Some(path) => path,
            None => Self::find_cli(executor)?,
        };
        let max_buffer_size = options.max_buffer_size.unwrap_or(DEFAULT_MAX_BUFFER_SIZE);

        Ok(Self {
            options,
            executor,
            prompt,
            cli_path,
            mcp_config_path,
            resolved_allow,
            system_prompt,
            process: None,
            stdin: None,
            stdout: None,
            ready: Arc::new(AtomicBool::new(false)),
            max_buffer_size,
            reader_task: None,
            stderr_task: None,
        })
    }

    /// Locate the agent CLI binary for the given executor dialect.
    pub fn find_cli(executor: Executor) -> Result<PathBuf> {
        let name = executor.binary_name();
        if let Ok(path) = which::which(name) {
            return Ok(path);
        }

        let home = env::var("HOME").unwrap_or_else(|_| String::from("/root"));
        let locations = [
            PathBuf::from(&home).join(".npm-global/bin").join(name),
            PathBuf::from("/usr/local/bin").join(name),
            PathBuf::from(&home).join(".local/bin").join(name),
            PathBuf::from(&home).join("node_modules/.bin").join(name),
            PathBuf::from(&home).join(".cargo/bin").join(name),
            PathBuf::from(&home).join(".yarn/bin").join(name),
        ];

        for path in locations {
            if path.is_file() {
                return Ok(path);
            }
        }

        Err(TimError::cli_not_found(name))
    }

    /// Whether the subprocess is spawned and its stdio handles are live.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    /// Spawn the subprocess and wire up piped stdio.
    pub async fn connect(&mut self) -> Result<()> {
        if self.process.is_some() {
            return Ok(());
        }

        let builder = CommandBuilder::new(
            &self.cli_path,
            self.executor,
            &self.prompt,
            &self.options,
            &self.resolved_allow,
            &self.mcp_config_path,
        );
        let mut cmd = builder.build(self.system_prompt.as_ref());

        let mut process_env: HashMap<String, String> = env::vars().collect();
        for (key, value) in &self.options.env {
            if !DANGEROUS_ENV_VARS.contains(&key.as_str()) {
                process_env.insert(key.clone(), value.clone());
            }
        }
        process_env.insert("CLAUDE_CODE_NONINTERACTIVE".to_string(), "1".to_string());
        process_env.insert(
            "TIM_AGENT_EXECUTOR".to_string(),
            self.executor.binary_name().to_string(),
        );
        process_env.insert("CLAUDE_CODE_SESSION_KEY".to_string(), String::new());

        if let Some(ref cwd) = self.options.cwd {
            process_env.insert("PWD".to_string(), cwd.to_string_lossy().to_string());
            cmd.current_dir(cwd);
        }

        cmd.envs(process_env);

        // We pipe stderr instead of inheriting it to prevent the child
        // process from manipulating the parent terminal state.
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(|e| {
            TimError::connection(format!(
                "failed to start {}: {e}",
                self.executor.binary_name()
            ))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| TimError::connection("failed to get stdin handle"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| TimError::connection("failed to get stdout handle"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| TimError::connection("failed to get stderr handle"))?;

        let stderr_task = tokio::spawn(async move {
            use tokio::io::AsyncReadExt;
            let mut stderr = stderr;
            let mut buffer = vec![0u8; 4096];
            loop {
                match stderr.read(&mut buffer).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        let _ = std::io::Write::write_all(&mut std::io::stderr(), &buffer[..n]);
                    }
                }
            }
        });

        self.stdin = Some(stdin);
        self.stdout = Some(BufReader::new(stdout));
        self.process = Some(child);
        self.stderr_task = Some(stderr_task);
        self.ready.store(true, Ordering::SeqCst);

        if matches!(self.prompt, PromptInput::String(_))
            && let Some(mut stdin) = self.stdin.take()
        {
            let _ = stdin.shutdown().await;
        }

        Ok(())
    }

    /// Write one raw line to the agent's stdin (used by the Input Router
    /// for stream-json follow-up messages).
    pub async fn write_line(&mut self, line: &str) -> Result<()> {
        if !self.is_ready() {
            return Err(TimError::transport("driver is not ready for writing"));
        }
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| TimError::transport("stdin not available"))?;
        stdin
            .write_all(line.as_bytes())
            .await
            .map_err(|e| TimError::transport(format!("failed to write to stdin: {e}")))?;
        stdin
            .flush()
            .await
            .map_err(|e| TimError::transport(format!("failed to flush stdin: {e}")))?;
        Ok(())
    }

    /// Close stdin, signalling the agent to wind down. Idempotent: a second
    /// call is a no-op since `stdin` is already `None`.
    pub async fn end_input(&mut self) -> Result<()> {
        if let Some(mut stdin) = self.stdin.take() {
            stdin
                .shutdown()
                .await
                .map_err(|e| TimError::transport(format!("failed to close stdin: {e}")))?;
        }
        Ok(())
    }

    /// Take ownership of the stdout handle and process handle for the
    /// reader task (see `super::reader`).
    pub(super) fn take_stdout(&mut self) -> Option<BufReader<ChildStdout>> {
        self.stdout.take()
    }

    pub(super) fn set_reader_task(&mut self, task: JoinHandle<()>) {
        self.reader_task = Some(task);
    }

    pub(super) const fn max_buffer_size(&self) -> usize {
        self.max_buffer_size
    }

    /// Path to the generated MCP config file (for diagnostics/cleanup).
    #[must_use]
    pub fn mcp_config_path(&self) -> &Path {
        &self.mcp_config_path
    }

    /// Graceful close: shut down stdin, abort background tasks, wait for
    /// exit with a bounded timeout, then force-kill.
    pub async fn close(&mut self) -> Result<Option<i32>> {
        self.ready.store(false, Ordering::SeqCst);

        if let Some(mut stdin) = self.stdin.take() {
            let _ = stdin.shutdown().await;
        }

        if let Some(task) = self.reader_task.take() {
            task.abort();
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        }
        if let Some(task) = self.stderr_task.take() {
            task.abort();
        }
        self.stdout = None;

        let Some(mut child) = self.process.take() else {
            return Ok(None);
        };

        let timeout = std::time::Duration::from_secs(5);
        match tokio::time::timeout(timeout, child.wait()).await {
            Ok(Ok(status)) => Ok(status.code()),
            Ok(Err(e)) => Err(TimError::Io(e)),
            Err(_) => {
                let _ = child.kill().await;
                let status = child.wait().await.ok();
                Ok(status.and_then(|s| s.code()))
            }
        }
    }

    /// Kill the subprocess immediately, no grace period, and reap its
    /// OS-signaled exit code. Used for caller-initiated cancellation and
    /// inactivity timeouts.
    pub async fn kill(&mut self) -> Result<Option<i32>> {
        self.ready.store(false, Ordering::SeqCst);
        let exit_code = if let Some(mut child) = self.process.take() {
            let _ = child.start_kill();
            child.wait().await.ok().and_then(|status| status.code())
        } else {
            None
        };
        if let Some(task) = self.reader_task.take() {
            task.abort();
        }
        if let Some(task) = self.stderr_task.take() {
            task.abort();
        }
        self.stdin = None;
        self.stdout = None;
        Ok(exit_code)
    }

    /// Spawn the background stdout-reading task. See `super::reader`.
    pub fn read_messages(&mut self) -> mpsc::UnboundedReceiver<Result<serde_json::Value>> {
        super::reader::spawn_reader(self)
    }
}

impl Drop for SubprocessDriver {
    fn drop(&mut self) {
        if let Some(stdin) = self.stdin.take() {
            drop(stdin);
        }
        if let Some(task) = self.reader_task.take() {
            task.abort();
        }
        if let Some(task) = self.stderr_task.take() {
            task.abort();
        }
        if let Some(mut child) = self.process.take() {
            let _ = child.start_kill();
        }
    }
}
