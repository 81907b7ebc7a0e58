//! ClaudeCodeExecutor - runs one assistant turn as a `claude -p` subprocess.
//!
//! The prompt goes to the child's stdin, the `stream-json` events come back on
//! stdout one per line. Every outcome, including launch errors and timeouts,
//! is returned as a [`TurnResult`].

use crate::invocation::build_invocation;
use crate::protocol::StreamAccumulator;
use async_trait::async_trait;
use relay_core::config::{DEFAULT_LINE_TIMEOUT_SECS, RelayConfig};
use relay_core::session::{SessionStateTracker, TurnFailure, TurnResult};
use relay_core::{TurnExecutor, TurnOptions};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;

/// Environment marker the assistant sets for processes it hosts.
///
/// Removed from the child's environment so a bridge started from inside an
/// assistant session does not spawn a "nested" assistant.
pub const NESTED_SESSION_ENV: &str = "CLAUDECODE";

/// Exit code reported when the child was terminated by a signal.
pub const SIGNAL_EXIT_CODE: i32 = -1;

/// Executes assistant turns through the `claude` CLI.
///
/// Successful turns mark their session id in the shared
/// [`SessionStateTracker`], so the next turn for the same id resumes it.
#[derive(Debug, Clone)]
pub struct ClaudeCodeExecutor {
    /// Path or bare name of the executable.
    program: PathBuf,
    /// Arguments placed before the generated ones (e.g. a wrapper script).
    args_prefix: Vec<String>,
    /// Maximum wait for a single output line.
    line_timeout: Duration,
    sessions: SessionStateTracker,
}

impl ClaudeCodeExecutor {
    pub fn new(program: impl Into<PathBuf>, sessions: SessionStateTracker) -> Self {
        Self {
            program: program.into(),
            args_prefix: Vec::new(),
            line_timeout: Duration::from_secs(DEFAULT_LINE_TIMEOUT_SECS),
            sessions,
        }
    }

    /// Creates an executor for the configured program and timeout.
    pub fn from_config(config: &RelayConfig, sessions: SessionStateTracker) -> Self {
        Self::new(config.claude_path.clone(), sessions).with_line_timeout(config.line_timeout())
    }

    pub fn with_args_prefix<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args_prefix = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_line_timeout(mut self, line_timeout: Duration) -> Self {
        self.line_timeout = line_timeout;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Checks that the configured program can be found.
    ///
    /// A path with directory components must point at a file; a bare name is
    /// looked up with `which` (Unix) or `where` (Windows).
    pub fn is_available(&self) -> bool {
        if self.program.components().count() > 1 {
            return self.program.is_file();
        }

        #[cfg(unix)]
        let check_cmd = "which";
        #[cfg(windows)]
        let check_cmd = "where";

        std::process::Command::new(check_cmd)
            .arg(&self.program)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }

    fn command(&self, args: &[String], working_directory: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args_prefix)
            .args(args)
            .current_dir(working_directory)
            .env_remove(NESTED_SESSION_ENV)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    fn launch_failure(&self, reason: impl Into<String>) -> TurnResult {
        let failure = TurnFailure::LaunchFailure {
            program: self.program.display().to_string(),
            reason: reason.into(),
        };
        tracing::error!("{}", failure);
        TurnResult::failed(failure)
    }

    async fn run_turn(
        &self,
        prompt: &str,
        session_id: &str,
        options: &TurnOptions,
        working_directory: &Path,
    ) -> TurnResult {
        if !working_directory.is_dir() {
            return self.launch_failure(format!(
                "working directory {} does not exist",
                working_directory.display()
            ));
        }

        let established = self.sessions.is_established(session_id).await;
        let args = build_invocation(session_id, established, options);
        tracing::info!(
            "Running: {} {} (cwd={})",
            self.program.display(),
            args.join(" "),
            working_directory.display()
        );

        let mut child = match self.command(&args, working_directory).spawn() {
            Ok(child) => child,
            Err(e) => return self.launch_failure(e.to_string()),
        };

        let stdin_task = spawn_stdin_writer(&mut child, prompt.to_string());
        let stderr_task = spawn_stderr_drain(&mut child);
        let Some(stdout) = child.stdout.take() else {
            return self.launch_failure("stdout was not captured");
        };

        let mut accumulator = StreamAccumulator::new();
        let mut lines = BufReader::new(stdout).split(b'\n');
        loop {
            match tokio::time::timeout(self.line_timeout, lines.next_segment()).await {
                Err(_) => {
                    tracing::warn!(
                        "No output from assistant for {:?}, killing session {}",
                        self.line_timeout,
                        session_id
                    );
                    if let Err(e) = child.kill().await {
                        tracing::warn!("Failed to kill assistant process: {}", e);
                    }
                    return TurnResult::failed(TurnFailure::TurnTimeout {
                        after_secs: self.line_timeout.as_secs(),
                    });
                }
                Ok(Ok(Some(segment))) => accumulator.feed_line(&String::from_utf8_lossy(&segment)),
                Ok(Ok(None)) => break,
                Ok(Err(e)) => {
                    tracing::warn!("Failed to read assistant output: {}", e);
                    break;
                }
            }
        }

        let code = match child.wait().await {
            Ok(status) => status.code().unwrap_or(SIGNAL_EXIT_CODE),
            Err(e) => {
                tracing::warn!("Failed to wait for assistant process: {}", e);
                SIGNAL_EXIT_CODE
            }
        };
        join_helper(stdin_task, "stdin writer").await;

        let has_text = accumulator.has_text();
        if code == 0 || has_text {
            self.sessions.mark_established(session_id).await;
        }

        if code != 0 && !has_text {
            let stderr = join_helper(stderr_task, "stderr drain").await;
            if !stderr.is_empty() {
                tracing::error!("claude stderr: {}", stderr);
            }
            return TurnResult::failed(TurnFailure::ProcessExitFailure { code, stderr });
        }

        let result = accumulator.into_result();
        tracing::debug!(
            "Turn finished with exit code {}: {} chars, {} permission denials",
            code,
            result.text.len(),
            result.permission_denials.len()
        );
        result
    }
}

#[async_trait]
impl TurnExecutor for ClaudeCodeExecutor {
    async fn execute(
        &self,
        prompt: &str,
        session_id: &str,
        options: &TurnOptions,
        working_directory: &Path,
    ) -> TurnResult {
        self.run_turn(prompt, session_id, options, working_directory)
            .await
    }
}

/// Writes the prompt and closes stdin so the child sees end of input.
/// Waits for an I/O helper task. A task that panicked or was cancelled
/// yields the default value.
async fn join_helper<T: Default>(task: Option<JoinHandle<T>>, name: &str) -> T {
    let Some(task) = task else {
        return T::default();
    };
    match task.await {
        Ok(value) => value,
        Err(e) => {
            tracing::debug!("Assistant {} task failed: {}", name, e);
            T::default()
        }
    }
}

fn spawn_stdin_writer(child: &mut Child, prompt: String) -> Option<JoinHandle<()>> {
    let mut stdin = child.stdin.take()?;
    Some(tokio::spawn(async move {
        if let Err(e) = stdin.write_all(prompt.as_bytes()).await {
            tracing::debug!("Failed to write prompt to assistant: {}", e);
            return;
        }
        if let Err(e) = stdin.shutdown().await {
            tracing::debug!("Failed to close assistant stdin: {}", e);
        }
    }))
}

/// Collects stderr in the background so the child never blocks on a full pipe.
fn spawn_stderr_drain(child: &mut Child) -> Option<JoinHandle<String>> {
    let mut stderr = child.stderr.take()?;
    Some(tokio::spawn(async move {
        let mut buf = Vec::new();
        if let Err(e) = stderr.read_to_end(&mut buf).await {
            tracing::debug!("Failed to read assistant stderr: {}", e);
        }
        String::from_utf8_lossy(&buf).trim().to_string()
    }))
}
