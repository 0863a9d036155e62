// Shell executor implementation
// reason: async-trait, tokio for async process management; os_pipe merges stdout/stderr
use async_trait::async_trait;
use std::io::{BufRead, BufReader};
use std::process::{ExitStatus, Stdio};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use ecco_core::application::constants::{GRACEFUL_SHUTDOWN_TIMEOUT, KILL_POLL_INTERVAL};
use ecco_core::domain::CommandResult;
use ecco_core::port::{ExecutionError, LogSink, TaskExecutor, TimeProvider};

use crate::log_follower::decode_line;

/// Interpreter the command text is handed to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shell {
    Sh,
    Bash,
    /// Windows PowerShell, profile skipped, execution policy bypassed
    PowerShell,
    /// PowerShell 7+
    Pwsh,
    Cmd,
    /// Any other interpreter: `program args... <command>`
    Custom { program: String, args: Vec<String> },
}

impl Shell {
    pub fn platform_default() -> Self {
        if cfg!(windows) {
            Shell::PowerShell
        } else {
            Shell::Sh
        }
    }

    pub fn program(&self) -> &str {
        match self {
            Shell::Sh => "sh",
            Shell::Bash => "bash",
            Shell::PowerShell => "powershell.exe",
            Shell::Pwsh => "pwsh",
            Shell::Cmd => "cmd.exe",
            Shell::Custom { program, .. } => program,
        }
    }

    /// Arguments preceding the command text (non-interactive, no policy prompts)
    pub fn args(&self) -> Vec<String> {
        let args: &[&str] = match self {
            Shell::Sh | Shell::Bash => &["-c"],
            Shell::PowerShell | Shell::Pwsh => &[
                "-NoProfile",
                "-NonInteractive",
                "-ExecutionPolicy",
                "Bypass",
                "-Command",
            ],
            Shell::Cmd => &["/D", "/S", "/C"],
            Shell::Custom { args, .. } => return args.clone(),
        };
        args.iter().map(|a| a.to_string()).collect()
    }
}

impl FromStr for Shell {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| "shell must not be empty".to_string())?;
        let rest: Vec<String> = parts.map(|p| p.to_string()).collect();

        if !rest.is_empty() {
            return Ok(Shell::Custom {
                program: program.to_string(),
                args: rest,
            });
        }

        Ok(match program.to_ascii_lowercase().as_str() {
            "sh" => Shell::Sh,
            "bash" => Shell::Bash,
            "powershell" | "powershell.exe" => Shell::PowerShell,
            "pwsh" => Shell::Pwsh,
            "cmd" | "cmd.exe" => Shell::Cmd,
            _ => Shell::Custom {
                program: program.to_string(),
                args: vec!["-c".to_string()],
            },
        })
    }
}

/// Executor configuration
#[derive(Debug, Clone)]
pub struct ShellExecutorConfig {
    pub shell: Shell,
    /// No limit when `None`: a hung command blocks the run
    pub timeout: Option<Duration>,
}

impl Default for ShellExecutorConfig {
    fn default() -> Self {
        Self {
            shell: Shell::platform_default(),
            timeout: None,
        }
    }
}

/// Shell executor
/// Runs the command under the configured shell and streams its merged output
pub struct ShellExecutor {
    config: ShellExecutorConfig,
    time_provider: Arc<dyn TimeProvider>,
}

impl ShellExecutor {
    /// Create a new shell executor
    ///
    /// # Example
    /// ```ignore
    /// let executor = ShellExecutor::new(
    ///     ShellExecutorConfig::default(),
    ///     Arc::new(SystemTimeProvider),
    /// );
    /// ```
    pub fn new(config: ShellExecutorConfig, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            config,
            time_provider,
        }
    }

    fn build_command(&self, command: &str) -> Command {
        let mut cmd = Command::new(self.config.shell.program());
        cmd.args(self.config.shell.args())
            .arg(command)
            .stdin(Stdio::null());

        // Own process group so a timeout can take down the whole tree.
        // Only then: otherwise Ctrl+C at the terminal still reaches the command.
        #[cfg(unix)]
        if self.config.timeout.is_some() {
            cmd.process_group(0);
        }

        cmd
    }

    /// Spawn the child with stdout and stderr on one pipe
    fn spawn(&self, command: &str) -> Result<(Child, os_pipe::PipeReader), ExecutionError> {
        let (reader, writer) =
            os_pipe::pipe().map_err(|e| ExecutionError::IoError(e.to_string()))?;
        let writer_err = writer
            .try_clone()
            .map_err(|e| ExecutionError::IoError(e.to_string()))?;

        let mut cmd = self.build_command(command);
        cmd.stdout(writer).stderr(writer_err);

        let child = cmd.spawn().map_err(|e| {
            ExecutionError::SpawnFailed(format!("{}: {}", self.config.shell.program(), e))
        })?;

        // The command still holds our copies of the write end; the reader
        // only sees EOF once they are gone.
        drop(cmd);

        Ok((child, reader))
    }

    /// Forward lines to the sink until every writer has closed the pipe
    async fn stream_output(
        &self,
        child: &mut Child,
        reader: os_pipe::PipeReader,
        sink: &mut dyn LogSink,
    ) -> Result<bool, ExecutionError> {
        let mut lines = spawn_line_reader(reader);
        let deadline = self.config.timeout.map(|limit| Instant::now() + limit);
        let mut timed_out = false;

        loop {
            tokio::select! {
                line = lines.recv() => match line {
                    Some(line) => {
                        if let Err(e) = sink.append_line(&line) {
                            warn!(error = %e, pid = ?child.id(), "Log write failed, killing command");
                            self.abort(child).await;
                            return Err(e.into());
                        }
                    }
                    None => break,
                },
                _ = wait_until(deadline), if !timed_out => {
                    timed_out = true;
                    warn!(
                        pid = ?child.id(),
                        timeout_secs = ?self.config.timeout.map(|t| t.as_secs()),
                        "Command exceeded its timeout, terminating"
                    );
                    self.kill_graceful(child).await?;
                }
            }
        }

        Ok(timed_out)
    }

    /// Kill without grace and reap; the run is already failing
    async fn abort(&self, child: &mut Child) {
        #[cfg(unix)]
        if self.config.timeout.is_some() {
            if let Some(pid) = child.id() {
                use nix::sys::signal::{killpg, Signal};
                use nix::unistd::Pid;
                let _ = killpg(Pid::from_raw(pid as i32), Signal::SIGKILL);
            }
        }

        #[cfg(windows)]
        if let Some(pid) = child.id() {
            let _ = taskkill_tree(pid).await;
        }

        if let Err(e) = child.start_kill() {
            debug!(error = %e, "Command already gone");
        }
        if let Err(e) = child.wait().await {
            debug!(error = %e, "Could not reap command");
        }
    }

    /// SIGTERM to the process group, SIGKILL if it is still alive after the grace period
    async fn kill_graceful(&self, child: &mut Child) -> Result<(), ExecutionError> {
        #[cfg(unix)]
        {
            use nix::sys::signal::{killpg, Signal};
            use nix::unistd::Pid;

            let Some(pid) = child.id() else {
                // Already reaped
                return Ok(());
            };
            let pgid = Pid::from_raw(pid as i32);

            info!(pid = %pid, "Sending SIGTERM to command process group");
            killpg(pgid, Signal::SIGTERM)
                .map_err(|e| ExecutionError::Killed(format!("SIGTERM failed: {}", e)))?;

            let start = Instant::now();
            loop {
                tokio::time::sleep(KILL_POLL_INTERVAL).await;

                if let Ok(Some(_)) = child.try_wait() {
                    info!(pid = %pid, "Command exited after SIGTERM");
                    // Stragglers in the group may still hold the pipe open
                    let _ = killpg(pgid, Signal::SIGKILL);
                    return Ok(());
                }

                if start.elapsed() > GRACEFUL_SHUTDOWN_TIMEOUT {
                    warn!(pid = %pid, "Command ignored SIGTERM, sending SIGKILL");
                    killpg(pgid, Signal::SIGKILL)
                        .map_err(|e| ExecutionError::Killed(format!("SIGKILL failed: {}", e)))?;
                    return Ok(());
                }
            }
        }

        #[cfg(windows)]
        {
            // The whole tree: grandchildren hold the merged pipe open
            let Some(pid) = child.id() else {
                return Ok(());
            };
            info!(pid = %pid, "Killing command process tree");
            taskkill_tree(pid).await
        }

        #[cfg(not(any(unix, windows)))]
        {
            info!(pid = ?child.id(), "Killing command process");
            child
                .start_kill()
                .map_err(|e| ExecutionError::Killed(e.to_string()))
        }
    }
}

#[async_trait]
impl TaskExecutor for ShellExecutor {
    async fn execute(
        &self,
        command: &str,
        sink: &mut dyn LogSink,
    ) -> Result<CommandResult, ExecutionError> {
        info!(
            shell = %self.config.shell.program(),
            command = %command,
            timeout_secs = ?self.config.timeout.map(|t| t.as_secs()),
            "Starting shell execution"
        );

        let (mut child, reader) = self.spawn(command)?;
        let timed_out = self.stream_output(&mut child, reader, sink).await?;

        let status = child
            .wait()
            .await
            .map_err(|e| ExecutionError::IoError(e.to_string()))?;
        let ended_at = self.time_provider.now();

        let result = match self.config.timeout {
            Some(limit) if timed_out => CommandResult::timed_out(ended_at, limit),
            _ => CommandResult::new(exit_code(&status), ended_at),
        };

        info!(
            exit_code = result.exit_code,
            timed_out,
            "Shell execution completed"
        );

        Ok(result)
    }
}

/// `taskkill /T /F` on `pid` and everything it started
#[cfg(windows)]
async fn taskkill_tree(pid: u32) -> Result<(), ExecutionError> {
    let pid = pid.to_string();
    let output = Command::new("taskkill")
        .args(["/T", "/F", "/PID", pid.as_str()])
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| ExecutionError::Killed(e.to_string()))?;

    if !output.status.success() {
        return Err(ExecutionError::Killed(format!(
            "taskkill failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    Ok(())
}

/// Read the merged pipe on a blocking thread, one message per line
fn spawn_line_reader(reader: os_pipe::PipeReader) -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::task::spawn_blocking(move || {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) => break,
                Ok(_) => {
                    if tx.send(decode_line(&buf)).is_err() {
                        break;
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    warn!(error = %e, "Error reading command output");
                    break;
                }
            }
        }
    });

    rx
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Exit code of the child; on Unix a signal death maps to 128 + signal
fn exit_code(status: &ExitStatus) -> i32 {
    match status.code() {
        Some(code) => code,
        None => signal_exit_code(status),
    }
}

#[cfg(unix)]
fn signal_exit_code(status: &ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status.signal().map(|sig| 128 + sig).unwrap_or(-1)
}

#[cfg(not(unix))]
fn signal_exit_code(_status: &ExitStatus) -> i32 {
    -1
}
