// Viewer process launcher and readiness marker
//
// The viewer runs as `<program> __viewer ...`, detached from the orchestrator.
// The only things shared are the log file and the readiness marker file.

use async_trait::async_trait;
use std::ffi::OsString;
use std::fs::OpenOptions;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

use ecco_core::application::constants::READY_POLL_INTERVAL;
use ecco_core::port::{LaunchError, ReadySignal, ViewerLauncher, ViewerRequest};

/// Hidden subcommand the binary dispatches to the viewer
pub const VIEWER_SUBCOMMAND: &str = "__viewer";

#[cfg(windows)]
const CREATE_NEW_CONSOLE: u32 = 0x0000_0010;

/// Where the viewer's stdio goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ViewerStdio {
    /// Same terminal as the caller
    Inherit,
    /// No stdio, own process group
    Detached,
}

/// Spawns the viewer as a separate process
pub struct ProcessViewerLauncher {
    program: PathBuf,
    /// Terminal launcher prefix, e.g. `["xterm", "-e"]`
    terminal: Vec<String>,
    /// The caller's stdout is an interactive terminal the viewer may draw on
    share_terminal: bool,
}

impl ProcessViewerLauncher {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            terminal: Vec::new(),
            share_terminal: std::io::stdout().is_terminal(),
        }
    }

    /// Launcher re-invoking the running executable
    pub fn current_exe() -> Result<Self, LaunchError> {
        std::env::current_exe()
            .map(Self::new)
            .map_err(|e| LaunchError::Unavailable(format!("cannot locate own executable: {}", e)))
    }

    /// Open the viewer through a terminal launcher (`"xterm -e"`, `"kitty"`, ...)
    pub fn with_terminal(mut self, terminal: Option<&str>) -> Self {
        self.terminal = terminal
            .map(|t| t.split_whitespace().map(|p| p.to_string()).collect())
            .unwrap_or_default();
        self
    }

    /// Override terminal detection; when false the viewer never touches the caller's stdio
    pub fn with_shared_terminal(mut self, share: bool) -> Self {
        self.share_terminal = share;
        self
    }

    /// Captured or redirected output must not receive the viewer's copy of the log
    fn stdio(&self) -> ViewerStdio {
        // Windows viewers always get their own console
        if cfg!(windows) || (self.terminal.is_empty() && self.share_terminal) {
            ViewerStdio::Inherit
        } else {
            ViewerStdio::Detached
        }
    }

    /// Arguments of the viewer entry point for `request`
    pub fn viewer_args(request: &ViewerRequest) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            VIEWER_SUBCOMMAND.into(),
            "--log".into(),
            request.log_path.clone().into(),
            "--skip".into(),
            request.skip_offset.to_string().into(),
            "--command".into(),
            request.command.clone().into(),
        ];
        if let Some(run_id) = &request.run_id {
            args.push("--run-id".into());
            args.push(run_id.as_str().into());
        }
        if let Some(marker) = &request.ready_marker {
            args.push("--ready-marker".into());
            args.push(marker.clone().into());
        }
        args
    }

    fn build_command(&self, request: &ViewerRequest) -> Command {
        let mut cmd = match self.terminal.split_first() {
            Some((launcher, launcher_args)) => {
                let mut cmd = Command::new(launcher);
                cmd.args(launcher_args).arg(&self.program);
                cmd
            }
            None => Command::new(&self.program),
        };
        cmd.args(Self::viewer_args(request)).stdin(Stdio::null());

        if self.stdio() == ViewerStdio::Detached {
            cmd.stdout(Stdio::null()).stderr(Stdio::null());

            #[cfg(unix)]
            {
                use std::os::unix::process::CommandExt;
                cmd.process_group(0);
            }
        }

        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            cmd.creation_flags(CREATE_NEW_CONSOLE);
        }

        cmd
    }
}

#[async_trait]
impl ViewerLauncher for ProcessViewerLauncher {
    fn launch(&self, request: &ViewerRequest) -> Result<(), LaunchError> {
        // Fire and forget: the child handle is dropped, never waited on
        let child = self
            .build_command(request)
            .spawn()
            .map_err(|e| LaunchError::SpawnFailed(e.to_string()))?;

        info!(
            pid = child.id(),
            log = %request.log_path.display(),
            skip_offset = request.skip_offset,
            detached = self.stdio() == ViewerStdio::Detached,
            "Viewer process started"
        );
        Ok(())
    }

    async fn wait_ready(&self, request: &ViewerRequest, timeout: Duration) -> bool {
        let Some(marker) = &request.ready_marker else {
            return false;
        };

        let deadline = Instant::now() + timeout;
        loop {
            if marker.exists() {
                if let Err(e) = std::fs::remove_file(marker) {
                    debug!(error = %e, marker = %marker.display(), "Could not remove readiness marker");
                }
                return true;
            }
            if Instant::now() >= deadline {
                // A viewer that signals later clears its own marker on completion
                if let Err(e) = std::fs::remove_file(marker) {
                    debug!(error = %e, marker = %marker.display(), "No readiness marker to remove");
                }
                return false;
            }
            tokio::time::sleep(READY_POLL_INTERVAL).await;
        }
    }
}

/// Viewer side of the handshake: create the marker file
pub struct MarkerFileSignal {
    path: PathBuf,
}

impl MarkerFileSignal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ReadySignal for MarkerFileSignal {
    fn signal_ready(&mut self) -> std::io::Result<()> {
        OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .open(&self.path)
            .map(|_| ())
    }

    fn clear(&mut self) -> std::io::Result<()> {
        match std::fs::remove_file(&self.path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}
