// Run Service - orchestrates one command, one log, one viewer


use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::application::constants::{DEFAULT_READY_TIMEOUT, LEGACY_GRACE_DELAY};
use crate::domain::session::resolve_log_path;
use crate::domain::{CommandResult, DomainError, LogSession};
use crate::error::Result;
use crate::port::{IdProvider, LogStore, TaskExecutor, TimeProvider, ViewerLauncher, ViewerRequest};

/// Whether a live viewer is started for the run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerMode {
    Enabled,
    Disabled,
}

/// How the orchestrator waits for the viewer before starting the command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// Wait for the viewer's marker, at most `timeout`
    Handshake { timeout: Duration },
    /// Sleep a fixed delay and hope the viewer is up
    FixedDelay(Duration),
}

/// Run configuration
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub viewer: ViewerMode,
    pub readiness: Readiness,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            viewer: ViewerMode::Enabled,
            readiness: Readiness::Handshake {
                timeout: DEFAULT_READY_TIMEOUT,
            },
        }
    }
}

impl Readiness {
    /// Legacy fixed delay
    pub fn legacy() -> Self {
        Readiness::FixedDelay(LEGACY_GRACE_DELAY)
    }
}

/// What to run and where to log it
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub command: String,
    /// Exact file (has a `.` in its last segment) or directory; `None` = `cwd`
    pub log_path: Option<PathBuf>,
    pub cwd: PathBuf,
}

/// How the viewer side of a run went (never fatal)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewerStatus {
    Disabled,
    /// Viewer confirmed it is positioned past the skip offset
    Ready,
    /// Viewer did not confirm within the ready timeout
    NotConfirmed,
    /// Fixed delay elapsed; readiness unknown
    Assumed,
    LaunchFailed(String),
}

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub session: LogSession,
    pub result: CommandResult,
    pub viewer: ViewerStatus,
}

impl RunOutcome {
    /// Exit code the tool itself should report
    pub fn exit_code(&self) -> i32 {
        self.result.exit_code
    }
}

/// Orchestrator: resolve, snapshot, header, viewer, execute, footer
pub struct RunService {
    config: RunConfig,
    log_store: Arc<dyn LogStore>,
    task_executor: Arc<dyn TaskExecutor>,
    viewer_launcher: Arc<dyn ViewerLauncher>,
    time_provider: Arc<dyn TimeProvider>,
    id_provider: Arc<dyn IdProvider>,
}

impl RunService {
    pub fn new(
        config: RunConfig,
        log_store: Arc<dyn LogStore>,
        task_executor: Arc<dyn TaskExecutor>,
        viewer_launcher: Arc<dyn ViewerLauncher>,
        time_provider: Arc<dyn TimeProvider>,
        id_provider: Arc<dyn IdProvider>,
    ) -> Self {
        Self {
            config,
            log_store,
            task_executor,
            viewer_launcher,
            time_provider,
            id_provider,
        }
    }

    /// Resolve the log path and snapshot the skip offset.
    ///
    /// The returned session is the only state a viewer needs; nothing is
    /// written to the log yet.
    pub fn prepare(&self, req: &RunRequest) -> Result<LogSession> {
        if req.command.trim().is_empty() {
            return Err(DomainError::EmptyCommand.into());
        }

        let now = self.time_provider.now();
        let path = resolve_log_path(&req.command, req.log_path.as_deref(), &req.cwd, &now);
        let skip_offset = self.log_store.prepare(&path)?;
        let run_id = self.id_provider.generate_run_id();

        info!(
            path = %path.display(),
            skip_offset,
            run_id = %run_id,
            "Log session prepared"
        );

        Ok(LogSession::new(
            req.command.clone(),
            path,
            skip_offset,
            now,
            run_id,
        ))
    }

    /// Write the header, start the viewer, run the command, write footer + sentinel
    pub async fn run(&self, session: &LogSession) -> Result<RunOutcome> {
        let mut sink = self.log_store.open_sink(&session.path)?;
        sink.write_header(&session.command, &session.path, &session.created_at)?;

        let viewer = self.start_viewer(session).await;

        info!(command = %session.command, "Starting command execution");
        let result = self
            .task_executor
            .execute(&session.command, sink.as_mut())
            .await?;

        sink.write_footer(&result, &session.run_id)?;

        info!(
            exit_code = result.exit_code,
            timed_out = result.timed_out_after.is_some(),
            "Command execution completed"
        );

        Ok(RunOutcome {
            session: session.clone(),
            result,
            viewer,
        })
    }

    /// prepare + run
    pub async fn execute(&self, req: &RunRequest) -> Result<RunOutcome> {
        let session = self.prepare(req)?;
        self.run(&session).await
    }

    /// Launch the viewer; failures only degrade the run to "no live view"
    async fn start_viewer(&self, session: &LogSession) -> ViewerStatus {
        if self.config.viewer == ViewerMode::Disabled {
            return ViewerStatus::Disabled;
        }

        let handshake = matches!(self.config.readiness, Readiness::Handshake { .. });
        let request = ViewerRequest::for_session(session, handshake);

        if let Err(e) = self.viewer_launcher.launch(&request) {
            warn!(error = %e, "Viewer could not be started, continuing without live view");
            return ViewerStatus::LaunchFailed(e.to_string());
        }

        match self.config.readiness {
            Readiness::Handshake { timeout } => {
                if self.viewer_launcher.wait_ready(&request, timeout).await {
                    ViewerStatus::Ready
                } else {
                    warn!(
                        timeout_ms = timeout.as_millis() as u64,
                        "Viewer did not confirm readiness, starting anyway"
                    );
                    ViewerStatus::NotConfirmed
                }
            }
            Readiness::FixedDelay(delay) => {
                tokio::time::sleep(delay).await;
                ViewerStatus::Assumed
            }
        }
    }
}
