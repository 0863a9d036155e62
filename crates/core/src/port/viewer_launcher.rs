// Viewer Launcher Port
// Starts the live viewer as an independent, fire-and-forget process

use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::domain::{ready_marker_path, LogSession, RunId};

#[derive(Error, Debug)]
pub enum LaunchError {
    #[error("Viewer spawn failed: {0}")]
    SpawnFailed(String),

    #[error("Viewer disabled: {0}")]
    Unavailable(String),
}

/// Everything a viewer needs to follow one run; the log file carries the rest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerRequest {
    pub command: String,
    pub log_path: PathBuf,
    pub skip_offset: u64,
    /// Only sentinels tagged with this run end the viewer (any sentinel when `None`)
    pub run_id: Option<RunId>,
    /// Where to signal readiness, when the orchestrator waits for it
    pub ready_marker: Option<PathBuf>,
}

impl ViewerRequest {
    pub fn for_session(session: &LogSession, handshake: bool) -> Self {
        Self {
            command: session.command.clone(),
            log_path: session.path.clone(),
            skip_offset: session.skip_offset,
            run_id: Some(session.run_id.clone()),
            ready_marker: handshake.then(|| ready_marker_path(&session.path, &session.run_id)),
        }
    }
}

#[async_trait]
pub trait ViewerLauncher: Send + Sync {
    /// Spawn the viewer without waiting for it
    fn launch(&self, request: &ViewerRequest) -> Result<(), LaunchError>;

    /// Wait up to `timeout` for the viewer's readiness signal; true when seen
    async fn wait_ready(&self, request: &ViewerRequest, timeout: Duration) -> bool;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Records launches; readiness and failure are scripted
    #[derive(Clone)]
    pub struct RecordingLauncher {
        launched: Arc<Mutex<Vec<ViewerRequest>>>,
        fail: Option<String>,
        ready: bool,
    }

    impl RecordingLauncher {
        pub fn ready() -> Self {
            Self {
                launched: Arc::new(Mutex::new(Vec::new())),
                fail: None,
                ready: true,
            }
        }

        pub fn never_ready() -> Self {
            Self {
                ready: false,
                ..Self::ready()
            }
        }

        pub fn failing(message: impl Into<String>) -> Self {
            Self {
                fail: Some(message.into()),
                ..Self::ready()
            }
        }

        pub fn launched(&self) -> Vec<ViewerRequest> {
            self.launched.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ViewerLauncher for RecordingLauncher {
        fn launch(&self, request: &ViewerRequest) -> Result<(), LaunchError> {
            if let Some(msg) = &self.fail {
                return Err(LaunchError::SpawnFailed(msg.clone()));
            }
            self.launched.lock().unwrap().push(request.clone());
            Ok(())
        }

        async fn wait_ready(&self, _request: &ViewerRequest, timeout: Duration) -> bool {
            if !self.ready {
                tokio::time::sleep(timeout).await;
            }
            self.ready
        }
    }
}
