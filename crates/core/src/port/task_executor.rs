// Task Executor Port
// Abstraction for running the target command and streaming its output

use crate::domain::CommandResult;
use crate::port::log_sink::{LogSink, SinkError};
use async_trait::async_trait;
use thiserror::Error;

/// Execution errors
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Spawn failed: {0}")]
    SpawnFailed(String),

    #[error("Process killed: {0}")]
    Killed(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error(transparent)]
    Sink(#[from] SinkError),
}

/// Task Executor trait
///
/// Implementations:
/// - ShellExecutor: runs the command under a shell interpreter
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    /// Run `command`, forwarding each completed output line to `sink`
    /// as soon as it is read, and return once the child has exited.
    ///
    /// # Errors
    /// - ExecutionError::SpawnFailed if the interpreter cannot be started
    /// - ExecutionError::Sink if a line cannot be written
    async fn execute(
        &self,
        command: &str,
        sink: &mut dyn LogSink,
    ) -> Result<CommandResult, ExecutionError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use chrono::Local;
    use std::sync::{Arc, Mutex};

    /// Mock executor behavior
    #[derive(Debug, Clone)]
    pub enum MockBehavior {
        /// Emit the lines, then exit with the code
        Exit { lines: Vec<String>, exit_code: i32 },
        /// Fail to spawn
        SpawnFail(String),
    }

    /// Mock Task Executor for testing
    pub struct MockTaskExecutor {
        behavior: MockBehavior,
        commands: Arc<Mutex<Vec<String>>>,
    }

    impl MockTaskExecutor {
        pub fn new(behavior: MockBehavior) -> Self {
            Self {
                behavior,
                commands: Arc::new(Mutex::new(Vec::new())),
            }
        }

        pub fn exiting(lines: &[&str], exit_code: i32) -> Self {
            Self::new(MockBehavior::Exit {
                lines: lines.iter().map(|l| l.to_string()).collect(),
                exit_code,
            })
        }

        pub fn new_spawn_fail(message: impl Into<String>) -> Self {
            Self::new(MockBehavior::SpawnFail(message.into()))
        }

        /// Commands received so far
        pub fn commands(&self) -> Vec<String> {
            self.commands.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TaskExecutor for MockTaskExecutor {
        async fn execute(
            &self,
            command: &str,
            sink: &mut dyn LogSink,
        ) -> Result<CommandResult, ExecutionError> {
            self.commands.lock().unwrap().push(command.to_string());

            match &self.behavior {
                MockBehavior::Exit { lines, exit_code } => {
                    for line in lines {
                        sink.append_line(line)?;
                    }
                    Ok(CommandResult::new(*exit_code, Local::now()))
                }
                MockBehavior::SpawnFail(msg) => Err(ExecutionError::SpawnFailed(msg.clone())),
            }
        }
    }
}
