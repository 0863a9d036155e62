// Command Result - produced once when the child terminates

use chrono::{DateTime, Local};
use std::time::Duration;

use super::sentinel::Sentinel;

/// Exit code reported for a command stopped by the configured timeout
pub const TIMEOUT_EXIT_CODE: i32 = 124;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    pub exit_code: i32,
    pub ended_at: DateTime<Local>,
    /// Set when the run was cut short by the timeout
    pub timed_out_after: Option<Duration>,
}

impl CommandResult {
    pub fn new(exit_code: i32, ended_at: DateTime<Local>) -> Self {
        Self {
            exit_code,
            ended_at,
            timed_out_after: None,
        }
    }

    pub fn timed_out(ended_at: DateTime<Local>, limit: Duration) -> Self {
        Self {
            exit_code: TIMEOUT_EXIT_CODE,
            ended_at,
            timed_out_after: Some(limit),
        }
    }

    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }

    pub fn sentinel(&self) -> Sentinel {
        Sentinel::from_exit_code(self.exit_code)
    }
}
