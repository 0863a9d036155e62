// Log Sink Port - single writer of a run's log

use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::domain::log_format::{footer_lines, header_lines};
use crate::domain::{CommandResult, RunId};

/// Log file errors (all fatal to the run)
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Cannot create log directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot open log file {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot read existing log {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot write log file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Append-only writer bound to one log file for a run's lifetime
///
/// Implementations must make every appended line visible to concurrent
/// readers as a whole line before `append_line` returns.
pub trait LogSink: Send {
    /// Append one line (the newline is added by the sink)
    fn append_line(&mut self, text: &str) -> Result<(), SinkError>;

    /// Header block, written once before execution begins
    fn write_header(
        &mut self,
        command: &str,
        path: &Path,
        started: &DateTime<Local>,
    ) -> Result<(), SinkError> {
        for line in header_lines(command, path, started) {
            self.append_line(&line)?;
        }
        Ok(())
    }

    /// Footer block plus exactly one sentinel line
    fn write_footer(&mut self, result: &CommandResult, run_id: &RunId) -> Result<(), SinkError> {
        for line in footer_lines(result, run_id) {
            self.append_line(&line)?;
        }
        Ok(())
    }
}

/// Filesystem side of a log session
pub trait LogStore: Send + Sync {
    /// Ensure the parent directory exists and count lines already in the file.
    ///
    /// Returns 0 for a missing file. An existing file whose last line is not
    /// newline-terminated is terminated so the next run starts on a fresh line.
    fn prepare(&self, path: &Path) -> Result<u64, SinkError>;

    /// Open the append-only sink for this run
    fn open_sink(&self, path: &Path) -> Result<Box<dyn LogSink>, SinkError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    /// In-memory sink sharing its lines with the test
    #[derive(Clone, Default)]
    pub struct MemorySink {
        lines: Arc<Mutex<Vec<String>>>,
        fail_after: Option<usize>,
    }

    impl MemorySink {
        pub fn new() -> Self {
            Self::default()
        }

        /// Sink that errors once `count` lines have been written
        pub fn failing_after(count: usize) -> Self {
            Self {
                fail_after: Some(count),
                ..Self::default()
            }
        }

        pub fn lines(&self) -> Vec<String> {
            self.lines.lock().unwrap().clone()
        }
    }

    impl LogSink for MemorySink {
        fn append_line(&mut self, text: &str) -> Result<(), SinkError> {
            let mut lines = self.lines.lock().unwrap();
            if self.fail_after.is_some_and(|limit| lines.len() >= limit) {
                return Err(SinkError::Write {
                    path: PathBuf::from("memory"),
                    source: std::io::Error::other("disk full"),
                });
            }
            lines.push(text.to_string());
            Ok(())
        }
    }

    /// In-memory store: one [`MemorySink`] per path, pre-seeded line counts
    #[derive(Default)]
    pub struct MemoryLogStore {
        sinks: Mutex<HashMap<PathBuf, MemorySink>>,
        existing: Mutex<HashMap<PathBuf, u64>>,
    }

    impl MemoryLogStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_existing(self, path: impl Into<PathBuf>, lines: u64) -> Self {
            self.existing.lock().unwrap().insert(path.into(), lines);
            self
        }

        pub fn lines(&self, path: &Path) -> Vec<String> {
            self.sinks
                .lock()
                .unwrap()
                .get(path)
                .map(|s| s.lines())
                .unwrap_or_default()
        }
    }

    impl LogStore for MemoryLogStore {
        fn prepare(&self, path: &Path) -> Result<u64, SinkError> {
            let existing = self.existing.lock().unwrap().get(path).copied();
            Ok(existing.unwrap_or_else(|| self.lines(path).len() as u64))
        }

        fn open_sink(&self, path: &Path) -> Result<Box<dyn LogSink>, SinkError> {
            let sink = self
                .sinks
                .lock()
                .unwrap()
                .entry(path.to_path_buf())
                .or_default()
                .clone();
            Ok(Box::new(sink))
        }
    }
}
