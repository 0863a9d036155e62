// Ecco Infrastructure - System Adapters
// Implements: TaskExecutor, LogStore/LogSink, LogFollower, ViewerLauncher, ReadySignal

pub mod file_log;
pub mod log_follower;
pub mod shell_executor;
pub mod viewer_process;

pub use file_log::{FileLogSink, FileLogStore};
pub use log_follower::FileFollower;
pub use shell_executor::{Shell, ShellExecutor, ShellExecutorConfig};
pub use viewer_process::{MarkerFileSignal, ProcessViewerLauncher, VIEWER_SUBCOMMAND};
