// Port Layer - Interfaces for external dependencies

pub mod id_provider; // For deterministic testing
pub mod log_sink;
pub mod task_executor;
pub mod time_provider;
pub mod viewer_io;
pub mod viewer_launcher;

// Re-exports
pub use id_provider::IdProvider;
pub use log_sink::{LogSink, LogStore, SinkError};
pub use task_executor::{ExecutionError, TaskExecutor};
pub use time_provider::TimeProvider;
pub use viewer_io::{LogFollower, ReadySignal, ViewerConsole};
pub use viewer_launcher::{LaunchError, ViewerLauncher, ViewerRequest};
