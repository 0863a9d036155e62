// Domain Layer - Pure log/run model, no I/O

pub mod error;
pub mod log_format;
pub mod result;
pub mod sentinel;
pub mod session;

// Re-exports
pub use error::DomainError;
pub use result::{CommandResult, TIMEOUT_EXIT_CODE};
pub use sentinel::{ParsedSentinel, Sentinel};
pub use session::{
    derive_command_name, ready_marker_path, resolve_log_path, LogSession, LogTarget, RunId,
};
