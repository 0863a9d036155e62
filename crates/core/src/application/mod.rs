// Application Layer - Use Cases

pub mod constants;
pub mod run;
pub mod viewer;

// Re-exports
pub use run::{Readiness, RunConfig, RunOutcome, RunRequest, RunService, ViewerMode, ViewerStatus};
pub use viewer::{Viewer, ViewerConfig, ViewerReport, ViewerState};
