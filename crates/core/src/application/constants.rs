// Orchestration constants (no magic values in the use cases)
use std::time::Duration;

/// How long the orchestrator waits for the viewer's readiness marker (3s)
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(3);

/// Poll interval while waiting for the readiness marker (50ms)
pub const READY_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Fixed grace delay used when the handshake is turned off (500ms)
pub const LEGACY_GRACE_DELAY: Duration = Duration::from_millis(500);

/// Poll interval of the viewer's follow read (100ms)
pub const TAIL_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Countdown ticks shown before the viewer closes itself
pub const COUNTDOWN_TICKS: u32 = 5;

/// Length of one countdown tick (1s)
pub const COUNTDOWN_TICK: Duration = Duration::from_secs(1);

/// Grace period between SIGTERM and SIGKILL when a command times out (5s)
pub const GRACEFUL_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Poll interval while waiting for a signalled process group to exit (100ms)
pub const KILL_POLL_INTERVAL: Duration = Duration::from_millis(100);
