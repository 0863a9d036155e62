// Viewer-side ports: follow the log, render to a console, signal readiness

use async_trait::async_trait;
use std::path::Path;

use crate::domain::Sentinel;

/// Sequential reader of an append-only log
#[async_trait]
pub trait LogFollower: Send {
    /// Wait for the next complete line, in file order, without its line ending
    async fn next_line(&mut self) -> std::io::Result<String>;
}

/// Where the viewer renders what it follows
pub trait ViewerConsole: Send {
    fn banner(&mut self, command: &str, log_path: &Path);
    fn line(&mut self, text: &str);
    fn completed(&mut self, sentinel: &Sentinel);
    /// One countdown tick, `remaining` down to 1
    fn countdown(&mut self, remaining: u32);
}

/// Tells the orchestrator the viewer is positioned and following
pub trait ReadySignal: Send {
    fn signal_ready(&mut self) -> std::io::Result<()>;

    /// Withdraw the signal once the run is over; a no-op if it was already consumed
    fn clear(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Follower over a fixed list of lines; EOF afterwards
    pub struct ScriptedFollower {
        lines: VecDeque<String>,
    }

    impl ScriptedFollower {
        pub fn new(lines: &[&str]) -> Self {
            Self {
                lines: lines.iter().map(|l| l.to_string()).collect(),
            }
        }
    }

    #[async_trait]
    impl LogFollower for ScriptedFollower {
        async fn next_line(&mut self) -> std::io::Result<String> {
            self.lines
                .pop_front()
                .ok_or_else(|| std::io::Error::from(std::io::ErrorKind::UnexpectedEof))
        }
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum ConsoleEvent {
        Banner(String),
        Line(String),
        Completed(Sentinel),
        Countdown(u32),
    }

    /// Console that records what it was asked to print
    #[derive(Clone, Default)]
    pub struct RecordingConsole {
        events: Arc<Mutex<Vec<ConsoleEvent>>>,
    }

    impl RecordingConsole {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn events(&self) -> Vec<ConsoleEvent> {
            self.events.lock().unwrap().clone()
        }

        /// Followed lines only
        pub fn lines(&self) -> Vec<String> {
            self.events()
                .into_iter()
                .filter_map(|e| match e {
                    ConsoleEvent::Line(l) => Some(l),
                    _ => None,
                })
                .collect()
        }
    }

    impl ViewerConsole for RecordingConsole {
        fn banner(&mut self, command: &str, _log_path: &Path) {
            self.events
                .lock()
                .unwrap()
                .push(ConsoleEvent::Banner(command.to_string()));
        }

        fn line(&mut self, text: &str) {
            self.events
                .lock()
                .unwrap()
                .push(ConsoleEvent::Line(text.to_string()));
        }

        fn completed(&mut self, sentinel: &Sentinel) {
            self.events
                .lock()
                .unwrap()
                .push(ConsoleEvent::Completed(*sentinel));
        }

        fn countdown(&mut self, remaining: u32) {
            self.events
                .lock()
                .unwrap()
                .push(ConsoleEvent::Countdown(remaining));
        }
    }

    /// Counts readiness signals and clears
    #[derive(Clone, Default)]
    pub struct CountingReadySignal {
        count: Arc<Mutex<u32>>,
        cleared: Arc<Mutex<u32>>,
    }

    impl CountingReadySignal {
        pub fn count(&self) -> u32 {
            *self.count.lock().unwrap()
        }

        pub fn cleared(&self) -> u32 {
            *self.cleared.lock().unwrap()
        }
    }

    impl ReadySignal for CountingReadySignal {
        fn signal_ready(&mut self) -> std::io::Result<()> {
            *self.count.lock().unwrap() += 1;
            Ok(())
        }

        fn clear(&mut self) -> std::io::Result<()> {
            *self.cleared.lock().unwrap() += 1;
            Ok(())
        }
    }
}
