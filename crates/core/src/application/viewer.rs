// Viewer - follows one run's log until its sentinel, then closes itself
//
// STARTING -> TAILING -> COMPLETED. Reads only; the sentinel line is the
// only signal it reacts to.

use std::time::Duration;
use tracing::{debug, warn};

use crate::application::constants::{COUNTDOWN_TICK, COUNTDOWN_TICKS};
use crate::domain::Sentinel;
use crate::port::{LogFollower, ReadySignal, ViewerConsole, ViewerRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerState {
    Starting,
    Tailing,
    Completed,
}

/// Countdown shown once the run has ended
#[derive(Debug, Clone)]
pub struct ViewerConfig {
    pub countdown_ticks: u32,
    pub tick: Duration,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            countdown_ticks: COUNTDOWN_TICKS,
            tick: COUNTDOWN_TICK,
        }
    }
}

/// What the viewer saw
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerReport {
    /// Lines shown after the skip offset, sentinel included
    pub lines_shown: u64,
    pub sentinel: Sentinel,
}

pub struct Viewer {
    request: ViewerRequest,
    config: ViewerConfig,
    follower: Box<dyn LogFollower>,
    console: Box<dyn ViewerConsole>,
    ready_signal: Option<Box<dyn ReadySignal>>,
    state: ViewerState,
}

impl Viewer {
    pub fn new(
        request: ViewerRequest,
        config: ViewerConfig,
        follower: Box<dyn LogFollower>,
        console: Box<dyn ViewerConsole>,
    ) -> Self {
        Self {
            request,
            config,
            follower,
            console,
            ready_signal: None,
            state: ViewerState::Starting,
        }
    }

    /// Signal readiness through `signal` once positioned past the skip offset
    pub fn with_ready_signal(mut self, signal: Box<dyn ReadySignal>) -> Self {
        self.ready_signal = Some(signal);
        self
    }

    pub fn state(&self) -> ViewerState {
        self.state
    }

    /// Drive the state machine to completion.
    ///
    /// # Errors
    /// Read errors from the follower; the viewer has no other failure mode.
    pub async fn run(&mut self) -> std::io::Result<ViewerReport> {
        self.start().await?;
        let report = self.tail().await?;
        self.complete(&report.sentinel).await;
        Ok(report)
    }

    async fn start(&mut self) -> std::io::Result<()> {
        for _ in 0..self.request.skip_offset {
            self.follower.next_line().await?;
        }

        if let Some(signal) = self.ready_signal.as_mut() {
            if let Err(e) = signal.signal_ready() {
                warn!(error = %e, "Could not signal viewer readiness");
            }
        }

        self.console
            .banner(&self.request.command, &self.request.log_path);
        self.transition(ViewerState::Tailing);
        Ok(())
    }

    async fn tail(&mut self) -> std::io::Result<ViewerReport> {
        let mut lines_shown = 0;
        loop {
            let line = self.follower.next_line().await?;
            self.console.line(&line);
            lines_shown += 1;

            if let Some(sentinel) = self.match_sentinel(&line) {
                self.transition(ViewerState::Completed);
                return Ok(ViewerReport {
                    lines_shown,
                    sentinel,
                });
            }
        }
    }

    async fn complete(&mut self, sentinel: &Sentinel) {
        if let Some(signal) = self.ready_signal.as_mut() {
            if let Err(e) = signal.clear() {
                debug!(error = %e, "Could not clear viewer readiness");
            }
        }

        self.console.completed(sentinel);
        for remaining in (1..=self.config.countdown_ticks).rev() {
            self.console.countdown(remaining);
            tokio::time::sleep(self.config.tick).await;
        }
    }

    fn match_sentinel(&self, line: &str) -> Option<Sentinel> {
        match &self.request.run_id {
            Some(run_id) => Sentinel::parse_for_run(line, run_id),
            None => Sentinel::parse(line).map(|parsed| parsed.sentinel),
        }
    }

    fn transition(&mut self, next: ViewerState) {
        debug!(from = ?self.state, to = ?next, "Viewer state change");
        self.state = next;
    }
}
