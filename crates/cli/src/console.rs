//! Terminal rendering for the viewer process

use colored::Colorize;
use std::io::{IsTerminal, Write};
use std::path::Path;
use std::time::Duration;

use ecco_core::domain::Sentinel;
use ecco_core::port::ViewerConsole;

const WINDOW_TITLE: &str = "ECCO Log Viewer";

/// Writes viewer output to stdout.
///
/// Write errors are dropped: a closed terminal must not stop the viewer
/// from reaching its sentinel.
pub struct TerminalConsole {
    close_after: Duration,
}

impl TerminalConsole {
    pub fn new(countdown_ticks: u32, tick: Duration) -> Self {
        Self {
            close_after: tick * countdown_ticks,
        }
    }

    fn emit(&self, text: &str) {
        let mut out = std::io::stdout().lock();
        let _ = out.write_all(text.as_bytes());
        let _ = out.flush();
    }
}

impl ViewerConsole for TerminalConsole {
    fn banner(&mut self, command: &str, log_path: &Path) {
        if std::io::stdout().is_terminal() {
            self.emit(&format!("\x1b]0;{}\x07", WINDOW_TITLE));
        }

        self.emit(&format!(
            "{}\n{} {}\n{} {}\n{}\n\n",
            "=== ECCO LOG VIEWER ===".cyan().bold(),
            "Command:".bold(),
            command,
            "Log file:".bold(),
            log_path.display(),
            "Following new output...".dimmed(),
        ));
    }

    fn line(&mut self, text: &str) {
        self.emit(&format!("{}\n", text));
    }

    fn completed(&mut self, sentinel: &Sentinel) {
        let status = match sentinel {
            Sentinel::Success => "Command execution completed.".green().bold(),
            Sentinel::Error { exit_code } => {
                format!("Command failed with exit code {}.", exit_code).red().bold()
            }
        };
        self.emit(&format!("\n{}\n", status));

        if !self.close_after.is_zero() {
            self.emit(&format!(
                "{}\n",
                format!(
                    "This window will close automatically in {} seconds...",
                    self.close_after.as_secs_f32().ceil() as u64
                )
                .yellow()
            ));
        }
    }

    fn countdown(&mut self, remaining: u32) {
        self.emit(&format!("\rClosing in {}...", remaining));
    }
}
