//! Ecco CLI - run a shell command, log its output, follow the log live
//!
//! Composition root: parses arguments, wires the system adapters into the
//! core services and maps the command's exit code onto the process.

mod console;
mod logging;

use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use colored::Colorize;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use ecco_core::application::constants::{COUNTDOWN_TICK, COUNTDOWN_TICKS, DEFAULT_READY_TIMEOUT};
use ecco_core::application::{
    Readiness, RunConfig, RunRequest, RunService, Viewer, ViewerConfig, ViewerMode, ViewerStatus,
};
use ecco_core::domain::RunId;
use ecco_core::VERSION;
use ecco_core::port::id_provider::UuidProvider;
use ecco_core::port::time_provider::SystemTimeProvider;
use ecco_core::port::ViewerRequest;
use ecco_infra_system::{
    FileFollower, FileLogStore, MarkerFileSignal, ProcessViewerLauncher, Shell, ShellExecutor,
    ShellExecutorConfig,
};

use console::TerminalConsole;

/// Exit code for a usage error (no command given)
const USAGE_EXIT_CODE: i32 = 1;

#[derive(Parser)]
#[command(name = "ecco")]
#[command(about = "Run a shell command, capture its output to a log, and follow the log live")]
#[command(version)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    internal: Option<Internal>,

    #[command(flatten)]
    run: RunArgs,
}

#[derive(Args)]
struct RunArgs {
    /// Command to execute, passed to the shell as a single argument
    command: Option<String>,

    /// Log file (last segment contains a '.') or directory to create one in
    log_path: Option<PathBuf>,

    /// Shell running the command (sh, bash, pwsh, powershell, cmd, or "<program> <args...>")
    #[arg(long, env = "ECCO_SHELL")]
    shell: Option<String>,

    /// Kill the command after this many seconds (exit code 124)
    #[arg(long, env = "ECCO_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,

    /// Run without a live viewer
    #[arg(long, env = "ECCO_NO_VIEWER")]
    no_viewer: bool,

    /// How long to wait for the viewer to confirm it is following
    #[arg(long, env = "ECCO_READY_TIMEOUT_MS", default_value_t = DEFAULT_READY_TIMEOUT.as_millis() as u64)]
    ready_timeout_ms: u64,

    /// Sleep this long after launching the viewer instead of waiting for it
    #[arg(long, env = "ECCO_FIXED_DELAY_MS")]
    fixed_delay_ms: Option<u64>,

    /// Terminal launcher to open the viewer in, e.g. "xterm -e"
    #[arg(long, env = "ECCO_VIEWER_TERMINAL")]
    viewer_terminal: Option<String>,
}

#[derive(Subcommand)]
enum Internal {
    /// Follow a log until its run ends (started by ecco itself)
    #[command(name = "__viewer", hide = true)]
    Viewer(ViewerArgs),
}

#[derive(Args)]
struct ViewerArgs {
    /// Log file to follow
    #[arg(long)]
    log: PathBuf,

    /// Lines already in the log before this run
    #[arg(long, default_value_t = 0)]
    skip: u64,

    /// Command text shown in the banner
    #[arg(long, default_value = "")]
    command: String,

    /// Only react to the sentinel of this run
    #[arg(long)]
    run_id: Option<String>,

    /// File to create once positioned past the skipped lines
    #[arg(long)]
    ready_marker: Option<PathBuf>,

    #[arg(long, default_value_t = COUNTDOWN_TICKS)]
    countdown_ticks: u32,

    #[arg(long, default_value_t = COUNTDOWN_TICK.as_millis() as u64)]
    tick_ms: u64,
}

impl RunArgs {
    fn run_config(&self) -> RunConfig {
        let viewer = if self.no_viewer {
            ViewerMode::Disabled
        } else {
            ViewerMode::Enabled
        };

        let readiness = match self.fixed_delay_ms {
            Some(ms) => Readiness::FixedDelay(Duration::from_millis(ms)),
            None => Readiness::Handshake {
                timeout: Duration::from_millis(self.ready_timeout_ms),
            },
        };

        RunConfig { viewer, readiness }
    }

    fn executor_config(&self) -> Result<ShellExecutorConfig> {
        let shell = match &self.shell {
            Some(name) => name
                .parse::<Shell>()
                .map_err(anyhow::Error::msg)
                .context("Invalid --shell")?,
            None => Shell::platform_default(),
        };

        Ok(ShellExecutorConfig {
            shell,
            timeout: self.timeout_secs.map(Duration::from_secs),
        })
    }

    fn log_path(&self) -> Option<PathBuf> {
        self.log_path.clone().map(expand_tilde)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging();
    debug!("ecco v{} starting", VERSION);

    match cli.internal {
        Some(Internal::Viewer(args)) => run_viewer(args).await,
        None => {
            let code = match cli.run.command.clone() {
                Some(command) => run_command(&cli.run, command).await?,
                None => {
                    Cli::command().print_help()?;
                    USAGE_EXIT_CODE
                }
            };
            std::io::stdout().flush()?;
            std::process::exit(code);
        }
    }
}

async fn run_command(args: &RunArgs, command: String) -> Result<i32> {
    let time_provider = Arc::new(SystemTimeProvider);
    let executor = ShellExecutor::new(args.executor_config()?, time_provider.clone());

    let launcher = ProcessViewerLauncher::current_exe()
        .unwrap_or_else(|e| {
            warn!(error = %e, "Falling back to PATH lookup for the viewer");
            ProcessViewerLauncher::new(env!("CARGO_BIN_NAME"))
        })
        .with_terminal(args.viewer_terminal.as_deref());

    let service = RunService::new(
        args.run_config(),
        Arc::new(FileLogStore::new()),
        Arc::new(executor),
        Arc::new(launcher),
        time_provider,
        Arc::new(UuidProvider),
    );

    let request = RunRequest {
        command,
        log_path: args.log_path(),
        cwd: std::env::current_dir().context("Cannot determine the current directory")?,
    };

    println!("{} {}", "Executing command:".bold(), request.command);
    let session = service
        .prepare(&request)
        .context("Failed to prepare the log file")?;
    println!("{} {}", "Log file:".bold(), session.path.display());
    if session.is_resumed() {
        println!(
            "{}",
            format!(
                "Appending to existing log ({} existing lines)",
                session.skip_offset
            )
            .yellow()
        );
    }

    let outcome = service.run(&session).await.context("Run failed")?;

    print_viewer_status(&outcome.viewer);
    if let Some(limit) = outcome.result.timed_out_after {
        println!(
            "{}",
            format!("Command timed out after {}s", limit.as_secs()).red()
        );
    }

    let code = outcome.exit_code();
    let code_text = if code == 0 {
        code.to_string().green()
    } else {
        code.to_string().red()
    };
    println!("{} {}", "Completed with exit code:".bold(), code_text);

    Ok(code)
}

fn print_viewer_status(status: &ViewerStatus) {
    match status {
        ViewerStatus::Disabled => {}
        ViewerStatus::Ready => println!("{} ready", "Log viewer:".bold()),
        ViewerStatus::Assumed => println!("{} started", "Log viewer:".bold()),
        ViewerStatus::NotConfirmed => println!(
            "{} {}",
            "Log viewer:".bold(),
            "did not confirm in time, early output may have been missed".yellow()
        ),
        ViewerStatus::LaunchFailed(reason) => println!(
            "{} {}",
            "Log viewer:".bold(),
            format!("could not be started ({})", reason).yellow()
        ),
    }
}

async fn run_viewer(args: ViewerArgs) -> Result<()> {
    let config = ViewerConfig {
        countdown_ticks: args.countdown_ticks,
        tick: Duration::from_millis(args.tick_ms),
    };
    let request = ViewerRequest {
        command: args.command,
        log_path: args.log,
        skip_offset: args.skip,
        run_id: args.run_id.map(RunId::new),
        ready_marker: args.ready_marker,
    };

    let follower = FileFollower::new(&request.log_path);
    let console = TerminalConsole::new(config.countdown_ticks, config.tick);
    let marker = request.ready_marker.clone();

    let mut viewer = Viewer::new(request, config, Box::new(follower), Box::new(console));
    if let Some(marker) = marker {
        viewer = viewer.with_ready_signal(Box::new(MarkerFileSignal::new(marker)));
    }

    let report = viewer
        .run()
        .await
        .context("Viewer stopped following the log")?;
    println!();

    info!(
        lines = report.lines_shown,
        sentinel = ?report.sentinel,
        "Viewer closing"
    );
    Ok(())
}

/// Expand a leading `~` in a user supplied path
fn expand_tilde(path: PathBuf) -> PathBuf {
    match path.to_str() {
        Some(s) if s.starts_with('~') => PathBuf::from(shellexpand::tilde(s).into_owned()),
        _ => path,
    }
}
