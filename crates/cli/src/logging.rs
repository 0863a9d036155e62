//! Tracing subscriber setup
//!
//! Diagnostics go to stderr so they never interleave with the command
//! output echoed on stdout.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset
const DEFAULT_FILTER: &str = "ecco=warn";

/// Initialize logging.
///
/// # Environment Variables
///
/// - `RUST_LOG`: standard `EnvFilter` directives (default: `ecco=warn`)
/// - `ECCO_LOG_FORMAT`: `pretty` (default), `compact` or `json`
pub fn init_logging() {
    let log_format = std::env::var("ECCO_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let registry = tracing_subscriber::registry().with(env_filter);

    // try_init: a subscriber may already be installed
    let _ = match log_format.as_str() {
        "json" => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        "compact" => registry
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .try_init(),
        _ => registry
            .with(fmt::layer().pretty().with_writer(std::io::stderr))
            .try_init(),
    };
}
