// Log Session - log target naming & path resolution (pure, no I/O)

use chrono::{DateTime, Local};
use std::path::{Component, Path, PathBuf};

use super::log_format::format_timestamp;

/// Upper bound for the identifier derived from a command
pub const MAX_COMMAND_NAME_LEN: usize = 30;

/// Identifier used when nothing usable survives sanitization
pub const FALLBACK_COMMAND_NAME: &str = "command";

/// Short per-run token, stamped on the sentinel so a viewer only reacts to its own run
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RunId(String);

impl RunId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where the caller asked the log to go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    /// Exact log file (final segment contains a `.`)
    File(PathBuf),
    /// Directory in which a file name is synthesized
    Directory(PathBuf),
}

impl LogTarget {
    /// Classify a user supplied path: an extension-like marker in the final
    /// segment means "this exact file", anything else is a directory.
    pub fn classify(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let looks_like_file = path
            .file_name()
            .map(|name| name.to_string_lossy().contains('.'))
            .unwrap_or(false);

        if looks_like_file {
            LogTarget::File(path)
        } else {
            LogTarget::Directory(path)
        }
    }

    /// File path for this target (synthesizes `log_<name>_<timestamp>.log` for directories)
    pub fn file_path(&self, command: &str, now: &DateTime<Local>) -> PathBuf {
        match self {
            LogTarget::File(path) => path.clone(),
            LogTarget::Directory(dir) => {
                dir.join(synthesize_file_name(&derive_command_name(command), now))
            }
        }
    }
}

/// Bookkeeping for one run against one log file
#[derive(Debug, Clone)]
pub struct LogSession {
    pub command: String,
    /// Resolved absolute path of the log file
    pub path: PathBuf,
    /// Lines present before this run; captured once, never recomputed
    pub skip_offset: u64,
    pub created_at: DateTime<Local>,
    pub run_id: RunId,
}

impl LogSession {
    pub fn new(
        command: impl Into<String>,
        path: PathBuf,
        skip_offset: u64,
        created_at: DateTime<Local>,
        run_id: RunId,
    ) -> Self {
        Self {
            command: command.into(),
            path,
            skip_offset,
            created_at,
            run_id,
        }
    }

    /// True when this run appends to a log that already had content
    pub fn is_resumed(&self) -> bool {
        self.skip_offset > 0
    }
}

/// Resolve the absolute log file path for `command`.
///
/// `log_path` follows [`LogTarget::classify`]; `None` means the current directory.
/// Relative paths are joined onto `cwd` and normalized lexically.
pub fn resolve_log_path(
    command: &str,
    log_path: Option<&Path>,
    cwd: &Path,
    now: &DateTime<Local>,
) -> PathBuf {
    let target = match log_path {
        Some(path) => LogTarget::classify(path),
        None => LogTarget::Directory(PathBuf::from(".")),
    };

    let file = target.file_path(command, now);
    let absolute = if file.is_absolute() {
        file
    } else {
        cwd.join(file)
    };

    normalize(&absolute)
}

/// Marker file a viewer creates once it is positioned past the skip offset.
///
/// Named after the run so a marker left behind by an earlier run never matches.
pub fn ready_marker_path(log_path: &Path, run_id: &RunId) -> PathBuf {
    let mut name = log_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(format!(".{}.viewer-ready", run_id));
    log_path.with_file_name(name)
}

/// `log_<name>_<YYYYmmdd_HHMMSS>.log`
pub fn synthesize_file_name(command_name: &str, now: &DateTime<Local>) -> String {
    format!("log_{}_{}.log", command_name, format_timestamp(now))
}

/// Derive a short, filesystem-safe identifier from a command string.
///
/// # Example
/// ```text
/// "../bar/foo.ps1 -option1 param1"  -> "foo"
/// "Get-Process | Where CPU -gt 100" -> "Get-Process"
/// ".\\script.ps1"                   -> "script"
/// ```
pub fn derive_command_name(command: &str) -> String {
    let first_token = command
        .trim()
        .split(|c: char| c.is_whitespace() || c == '|' || c == ';')
        .next()
        .unwrap_or_default();

    let base_name = first_token
        .trim_end_matches(['/', '\\'])
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();

    let sanitized: String = strip_extension(base_name)
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .take(MAX_COMMAND_NAME_LEN)
        .collect();

    let trimmed = sanitized.trim_matches('_');
    if trimmed.is_empty() {
        FALLBACK_COMMAND_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Drop the last `.ext`; leading dots (`.bashrc`) and trailing dots are not extensions
fn strip_extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(i) if i > 0 && i < name.len() - 1 => &name[..i],
        _ => name,
    }
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // Never pop past the root
                if !matches!(
                    out.components().next_back(),
                    None | Some(Component::RootDir) | Some(Component::Prefix(_))
                ) {
                    out.pop();
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
