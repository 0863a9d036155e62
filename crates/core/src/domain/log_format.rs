// Log file layout: header block, footer block, timestamps

use chrono::{DateTime, Local};
use std::path::Path;

use super::result::CommandResult;
use super::session::RunId;

/// Timestamp layout used in headers, footers and synthesized file names
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Width of the `=` delimiter lines
pub const DELIMITER_WIDTH: usize = 50;

pub const HEADER_TITLE: &str = "=== Executing Command ===";
pub const FOOTER_TITLE: &str = "=== Execution completed ===";

pub fn format_timestamp(at: &DateTime<Local>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

pub fn delimiter() -> String {
    "=".repeat(DELIMITER_WIDTH)
}

/// Header block written once before execution starts
pub fn header_lines(command: &str, path: &Path, started: &DateTime<Local>) -> Vec<String> {
    vec![
        HEADER_TITLE.to_string(),
        format!("Command: {}", command),
        format!("Log: {}", path.display()),
        format!("Started: {}", format_timestamp(started)),
        delimiter(),
        String::new(),
    ]
}

/// Footer block followed by the single sentinel line (always last)
pub fn footer_lines(result: &CommandResult, run_id: &RunId) -> Vec<String> {
    let mut lines = vec![
        String::new(),
        String::new(),
        delimiter(),
        FOOTER_TITLE.to_string(),
        format!("Ended: {}", format_timestamp(&result.ended_at)),
    ];

    if let Some(limit) = result.timed_out_after {
        lines.push(format!("Timed out: after {}s", limit.as_secs()));
    }

    lines.push(format!("Exit code: {}", result.exit_code));
    lines.push(delimiter());
    lines.push(String::new());
    lines.push(result.sentinel().render(run_id));
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Sentinel;
    use chrono::TimeZone;
    use std::time::Duration;

    fn at() -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap()
    }

    #[test]
    fn test_header_shape() {
        let lines = header_lines("echo hi", Path::new("/tmp/a.log"), &at());
        assert_eq!(
            lines,
            vec![
                "=== Executing Command ===",
                "Command: echo hi",
                "Log: /tmp/a.log",
                "Started: 20250102_030405",
                "==================================================",
                "",
            ]
        );
    }

    #[test]
    fn test_footer_ends_with_single_sentinel() {
        let result = CommandResult::new(7, at());
        let run_id = RunId::new("abcd1234");
        let lines = footer_lines(&result, &run_id);

        assert!(lines.contains(&"Exit code: 7".to_string()));
        assert!(lines.contains(&"Ended: 20250102_030405".to_string()));

        let sentinels: Vec<_> = lines
            .iter()
            .filter_map(|l| Sentinel::parse(l))
            .collect();
        assert_eq!(sentinels.len(), 1);
        assert_eq!(
            Sentinel::parse(lines.last().unwrap()).map(|p| p.sentinel),
            Some(Sentinel::Error { exit_code: 7 })
        );
    }

    #[test]
    fn test_footer_reports_timeout() {
        let result = CommandResult::timed_out(at(), Duration::from_secs(30));
        let lines = footer_lines(&result, &RunId::new("r"));
        assert!(lines.contains(&"Timed out: after 30s".to_string()));
        assert!(lines.contains(&"Exit code: 124".to_string()));
    }
}
