//! Binary tests: drive the built `ecco` executable end to end
#![cfg(unix)]

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use std::time::{Duration, Instant};

fn ecco(args: &[&str], cwd: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_ecco"))
        .args(args)
        .current_dir(cwd)
        .env_remove("ECCO_SHELL")
        .env_remove("ECCO_TIMEOUT_SECS")
        .env("RUST_LOG", "off")
        .env("NO_COLOR", "1")
        .output()
        .unwrap()
}

fn last_line(path: &Path) -> String {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .filter(|l| !l.is_empty())
        .last()
        .unwrap_or_default()
        .to_string()
}

#[test]
fn test_success_exit_code_and_sentinel() {
    let tmp = tempfile::tempdir().unwrap();
    let log = tmp.path().join("run.log");

    let out = ecco(
        &["--no-viewer", "echo hello", log.to_str().unwrap()],
        tmp.path(),
    );

    assert_eq!(out.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("Executing command:"));
    assert!(stdout.contains("Completed with exit code:"));

    let content = fs::read_to_string(&log).unwrap();
    assert!(content.starts_with("=== Executing Command ===\n"));
    assert!(content.contains("\nhello\n"));
    assert!(last_line(&log).starts_with("[SUCCESS] Command completed successfully."));
}

#[test]
fn test_failure_exit_code_is_mirrored() {
    let tmp = tempfile::tempdir().unwrap();
    let log = tmp.path().join("fail.log");

    let out = ecco(&["--no-viewer", "exit 7", log.to_str().unwrap()], tmp.path());

    assert_eq!(out.status.code(), Some(7));
    assert!(last_line(&log).starts_with("[ERROR] Command failed with exit code 7."));
    assert!(fs::read_to_string(&log).unwrap().contains("Exit code: 7\n"));
}

#[test]
fn test_directory_target_synthesizes_file_name() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().join("runs");

    let out = ecco(
        &["--no-viewer", "./build.sh --fast || true", dir.to_str().unwrap()],
        tmp.path(),
    );
    assert_eq!(out.status.code(), Some(0));

    let names: Vec<String> = fs::read_dir(&dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names.len(), 1);
    assert!(names[0].starts_with("log_build_"));
    assert!(names[0].ends_with(".log"));
}

#[test]
fn test_default_log_goes_to_cwd() {
    let tmp = tempfile::tempdir().unwrap();

    let out = ecco(&["--no-viewer", "true"], tmp.path());
    assert_eq!(out.status.code(), Some(0));

    let created: Vec<_> = fs::read_dir(tmp.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|n| n.starts_with("log_true_"))
        .collect();
    assert_eq!(created.len(), 1);
}

#[test]
fn test_second_run_reports_existing_lines() {
    let tmp = tempfile::tempdir().unwrap();
    let log = tmp.path().join("again.log");
    let log_arg = log.to_str().unwrap();

    ecco(&["--no-viewer", "echo first", log_arg], tmp.path());
    let before = fs::read_to_string(&log).unwrap().lines().count();

    let out = ecco(&["--no-viewer", "echo second", log_arg], tmp.path());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains(&format!("Appending to existing log ({} existing lines)", before)));

    let content = fs::read_to_string(&log).unwrap();
    assert_eq!(content.matches("=== Executing Command ===").count(), 2);
    assert!(content.find("first").unwrap() < content.find("second").unwrap());
}

#[test]
fn test_missing_command_prints_usage() {
    let tmp = tempfile::tempdir().unwrap();
    let out = ecco(&[], tmp.path());

    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stdout).contains("Usage"));
}

#[test]
fn test_timeout_kills_command() {
    let tmp = tempfile::tempdir().unwrap();
    let log = tmp.path().join("slow.log");

    let out = ecco(
        &[
            "--no-viewer",
            "--timeout-secs",
            "1",
            "echo started; sleep 30",
            log.to_str().unwrap(),
        ],
        tmp.path(),
    );

    assert_eq!(out.status.code(), Some(124));
    let content = fs::read_to_string(&log).unwrap();
    assert!(content.contains("started\n"));
    assert!(content.contains("Timed out: after 1s\n"));
}

#[test]
fn test_viewer_subcommand_shows_only_new_lines() {
    let tmp = tempfile::tempdir().unwrap();
    let log = tmp.path().join("view.log");
    let marker = tmp.path().join("view.log.cafe0001.viewer-ready");
    fs::write(
        &log,
        "old one\nold two\nnew one\n\
         [SUCCESS] Command completed successfully. (run 0ther000)\n\
         new two\n\
         [SUCCESS] Command completed successfully. (run cafe0001)\n\
         after the end\n",
    )
    .unwrap();

    let out = ecco(
        &[
            "__viewer",
            "--log",
            log.to_str().unwrap(),
            "--skip",
            "2",
            "--command",
            "make",
            "--run-id",
            "cafe0001",
            "--ready-marker",
            marker.to_str().unwrap(),
            "--countdown-ticks",
            "0",
        ],
        tmp.path(),
    );

    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("=== ECCO LOG VIEWER ==="));
    assert!(!stdout.contains("old one"));
    assert!(stdout.contains("new one"));
    assert!(stdout.contains("new two"));
    assert!(stdout.contains("Command execution completed."));
    assert!(!stdout.contains("after the end"));
    // Signalled after the skip, withdrawn once the run completed
    assert!(!marker.exists());
}

#[test]
fn test_viewer_enabled_run_with_captured_output() {
    let tmp = tempfile::tempdir().unwrap();
    let log = tmp.path().join("live.log");

    let started = Instant::now();
    let out = ecco(
        &[
            "--ready-timeout-ms",
            "4000",
            "echo hello; exit 3",
            log.to_str().unwrap(),
        ],
        tmp.path(),
    );
    let elapsed = started.elapsed();

    assert_eq!(out.status.code(), Some(3));
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("Log viewer: ready"), "stdout: {}", stdout);
    assert!(stdout.contains("Completed with exit code: 3"));

    // The viewer counts down for seconds; a captured run must not wait for it
    assert!(elapsed < Duration::from_secs(5), "took {:?}", elapsed);
    assert!(!stdout.contains("=== ECCO LOG VIEWER ==="));
    assert!(!stdout.contains("Closing in"));

    let markers: Vec<_> = fs::read_dir(tmp.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|n| n.ends_with(".viewer-ready"))
        .collect();
    assert!(markers.is_empty(), "leftover markers: {:?}", markers);
    assert!(last_line(&log).starts_with("[ERROR] Command failed with exit code 3."));
}
