//! End-to-end runs: real shell, real log files
#![cfg(unix)]

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use ecco_core::application::{Readiness, RunConfig, RunRequest, RunService, ViewerMode, ViewerStatus};
use ecco_core::domain::TIMEOUT_EXIT_CODE;
use ecco_core::port::id_provider::UuidProvider;
use ecco_core::port::time_provider::SystemTimeProvider;
use ecco_core::port::viewer_launcher::mocks::RecordingLauncher;
use ecco_core::AppError;
use ecco_infra_system::{FileLogStore, Shell, ShellExecutor, ShellExecutorConfig};

fn service(viewer: ViewerMode, timeout: Option<Duration>) -> RunService {
    let time_provider = Arc::new(SystemTimeProvider);
    let executor = ShellExecutor::new(
        ShellExecutorConfig {
            shell: Shell::Sh,
            timeout,
        },
        time_provider.clone(),
    );

    RunService::new(
        RunConfig {
            viewer,
            readiness: Readiness::Handshake {
                timeout: Duration::from_millis(200),
            },
        },
        Arc::new(FileLogStore::new()),
        Arc::new(executor),
        Arc::new(RecordingLauncher::ready()),
        time_provider,
        Arc::new(UuidProvider),
    )
}

fn request(command: &str, log: &std::path::Path) -> RunRequest {
    RunRequest {
        command: command.to_string(),
        log_path: Some(log.to_path_buf()),
        cwd: log.parent().unwrap().to_path_buf(),
    }
}

#[tokio::test]
async fn test_log_layout_for_successful_run() {
    let tmp = tempfile::tempdir().unwrap();
    let log = tmp.path().join("build.log");

    let outcome = service(ViewerMode::Disabled, None)
        .execute(&request("echo compiling; echo linking", &log))
        .await
        .unwrap();

    assert_eq!(outcome.exit_code(), 0);
    assert_eq!(outcome.viewer, ViewerStatus::Disabled);
    assert_eq!(outcome.session.skip_offset, 0);

    let content = fs::read_to_string(&log).unwrap();
    let lines: Vec<&str> = content.lines().collect();

    assert_eq!(lines[0], "=== Executing Command ===");
    assert_eq!(lines[1], "Command: echo compiling; echo linking");
    assert_eq!(lines[2], format!("Log: {}", log.display()));
    assert!(lines[3].starts_with("Started: "));
    assert_eq!(lines[4], "=".repeat(50));
    assert_eq!(lines[5], "");
    assert_eq!(&lines[6..8], &["compiling", "linking"]);
    assert!(content.contains("=== Execution completed ===\n"));
    assert!(content.contains("Exit code: 0\n"));

    let sentinel = format!(
        "[SUCCESS] Command completed successfully. (run {})",
        outcome.session.run_id
    );
    assert_eq!(lines.iter().rev().find(|l| !l.is_empty()), Some(&sentinel.as_str()));
    assert!(content.ends_with('\n'));
}

#[tokio::test]
async fn test_stderr_is_captured_in_order() {
    let tmp = tempfile::tempdir().unwrap();
    let log = tmp.path().join("mixed.log");

    service(ViewerMode::Disabled, None)
        .execute(&request("echo out-1; echo err-1 >&2; echo out-2", &log))
        .await
        .unwrap();

    let content = fs::read_to_string(&log).unwrap();
    let out_1 = content.find("out-1\n").unwrap();
    let err_1 = content.find("err-1\n").unwrap();
    let out_2 = content.find("out-2\n").unwrap();
    assert!(out_1 < err_1 && err_1 < out_2);
}

#[tokio::test]
async fn test_nonzero_exit_is_reported_and_logged() {
    let tmp = tempfile::tempdir().unwrap();
    let log = tmp.path().join("fail.log");

    let outcome = service(ViewerMode::Disabled, None)
        .execute(&request("echo boom >&2; exit 3", &log))
        .await
        .unwrap();

    assert_eq!(outcome.exit_code(), 3);
    let content = fs::read_to_string(&log).unwrap();
    assert!(content.contains("Exit code: 3\n"));
    assert!(content.contains(&format!(
        "[ERROR] Command failed with exit code 3. (run {})\n",
        outcome.session.run_id
    )));
}

#[tokio::test]
async fn test_consecutive_runs_append_and_offsets_grow() {
    let tmp = tempfile::tempdir().unwrap();
    let log = tmp.path().join("shared.log");
    let svc = service(ViewerMode::Enabled, None);

    let first = svc.execute(&request("echo first", &log)).await.unwrap();
    let after_first = fs::read_to_string(&log).unwrap().lines().count() as u64;

    let second = svc.execute(&request("echo second", &log)).await.unwrap();

    assert_eq!(first.session.skip_offset, 0);
    assert_eq!(second.session.skip_offset, after_first);
    assert_eq!(second.viewer, ViewerStatus::Ready);
    assert_ne!(first.session.run_id, second.session.run_id);

    let content = fs::read_to_string(&log).unwrap();
    assert_eq!(content.matches("=== Executing Command ===").count(), 2);
    assert_eq!(content.matches("[SUCCESS]").count(), 2);
}

#[tokio::test]
async fn test_unterminated_existing_log_is_repaired() {
    let tmp = tempfile::tempdir().unwrap();
    let log = tmp.path().join("partial.log");
    fs::write(&log, "line one\nno newline here").unwrap();

    let outcome = service(ViewerMode::Disabled, None)
        .execute(&request("echo fresh", &log))
        .await
        .unwrap();

    assert_eq!(outcome.session.skip_offset, 2);
    let content = fs::read_to_string(&log).unwrap();
    assert!(content.starts_with("line one\nno newline here\n=== Executing Command ===\n"));
}

#[tokio::test]
async fn test_timeout_ends_run_with_timeout_code() {
    let tmp = tempfile::tempdir().unwrap();
    let log = tmp.path().join("hang.log");

    let outcome = service(ViewerMode::Disabled, Some(Duration::from_millis(300)))
        .execute(&request("echo waiting; sleep 30", &log))
        .await
        .unwrap();

    assert_eq!(outcome.exit_code(), TIMEOUT_EXIT_CODE);
    assert!(outcome.result.timed_out_after.is_some());

    let content = fs::read_to_string(&log).unwrap();
    assert!(content.contains("waiting\n"));
    assert!(content.contains("[ERROR] Command failed with exit code 124."));
}

#[tokio::test]
async fn test_unusable_log_location_fails_before_running() {
    let tmp = tempfile::tempdir().unwrap();
    let blocker = tmp.path().join("not-a-dir");
    fs::write(&blocker, "file").unwrap();
    let marker = tmp.path().join("ran");

    let err = service(ViewerMode::Disabled, None)
        .execute(&request(
            &format!("touch {}", marker.display()),
            &blocker.join("run.log"),
        ))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Sink(_)));
    assert!(!marker.exists());
}
