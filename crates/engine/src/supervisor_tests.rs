// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn log_path(dir: &tempfile::TempDir, name: &str) -> std::path::PathBuf {
    dir.path().join("logs").join(format!("{name}.log"))
}

#[tokio::test]
async fn echo_exits_zero_and_logs() {
    let dir = tempfile::tempdir().unwrap();
    let log = log_path(&dir, "echo");

    let child = spawn("echo hello", dir.path(), &[], &log).unwrap();
    assert!(log.exists(), "log file must exist before the child runs");

    let code = child.wait().await.unwrap();
    assert_eq!(code, 0);
    assert_eq!(std::fs::read_to_string(&log).unwrap(), "hello\n");
}

#[tokio::test]
async fn nonzero_exit_code_is_preserved() {
    let dir = tempfile::tempdir().unwrap();
    let log = log_path(&dir, "fail");

    let child = spawn("exit 7", dir.path(), &[], &log).unwrap();
    assert_eq!(child.wait().await.unwrap(), 7);
}

#[tokio::test]
async fn stdout_and_stderr_are_merged() {
    let dir = tempfile::tempdir().unwrap();
    let log = log_path(&dir, "merged");

    let child = spawn("echo out; echo err >&2; echo tail", dir.path(), &[], &log).unwrap();
    child.wait().await.unwrap();

    let content = std::fs::read_to_string(&log).unwrap();
    assert!(content.contains("out\n"));
    assert!(content.contains("err\n"));
    assert!(content.contains("tail\n"));
}

#[tokio::test]
async fn env_overrides_reach_the_child_only() {
    let dir = tempfile::tempdir().unwrap();
    let log = log_path(&dir, "env");

    let env = vec![("TF_SUPERVISOR_TEST_VAR".to_string(), "injected".to_string())];
    let child = spawn("echo \"$TF_SUPERVISOR_TEST_VAR\"", dir.path(), &env, &log).unwrap();
    child.wait().await.unwrap();

    assert_eq!(std::fs::read_to_string(&log).unwrap(), "injected\n");
    // The supervisor's own environment was never touched.
    assert!(std::env::var("TF_SUPERVISOR_TEST_VAR").is_err());
}

#[tokio::test]
async fn runs_in_the_given_working_directory() {
    let dir = tempfile::tempdir().unwrap();
    let log = log_path(&dir, "cwd");

    let child = spawn("pwd", dir.path(), &[], &log).unwrap();
    child.wait().await.unwrap();

    let reported = std::fs::read_to_string(&log).unwrap();
    let expected = dir.path().canonicalize().unwrap();
    assert_eq!(
        std::path::Path::new(reported.trim()).canonicalize().unwrap(),
        expected
    );
}

#[cfg(unix)]
#[tokio::test]
async fn sigterm_surfaces_as_signal_exit_code() {
    let dir = tempfile::tempdir().unwrap();
    let log = log_path(&dir, "term");

    let child = spawn("sleep 30", dir.path(), &[], &log).unwrap();
    let pid = child.pid();
    assert!(pid_alive(pid));

    terminate_group(pid);
    let code = child.wait().await.unwrap();
    assert_eq!(code, 128 + libc::SIGTERM);
}

#[cfg(unix)]
#[tokio::test]
async fn kill_reaches_grandchildren_in_the_group() {
    let dir = tempfile::tempdir().unwrap();
    let log = log_path(&dir, "group");

    // The shell spawns its own child; the group kill must take both out.
    let child = spawn("sh -c 'sleep 30' & wait", dir.path(), &[], &log).unwrap();
    let pid = child.pid();

    kill_group(pid);
    let code = child.wait().await.unwrap();
    assert_eq!(code, 128 + libc::SIGKILL);
}

#[cfg(unix)]
#[test]
fn pid_alive_detects_dead_processes() {
    // Our own pid is alive; a pid beyond any kernel's pid_max is not.
    assert!(pid_alive(std::process::id()));
    assert!(!pid_alive(i32::MAX as u32));
}
