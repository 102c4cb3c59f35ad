// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::TimeZone;
use yare::parameterized;

#[test]
fn logs_dir_sits_next_to_config() {
    assert_eq!(
        logs_dir(Path::new("/work/exp1/tasks.yaml")),
        PathBuf::from("/work/exp1/logs")
    );
}

#[test]
fn history_lives_under_logs() {
    assert_eq!(
        history_path(Path::new("/work/exp1/tasks.yaml")),
        PathBuf::from("/work/exp1/logs/.history.json")
    );
}

#[test]
fn task_log_path_embeds_name_and_timestamp() {
    let now = chrono::Local.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
    let path = task_log_path(Path::new("/work/tasks.yaml"), "train run", now);
    assert_eq!(
        path,
        PathBuf::from("/work/logs/train_run_20260102_030405.log")
    );
}

#[parameterized(
    plain = { "train", "train" },
    spaces = { "my task", "my_task" },
    slashes = { "a/b\\c", "a_b_c" },
    keeps_dots_dashes = { "eval-v1.2_final", "eval-v1.2_final" },
    unicode_kept = { "训练", "训练" },
)]
fn sanitises(name: &str, expected: &str) {
    assert_eq!(sanitise_name(name), expected);
}
