use assert_cmd::Command;
use predicates::prelude::*;
use std::time::Duration;

/// A `bfvm` command that ignores the caller's settings file and `BF_*` variables.
fn cargo_bin() -> Command {
    let empty = tempfile::tempdir().expect("tempdir");
    let mut cmd = Command::cargo_bin("bfvm").unwrap();
    cmd.env("XDG_CONFIG_HOME", empty.path());
    for key in ["BF_TAPE", "BF_TAPE_SIZE", "BF_EOF", "BF_TIMEOUT_MS", "BF_MAX_STEPS"] {
        cmd.env_remove(key);
    }
    cmd
}

fn infinite_bf() -> &'static str {
    "+[]" // increments to 1, then [] does nothing forever
}

#[test]
fn timeout_flag_aborts_infinite_loop() {
    cargo_bin()
        .timeout(Duration::from_secs(5))
        .env_remove("BF_MAX_STEPS")
        .args(["run", "--timeout", "100", "--code", infinite_bf()])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("wall-clock timeout exceeded (100 ms)"))
        .stdout(predicate::str::contains("Execution aborted").not());
}

#[test]
fn step_limit_flag_aborts_infinite_loop() {
    cargo_bin()
        .timeout(Duration::from_secs(5))
        .env_remove("BF_TIMEOUT_MS")
        .args(["run", "--max-steps", "50", "--code", infinite_bf()])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("step limit exceeded (50)"));
}

#[test]
fn step_limit_from_environment() {
    cargo_bin()
        .timeout(Duration::from_secs(5))
        .env("BF_MAX_STEPS", "50")
        .env_remove("BF_TIMEOUT_MS")
        .args(["run", "--code", infinite_bf()])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("step limit exceeded (50)"));
}

#[test]
fn flag_overrides_environment() {
    cargo_bin()
        .timeout(Duration::from_secs(5))
        .env("BF_MAX_STEPS", "50")
        .args(["run", "--max-steps", "7", "--code", infinite_bf()])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("step limit exceeded (7)"));
}

#[test]
fn finite_program_is_not_affected_by_limits() {
    cargo_bin()
        .timeout(Duration::from_secs(5))
        .args(["run", "--timeout", "2000", "--max-steps", "10000", "--code", "++++++++[>++++++++<-]>+."])
        .assert()
        .success()
        .stdout("A");
}
