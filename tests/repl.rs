use assert_cmd::Command;
use predicates::prelude::*;
use std::time::Duration;

/// A `bfvm` command that ignores the caller's settings file and `BF_*` variables.
fn make_cmd() -> Command {
    let empty = tempfile::tempdir().expect("tempdir");
    let mut cmd = Command::cargo_bin("bfvm").expect("bfvm binary");
    cmd.env("XDG_CONFIG_HOME", empty.path()).env_remove("BF_REPL_MODE");
    for key in ["BF_TAPE", "BF_TAPE_SIZE", "BF_EOF", "BF_TIMEOUT_MS", "BF_MAX_STEPS"] {
        cmd.env_remove(key);
    }
    cmd
}

#[test]
fn bare_empty_input_exits_clean_and_quiet() {
    make_cmd()
        .write_stdin("")
        .assert()
        .success()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::is_empty());
}

#[test]
fn piped_program_runs_once_in_bare_mode() {
    make_cmd()
        .timeout(Duration::from_secs(5))
        .write_stdin("+++.")
        .assert()
        .success()
        .stdout("\u{3}\n");
}

#[test]
fn repl_subcommand_with_bare_flag() {
    // 65 '+' then '.' prints 'A'
    let program = format!("{}.", "+".repeat(65));
    make_cmd()
        .timeout(Duration::from_secs(5))
        .env("BF_REPL_MODE", "editor")
        .args(["repl", "--bare"])
        .write_stdin(program)
        .assert()
        .success()
        .stdout("A\n")
        .stderr(predicate::str::is_empty());
}

#[test]
fn invalid_program_reports_error_and_exits_clean() {
    make_cmd()
        .timeout(Duration::from_secs(5))
        .write_stdin("]")
        .assert()
        .success()
        .stderr(predicate::str::contains("Parse error: unmatched bracket ']'"))
        .stdout("\n");
}

#[test]
fn comment_only_input_runs_nothing() {
    make_cmd()
        .write_stdin("nothing to see here\n")
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn bare_mode_honours_step_limit() {
    make_cmd()
        .timeout(Duration::from_secs(5))
        .env("BF_MAX_STEPS", "50")
        .env_remove("BF_TIMEOUT_MS")
        .write_stdin("+[]")
        .assert()
        .success()
        .stderr(predicate::str::contains("step limit exceeded (50)"));
}

#[test]
fn forced_editor_on_non_tty_errors() {
    make_cmd()
        .args(["repl", "--editor"])
        .write_stdin("+")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("stdin is not a TTY"));
}

#[test]
fn invalid_mode_env_is_reported() {
    make_cmd()
        .env("BF_REPL_MODE", "fancy")
        .write_stdin("+")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("invalid BF_REPL_MODE"));
}
