use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

/// A `bfvm` command that ignores the caller's settings file and `BF_*` variables.
fn cargo_bin() -> Command {
    // The directory is gone once this returns; a missing config home means no settings file.
    let empty = tempfile::tempdir().expect("tempdir");
    cargo_bin_with_config(empty.path())
}

fn cargo_bin_with_config(config_home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("bfvm").unwrap();
    cmd.env("XDG_CONFIG_HOME", config_home);
    for key in ["BF_TAPE", "BF_TAPE_SIZE", "BF_EOF", "BF_TIMEOUT_MS", "BF_MAX_STEPS"] {
        cmd.env_remove(key);
    }
    cmd
}

fn write_tempfile(content: &str) -> tempfile::NamedTempFile {
    let mut tf = tempfile::NamedTempFile::new().expect("tempfile");
    write!(tf, "{}", content).unwrap();
    tf
}

#[test]
fn runs_program_from_file() {
    // 65 '+' then '.' prints 'A'; the words around it are comments
    let tf = write_tempfile(&format!("print an A\n{}\nthen stop\n.", "+".repeat(65)));
    cargo_bin()
        .timeout(Duration::from_secs(5))
        .arg("run").arg(tf.path())
        .assert()
        .success()
        .stdout("A")
        .stderr(predicate::str::is_empty());
}

#[test]
fn runs_inline_code() {
    cargo_bin()
        .timeout(Duration::from_secs(5))
        .args(["run", "--code", "++++++++[>++++++++<-]>+."])
        .assert()
        .success()
        .stdout("A");
}

#[test]
fn growable_tape_survives_moving_left_of_start() {
    let assert = cargo_bin()
        .timeout(Duration::from_secs(5))
        .args(["run", "--code", "<.>."])
        .assert()
        .success();
    assert_eq!(assert.get_output().stdout, vec![0u8, 0u8]);
}

#[test]
fn missing_program_exits_1() {
    cargo_bin()
        .arg("run")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("need a program"));
}

#[test]
fn unreadable_file_exits_2() {
    let dir = tempfile::tempdir().expect("tempdir");
    let missing = dir.path().join("missing.bf");
    cargo_bin()
        .arg("run").arg(&missing)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("could not open program"));
}

#[test]
fn unmatched_bracket_exits_3_with_caret() {
    cargo_bin()
        .timeout(Duration::from_secs(5))
        .args(["run", "--code", "oops +]"])
        .assert()
        .code(3)
        .stderr(
            predicate::str::contains("Parse error: unmatched bracket ']' at instruction 1")
                .and(predicate::str::contains("oops +]"))
                .and(predicate::str::contains("      ^")),
        );
}

#[test]
fn unclosed_bracket_exits_3() {
    cargo_bin()
        .timeout(Duration::from_secs(5))
        .args(["run", "--code", "["])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("unmatched bracket '['"));
}

#[test]
fn reads_from_stdin_and_echoes_byte() {
    cargo_bin()
        .timeout(Duration::from_secs(5))
        .args(["run", "--code", ",."])
        .write_stdin("Z")
        .assert()
        .success()
        .stdout("Z");
}

#[test]
fn eof_policy_flag_keeps_cell() {
    let assert = cargo_bin()
        .timeout(Duration::from_secs(5))
        .args(["run", "--eof", "unchanged", "--code", "+++,."])
        .write_stdin("")
        .assert()
        .success();
    assert_eq!(assert.get_output().stdout, vec![3u8]);
}

#[test]
fn debug_flag_prints_table() {
    cargo_bin()
        .timeout(Duration::from_secs(5))
        .args(["run", "--debug", "--code", ">+."])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("STEP | IP")
                .and(predicate::str::contains("Grew tape right; moved pointer head to index 1"))
                .and(predicate::str::contains("Output byte 1 (suppressed in debug)")),
        );
}

#[test]
fn fixed_tape_overrun_terminates_abnormally() {
    cargo_bin()
        .timeout(Duration::from_secs(5))
        .args(["run", "--tape", "fixed", "--code", "<"])
        .assert()
        .code(101)
        .stderr(predicate::str::contains("left edge"));
}

#[test]
fn fixed_tape_size_flag_is_respected() {
    cargo_bin()
        .timeout(Duration::from_secs(5))
        .args(["run", "--tape", "fixed", "--tape-size", "2", "--code", ">>"])
        .assert()
        .code(101)
        .stderr(predicate::str::contains("2-cell fixed tape"));
}

#[test]
fn unknown_tape_policy_is_a_usage_error() {
    cargo_bin()
        .args(["run", "--tape", "infinite", "--code", "+"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid tape policy"));
}

#[test]
fn zero_tape_size_is_a_usage_error() {
    cargo_bin()
        .args(["run", "--tape", "fixed", "--tape-size", "0", "--code", "+"])
        .assert()
        .failure()
        .code(predicate::ne(0).and(predicate::ne(101)))
        .stderr(predicate::str::contains("at least one cell"));
}

fn write_settings(dir: &Path, content: &str) {
    std::fs::write(dir.join("bfvm.toml"), content).expect("write settings");
}

#[test]
fn settings_file_selects_fixed_tape() {
    let cfg = tempfile::tempdir().expect("tempdir");
    write_settings(cfg.path(), "[machine]\ntape = \"fixed\"\ntape_size = 2\n");
    cargo_bin_with_config(cfg.path())
        .timeout(Duration::from_secs(5))
        .args(["run", "--code", ">>"])
        .assert()
        .code(101)
        .stderr(predicate::str::contains("2-cell fixed tape"));
}

#[test]
fn flag_overrides_settings_file() {
    let cfg = tempfile::tempdir().expect("tempdir");
    write_settings(cfg.path(), "[machine]\ntape = \"fixed\"\ntape_size = 2\n");
    let assert = cargo_bin_with_config(cfg.path())
        .timeout(Duration::from_secs(5))
        .args(["run", "--tape", "growable", "--code", ">>."])
        .assert()
        .success();
    assert_eq!(assert.get_output().stdout, vec![0u8]);
}

#[test]
fn environment_overrides_settings_file() {
    let cfg = tempfile::tempdir().expect("tempdir");
    write_settings(cfg.path(), "[machine]\ntape = \"fixed\"\ntape_size = 2\n");
    cargo_bin_with_config(cfg.path())
        .timeout(Duration::from_secs(5))
        .env("BF_TAPE_SIZE", "3")
        .args(["run", "--code", ">>>"])
        .assert()
        .code(101)
        .stderr(predicate::str::contains("3-cell fixed tape"));
}

#[test]
fn input_is_echoed_under_a_timeout() {
    cargo_bin()
        .timeout(Duration::from_secs(5))
        .args(["run", "--timeout", "2000", "--code", ",.,."])
        .write_stdin("hi")
        .assert()
        .success()
        .stdout("hi");
}
