//! CLI tests for the `reprise-selftest` binary.
//!
//! Spawns the binary in a scratch directory and checks exit codes and
//! console output.

use std::path::Path;
use std::process::{Command, Output};

use reprise::exit_codes;

fn selftest(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_reprise-selftest"))
        .current_dir(dir)
        .args(args)
        .output()
        .expect("spawn reprise-selftest")
}

#[test]
fn passing_cases_exit_ok() {
    let temp = tempfile::tempdir().expect("tempdir");
    let output = selftest(
        temp.path(),
        &[
            "run",
            "vector_sizes",
            "generator_in_section",
            "generator_product",
            "seeded_dice",
        ],
    );

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let stdout = String::from_utf8(output.stdout).expect("utf8");
    assert!(stdout.contains("vector_sizes ... ok (4 passes"));
    assert!(stdout.contains("generator_in_section ... ok (5 passes"));
    assert!(stdout.contains("generator_product ... ok (5 passes"));
    assert!(stdout.contains("4 cases: 4 passed, 0 failed"));
}

#[test]
fn failing_case_exits_failed_and_names_the_section() {
    let temp = tempfile::tempdir().expect("tempdir");
    let output = selftest(temp.path(), &["run", "expected_failure_sibling"]);

    assert_eq!(output.status.code(), Some(exit_codes::FAILED));
    let stdout = String::from_utf8(output.stdout).expect("utf8");
    assert!(stdout.contains("expected_failure_sibling ... FAILED (3 passes"));
    assert!(stdout.contains("expected_failure_sibling/fails (pass 1): deliberate failure"));
}

#[test]
fn list_prints_every_case() {
    let temp = tempfile::tempdir().expect("tempdir");
    let output = selftest(temp.path(), &["list"]);

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let stdout = String::from_utf8(output.stdout).expect("utf8");
    let names: Vec<&str> = stdout
        .lines()
        .filter_map(|line| line.split('\t').next())
        .collect();
    assert_eq!(
        names,
        vec![
            "vector_sizes",
            "generator_in_section",
            "generator_product",
            "seeded_dice",
            "expected_failure_sibling",
            "expected_failure_panic",
        ]
    );
}

#[test]
fn unknown_case_name_is_invalid() {
    let temp = tempfile::tempdir().expect("tempdir");
    let output = selftest(temp.path(), &["run", "no_such_case"]);

    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    let stderr = String::from_utf8(output.stderr).expect("utf8");
    assert!(stderr.contains("no test case named 'no_such_case'"));
}

#[test]
fn missing_config_file_is_invalid() {
    let temp = tempfile::tempdir().expect("tempdir");
    let output = selftest(temp.path(), &["run", "--config", "absent.toml"]);

    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
}

#[test]
fn config_file_in_working_directory_is_honoured() {
    let temp = tempfile::tempdir().expect("tempdir");
    std::fs::write(temp.path().join("reprise.toml"), "max_passes = 2\n").expect("write config");
    let output = selftest(temp.path(), &["run", "generator_in_section"]);

    assert_eq!(output.status.code(), Some(exit_codes::FAILED));
    let stdout = String::from_utf8(output.stdout).expect("utf8");
    assert!(stdout.contains("stopped after 2 passes"));
}

#[test]
fn report_json_is_written() {
    let temp = tempfile::tempdir().expect("tempdir");
    let output = selftest(
        temp.path(),
        &[
            "run",
            "expected_failure_panic",
            "--report-json",
            "out/report.json",
        ],
    );

    assert_eq!(output.status.code(), Some(exit_codes::FAILED));
    let raw = std::fs::read_to_string(temp.path().join("out/report.json")).expect("read report");
    let report: serde_json::Value = serde_json::from_str(&raw).expect("parse report");
    let case = &report["cases"][0];
    assert_eq!(case["name"], "expected_failure_panic");
    assert_eq!(case["passes"], 3);
    assert_eq!(case["failures"][0]["message"], "no element");
    assert_eq!(case["failures"][0]["path"], "expected_failure_panic/panics");
}
