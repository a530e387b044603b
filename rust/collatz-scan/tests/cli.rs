//! Exit-code and output contract of the `collatz-scan` binary.

use std::process::{Command, Output};

fn run(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_collatz-scan"))
        .args(args)
        .output()
        .expect("failed to launch collatz-scan")
}

#[test]
fn test_completed_scan_exits_zero() {
    let out = run(&["--lower", "0", "--upper", "2000", "--threads", "2"]);
    assert_eq!(out.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("No counterexample found."), "stdout: {}", stdout);
}

#[test]
fn test_inverted_range_exits_one() {
    let out = run(&["--lower", "100", "--upper", "50", "--threads", "4"]);
    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("invalid range"), "stderr: {}", stderr);
}

#[test]
fn test_width_ceiling_exits_one() {
    let out = run(&["--lower", "0", "--upper", "18446744073709551615", "--width", "64"]);
    assert_eq!(out.status.code(), Some(1));
}

#[test]
fn test_bad_arguments_exit_one() {
    assert_eq!(run(&["--lower", "0", "--upper", "10", "--width", "32"]).status.code(), Some(1));
    assert_eq!(run(&["--upper", "10"]).status.code(), Some(1));
}

#[test]
fn test_step_limit_exits_two_with_value() {
    let out = run(&["--lower", "0", "--upper", "1", "--threads", "1", "--max-steps", "1"]);
    assert_eq!(out.status.code(), Some(2));
    let stdout = String::from_utf8_lossy(&out.stdout);
    let line = stdout
        .lines()
        .find(|l| l.starts_with("counterexample candidate: "))
        .expect("finding line missing");
    let value: u64 = line["counterexample candidate: ".len()..].trim().parse().unwrap();
    assert!(value < 256);
}

#[test]
fn test_json_report() {
    let out = run(&[
        "--lower", "10", "--upper", "20", "--threads", "1", "--width", "arbitrary", "--unfiltered", "--json",
    ]);
    assert_eq!(out.status.code(), Some(0));
    let report: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(report["chunks_scanned"], 10);
    assert_eq!(report["candidates_tested"], 2560);
    assert_eq!(report["width"], "arbitrary");
    assert_eq!(report["sieve"], "unfiltered");
}
