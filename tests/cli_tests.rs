//! CLI integration tests for the `tricore` binary.
//!
//! These spawn the compiled binary as a subprocess and assert on exit code,
//! stdout, and stderr via `assert_cmd`/`predicates`. Only argument-parsing
//! and no-network-required behavior is exercised here; the real command-bus
//! round trip (`aggregator`/`actuator`/`send` talking to each other) is
//! covered in-process in `tests/bus_integration.rs` instead of by spawning
//! real subprocesses bound to real ports.

use assert_cmd::Command;
use predicates::prelude::*;

fn tricore() -> Command {
    Command::cargo_bin("tricore").unwrap()
}

#[test]
fn help_shows_all_three_roles() {
    tricore().arg("--help").assert().success().stdout(
        predicate::str::contains("aggregator")
            .and(predicate::str::contains("actuator"))
            .and(predicate::str::contains("send")),
    );
}

#[test]
fn send_help_shows_source_priority_and_mode_flags() {
    tricore().args(["send", "--help"]).assert().success().stdout(
        predicate::str::contains("--source")
            .and(predicate::str::contains("--priority"))
            .and(predicate::str::contains("--mode")),
    );
}

#[test]
fn missing_cmd_argument_to_send_is_rejected() {
    tricore()
        .arg("send")
        .assert()
        .failure()
        .stderr(predicate::str::contains("required"));
}

#[test]
fn unknown_source_value_is_rejected_by_clap() {
    tricore()
        .args(["send", "forward 1", "--source", "not-a-real-source"])
        .assert()
        .failure();
}

/// With no actuator/aggregator listening on the default ports, `send`
/// should fail fast with a connection error rather than hang — the
/// request/reply client's retry loop is bounded by `--request-retries`
/// and `--request-timeout`.
#[test]
fn send_fails_fast_against_an_unreachable_aggregator() {
    tricore()
        .args([
            "send",
            "stop",
            "--aggregator-host",
            "127.0.0.1",
            "--aggregator-port",
            "1",
            "--request-timeout",
            "0.2",
            "--request-retries",
            "0",
        ])
        .assert()
        .failure();
}
