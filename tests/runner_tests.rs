#![cfg(unix)]

//! Lifecycle tests for the suite runner.
//!
//! These spawn real subprocesses as stand-ins for the server under test,
//! so they run serially to avoid process and port contention.

use std::path::PathBuf;

use serial_test::serial;
use tempfile::TempDir;

use vetter::Error;
use vetter::catalog::TestGroup;
use vetter::harness::HarnessOptions;
use vetter::runner::{RunOutcome, run_suite};

fn options(server_bin: &str, sandbox_root: PathBuf) -> HarnessOptions {
    HarnessOptions {
        server_bin: PathBuf::from(server_bin),
        config_root: PathBuf::from("/tmp"),
        alt_config_root: PathBuf::from("/tmp"),
        // Nothing listens here; readiness probing falls back to its bound.
        port: 39147,
        sandbox_root,
    }
}

fn empty_group(config: &str) -> TestGroup {
    TestGroup {
        config: config.to_string(),
        alt_config_root: false,
        cases: Vec::new(),
    }
}

#[tokio::test]
#[serial]
async fn missing_server_binary_aborts_the_run() {
    let dir = TempDir::new().unwrap();
    let sandbox_root = dir.path().join("sandbox");
    let opts = options("definitely/not/a/server", sandbox_root.clone());

    let err = run_suite(&opts, &[empty_group("simple_config")])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ServerBinaryMissing { .. }));

    // The abort path must not leak the group's sandbox.
    assert!(!sandbox_root.exists());
}

#[tokio::test]
#[serial]
async fn sandbox_absent_after_each_group() {
    let dir = TempDir::new().unwrap();
    let sandbox_root = dir.path().join("sandbox");
    // `sleep` starts, ignores its config argument, and is terminated by
    // stop(); a group with no cases exercises the full lifecycle.
    let opts = options("/bin/sleep", sandbox_root.clone());

    let outcome = run_suite(&opts, &[empty_group("30"), empty_group("30")])
        .await
        .unwrap();
    assert_eq!(outcome, RunOutcome::AllPassed);
    assert!(
        !sandbox_root.exists(),
        "sandbox must be fully removed after the run"
    );
}

#[tokio::test]
#[serial]
async fn failing_case_still_tears_down_and_exits_nonzero() {
    let dir = TempDir::new().unwrap();
    let sandbox_root = dir.path().join("sandbox");
    let opts = options("/bin/sleep", sandbox_root.clone());

    // Nothing is listening on the test port, so this case's connection is
    // refused; that is a case-local failure, not a run abort.
    let group = TestGroup {
        config: "30".to_string(),
        alt_config_root: false,
        cases: vec![vetter::catalog::TestCase::raw(
            "unreachable server",
            &b"GET / HTTP/1.1\r\n\r\n"[..],
            &b"HTTP/1.1 200 OK\r\n\r\n"[..],
        )],
    };

    let outcome = run_suite(&opts, &[group]).await.unwrap();
    assert_eq!(outcome, RunOutcome::SomeFailed);
    assert!(!sandbox_root.exists());
}
