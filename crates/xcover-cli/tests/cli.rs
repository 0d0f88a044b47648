use assert_cmd::Command;
use predicates::prelude::*;

fn cmd(tmp: &tempfile::TempDir) -> Command {
    let mut cmd = Command::cargo_bin("xcover").unwrap();
    cmd.env("XCOVER_PID_PATH", tmp.path().join("xcover.pid"));
    cmd.env("XCOVER_SOCKET_PATH", tmp.path().join("xcover.sock"));
    cmd.env("XCOVER_LOG_PATH", tmp.path().join("xcover.log"));
    cmd.env("XCOVER_REPORT_PATH", tmp.path().join("xcover-report.json"));
    cmd
}

#[test]
fn status_reports_not_running_without_pid_file() {
    let tmp = tempfile::tempdir().unwrap();
    cmd(&tmp)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("not running"));
}

#[test]
fn stop_is_idempotent_and_succeeds_when_already_stopped() {
    // spec §8 property 7: stop called twice in succession leaves no PID
    // file and returns success the second time with "not running".
    let tmp = tempfile::tempdir().unwrap();
    cmd(&tmp)
        .arg("stop")
        .assert()
        .success()
        .stdout(predicate::str::contains("not running"));
    assert!(!tmp.path().join("xcover.pid").exists());
}

#[test]
fn wait_times_out_when_socket_never_appears() {
    let tmp = tempfile::tempdir().unwrap();
    cmd(&tmp)
        .args(["wait", "--timeout", "200ms", "--retry-interval", "20ms"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("timed out"));
}

#[test]
fn start_without_path_is_rejected_by_clap() {
    let tmp = tempfile::tempdir().unwrap();
    cmd(&tmp).arg("start").assert().failure();
}

#[test]
fn start_reports_missing_instrumentation_object() {
    let tmp = tempfile::tempdir().unwrap();
    cmd(&tmp)
        .env("XCOVER_PROBE_OBJECT", tmp.path().join("missing-probe.o"))
        .args(["start", "--path", "/bin/true"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("instrumentation object"));
}
