//! Daemon lifecycle (spec §4.9): PID file ownership, detaching into a
//! background process, liveness checks, and graceful stop.

use std::fs;
use std::io::Write;
use std::os::unix::process::CommandExt;
use std::path::Path;
use std::process::Command;
use std::time::Duration;

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("daemon already running (pid {0})")]
    AlreadyRunning(i32),

    #[error("no daemon is running")]
    NotRunning,

    #[error("pid file at {0:?} does not contain a valid pid")]
    InvalidPidFile(std::path::PathBuf),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to signal process: {0}")]
    Signal(#[from] nix::Error),
}

/// Reads the pid recorded at `pid_path`, if any.
pub fn read_pid(pid_path: &Path) -> Result<Option<i32>, DaemonError> {
    if !pid_path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(pid_path)?;
    let pid = raw
        .trim()
        .parse::<i32>()
        .map_err(|_| DaemonError::InvalidPidFile(pid_path.to_path_buf()))?;
    Ok(Some(pid))
}

/// `kill(pid, 0)`: true iff the process exists and is signalable by us.
pub fn is_alive(pid: i32) -> bool {
    signal::kill(Pid::from_raw(pid), None).is_ok()
}

/// Returns the pid of the currently running daemon, if one is alive.
pub fn running_pid(pid_path: &Path) -> Result<Option<i32>, DaemonError> {
    match read_pid(pid_path)? {
        Some(pid) if is_alive(pid) => Ok(Some(pid)),
        _ => Ok(None),
    }
}

/// Writes `pid` to `pid_path`, refusing if a live daemon already owns it.
pub fn claim_pid_file(pid_path: &Path, pid: i32) -> Result<(), DaemonError> {
    if let Some(existing) = running_pid(pid_path)? {
        return Err(DaemonError::AlreadyRunning(existing));
    }
    let mut file = fs::File::create(pid_path)?;
    write!(file, "{pid}")?;
    Ok(())
}

pub fn release_pid_file(pid_path: &Path) {
    let _ = fs::remove_file(pid_path);
}

/// RAII guard over a claimed PID file: releases it on drop, including when
/// the scope unwinds from a panic, since Rust has no `defer` (spec §4.15).
pub struct PidFileGuard {
    pid_path: std::path::PathBuf,
}

impl PidFileGuard {
    /// Claims `pid_path` for `pid` and returns a guard that releases it
    /// when dropped.
    pub fn claim(pid_path: &Path, pid: i32) -> Result<Self, DaemonError> {
        claim_pid_file(pid_path, pid)?;
        Ok(Self { pid_path: pid_path.to_path_buf() })
    }

    /// Wraps a PID file already claimed by another process (the re-exec'd
    /// `foreground` child adopts the file its parent wrote) without
    /// claiming it again.
    pub fn adopt(pid_path: &Path) -> Self {
        Self { pid_path: pid_path.to_path_buf() }
    }
}

impl Drop for PidFileGuard {
    fn drop(&mut self) {
        release_pid_file(&self.pid_path);
    }
}

/// Re-execs the current binary with `--foreground` appended, redirecting its
/// stdio to `log_path` and detaching it from the controlling terminal. The
/// caller (the parent process) should exit immediately after this returns
/// with the child's pid.
pub fn spawn_detached(log_path: &Path, args: &[String]) -> Result<i32, DaemonError> {
    let exe = std::env::current_exe()?;
    let log_file = fs::OpenOptions::new().create(true).append(true).open(log_path)?;
    let log_file_err = log_file.try_clone()?;

    let mut command = Command::new(exe);
    command.args(args);
    command.stdin(std::process::Stdio::null());
    command.stdout(log_file);
    command.stderr(log_file_err);
    // Detach from the parent's session so the daemon survives terminal close.
    unsafe {
        command.pre_exec(|| {
            nix::unistd::setsid()
                .map(|_| ())
                .map_err(|errno| std::io::Error::from_raw_os_error(errno as i32))
        });
    }

    let child = command.spawn()?;
    Ok(child.id() as i32)
}

/// Sends SIGTERM, then polls for exit, escalating to SIGKILL if the process
/// is still alive after the grace period. The PID file is removed
/// unconditionally at the end, even when it turned out to be stale (the
/// recorded process already gone) — `ESRCH` is not an error for `stop`
/// (spec §4.9).
pub fn stop(pid_path: &Path, grace_period: Duration) -> Result<(), DaemonError> {
    let Some(pid) = read_pid(pid_path)? else {
        return Err(DaemonError::NotRunning);
    };

    if !is_alive(pid) {
        release_pid_file(pid_path);
        return Err(DaemonError::NotRunning);
    }

    let result = (|| -> Result<(), DaemonError> {
        signal::kill(Pid::from_raw(pid), Signal::SIGTERM)?;

        let deadline = std::time::Instant::now() + grace_period;
        while std::time::Instant::now() < deadline {
            if !is_alive(pid) {
                return Ok(());
            }
            std::thread::sleep(Duration::from_millis(100));
        }

        if is_alive(pid) {
            signal::kill(Pid::from_raw(pid), Signal::SIGKILL)?;
        }
        Ok(())
    })();

    release_pid_file(pid_path);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_pid_returns_none_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("none.pid");
        assert_eq!(read_pid(&path).unwrap(), None);
    }

    #[test]
    fn claim_and_release_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("xcover.pid");
        claim_pid_file(&path, std::process::id() as i32).unwrap();
        assert_eq!(read_pid(&path).unwrap(), Some(std::process::id() as i32));
        release_pid_file(&path);
        assert_eq!(read_pid(&path).unwrap(), None);
    }

    #[test]
    fn claim_fails_if_live_pid_already_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("xcover.pid");
        let own_pid = std::process::id() as i32;
        claim_pid_file(&path, own_pid).unwrap();
        let err = claim_pid_file(&path, own_pid).unwrap_err();
        assert!(matches!(err, DaemonError::AlreadyRunning(p) if p == own_pid));
    }

    #[test]
    fn invalid_pid_file_contents_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("xcover.pid");
        fs::write(&path, "not-a-pid").unwrap();
        let err = read_pid(&path).unwrap_err();
        assert!(matches!(err, DaemonError::InvalidPidFile(_)));
    }

    #[test]
    fn stop_removes_stale_pid_file_and_reports_not_running() {
        // A pid file pointing at a process that no longer exists must still
        // be cleaned up, not merely reported as an error (spec §4.9).
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("xcover.pid");
        fs::write(&path, "999999999").unwrap();
        let err = stop(&path, Duration::from_millis(50)).unwrap_err();
        assert!(matches!(err, DaemonError::NotRunning));
        assert!(!path.exists());
    }

    #[test]
    fn pid_file_guard_releases_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("xcover.pid");
        {
            let _guard = PidFileGuard::claim(&path, std::process::id() as i32).unwrap();
            assert_eq!(read_pid(&path).unwrap(), Some(std::process::id() as i32));
        }
        assert_eq!(read_pid(&path).unwrap(), None);
    }
}
