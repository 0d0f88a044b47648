use crate::daemon;
use crate::settings::Settings;

/// Reports whether a daemon is currently running. Always exits `0`: "not
/// running" is a normal report, not a failure — spec §6 surfaces error
/// identifiers through the log line, not a distinct exit code, and no
/// section documents one for `status` (consistent with `stop`'s idempotent
/// "not running" success case).
pub fn run(settings: &Settings) -> anyhow::Result<i32> {
    match daemon::running_pid(&settings.pid_path)? {
        Some(pid) => println!("running (pid {pid})"),
        None => println!("not running"),
    }
    Ok(0)
}
