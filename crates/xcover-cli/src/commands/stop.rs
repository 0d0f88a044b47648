use std::time::Duration;

use crate::daemon::{self, DaemonError};
use crate::settings::Settings;

/// `stop` is idempotent (spec §8 property 7): calling it a second time, once
/// no PID file remains, leaves no PID file behind and still returns success
/// — reporting "not running" is not an error for `stop`, it's the
/// already-stopped steady state.
pub fn run(settings: &Settings, grace_period: Duration) -> anyhow::Result<i32> {
    match daemon::stop(&settings.pid_path, grace_period) {
        Ok(()) => {
            println!("stopped");
            Ok(0)
        }
        Err(DaemonError::NotRunning) => {
            println!("not running");
            Ok(0)
        }
        Err(err) => Err(err.into()),
    }
}
