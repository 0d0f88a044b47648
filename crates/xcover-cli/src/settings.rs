//! Derives the fixed filesystem paths the daemon and its clients agree on
//! (spec §6): `/tmp/<cmd>.pid`, `/tmp/<cmd>.sock`, `/tmp/<cmd>.log`, and
//! `<cmd>-report.json` in the current working directory.

use std::path::PathBuf;

const COMMAND_NAME: &str = "xcover";

/// Fallback location for the precompiled instrumentation object when
/// `XCOVER_PROBE_OBJECT` is unset. The object itself is an external,
/// prebuilt artifact (spec §1) — xcover only needs a path to it.
const DEFAULT_PROBE_OBJECT_PATH: &str = "/usr/local/share/xcover/probe.o";

#[derive(Debug, Clone)]
pub struct Settings {
    pub pid_path: PathBuf,
    pub socket_path: PathBuf,
    pub log_path: PathBuf,
    pub report_path: PathBuf,
    pub probe_object_path: PathBuf,
}

fn env_or(var: &str, default: PathBuf) -> PathBuf {
    std::env::var_os(var).map(PathBuf::from).unwrap_or(default)
}

impl Settings {
    /// Builds the default paths, overridable per-variable via environment so
    /// integration tests can run several instances side by side without
    /// fighting over `/tmp/xcover.*`. Production runs rely entirely on the
    /// spec-fixed defaults.
    pub fn load() -> Self {
        Self {
            pid_path: env_or("XCOVER_PID_PATH", PathBuf::from(format!("/tmp/{COMMAND_NAME}.pid"))),
            socket_path: env_or("XCOVER_SOCKET_PATH", PathBuf::from(format!("/tmp/{COMMAND_NAME}.sock"))),
            log_path: env_or("XCOVER_LOG_PATH", PathBuf::from(format!("/tmp/{COMMAND_NAME}.log"))),
            report_path: env_or("XCOVER_REPORT_PATH", PathBuf::from(format!("{COMMAND_NAME}-report.json"))),
            probe_object_path: env_or("XCOVER_PROBE_OBJECT", PathBuf::from(DEFAULT_PROBE_OBJECT_PATH)),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::load()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_fixed_paths_from_command_name() {
        let settings = Settings::load();
        assert_eq!(settings.pid_path, PathBuf::from("/tmp/xcover.pid"));
        assert_eq!(settings.socket_path, PathBuf::from("/tmp/xcover.sock"));
        assert_eq!(settings.log_path, PathBuf::from("/tmp/xcover.log"));
        assert_eq!(settings.report_path, PathBuf::from("xcover-report.json"));
        assert_eq!(settings.probe_object_path, PathBuf::from(DEFAULT_PROBE_OBJECT_PATH));
    }
}
