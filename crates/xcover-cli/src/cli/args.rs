use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "xcover", version, about = "Functional-test coverage profiler for native executables")]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Command,

    /// Log verbosity, passed through to `tracing-subscriber`'s EnvFilter
    /// (e.g. `info`, `debug`, `xcover_core=trace,warn`).
    #[arg(long, global = true, default_value = "info", env = "XCOVER_LOG")]
    pub log_level: String,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start tracing an executable.
    Start(StartArgs),
    /// Alias for `start`.
    Run(StartArgs),
    /// Alias for `start`.
    Profile(StartArgs),
    /// Block until the running daemon signals that every probe is armed.
    Wait(WaitArgs),
    /// Report whether a daemon is currently running.
    Status(StatusArgs),
    /// Stop the running daemon.
    Stop(StopArgs),
    /// Internal: run the trace loop in the foreground. Used by `--detach`
    /// to re-exec itself as a background process; not meant to be invoked
    /// directly.
    #[command(hide = true)]
    Foreground(StartArgs),
}

#[derive(clap::Args, Debug, Clone)]
pub struct StartArgs {
    /// Path to the native executable to instrument.
    #[arg(long)]
    pub path: PathBuf,

    /// Only instrument functions whose name matches this regular
    /// expression. May be repeated; a function matches if it matches any.
    #[arg(long = "include")]
    pub include: Vec<String>,

    /// Never instrument functions whose name matches this regular
    /// expression, even if also matched by `--include`. May be repeated.
    #[arg(long = "exclude")]
    pub exclude: Vec<String>,

    /// Print each function's name the first time it is observed.
    #[arg(long)]
    pub verbose: bool,

    /// Print a one-line coverage summary once a second while tracing.
    #[arg(long)]
    pub status: bool,

    /// Run as a background daemon instead of blocking the current terminal.
    #[arg(long)]
    pub detach: bool,

    /// Write the JSON coverage report when the run ends. On by default;
    /// pass `--report=false` to suppress it. The destination path is always
    /// the fixed report path derived from the command name, not
    /// configurable per run.
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub report: bool,
}

#[derive(clap::Args, Debug, Clone)]
pub struct WaitArgs {
    /// How long to wait for the readiness signal before giving up.
    #[arg(long, default_value = "120s")]
    pub timeout: humantime::Duration,

    /// Polling interval between connection attempts.
    #[arg(long, default_value = "500ms")]
    pub retry_interval: humantime::Duration,
}

#[derive(clap::Args, Debug, Clone)]
pub struct StatusArgs {}

#[derive(clap::Args, Debug, Clone)]
pub struct StopArgs {
    /// How long to wait for a graceful shutdown before sending SIGKILL.
    #[arg(long, default_value = "5s")]
    pub grace_period: humantime::Duration,
}
