use std::sync::Arc;

use tokio::signal::unix::{signal, SignalKind};
use xcover_core::{RunConfig, SymbolFilter};

use crate::cli::args::StartArgs;
use crate::daemon;
use crate::settings::Settings;

fn combine_patterns(patterns: &[String]) -> Option<String> {
    if patterns.is_empty() {
        return None;
    }
    Some(patterns.iter().map(|p| format!("(?:{p})")).collect::<Vec<_>>().join("|"))
}

fn build_filter(args: &StartArgs) -> anyhow::Result<SymbolFilter> {
    Ok(SymbolFilter::builder()
        .include_pattern(combine_patterns(&args.include))
        .exclude_pattern(combine_patterns(&args.exclude))
        .build()?)
}

/// Reconstructs the argv for the re-exec'd foreground process, dropping
/// `--detach` so the child runs the trace loop in place.
fn foreground_argv(args: &StartArgs) -> Vec<String> {
    let mut argv = vec!["foreground".to_string(), "--path".to_string(), args.path.display().to_string()];
    for pattern in &args.include {
        argv.push("--include".to_string());
        argv.push(pattern.clone());
    }
    for pattern in &args.exclude {
        argv.push("--exclude".to_string());
        argv.push(pattern.clone());
    }
    if args.verbose {
        argv.push("--verbose".to_string());
    }
    if args.status {
        argv.push("--status".to_string());
    }
    argv.push(format!("--report={}", args.report));
    argv
}

pub async fn run(settings: &Settings, args: StartArgs, foreground: bool) -> anyhow::Result<i32> {
    if args.detach && !foreground {
        // Checked up front, before spawning anything, so a second
        // `--detach` invocation racing a near-simultaneous first one still
        // sees the earlier claim (spec §8 property: duplicate daemon starts
        // print "already running" and exit 0 without touching the PID
        // file). `claim_pid_file` below re-checks atomically with the write.
        if let Some(existing) = daemon::running_pid(&settings.pid_path)? {
            println!("xcover is already running (pid {existing})");
            return Ok(0);
        }

        let argv = foreground_argv(&args);
        let pid = daemon::spawn_detached(&settings.log_path, &argv)?;
        // The parent writes the PID file using the freshly spawned child's
        // pid, available synchronously from the spawn call — it does not
        // wait for the child to initialize before recording it (matches the
        // original `daemonize()`: the pid recorded is `cmd.Process.Pid`
        // right after `Start()` returns). The re-exec'd child (the
        // `foreground` branch below) must not claim it again: doing so
        // would see its own just-written pid as "already running".
        daemon::claim_pid_file(&settings.pid_path, pid)?;
        println!("started xcover in the background (pid {pid}), log at {}", settings.log_path.display());
        return Ok(0);
    }

    if foreground {
        // The parent already claimed the PID file with our pid (see above);
        // adopt it here so it is still released on drop, panic included.
        let _guard = daemon::PidFileGuard::adopt(&settings.pid_path);
        run_foreground(settings, args).await
    } else {
        let _guard = daemon::PidFileGuard::claim(&settings.pid_path, std::process::id() as i32)?;
        run_foreground(settings, args).await
    }
}

async fn run_foreground(settings: &Settings, args: StartArgs) -> anyhow::Result<i32> {
    let filter = build_filter(&args)?;
    let instrumentation_object = std::fs::read(&settings.probe_object_path).map_err(|err| {
        anyhow::anyhow!(
            "failed to read instrumentation object at {}: {err}",
            settings.probe_object_path.display()
        )
    })?;

    let module_name = args
        .path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "xcover".to_string());

    let verbose: Option<xcover_core::pipeline::VerboseSink> = if args.verbose {
        Some(Arc::new(|name: &str| println!("{name}")))
    } else {
        None
    };

    let config = RunConfig {
        exe_path: args.path.clone(),
        filter,
        socket_path: settings.socket_path.clone(),
        report_path: settings.report_path.clone(),
        report_enabled: args.report,
        instrumentation_object,
        module_name,
        status_enabled: args.status,
        verbose,
    };

    let host = Box::new(xcover_probe::DefaultProbeHost::new());
    let (cancel_tx, cancel_rx) = tokio::sync::oneshot::channel();

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    tokio::spawn(async move {
        tokio::select! {
            _ = sigterm.recv() => {}
            _ = sigint.recv() => {}
        }
        let _ = cancel_tx.send(());
    });

    let report = xcover_core::run(host, config, cancel_rx).await?;
    tracing::info!(
        funcs_traced = report.funcs_traced.len(),
        funcs_ack = report.funcs_ack.len(),
        cov_by_func = report.cov_by_func,
        "trace run complete"
    );
    Ok(0)
}
