//! Tracer Orchestrator (spec §4.10): sequences every other component from
//! cold start through report emission.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::oneshot;
use xcover_common::{Cookie, FEED_CHANNEL_DEPTH, RING_BUFFER_DEPTH};

use crate::ack_set::AcknowledgementSet;
use crate::error::CoreError;
use crate::filter::SymbolFilter;
use crate::pipeline::{dispatch, feed_channel, ingest, PipelineCounters, VerboseSink};
use crate::probe_host::ProbeHost;
use crate::readiness::ReadinessServer;
use crate::report::CoverageReport;
use crate::status::{self, ChannelGauge};
use crate::tracee::Tracee;

/// Configuration for a single trace run.
pub struct RunConfig {
    pub exe_path: PathBuf,
    pub filter: SymbolFilter,
    pub socket_path: PathBuf,
    pub report_path: PathBuf,
    pub report_enabled: bool,
    pub instrumentation_object: Vec<u8>,
    pub module_name: String,
    pub status_enabled: bool,
    pub verbose: Option<VerboseSink>,
}

/// Runs a trace end-to-end: build the function table, stand up the
/// readiness socket, load and arm the probe host, pump events until
/// cancelled, then tear everything down and write the report.
///
/// `cancel` resolves when the caller (the CLI's signal handler, or the
/// test harness exiting) wants the run to stop.
pub async fn run(
    mut host: Box<dyn ProbeHost>,
    config: RunConfig,
    cancel: oneshot::Receiver<()>,
) -> Result<CoverageReport, CoreError> {
    let tracee = Tracee::load(&config.exe_path, &config.filter)?;
    let functions = Arc::new(tracee.function_table().clone());
    let ack = Arc::new(AcknowledgementSet::new());
    let counters = Arc::new(PipelineCounters::new());
    let ring_gauge = Arc::new(ChannelGauge::new(RING_BUFFER_DEPTH));
    let feed_gauge = Arc::new(ChannelGauge::new(FEED_CHANNEL_DEPTH));

    let readiness = ReadinessServer::bind(&config.socket_path).await?;

    host.load(&config.instrumentation_object, &config.module_name)?;
    let exe_path = tracee.exe_path().display().to_string();
    for batch in tracee.attach_batches() {
        let offsets: Vec<u64> = batch.iter().map(|(offset, _)| *offset).collect();
        let cookies: Vec<Cookie> = batch.iter().map(|(_, cookie)| *cookie).collect();
        // Per-batch attach failures are warn-logged, not fatal (spec §4.3,
        // §7): probes that fail to attach simply produce no events, and the
        // run continues with whatever did attach.
        if let Err(err) = host.attach(&exe_path, &offsets, &cookies) {
            tracing::warn!(%err, batch_size = offsets.len(), "failed to attach probe batch; continuing");
        }
    }

    let events = host.events(Arc::clone(&ring_gauge))?;
    let (feed_tx, feed_rx) = feed_channel();
    let ingest_task = tokio::spawn(ingest(events, feed_tx, Arc::clone(&feed_gauge)));
    let dispatch_task = tokio::spawn(dispatch(
        feed_rx,
        Arc::clone(&functions),
        Arc::clone(&ack),
        Arc::clone(&counters),
        config.verbose.clone(),
    ));

    let (status_cancel_tx, status_cancel_rx) = oneshot::channel();
    let status_task = if config.status_enabled {
        Some(tokio::spawn(status::run(
            tracee.len(),
            Arc::clone(&ack),
            Arc::clone(&counters),
            Arc::clone(&ring_gauge),
            Arc::clone(&feed_gauge),
            status_cancel_rx,
        )))
    } else {
        drop(status_cancel_rx);
        None
    };

    readiness.notify_ready();

    let _ = cancel.await;

    // Report writing happens-after Dispatch has joined, so no event races
    // with report enumeration (spec §5, ordering guarantee (d)). Aborting
    // alone only schedules cancellation; awaiting the handle is what
    // guarantees the task has actually stopped before we snapshot the
    // Acknowledgement Set below.
    ingest_task.abort();
    let _ = ingest_task.await;
    dispatch_task.abort();
    let _ = dispatch_task.await;
    let _ = status_cancel_tx.send(());
    if let Some(task) = status_task {
        let _ = task.await;
    }

    host.close()?;
    readiness.shutdown().await;

    let report = CoverageReport::build(&tracee, &ack);
    if config.report_enabled {
        report.write_to(&config.report_path)?;
    }

    Ok(report)
}
