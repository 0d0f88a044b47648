//! Status Reporter (spec §4.7): a once-a-second terminal line summarising
//! coverage progress, throughput, and channel back-pressure. A no-op when
//! status reporting is disabled (the `--status` flag off).

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::ack_set::AcknowledgementSet;
use crate::pipeline::PipelineCounters;

/// Snapshot of channel depth, updated by the pipeline as messages are
/// sent/received so the reporter never has to poll the channel itself.
#[derive(Default)]
pub struct ChannelGauge {
    depth: AtomicUsize,
    capacity: usize,
}

impl ChannelGauge {
    pub fn new(capacity: usize) -> Self {
        Self {
            depth: AtomicUsize::new(0),
            capacity,
        }
    }

    pub fn set(&self, depth: usize) {
        self.depth.store(depth, Ordering::Relaxed);
    }

    fn utilization_pct(&self) -> f64 {
        if self.capacity == 0 {
            return 0.0;
        }
        100.0 * self.depth.load(Ordering::Relaxed) as f64 / self.capacity as f64
    }
}

/// Runs the once-a-second status line until cancelled. `total_functions` is
/// the denominator for coverage percentage.
pub async fn run(
    total_functions: usize,
    ack: Arc<AcknowledgementSet>,
    counters: Arc<PipelineCounters>,
    ring_gauge: Arc<ChannelGauge>,
    feed_gauge: Arc<ChannelGauge>,
    mut cancel: tokio::sync::oneshot::Receiver<()>,
) {
    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                print_line(total_functions, &ack, &counters, &ring_gauge, &feed_gauge);
            }
            _ = &mut cancel => {
                break;
            }
        }
    }
}

fn print_line(
    total_functions: usize,
    ack: &AcknowledgementSet,
    counters: &PipelineCounters,
    ring_gauge: &ChannelGauge,
    feed_gauge: &ChannelGauge,
) {
    let covered = ack.len();
    let pct = if total_functions == 0 {
        0.0
    } else {
        100.0 * covered as f64 / total_functions as f64
    };
    let events_per_sec = counters.swap_reset();
    let line = format!(
        "funcs {covered}/{total_functions} ({pct:.1}%) events/s {events_per_sec} ring {:.0}% feed {:.0}%",
        ring_gauge.utilization_pct(),
        feed_gauge.utilization_pct(),
    );
    // Right-aligned, carriage-return prefixed so the line overwrites itself
    // in place rather than scrolling the terminal.
    eprint!("\r{line:>80}");
}
