//! Event Pipeline (spec §4.4): Ingest -> feed channel -> Dispatch ->
//! Acknowledgement Set.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use xcover_common::{decode_event, Cookie, FEED_CHANNEL_DEPTH};

use crate::ack_set::AcknowledgementSet;
use crate::probe_host::EventStream;
use crate::status::ChannelGauge;
use crate::tracee::FunctionRecord;

/// Optional sink for first-seen function names (the `--verbose` output).
pub type VerboseSink = Arc<dyn Fn(&str) + Send + Sync>;

/// Throughput and utilisation counters shared between Dispatch and the
/// Status Reporter.
#[derive(Default)]
pub struct PipelineCounters {
    consumed: AtomicU64,
}

impl PipelineCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self) {
        self.consumed.fetch_add(1, Ordering::Relaxed);
    }

    /// Reads and resets the counter, yielding an events/second rate when
    /// sampled once per second (spec §4.4).
    pub fn swap_reset(&self) -> u64 {
        self.consumed.swap(0, Ordering::Relaxed)
    }
}

/// Runs the Ingest task: reads byte slices from the Probe Host's events
/// source and forwards each into `feed_tx`. No decoding, no map lookup here
/// — the critical loop is one receive and one send, so the ring-buffer
/// consumer stays wait-free (spec §4.4). `gauge` is updated after every send
/// so the Status Reporter can read channel back-pressure without polling
/// the channel itself.
pub async fn ingest(mut events: EventStream, feed_tx: mpsc::Sender<Vec<u8>>, gauge: Arc<ChannelGauge>) {
    let capacity = feed_tx.max_capacity();
    while let Some(event) = events.next().await {
        if feed_tx.send(event).await.is_err() {
            break;
        }
        gauge.set(capacity - feed_tx.capacity());
    }
}

/// Runs the Dispatch task: decodes each event's cookie, resolves it against
/// the function table, records first-seen observations in `ack`, and bumps
/// the throughput counter. Duplicate observations are counted but otherwise
/// ignored (spec §4.4, §8 property 5).
pub async fn dispatch(
    mut feed_rx: mpsc::Receiver<Vec<u8>>,
    functions: Arc<HashMap<Cookie, FunctionRecord>>,
    ack: Arc<AcknowledgementSet>,
    counters: Arc<PipelineCounters>,
    verbose: Option<VerboseSink>,
) {
    while let Some(event) = feed_rx.recv().await {
        counters.record();

        let cookie = match decode_event(&event) {
            Ok(cookie) => cookie,
            Err(err) => {
                tracing::error!(%err, "failed to decode event; dropping");
                continue;
            }
        };

        let Some(record) = functions.get(&cookie) else {
            let err = crate::error::CoreError::FuncNotFoundForCookie(cookie);
            tracing::error!(%err, "dropping event");
            continue;
        };

        if ack.insert_if_absent(cookie) {
            if let Some(sink) = &verbose {
                sink(&record.name);
            }
        }
    }
}

/// Builds the bounded feed channel used between Ingest and Dispatch.
pub fn feed_channel() -> (mpsc::Sender<Vec<u8>>, mpsc::Receiver<Vec<u8>>) {
    mpsc::channel(FEED_CHANNEL_DEPTH)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn function(name: &str, cookie: Cookie) -> FunctionRecord {
        FunctionRecord {
            name: name.to_string(),
            binding: xcover_common::Binding::Global,
            file_offset: 0,
            cookie,
        }
    }

    #[tokio::test]
    async fn dispatch_records_first_seen_only_once() {
        let cookie = xcover_common::fnv1a_64("foo");
        let mut map = HashMap::new();
        map.insert(cookie, function("foo", cookie));
        let functions = Arc::new(map);
        let ack = Arc::new(AcknowledgementSet::new());
        let counters = Arc::new(PipelineCounters::new());

        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        let verbose: VerboseSink = Arc::new(move |name: &str| {
            seen_clone.lock().unwrap().push(name.to_string());
        });

        let (tx, rx) = feed_channel();
        let handle = tokio::spawn(dispatch(rx, functions, Arc::clone(&ack), Arc::clone(&counters), Some(verbose)));

        for _ in 0..5 {
            tx.send(cookie.to_le_bytes().to_vec()).await.unwrap();
        }
        drop(tx);
        handle.await.unwrap();

        assert_eq!(ack.len(), 1);
        assert_eq!(seen.lock().unwrap().len(), 1);
        assert_eq!(counters.swap_reset(), 5);
    }

    #[tokio::test]
    async fn dispatch_drops_unknown_cookie() {
        let functions = Arc::new(HashMap::new());
        let ack = Arc::new(AcknowledgementSet::new());
        let counters = Arc::new(PipelineCounters::new());

        let (tx, rx) = feed_channel();
        let handle = tokio::spawn(dispatch(rx, functions, Arc::clone(&ack), Arc::clone(&counters), None));
        tx.send(42u64.to_le_bytes().to_vec()).await.unwrap();
        drop(tx);
        handle.await.unwrap();

        assert_eq!(ack.len(), 0);
        assert_eq!(counters.swap_reset(), 1);
    }
}
