//! The Probe Host abstraction (spec §4.3).
//!
//! The concrete binding to the kernel's dynamic-instrumentation facility is
//! an external collaborator (spec §1); this trait is the contract the trace
//! engine programs against. `xcover-probe` supplies the Linux
//! implementation.

use std::sync::Arc;

use async_trait::async_trait;
use xcover_common::Cookie;

use crate::error::CoreError;
use crate::status::ChannelGauge;

/// A boxed stream of opaque event byte slices, one per firing.
pub type EventStream = std::pin::Pin<Box<dyn futures::Stream<Item = Vec<u8>> + Send>>;

/// The kernel-assisted instrumentation facility, abstracted.
///
/// The kernel-side program is a sealed artifact: its only observable
/// contract is "for each invocation of a function at an attached offset,
/// emit one record containing the associated cookie in native byte order."
#[async_trait]
pub trait ProbeHost: Send {
    /// Parses the precompiled instrumentation object from `object_bytes`,
    /// resolves the entry-handler program, declares its attach type, and
    /// commits the object to the kernel.
    fn load(&mut self, object_bytes: &[u8], module_name: &str) -> Result<(), CoreError>;

    /// Installs entry probes at `exe_path` at the given file offsets, each
    /// carrying its paired cookie. The caller has already partitioned the
    /// input into batches of at most `MAX_PROBES_PER_BATCH`. Partial success
    /// is tolerated: probes that fail to attach simply produce no events.
    fn attach(&mut self, exe_path: &str, offsets: &[u64], cookies: &[Cookie]) -> Result<(), CoreError>;

    /// Returns an asynchronous source of opaque event byte slices.
    /// `ring_gauge` is updated with the source's own buffering pressure as
    /// events are drained from it, independent of the feed channel the
    /// trace engine forwards them into (spec §4.7: ring and feed
    /// utilisation are reported separately).
    fn events(&mut self, ring_gauge: Arc<ChannelGauge>) -> Result<EventStream, CoreError>;

    /// Detaches all probes and releases resources.
    fn close(&mut self) -> Result<(), CoreError>;
}
