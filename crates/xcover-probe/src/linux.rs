#![cfg(target_os = "linux")]

//! Linux `ProbeHost`: loads the instrumentation object with `aya`, arms
//! uprobe-multi attachments batch by batch, and bridges the kernel ring
//! buffer into an async event stream via a dedicated polling thread.

use std::sync::{Arc, Mutex};

use aya::maps::RingBuf;
use aya::programs::UProbe;
use aya::Ebpf;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use xcover_common::Cookie;
use xcover_core::status::ChannelGauge;
use xcover_core::{CoreError, EventStream, ProbeHost};

use crate::error::ProbeError;

const ENTRY_PROGRAM: &str = "handle_user_function";
const EVENTS_MAP: &str = "EVENTS";

pub struct LinuxProbeHost {
    bpf: Option<Arc<Mutex<Ebpf>>>,
}

impl Default for LinuxProbeHost {
    fn default() -> Self {
        Self { bpf: None }
    }
}

impl LinuxProbeHost {
    pub fn new() -> Self {
        Self::default()
    }

    fn bpf(&self) -> Result<&Arc<Mutex<Ebpf>>, ProbeError> {
        self.bpf.as_ref().ok_or(ProbeError::ProgramNotFound { name: ENTRY_PROGRAM })
    }
}

impl ProbeHost for LinuxProbeHost {
    fn load(&mut self, object_bytes: &[u8], _module_name: &str) -> Result<(), CoreError> {
        let ebpf = Ebpf::load(object_bytes).map_err(ProbeError::Load)?;
        self.bpf = Some(Arc::new(Mutex::new(ebpf)));
        Ok(())
    }

    fn attach(&mut self, exe_path: &str, offsets: &[u64], cookies: &[Cookie]) -> Result<(), CoreError> {
        debug_assert_eq!(offsets.len(), cookies.len());
        let bpf = self.bpf()?.clone();
        let mut guard = bpf.lock().unwrap();

        let program = guard
            .program_mut(ENTRY_PROGRAM)
            .ok_or(ProbeError::ProgramNotFound { name: ENTRY_PROGRAM })?;
        let uprobe: &mut UProbe = program.try_into().map_err(ProbeError::ProgramLoad)?;
        uprobe.load().map_err(ProbeError::ProgramLoad)?;

        let mut attached = 0usize;
        for (&offset, &cookie) in offsets.iter().zip(cookies) {
            match uprobe.attach_with_cookie(None, offset, exe_path, None, cookie) {
                Ok(_link) => attached += 1,
                Err(err) => {
                    tracing::warn!(%err, offset = format!("{offset:#x}"), "failed to attach probe; skipping");
                }
            }
        }

        if attached == 0 && !offsets.is_empty() {
            return Err(ProbeError::Attach("no probes in batch attached".into()).into());
        }
        Ok(())
    }

    fn events(&mut self, ring_gauge: Arc<ChannelGauge>) -> Result<EventStream, CoreError> {
        let bpf = self.bpf()?.clone();
        let capacity = xcover_common::RING_BUFFER_DEPTH;
        let (tx, rx) = mpsc::channel(capacity);

        std::thread::spawn(move || loop {
            {
                let mut guard = bpf.lock().unwrap();
                if let Some(map) = guard.map_mut(EVENTS_MAP) {
                    if let Ok(mut ring) = RingBuf::try_from(map) {
                        while let Some(item) = ring.next() {
                            // Sampled before the send so a full bridging
                            // channel reads as 100% ring-buffer pressure
                            // rather than lagging one event behind.
                            ring_gauge.set(capacity.saturating_sub(tx.capacity()));
                            if tx.blocking_send(item.to_vec()).is_err() {
                                return;
                            }
                        }
                    }
                }
            }
            std::thread::sleep(std::time::Duration::from_millis(5));
        });

        Ok(Box::pin(ReceiverStream::new(rx)))
    }

    fn close(&mut self) -> Result<(), CoreError> {
        self.bpf = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unloaded_host_rejects_attach() {
        let mut host = LinuxProbeHost::new();
        let err = host.attach("/bin/true", &[0x1000], &[42]).unwrap_err();
        assert!(matches!(err, CoreError::LoadFailed(_)));
    }
}
