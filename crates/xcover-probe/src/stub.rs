#![cfg(not(target_os = "linux"))]

//! Non-Linux builds have no kernel-assisted instrumentation facility; every
//! call reports [`CoreError::LoadFailed`] so the CLI can fail fast with a
//! clear message instead of panicking on a missing backend.

use std::sync::Arc;

use xcover_common::Cookie;
use xcover_core::status::ChannelGauge;
use xcover_core::{CoreError, EventStream, ProbeHost};

use crate::error::ProbeError;

#[derive(Default)]
pub struct UnsupportedProbeHost;

impl UnsupportedProbeHost {
    pub fn new() -> Self {
        Self
    }
}

impl ProbeHost for UnsupportedProbeHost {
    fn load(&mut self, _object_bytes: &[u8], _module_name: &str) -> Result<(), CoreError> {
        Err(ProbeError::NotSupported.into())
    }

    fn attach(&mut self, _exe_path: &str, _offsets: &[u64], _cookies: &[Cookie]) -> Result<(), CoreError> {
        Err(ProbeError::NotSupported.into())
    }

    fn events(&mut self, _ring_gauge: Arc<ChannelGauge>) -> Result<EventStream, CoreError> {
        Err(ProbeError::NotSupported.into())
    }

    fn close(&mut self) -> Result<(), CoreError> {
        Ok(())
    }
}
