//! The trace engine: symbol discovery and filtering, the tracee function
//! table, the Probe Host contract, the event pipeline, the readiness
//! server, the status reporter, the coverage report, and the orchestrator
//! that sequences all of them through one run.

pub mod ack_set;
pub mod error;
pub mod filter;
pub mod orchestrator;
pub mod pipeline;
pub mod probe_host;
pub mod readiness;
pub mod report;
pub mod status;
pub mod symbols;
pub mod tracee;

pub use ack_set::AcknowledgementSet;
pub use error::CoreError;
pub use filter::{SymbolFilter, SymbolFilterBuilder};
pub use orchestrator::{run, RunConfig};
pub use probe_host::{EventStream, ProbeHost};
pub use readiness::ReadinessServer;
pub use report::CoverageReport;
pub use tracee::{FunctionRecord, Tracee};
