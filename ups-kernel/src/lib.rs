//! UPS monitoring kernel
//!
//! Vendor-abstracted SNMP register access and the power-event state machine:
//!
//! - `dialect`: per-vendor OID tables over the canonical `Param` vocabulary
//! - `decoder`: raw register strings to typed, severity-classified values
//! - `transport`: one bounded SNMP GET per call
//! - `inventory`: configured devices and their probe flags
//! - `reader`: per-cycle snapshot assembly with single-retry policy
//! - `state`: threshold-driven transitions and idempotent actions
//! - `sinks`: action and reporting seams consumed by the daemon

pub mod decoder;
pub mod dialect;
pub mod error;
pub mod inventory;
pub mod models;
pub mod reader;
pub mod sinks;
pub mod state;
pub mod thresholds;
pub mod transport;

pub use decoder::decode;
pub use dialect::{register_specs_for, register_specs_in, DecodeRule, Dialect, RegisterSpec, VendorType};
pub use error::KernelError;
pub use inventory::{DeviceDescriptor, DeviceFilter, DeviceFlags, DeviceSpec, Inventory};
pub use models::{Category, DecodedValue, Param, Reading, Severity, Snapshot, Value};
pub use reader::SnapshotReader;
pub use sinks::{ActionError, ActionSink, ReportSink};
pub use state::{Action, CycleOutcome, DaemonState, PollMode, PowerInputs, PowerState, ThresholdStateMachine};
pub use thresholds::{Metric, ReadInterval, Threshold, ThresholdConfig};
pub use transport::{Endpoint, SnmpGet, SnmpTransport, TransportError};
