//! UPS daemon library: configuration, action scripts, reporting sinks and
//! the poll loop. The binary in `main.rs` wires these together.

pub mod config;
pub mod execution;
pub mod poller;
pub mod report;

pub use config::{DaemonConfig, ScriptConfig, SnmpConfig};
pub use execution::ScriptExecutor;
pub use poller::PollLoop;
pub use report::{Board, LogReporter, Report, SnapshotBoard};
