use chrono::{DateTime, Utc};

use crate::thresholds::Metric;
use crate::transport::TransportError;

/// Errors raised by kernel operations
#[derive(Debug, thiserror::Error)]
pub enum KernelError {
    #[error("Unsupported vendor type: {0}")]
    UnsupportedVendorType(String),
    #[error("Unknown parameter: {0}")]
    UnknownParameter(String),
    #[error("Invalid threshold for {metric}: {reason}")]
    InvalidThreshold { metric: Metric, reason: String },
    #[error("Invalid read interval: {0}")]
    InvalidInterval(String),
    #[error("Snapshot for {device} taken at {taken_at} is older than the last one processed")]
    OutOfOrderSnapshot {
        device: String,
        taken_at: DateTime<Utc>,
    },
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}
