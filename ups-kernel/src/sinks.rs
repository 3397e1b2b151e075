//! Collaborator seams for the poll loop's outputs

use async_trait::async_trait;
use std::time::Duration;

use crate::models::Snapshot;
use crate::state::{Action, DaemonState};

#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("No command configured for {0}")]
    NotConfigured(Action),
    #[error("Failed to start {action} command: {source}")]
    Spawn {
        action: Action,
        #[source]
        source: std::io::Error,
    },
    #[error("{action} command timed out after {after:?}")]
    Timeout { action: Action, after: Duration },
    #[error("{action} command exited with {code:?}: {stderr}")]
    Failed {
        action: Action,
        code: Option<i32>,
        stderr: String,
    },
}

/// Executes power actions. Failures are logged by the caller and never retried.
#[async_trait]
pub trait ActionSink: Send + Sync {
    async fn trigger(&self, action: Action) -> Result<(), ActionError>;
}

/// Receives every snapshot in poll order with a copy of the device's state.
pub trait ReportSink: Send + Sync {
    fn report(&self, snapshot: &Snapshot, state: &DaemonState);
}
