/*!
Recording sinks

Capture every action trigger and every report so tests can assert on what
the poll loop or state machine emitted, in order.
*/

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;
use ups_kernel::{Action, ActionError, ActionSink, DaemonState, ReportSink, Snapshot};

use crate::state::{new_state, Shared};

/// Action sink that records triggers; optionally fails every one of them
#[derive(Clone, Default)]
pub struct RecordingActionSink {
    triggered: Shared<Vec<Action>>,
    failing: Arc<AtomicBool>,
}

impl RecordingActionSink {
    pub fn new() -> Self {
        Self {
            triggered: new_state(Vec::new()),
            failing: Arc::new(AtomicBool::new(false)),
        }
    }

    /// A sink whose commands always exit non-zero
    pub fn failing() -> Self {
        let sink = Self::new();
        sink.set_failing(true);
        sink
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn actions(&self) -> Vec<Action> {
        self.triggered.lock().clone()
    }

    pub fn count(&self, action: Action) -> usize {
        self.triggered.lock().iter().filter(|a| **a == action).count()
    }

    pub fn clear(&self) {
        self.triggered.lock().clear();
    }
}

#[async_trait]
impl ActionSink for RecordingActionSink {
    async fn trigger(&self, action: Action) -> Result<(), ActionError> {
        self.triggered.lock().push(action);
        info!(%action, "[MOCK] Action triggered");

        if self.failing.load(Ordering::SeqCst) {
            return Err(ActionError::Failed {
                action,
                code: Some(1),
                stderr: "simulated failure".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedReport {
    pub snapshot: Snapshot,
    pub state: DaemonState,
}

/// Report sink that keeps every report it receives
#[derive(Clone, Default)]
pub struct RecordingReporter {
    reports: Shared<Vec<RecordedReport>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self {
            reports: new_state(Vec::new()),
        }
    }

    pub fn reports(&self) -> Vec<RecordedReport> {
        self.reports.lock().clone()
    }

    pub fn reports_for(&self, device_id: &str) -> Vec<RecordedReport> {
        self.reports
            .lock()
            .iter()
            .filter(|r| r.snapshot.device_id == device_id)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.reports.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.lock().is_empty()
    }
}

impl ReportSink for RecordingReporter {
    fn report(&self, snapshot: &Snapshot, state: &DaemonState) {
        self.reports.lock().push(RecordedReport {
            snapshot: snapshot.clone(),
            state: *state,
        });
    }
}
