//! Reporting sinks
//!
//! - `LogReporter`: one structured log line per snapshot
//! - `SnapshotBoard`: latest report per device behind a `watch` channel, so a
//!   display task reads immutable copies while the poll loop stays the only
//!   writer

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};
use ups_kernel::{DaemonState, Param, ReportSink, Snapshot};

/// A snapshot and the state it produced
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub snapshot: Snapshot,
    pub state: DaemonState,
}

impl Report {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Latest report per device id
pub type Board = BTreeMap<String, Arc<Report>>;

#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl LogReporter {
    fn summary(snapshot: &Snapshot) -> String {
        Param::POWER_INPUTS
            .iter()
            .filter_map(|param| snapshot.get(*param).map(|value| format!("{param}={value}")))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl ReportSink for LogReporter {
    fn report(&self, snapshot: &Snapshot, state: &DaemonState) {
        if !snapshot.responsive {
            warn!(device = %snapshot.device_id, "UPS not responding");
        }
        info!(
            device = %snapshot.device_id,
            state = %state.power_state(),
            interval_secs = state.poll_interval.as_secs(),
            readings = %Self::summary(snapshot),
            "Snapshot"
        );
        for (param, value) in snapshot.critical() {
            warn!(device = %snapshot.device_id, %param, %value, "Critical reading");
        }
    }
}

pub struct SnapshotBoard {
    tx: watch::Sender<Arc<Board>>,
}

impl Default for SnapshotBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotBoard {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Arc::new(Board::new()));
        Self { tx }
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<Board>> {
        self.tx.subscribe()
    }

    pub fn latest(&self, device_id: &str) -> Option<Arc<Report>> {
        self.tx.borrow().get(device_id).cloned()
    }
}

impl ReportSink for SnapshotBoard {
    fn report(&self, snapshot: &Snapshot, state: &DaemonState) {
        let report = Arc::new(Report {
            snapshot: snapshot.clone(),
            state: *state,
        });
        self.tx.send_modify(|board| {
            let mut next = Board::clone(board);
            next.insert(snapshot.device_id.clone(), report);
            *board = Arc::new(next);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use ups_kernel::{DecodedValue, Reading, Severity, ThresholdConfig, ThresholdStateMachine, Value};

    fn snapshot(device: &str, capacity: f64) -> Snapshot {
        let mut snapshot = Snapshot::new(device, Utc::now());
        snapshot.readings.insert(
            Param::BatteryCapacity,
            Reading::Value(DecodedValue::new(Value::Number(capacity), Some("%"), Severity::Normal)),
        );
        snapshot
    }

    #[test]
    fn test_board_publishes_immutable_copies() {
        let state = *ThresholdStateMachine::new("ups", ThresholdConfig::default()).state();
        let board = SnapshotBoard::new();
        let rx = board.subscribe();

        board.report(&snapshot("ups", 90.0), &state);
        let first = rx.borrow().clone();

        board.report(&snapshot("ups", 80.0), &state);
        board.report(&snapshot("other", 70.0), &state);

        assert_eq!(first["ups"].snapshot.number(Param::BatteryCapacity), Some(90.0));
        let latest = rx.borrow().clone();
        assert_eq!(latest.len(), 2);
        assert_eq!(
            board.latest("ups").unwrap().snapshot.number(Param::BatteryCapacity),
            Some(80.0)
        );
    }

    #[test]
    fn test_report_serializes() {
        let state = *ThresholdStateMachine::new("ups", ThresholdConfig::default()).state();
        let json = Report { snapshot: snapshot("ups", 55.0), state }.to_json().unwrap();
        assert!(json.contains("\"battery_capacity\""));
        assert!(json.contains("\"poll_mode\":\"normal\""));
    }

    #[test]
    fn test_summary_lists_power_inputs() {
        assert_eq!(LogReporter::summary(&snapshot("ups", 42.0)), "battery_capacity=42.0 %");
    }
}
