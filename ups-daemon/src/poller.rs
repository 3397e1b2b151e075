//! Poll loop
//!
//! Single writer of every `DaemonState` and device flag. Each cycle reads
//! the dynamic categories of every polled device in id order, feeds the
//! snapshot to that device's state machine, hands copies to the reporting
//! sinks and dispatches actions for the daemon device only.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use ups_kernel::{
    ActionSink, Category, CycleOutcome, DaemonState, Inventory, Param, ReportSink, SnapshotReader,
    SnmpTransport, ThresholdConfig, ThresholdStateMachine,
};

const SLEEP_TICK: Duration = Duration::from_secs(1);

pub struct PollLoop<T, A> {
    inventory: Inventory,
    thresholds: ThresholdConfig,
    transport: T,
    actions: A,
    reporters: Vec<Arc<dyn ReportSink>>,
    machines: BTreeMap<String, ThresholdStateMachine>,
}

impl<T, A> PollLoop<T, A>
where
    T: SnmpTransport,
    A: ActionSink,
{
    /// Devices with an unsupported vendor get no state machine and are never polled.
    pub fn new(inventory: Inventory, thresholds: ThresholdConfig, transport: T, actions: A) -> Self {
        let machines = inventory
            .iter()
            .filter(|d| d.vendor().is_some())
            .map(|d| {
                (
                    d.id().to_string(),
                    ThresholdStateMachine::new(d.id(), thresholds.clone()),
                )
            })
            .collect();

        Self {
            inventory,
            thresholds,
            transport,
            actions,
            reporters: Vec::new(),
            machines,
        }
    }

    pub fn add_reporter(&mut self, reporter: Arc<dyn ReportSink>) {
        self.reporters.push(reporter);
    }

    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    pub fn polled_devices(&self) -> impl Iterator<Item = &str> {
        self.machines.keys().map(String::as_str)
    }

    pub fn state_of(&self, device_id: &str) -> Option<DaemonState> {
        self.machines.get(device_id).map(|m| *m.state())
    }

    /// Probe every device and log an identity summary of the responsive ones.
    pub async fn startup(&mut self) {
        self.inventory.probe_all(&self.transport).await;

        let reader = SnapshotReader::new(&self.transport, &self.thresholds);
        for device in self.inventory.iter_mut() {
            if !device.flags().responsive {
                warn!(device = %device.id(), address = %device.endpoint().address, "Device not responding at startup");
                continue;
            }
            let Ok(identity) = reader.read_category(device, Category::Static).await else {
                continue;
            };
            let field = |param| {
                identity
                    .get(param)
                    .map(|v| v.to_string())
                    .unwrap_or_else(|| "-".to_string())
            };
            info!(
                device = %device.id(),
                name = %device.display_name(),
                vendor = %device.vendor_tag(),
                daemon = device.is_daemon(),
                model = %field(Param::UpsModel),
                serial = %field(Param::SerialNumber),
                firmware = %field(Param::FirmwareRevision),
                "Inventory"
            );
        }
    }

    /// Poll every device once. Returns each device's outcome in id order.
    pub async fn run_cycle(&mut self) -> Vec<(String, CycleOutcome)> {
        let mut outcomes = Vec::with_capacity(self.machines.len());
        let reader = SnapshotReader::new(&self.transport, &self.thresholds);

        for (id, machine) in self.machines.iter_mut() {
            let Some(device) = self.inventory.get_mut(id) else {
                continue;
            };

            let mut snapshot = match reader.read_categories(device, Category::DYNAMIC).await {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    error!(device = %id, error = %e, "Snapshot read failed");
                    continue;
                }
            };

            let outcome = machine.observe_cycle(&mut snapshot);

            let state = *machine.state();
            for reporter in &self.reporters {
                reporter.report(&snapshot, &state);
            }

            if outcome.overload_raised {
                warn!(device = %id, "Overload fault raised, resume disabled until restart");
            }

            if device.is_daemon() {
                for action in &outcome.actions {
                    // the transition stands even when the command fails
                    if let Err(e) = self.actions.trigger(*action).await {
                        error!(device = %id, %action, error = %e, "Action failed");
                    }
                }
            } else if !outcome.actions.is_empty() {
                info!(device = %id, actions = ?outcome.actions, "Not the daemon device, actions not dispatched");
            }

            outcomes.push((id.clone(), outcome));
        }
        outcomes
    }

    /// The daemon device's interval, else the shortest active one.
    pub fn active_interval(&self) -> Duration {
        let daemon_interval = self
            .inventory
            .daemon_device()
            .and_then(|d| self.machines.get(d.id()))
            .map(ThresholdStateMachine::poll_interval);

        daemon_interval
            .or_else(|| self.machines.values().map(|m| m.poll_interval()).min())
            .unwrap_or_else(|| self.thresholds.read_interval.normal_duration())
    }

    /// Poll until `cancel` fires. A cycle in progress always completes.
    pub async fn run(&mut self, cancel: CancellationToken) {
        info!(devices = self.machines.len(), "Poll loop started");
        loop {
            if cancel.is_cancelled() {
                break;
            }
            self.run_cycle().await;
            if sleep_or_cancel(self.active_interval(), &cancel).await {
                break;
            }
        }
        info!("Poll loop stopped");
    }
}

/// Sleep in one-second ticks; true if cancelled first.
async fn sleep_or_cancel(total: Duration, cancel: &CancellationToken) -> bool {
    let deadline = Instant::now() + total;
    loop {
        let now = Instant::now();
        if now >= deadline {
            return cancel.is_cancelled();
        }
        let tick = (deadline - now).min(SLEEP_TICK);
        tokio::select! {
            _ = cancel.cancelled() => return true,
            _ = sleep(tick) => {}
        }
    }
}
