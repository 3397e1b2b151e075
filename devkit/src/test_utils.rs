/*!
Test harness for the threshold state machine

- `SnapshotBuilder`: describe readings in engineering units, encode them the
  way the device's dialect would, and decode them back through the real
  decoder
- `TestHarness`: feeds snapshots with increasing timestamps and collects
  the emitted actions, with count expectations checked by `verify`
*/

use chrono::{DateTime, Utc};
use ups_kernel::{
    decode, Action, CycleOutcome, DaemonState, DecodeRule, KernelError, Param, PowerState, Reading,
    Snapshot, ThresholdConfig, ThresholdStateMachine, VendorType,
};

/// Install a test-writer subscriber once; later calls are no-ops.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "ups_kernel=debug,ups_daemon=debug".into());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init()
        .ok();
}

#[derive(Debug, Clone)]
enum RawReading {
    Raw(String),
    Unresponsive,
}

/// Snapshot described in engineering units
#[derive(Debug, Clone)]
pub struct SnapshotBuilder {
    device_id: String,
    vendor: VendorType,
    readings: Vec<(Param, RawReading)>,
}

impl SnapshotBuilder {
    /// APC dialect by default
    pub fn new(device_id: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            vendor: VendorType::ApcAp96xx,
            readings: Vec::new(),
        }
    }

    pub fn vendor(&self) -> VendorType {
        self.vendor
    }

    /// Values already encoded keep the previous dialect's scaling; set the
    /// vendor before any engineering value.
    pub fn with_vendor(mut self, vendor: VendorType) -> Self {
        self.vendor = vendor;
        self
    }

    /// Store a raw register string as the device would send it.
    pub fn raw(mut self, param: Param, raw: impl Into<String>) -> Self {
        self.readings.retain(|(p, _)| *p != param);
        self.readings.push((param, RawReading::Raw(raw.into())));
        self
    }

    pub fn unresponsive(mut self, param: Param) -> Self {
        self.readings.retain(|(p, _)| *p != param);
        self.readings.push((param, RawReading::Unresponsive));
        self
    }

    /// Encode an engineering value with the dialect's rule for `param`.
    fn encoded(self, param: Param, value: f64) -> Self {
        let raw = match self.vendor.dialect().lookup(param).map(|spec| spec.rule) {
            Some(DecodeRule::Scaled { scale, .. }) => format!("{}", (value * scale).round() as i64),
            Some(DecodeRule::Duration { ticks_per_second }) => {
                format!("{}", (value * 60.0 * f64::from(ticks_per_second)).round() as u64)
            }
            _ => format!("{}", value.round() as i64),
        };
        self.raw(param, raw)
    }

    pub fn time_on_battery(self, minutes: f64) -> Self {
        self.encoded(Param::TimeOnBattery, minutes)
    }

    pub fn runtime_remaining(self, minutes: f64) -> Self {
        self.encoded(Param::RuntimeRemaining, minutes)
    }

    pub fn capacity(self, percent: f64) -> Self {
        self.encoded(Param::BatteryCapacity, percent)
    }

    pub fn load(self, percent: f64) -> Self {
        self.encoded(Param::OutputLoad, percent)
    }

    /// Battery status code `2` (normal)
    pub fn battery_normal(self) -> Self {
        self.raw(Param::BatteryStatus, "2")
    }

    /// Battery status code `3` (low)
    pub fn battery_low(self) -> Self {
        self.raw(Param::BatteryStatus, "3")
    }

    /// On line power with a full battery and light load
    pub fn online(device_id: impl Into<String>) -> Self {
        Self::new(device_id)
            .battery_normal()
            .time_on_battery(0.0)
            .runtime_remaining(58.0)
            .capacity(100.0)
            .load(25.0)
    }

    /// On battery for `minutes`, other readings healthy
    pub fn on_battery(device_id: impl Into<String>, minutes: f64) -> Self {
        Self::online(device_id).time_on_battery(minutes)
    }

    pub fn raw_values(&self) -> impl Iterator<Item = (Param, &str)> {
        self.readings.iter().filter_map(|(param, reading)| match reading {
            RawReading::Raw(raw) => Some((*param, raw.as_str())),
            RawReading::Unresponsive => None,
        })
    }

    /// Decode every reading through the real dialect and decoder.
    pub fn build(&self, thresholds: &ThresholdConfig, taken_at: DateTime<Utc>) -> Snapshot {
        let dialect = self.vendor.dialect();
        let mut snapshot = Snapshot::new(self.device_id.clone(), taken_at);
        for (param, reading) in &self.readings {
            let reading = match (reading, dialect.lookup(*param)) {
                (RawReading::Raw(raw), Some(spec)) => Reading::Value(decode(raw, &spec.rule, thresholds)),
                (RawReading::Raw(_), None) => continue,
                (RawReading::Unresponsive, _) => {
                    snapshot.responsive = false;
                    Reading::Unresponsive
                }
            };
            snapshot.readings.insert(*param, reading);
        }
        snapshot
    }

    pub fn snapshot(&self) -> Snapshot {
        self.build(&ThresholdConfig::default(), Utc::now())
    }
}

#[derive(Debug)]
struct Expectation {
    action: Action,
    expected_count: usize,
}

/// Drives one state machine with a simulated poll clock
pub struct TestHarness {
    machine: ThresholdStateMachine,
    thresholds: ThresholdConfig,
    clock: DateTime<Utc>,
    step: chrono::Duration,
    actions: Vec<Action>,
    outcomes: Vec<CycleOutcome>,
    expectations: Vec<Expectation>,
}

impl TestHarness {
    pub fn new(thresholds: ThresholdConfig) -> Self {
        init_tracing();
        Self {
            machine: ThresholdStateMachine::new("ups", thresholds.clone()),
            thresholds,
            clock: Utc::now(),
            step: chrono::Duration::seconds(30),
            actions: Vec::new(),
            outcomes: Vec::new(),
            expectations: Vec::new(),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(ThresholdConfig::default())
    }

    pub fn thresholds(&self) -> &ThresholdConfig {
        &self.thresholds
    }

    /// Build, timestamp and process the next snapshot.
    pub fn feed(&mut self, builder: SnapshotBuilder) -> Result<CycleOutcome, KernelError> {
        let snapshot = builder.build(&self.thresholds, self.clock);
        self.clock += self.step;
        self.feed_snapshot(&snapshot)
    }

    /// Process a snapshot stamped `taken_at` the way the poll loop does.
    pub fn feed_cycle_at(&mut self, builder: SnapshotBuilder, taken_at: DateTime<Utc>) -> CycleOutcome {
        let mut snapshot = builder.build(&self.thresholds, taken_at);
        let outcome = self.machine.observe_cycle(&mut snapshot);
        self.actions.extend(outcome.actions.iter().copied());
        self.outcomes.push(outcome.clone());
        outcome
    }

    pub fn feed_snapshot(&mut self, snapshot: &Snapshot) -> Result<CycleOutcome, KernelError> {
        let outcome = self.machine.observe(snapshot)?;
        self.actions.extend(outcome.actions.iter().copied());
        self.outcomes.push(outcome.clone());
        Ok(outcome)
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn count(&self, action: Action) -> usize {
        self.actions.iter().filter(|a| **a == action).count()
    }

    pub fn outcomes(&self) -> &[CycleOutcome] {
        &self.outcomes
    }

    pub fn state(&self) -> &DaemonState {
        self.machine.state()
    }

    pub fn power_state(&self) -> PowerState {
        self.machine.state().power_state()
    }

    /// Expect `action` to have fired exactly `count` times when `verify` runs.
    pub fn expect_action(&mut self, action: Action, count: usize) -> &mut Self {
        self.expectations.push(Expectation {
            action,
            expected_count: count,
        });
        self
    }

    pub fn verify(&self) -> Result<(), String> {
        let failures: Vec<String> = self
            .expectations
            .iter()
            .filter_map(|e| {
                let actual = self.count(e.action);
                (actual != e.expected_count).then(|| {
                    format!("{}: expected {}, got {}", e.action, e.expected_count, actual)
                })
            })
            .collect();

        if failures.is_empty() {
            Ok(())
        } else {
            Err(failures.join("; "))
        }
    }
}
