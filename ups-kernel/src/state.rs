//! Threshold state machine
//!
//! Folds one device's time-ordered snapshots into power-state transitions
//! and action triggers. Rules run in a fixed order each cycle:
//!
//! 1. Line power (`time_on_battery == 0`): cancel a pending shutdown, return
//!    the poll interval to normal, go `Online`.
//! 2. Battery power: go `OnBattery`; a crossed warning threshold selects the
//!    fault poll interval until line power returns; a low battery or crossed
//!    critical threshold issues `shutdown` once.
//! 3. Output load above critical raises the sticky overload fault.
//! 4. Suspend once time on battery or load passes critical; resume once time
//!    on battery is back under critical, unless the overload fault is set.
//!
//! Every action fires once per entry into the state that causes it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::KernelError;
use crate::models::{Param, Severity, Snapshot};
use crate::thresholds::ThresholdConfig;

/// External actions the state machine can trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Suspend,
    Resume,
    Shutdown,
    CancelShutdown,
}

impl Action {
    pub const ALL: &'static [Action] = &[
        Action::Suspend,
        Action::Resume,
        Action::Shutdown,
        Action::CancelShutdown,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Action::Suspend => "suspend",
            Action::Resume => "resume",
            Action::Shutdown => "shutdown",
            Action::CancelShutdown => "cancel_shutdown",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerState {
    Online,
    OnBattery,
    ShuttingDown,
    Suspended,
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PowerState::Online => "online",
            PowerState::OnBattery => "on battery",
            PowerState::ShuttingDown => "shutting down",
            PowerState::Suspended => "suspended",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PollMode {
    Normal,
    Fault,
}

/// Authoritative state for one monitored device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaemonState {
    pub on_battery: bool,
    pub shutting_down: bool,
    pub suspended: bool,
    pub poll_mode: PollMode,
    pub poll_interval: Duration,
    /// Sticky for the process lifetime
    pub overload_fault: bool,
}

impl DaemonState {
    fn initial(config: &ThresholdConfig) -> Self {
        Self {
            on_battery: false,
            shutting_down: false,
            suspended: false,
            poll_mode: PollMode::Normal,
            poll_interval: config.read_interval.normal_duration(),
            overload_fault: false,
        }
    }

    /// `ShuttingDown` outranks `Suspended`, which outranks `OnBattery`.
    pub fn power_state(&self) -> PowerState {
        if self.shutting_down {
            PowerState::ShuttingDown
        } else if self.suspended {
            PowerState::Suspended
        } else if self.on_battery {
            PowerState::OnBattery
        } else {
            PowerState::Online
        }
    }
}

/// The per-cycle values the rules consume
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerInputs {
    pub battery_low: bool,
    pub output_load: Option<f64>,
    pub battery_capacity: Option<f64>,
    /// Minutes
    pub time_on_battery: f64,
    /// Minutes
    pub runtime_remaining: Option<f64>,
}

impl PowerInputs {
    /// `None` when the snapshot has no usable time-on-battery reading.
    pub fn from_snapshot(snapshot: &Snapshot) -> Option<Self> {
        let time_on_battery = snapshot.minutes(Param::TimeOnBattery)?;
        let battery_low = snapshot
            .get(Param::BatteryStatus)
            .is_some_and(|status| status.severity == Severity::Critical);

        Some(Self {
            battery_low,
            output_load: snapshot.number(Param::OutputLoad),
            battery_capacity: snapshot.number(Param::BatteryCapacity),
            time_on_battery,
            runtime_remaining: snapshot.minutes(Param::RuntimeRemaining),
        })
    }
}

/// What one cycle changed
#[derive(Debug, Clone, PartialEq)]
pub struct CycleOutcome {
    pub previous: PowerState,
    pub current: PowerState,
    /// In emission order
    pub actions: Vec<Action>,
    /// New active poll interval, when it changed this cycle
    pub interval_changed: Option<Duration>,
    /// True on the cycle that first raised the overload fault
    pub overload_raised: bool,
    /// False when the snapshot lacked the inputs to evaluate the rules
    pub evaluated: bool,
}

impl CycleOutcome {
    fn skipped(state: PowerState) -> Self {
        Self {
            previous: state,
            current: state,
            actions: Vec::new(),
            interval_changed: None,
            overload_raised: false,
            evaluated: false,
        }
    }
}

fn below(value: Option<f64>, limit: f64) -> bool {
    value.is_some_and(|v| v < limit)
}

fn above(value: Option<f64>, limit: f64) -> bool {
    value.is_some_and(|v| v > limit)
}

pub struct ThresholdStateMachine {
    device_id: String,
    config: ThresholdConfig,
    state: DaemonState,
    last_seen: Option<DateTime<Utc>>,
}

impl ThresholdStateMachine {
    pub fn new(device_id: impl Into<String>, config: ThresholdConfig) -> Self {
        let state = DaemonState::initial(&config);
        Self {
            device_id: device_id.into(),
            config,
            state,
            last_seen: None,
        }
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn state(&self) -> &DaemonState {
        &self.state
    }

    pub fn poll_interval(&self) -> Duration {
        self.state.poll_interval
    }

    /// Process a snapshot from an external source; older snapshots than the
    /// last one are rejected.
    pub fn observe(&mut self, snapshot: &Snapshot) -> Result<CycleOutcome, KernelError> {
        if let Some(last) = self.last_seen {
            if snapshot.taken_at < last {
                return Err(KernelError::OutOfOrderSnapshot {
                    device: snapshot.device_id.clone(),
                    taken_at: snapshot.taken_at,
                });
            }
        }
        Ok(self.evaluate(snapshot))
    }

    /// Process the snapshot of the current poll cycle. Cycles are ordered by
    /// the loop itself, so a timestamp behind the last one (wall clock stepped
    /// back) is raised to it and the cycle is still evaluated.
    pub fn observe_cycle(&mut self, snapshot: &mut Snapshot) -> CycleOutcome {
        if let Some(last) = self.last_seen {
            if snapshot.taken_at < last {
                warn!(
                    device = %self.device_id,
                    taken_at = %snapshot.taken_at,
                    last = %last,
                    "Wall clock stepped back, keeping poll order"
                );
                snapshot.taken_at = last;
            }
        }
        self.evaluate(snapshot)
    }

    fn evaluate(&mut self, snapshot: &Snapshot) -> CycleOutcome {
        self.last_seen = Some(snapshot.taken_at);

        match PowerInputs::from_snapshot(snapshot) {
            Some(inputs) => self.step(&inputs),
            None => {
                warn!(device = %self.device_id, "No time on battery reading, state unchanged");
                CycleOutcome::skipped(self.state.power_state())
            }
        }
    }

    /// Apply the transition rules to one cycle's inputs.
    pub fn step(&mut self, inputs: &PowerInputs) -> CycleOutcome {
        let cfg = &self.config;
        let state = &mut self.state;
        let previous = state.power_state();
        let previous_interval = state.poll_interval;
        let mut actions = Vec::new();
        let mut overload_raised = false;

        if inputs.time_on_battery <= 0.0 {
            if state.shutting_down {
                state.shutting_down = false;
                actions.push(Action::CancelShutdown);
            }
            state.poll_mode = PollMode::Normal;
            state.on_battery = false;
        } else {
            state.on_battery = true;

            let warning = below(inputs.runtime_remaining, cfg.battery_time_rem.warn)
                || below(inputs.battery_capacity, cfg.battery_capacity.warn);
            if warning && state.poll_mode == PollMode::Normal {
                state.poll_mode = PollMode::Fault;
            }

            let critical = inputs.battery_low
                || below(inputs.battery_capacity, cfg.battery_capacity.crit)
                || below(inputs.runtime_remaining, cfg.battery_time_rem.crit);
            if critical && !state.shutting_down {
                state.shutting_down = true;
                actions.push(Action::Shutdown);
            }
        }

        let overloaded = above(inputs.output_load, cfg.battery_load.crit);
        if overloaded {
            warn!(
                device = %self.device_id,
                load = inputs.output_load.unwrap_or_default(),
                crit = cfg.battery_load.crit,
                "Output overload"
            );
            if !state.overload_fault {
                state.overload_fault = true;
                overload_raised = true;
            }
        }

        if state.suspended {
            if inputs.time_on_battery < cfg.time_on_battery.crit && !state.overload_fault {
                state.suspended = false;
                actions.push(Action::Resume);
            }
        } else if inputs.time_on_battery > cfg.time_on_battery.crit || overloaded {
            state.suspended = true;
            actions.push(Action::Suspend);
        }

        state.poll_interval = match state.poll_mode {
            PollMode::Normal => cfg.read_interval.normal_duration(),
            PollMode::Fault => cfg.read_interval.fault_duration(),
        };
        let interval_changed = (state.poll_interval != previous_interval).then_some(state.poll_interval);
        let current = state.power_state();

        if current != previous {
            info!(device = %self.device_id, from = %previous, to = %current, "Power state changed");
        }
        if let Some(interval) = interval_changed {
            info!(device = %self.device_id, interval_secs = interval.as_secs(), "Poll interval changed");
        }
        for action in &actions {
            info!(device = %self.device_id, %action, "Action triggered");
        }
        debug!(
            device = %self.device_id,
            time_on_battery = inputs.time_on_battery,
            state = %current,
            "Cycle evaluated"
        );

        CycleOutcome {
            previous,
            current,
            actions,
            interval_changed,
            overload_raised,
            evaluated: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(time_on_battery: f64) -> PowerInputs {
        PowerInputs {
            battery_low: false,
            output_load: Some(25.0),
            battery_capacity: Some(100.0),
            time_on_battery,
            runtime_remaining: Some(60.0),
        }
    }

    fn machine() -> ThresholdStateMachine {
        ThresholdStateMachine::new("ups", ThresholdConfig::default())
    }

    #[test]
    fn test_initial_state_is_online_normal() {
        let sm = machine();
        assert_eq!(sm.state().power_state(), PowerState::Online);
        assert_eq!(sm.poll_interval(), Duration::from_secs(30));
    }

    #[test]
    fn test_line_power_is_quiet() {
        let mut sm = machine();
        let outcome = sm.step(&inputs(0.0));
        assert_eq!(outcome.current, PowerState::Online);
        assert!(outcome.actions.is_empty());
        assert_eq!(outcome.interval_changed, None);
    }

    #[test]
    fn test_low_battery_status_triggers_shutdown() {
        let mut sm = machine();
        let outcome = sm.step(&PowerInputs { battery_low: true, ..inputs(2.0) });
        assert_eq!(outcome.actions, vec![Action::Shutdown]);
        assert_eq!(outcome.current, PowerState::ShuttingDown);
    }

    #[test]
    fn test_runtime_thresholds() {
        let mut sm = machine();
        let warn = sm.step(&PowerInputs { runtime_remaining: Some(8.0), ..inputs(1.0) });
        assert!(warn.actions.is_empty());
        assert_eq!(warn.interval_changed, Some(Duration::from_secs(10)));

        let crit = sm.step(&PowerInputs { runtime_remaining: Some(4.0), ..inputs(2.0) });
        assert_eq!(crit.actions, vec![Action::Shutdown]);
        assert_eq!(crit.interval_changed, None);
    }

    #[test]
    fn test_missing_inputs_do_not_cross_thresholds() {
        let mut sm = machine();
        let outcome = sm.step(&PowerInputs {
            battery_low: false,
            output_load: None,
            battery_capacity: None,
            time_on_battery: 3.0,
            runtime_remaining: None,
        });
        assert_eq!(outcome.current, PowerState::OnBattery);
        assert!(outcome.actions.is_empty());
    }

    #[test]
    fn test_overload_suspends_and_blocks_resume() {
        let mut sm = machine();
        let outcome = sm.step(&PowerInputs { output_load: Some(95.0), ..inputs(0.0) });
        assert!(outcome.overload_raised);
        assert_eq!(outcome.actions, vec![Action::Suspend]);
        assert!(sm.state().overload_fault);

        // load back to normal, still on line power: no resume while the fault stands
        for _ in 0..3 {
            let outcome = sm.step(&inputs(0.0));
            assert!(outcome.actions.is_empty());
            assert!(!outcome.overload_raised);
        }
        assert!(sm.state().suspended);
        assert!(sm.state().overload_fault);
    }

    #[test]
    fn test_resume_after_return_to_line_power() {
        let mut sm = machine();
        assert_eq!(sm.step(&inputs(31.0)).actions, vec![Action::Suspend]);
        assert!(sm.step(&inputs(32.0)).actions.is_empty());

        let back = sm.step(&inputs(0.0));
        assert_eq!(back.actions, vec![Action::Resume]);
        assert_eq!(back.current, PowerState::Online);
    }

    #[test]
    fn test_clock_step_back_still_evaluates_cycle() {
        use crate::models::{DecodedValue, Reading, Value};

        let mut sm = machine();
        let now = Utc::now();
        let duration = |minutes: f64| {
            Reading::Value(DecodedValue::new(
                Value::Duration { minutes, ticks: (minutes * 6000.0) as u64 },
                Some("min"),
                Severity::Unknown,
            ))
        };

        let mut online = Snapshot::new("ups", now);
        online.readings.insert(Param::TimeOnBattery, duration(0.0));
        assert!(sm.observe_cycle(&mut online).evaluated);

        let mut critical = Snapshot::new("ups", now - chrono::Duration::seconds(60));
        critical.readings.insert(Param::TimeOnBattery, duration(5.0));
        critical.readings.insert(Param::RuntimeRemaining, duration(2.0));

        let outcome = sm.observe_cycle(&mut critical);
        assert!(outcome.evaluated);
        assert_eq!(outcome.actions, vec![Action::Shutdown]);
        assert_eq!(critical.taken_at, now);
        assert_eq!(sm.state().power_state(), PowerState::ShuttingDown);
    }

    #[test]
    fn test_out_of_order_snapshot_rejected() {
        let mut sm = machine();
        let now = Utc::now();
        let later = Snapshot::new("ups", now);
        let earlier = Snapshot::new("ups", now - chrono::Duration::seconds(30));

        let outcome = sm.observe(&later).unwrap();
        assert!(!outcome.evaluated);
        assert!(matches!(
            sm.observe(&earlier),
            Err(KernelError::OutOfOrderSnapshot { .. })
        ));
    }
}
