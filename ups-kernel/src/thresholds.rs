//! Threshold configuration for the power-event state machine
//!
//! Each metric carries a `{warn, crit}` pair expressed in the metric's own
//! direction: capacity and runtime get worse as they fall (`crit < warn`),
//! load, time on battery and temperature get worse as they rise
//! (`crit > warn`). The poll intervals live here as well since the state
//! machine switches between them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::error::KernelError;
use crate::models::Severity;

/// Metrics that carry thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    BatteryCapacity,
    BatteryLoad,
    BatteryTimeRem,
    TimeOnBattery,
    EnvTemp,
}

impl Metric {
    pub fn as_str(self) -> &'static str {
        match self {
            Metric::BatteryCapacity => "battery_capacity",
            Metric::BatteryLoad => "battery_load",
            Metric::BatteryTimeRem => "battery_time_rem",
            Metric::TimeOnBattery => "time_on_battery",
            Metric::EnvTemp => "env_temp",
        }
    }

    /// True when larger values are the more severe condition.
    pub fn higher_is_worse(self) -> bool {
        matches!(
            self,
            Metric::BatteryLoad | Metric::TimeOnBattery | Metric::EnvTemp
        )
    }

    /// Legal range for both threshold values, inclusive.
    pub fn legal_range(self) -> (f64, f64) {
        match self {
            Metric::BatteryCapacity => (5.0, 100.0),
            Metric::BatteryLoad => (10.0, 100.0),
            Metric::BatteryTimeRem => (1.0, 600.0),
            Metric::TimeOnBattery => (1.0, 1440.0),
            Metric::EnvTemp => (5.0, 80.0),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A `{warn, crit}` pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Threshold {
    pub warn: f64,
    pub crit: f64,
}

impl Threshold {
    pub const fn new(warn: f64, crit: f64) -> Self {
        Self { warn, crit }
    }

    /// Classify a value; crossing is strict in the metric's direction.
    pub fn classify(&self, value: f64) -> Severity {
        if self.crit > self.warn {
            if value > self.crit {
                Severity::Critical
            } else if value > self.warn {
                Severity::Warning
            } else {
                Severity::Normal
            }
        } else if value < self.crit {
            Severity::Critical
        } else if value < self.warn {
            Severity::Warning
        } else {
            Severity::Normal
        }
    }

    fn validate(&self, metric: Metric) -> Result<(), KernelError> {
        let invalid = |reason: String| KernelError::InvalidThreshold { metric, reason };

        if !self.warn.is_finite() || !self.crit.is_finite() {
            return Err(invalid("values must be finite".into()));
        }
        if metric.higher_is_worse() && self.crit <= self.warn {
            return Err(invalid(format!(
                "crit ({}) must be greater than warn ({})",
                self.crit, self.warn
            )));
        }
        if !metric.higher_is_worse() && self.crit >= self.warn {
            return Err(invalid(format!(
                "crit ({}) must be less than warn ({})",
                self.crit, self.warn
            )));
        }
        let (low, high) = metric.legal_range();
        for value in [self.warn, self.crit] {
            if value < low || value > high {
                return Err(invalid(format!("{value} outside legal range {low}..={high}")));
            }
        }
        Ok(())
    }
}

/// Poll intervals in seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadInterval {
    /// Used on line power and on battery while every metric is above warning
    pub normal: u64,
    /// Used once a warning threshold is crossed on battery
    pub fault: u64,
    /// Minimum legal interval
    pub limit: u64,
}

impl Default for ReadInterval {
    fn default() -> Self {
        Self {
            normal: 30,
            fault: 10,
            limit: 5,
        }
    }
}

impl ReadInterval {
    pub fn normal_duration(&self) -> Duration {
        Duration::from_secs(self.normal)
    }

    pub fn fault_duration(&self) -> Duration {
        Duration::from_secs(self.fault)
    }

    fn validate(&self) -> Result<(), KernelError> {
        if self.limit == 0 {
            return Err(KernelError::InvalidInterval("limit must be at least 1s".into()));
        }
        if self.fault < self.limit {
            return Err(KernelError::InvalidInterval(format!(
                "fault interval {}s is below the {}s limit",
                self.fault, self.limit
            )));
        }
        if self.fault > self.normal {
            return Err(KernelError::InvalidInterval(format!(
                "fault interval {}s exceeds normal interval {}s",
                self.fault, self.normal
            )));
        }
        Ok(())
    }
}

/// Thresholds and intervals, loaded once at daemon start
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    pub battery_capacity: Threshold,
    pub battery_load: Threshold,
    pub battery_time_rem: Threshold,
    pub time_on_battery: Threshold,
    pub env_temp: Option<Threshold>,
    pub read_interval: ReadInterval,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            battery_capacity: Threshold::new(50.0, 10.0),
            battery_load: Threshold::new(80.0, 90.0),
            battery_time_rem: Threshold::new(10.0, 5.0),
            time_on_battery: Threshold::new(15.0, 30.0),
            env_temp: Some(Threshold::new(30.0, 35.0)),
            read_interval: ReadInterval::default(),
        }
    }
}

impl ThresholdConfig {
    pub fn for_metric(&self, metric: Metric) -> Option<&Threshold> {
        match metric {
            Metric::BatteryCapacity => Some(&self.battery_capacity),
            Metric::BatteryLoad => Some(&self.battery_load),
            Metric::BatteryTimeRem => Some(&self.battery_time_rem),
            Metric::TimeOnBattery => Some(&self.time_on_battery),
            Metric::EnvTemp => self.env_temp.as_ref(),
        }
    }

    /// Check direction, legal range and interval ordering.
    pub fn validate(&self) -> Result<(), KernelError> {
        self.battery_capacity.validate(Metric::BatteryCapacity)?;
        self.battery_load.validate(Metric::BatteryLoad)?;
        self.battery_time_rem.validate(Metric::BatteryTimeRem)?;
        self.time_on_battery.validate(Metric::TimeOnBattery)?;
        if let Some(env_temp) = &self.env_temp {
            env_temp.validate(Metric::EnvTemp)?;
        }
        self.read_interval.validate()
    }
}
