//! Core value types shared by every kernel component
//!
//! - `Param`: canonical parameter vocabulary, independent of vendor dialects
//! - `Category`: register grouping used to select polled subsets
//! - `DecodedValue` / `Severity`: typed result of decoding one register
//! - `Reading`: decoded value or explicit "device did not answer"
//! - `Snapshot`: every reading for one device at one poll instant

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::KernelError;

/// Canonical monitoring parameter names
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Param {
    UpsInfo,
    UpsName,
    UpsModel,
    UpsType,
    UpsLocation,
    UpsContact,
    UpsManufacturer,
    SerialNumber,
    FirmwareRevision,
    ManufactureDate,
    UpsUptime,
    Comms,
    SystemStatus,
    BatteryStatus,
    BatteryCapacity,
    BatteryTemperature,
    BatteryVoltage,
    BatteryReplace,
    TimeOnBattery,
    RuntimeRemaining,
    InputVoltage,
    InputFrequency,
    LastTransferReason,
    OutputVoltage,
    OutputFrequency,
    OutputLoad,
    OutputCurrent,
    OutputPower,
    OutputSource,
    EnvTemp,
    LastSelfTestResult,
    LastSelfTestDate,
}

impl Param {
    pub const ALL: &'static [Param] = &[
        Param::UpsInfo,
        Param::UpsName,
        Param::UpsModel,
        Param::UpsType,
        Param::UpsLocation,
        Param::UpsContact,
        Param::UpsManufacturer,
        Param::SerialNumber,
        Param::FirmwareRevision,
        Param::ManufactureDate,
        Param::UpsUptime,
        Param::Comms,
        Param::SystemStatus,
        Param::BatteryStatus,
        Param::BatteryCapacity,
        Param::BatteryTemperature,
        Param::BatteryVoltage,
        Param::BatteryReplace,
        Param::TimeOnBattery,
        Param::RuntimeRemaining,
        Param::InputVoltage,
        Param::InputFrequency,
        Param::LastTransferReason,
        Param::OutputVoltage,
        Param::OutputFrequency,
        Param::OutputLoad,
        Param::OutputCurrent,
        Param::OutputPower,
        Param::OutputSource,
        Param::EnvTemp,
        Param::LastSelfTestResult,
        Param::LastSelfTestDate,
    ];

    /// Parameters the threshold state machine consumes every cycle.
    pub const POWER_INPUTS: &'static [Param] = &[
        Param::BatteryStatus,
        Param::OutputLoad,
        Param::BatteryCapacity,
        Param::TimeOnBattery,
        Param::RuntimeRemaining,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Param::UpsInfo => "ups_info",
            Param::UpsName => "ups_name",
            Param::UpsModel => "ups_model",
            Param::UpsType => "ups_type",
            Param::UpsLocation => "ups_location",
            Param::UpsContact => "ups_contact",
            Param::UpsManufacturer => "ups_manufacturer",
            Param::SerialNumber => "serial_number",
            Param::FirmwareRevision => "firmware_revision",
            Param::ManufactureDate => "manufacture_date",
            Param::UpsUptime => "ups_uptime",
            Param::Comms => "comms",
            Param::SystemStatus => "system_status",
            Param::BatteryStatus => "battery_status",
            Param::BatteryCapacity => "battery_capacity",
            Param::BatteryTemperature => "battery_temperature",
            Param::BatteryVoltage => "battery_voltage",
            Param::BatteryReplace => "battery_replace",
            Param::TimeOnBattery => "time_on_battery",
            Param::RuntimeRemaining => "runtime_remaining",
            Param::InputVoltage => "input_voltage",
            Param::InputFrequency => "input_frequency",
            Param::LastTransferReason => "last_transfer_reason",
            Param::OutputVoltage => "output_voltage",
            Param::OutputFrequency => "output_frequency",
            Param::OutputLoad => "output_load",
            Param::OutputCurrent => "output_current",
            Param::OutputPower => "output_power",
            Param::OutputSource => "output_source",
            Param::EnvTemp => "env_temp",
            Param::LastSelfTestResult => "last_self_test_result",
            Param::LastSelfTestDate => "last_self_test_date",
        }
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Param {
    type Err = KernelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Param::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| KernelError::UnknownParameter(s.to_string()))
    }
}

/// Register grouping tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Battery,
    Input,
    Output,
    System,
    /// Identity registers that never change during a run
    Static,
}

impl Category {
    /// Categories read on every poll cycle.
    pub const DYNAMIC: &'static [Category] = &[
        Category::Battery,
        Category::Input,
        Category::Output,
        Category::System,
    ];
}

/// Severity classification of a decoded value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Normal,
    Warning,
    Critical,
    Unknown,
}

/// Typed payload of a decoded register
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Value {
    Number(f64),
    Text(String),
    /// Names of the active conditions of a bit-flag register
    Flags(Vec<String>),
    Duration { minutes: f64, ticks: u64 },
    Unknown,
}

/// Result of decoding one register read
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedValue {
    pub value: Value,
    pub unit: Option<String>,
    pub severity: Severity,
}

impl DecodedValue {
    pub fn new(value: Value, unit: Option<&str>, severity: Severity) -> Self {
        Self {
            value,
            unit: unit.map(str::to_string),
            severity,
        }
    }

    /// Sentinel for raw payloads the decoder could not interpret
    pub fn unknown() -> Self {
        Self::new(Value::Unknown, None, Severity::Unknown)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self.value, Value::Unknown)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self.value {
            Value::Number(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match &self.value {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_minutes(&self) -> Option<f64> {
        match self.value {
            Value::Duration { minutes, .. } => Some(minutes),
            _ => None,
        }
    }
}

impl fmt::Display for DecodedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Value::Number(n) => write!(f, "{n:.1}")?,
            Value::Text(s) => f.write_str(s)?,
            Value::Flags(flags) if flags.is_empty() => f.write_str("none")?,
            Value::Flags(flags) => f.write_str(&flags.join(", "))?,
            Value::Duration { minutes, .. } => write!(f, "{minutes:.1}")?,
            Value::Unknown => f.write_str("unknown")?,
        }
        match (&self.unit, &self.value) {
            (Some(unit), Value::Number(_) | Value::Duration { .. }) => write!(f, " {unit}"),
            _ => Ok(()),
        }
    }
}

/// One register's outcome within a snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reading {
    Value(DecodedValue),
    /// The device did not answer this register during the cycle
    Unresponsive,
}

impl Reading {
    pub fn value(&self) -> Option<&DecodedValue> {
        match self {
            Reading::Value(v) => Some(v),
            Reading::Unresponsive => None,
        }
    }
}

/// Decoded readings for one device at one poll instant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub device_id: String,
    pub taken_at: DateTime<Utc>,
    /// False when a register exhausted its retry during the cycle
    pub responsive: bool,
    pub readings: BTreeMap<Param, Reading>,
}

impl Snapshot {
    pub fn new(device_id: impl Into<String>, taken_at: DateTime<Utc>) -> Self {
        Self {
            device_id: device_id.into(),
            taken_at,
            responsive: true,
            readings: BTreeMap::new(),
        }
    }

    pub fn get(&self, param: Param) -> Option<&DecodedValue> {
        self.readings.get(&param).and_then(Reading::value)
    }

    pub fn number(&self, param: Param) -> Option<f64> {
        self.get(param).and_then(DecodedValue::as_number)
    }

    pub fn minutes(&self, param: Param) -> Option<f64> {
        self.get(param).and_then(DecodedValue::as_minutes)
    }

    pub fn text(&self, param: Param) -> Option<&str> {
        self.get(param).and_then(DecodedValue::as_text)
    }

    /// Readings classified critical in this snapshot
    pub fn critical(&self) -> impl Iterator<Item = (Param, &DecodedValue)> {
        self.readings.iter().filter_map(|(param, reading)| {
            reading
                .value()
                .filter(|v| v.severity == Severity::Critical)
                .map(|v| (*param, v))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_names_round_trip() {
        for param in Param::ALL {
            assert_eq!(param.as_str().parse::<Param>().unwrap(), *param);
        }
        assert!(matches!(
            "battery_voltages".parse::<Param>(),
            Err(KernelError::UnknownParameter(_))
        ));
    }

    #[test]
    fn test_decoded_value_display() {
        let v = DecodedValue::new(Value::Number(229.4), Some("V"), Severity::Normal);
        assert_eq!(v.to_string(), "229.4 V");

        let flags = DecodedValue::new(
            Value::Flags(vec!["On Line".into(), "Overload".into()]),
            None,
            Severity::Critical,
        );
        assert_eq!(flags.to_string(), "On Line, Overload");
        assert_eq!(DecodedValue::unknown().to_string(), "unknown");
    }

    #[test]
    fn test_snapshot_accessors() {
        let mut snap = Snapshot::new("ups1", Utc::now());
        snap.readings.insert(
            Param::BatteryCapacity,
            Reading::Value(DecodedValue::new(Value::Number(15.0), Some("%"), Severity::Critical)),
        );
        snap.readings.insert(Param::OutputLoad, Reading::Unresponsive);

        assert_eq!(snap.number(Param::BatteryCapacity), Some(15.0));
        assert_eq!(snap.number(Param::OutputLoad), None);
        assert_eq!(snap.critical().count(), 1);
    }
}
