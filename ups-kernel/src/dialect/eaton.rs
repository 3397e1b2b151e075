//! Eaton PowerWare ConnectUPS (XUPS MIB, enterprise 534, plus RFC 1628 UPS-MIB)

use super::{code, mib2, register, DecodeRule, Dialect, EnumCode, RegisterSpec, VendorType};
use crate::models::{Category, Param, Severity};
use crate::thresholds::Metric;

// XUPS and UPS-MIB report durations in whole seconds
const SECONDS: DecodeRule = DecodeRule::Duration { ticks_per_second: 1 };

const fn units(unit: &'static str, metric: Option<Metric>) -> DecodeRule {
    DecodeRule::Scaled { scale: 1.0, unit, metric }
}

const BATTERY_STATUS: &[EnumCode] = &[
    code(1, "Unknown", Severity::Unknown),
    code(2, "Normal", Severity::Normal),
    code(3, "Low", Severity::Critical),
    code(4, "Depleted", Severity::Critical),
];

const OUTPUT_SOURCE: &[EnumCode] = &[
    code(1, "Other", Severity::Unknown),
    code(2, "None", Severity::Critical),
    code(3, "Normal", Severity::Normal),
    code(4, "Bypass", Severity::Warning),
    code(5, "Battery", Severity::Warning),
    code(6, "Booster", Severity::Normal),
    code(7, "Reducer", Severity::Normal),
    code(8, "Parallel Capacity", Severity::Normal),
    code(9, "Parallel Redundant", Severity::Normal),
    code(10, "High Efficiency Mode", Severity::Normal),
    code(11, "Maintenance Bypass", Severity::Warning),
    code(12, "ESS Mode", Severity::Normal),
];

const SELF_TEST: &[EnumCode] = &[
    code(1, "Unknown", Severity::Unknown),
    code(2, "Passed", Severity::Normal),
    code(3, "Failed", Severity::Critical),
    code(4, "In Progress", Severity::Normal),
    code(5, "Not Supported", Severity::Unknown),
    code(6, "Inhibited", Severity::Warning),
    code(7, "Scheduled", Severity::Normal),
];

#[rustfmt::skip]
const REGISTERS: &[RegisterSpec] = &[
    // identity
    register(Param::UpsInfo, mib2::SYS_DESCR, DecodeRule::Text, Category::Static, "UPS Info"),
    register(Param::UpsName, mib2::SYS_NAME, DecodeRule::Text, Category::Static, "UPS Name"),
    register(Param::UpsContact, mib2::SYS_CONTACT, DecodeRule::Text, Category::Static, "Contact"),
    register(Param::UpsLocation, mib2::SYS_LOCATION, DecodeRule::Text, Category::Static, "Location"),
    register(Param::UpsManufacturer, "1.3.6.1.4.1.534.1.1.1.0", DecodeRule::Text, Category::Static, "Manufacturer"),
    register(Param::UpsModel, "1.3.6.1.4.1.534.1.1.2.0", DecodeRule::Text, Category::Static, "UPS Model"),
    register(Param::FirmwareRevision, "1.3.6.1.4.1.534.1.1.3.0", DecodeRule::Text, Category::Static, "Firmware Revision"),
    // battery
    register(Param::BatteryStatus, "1.3.6.1.2.1.33.1.2.1.0", DecodeRule::Enumeration(BATTERY_STATUS), Category::Battery, "Battery Status"),
    register(Param::TimeOnBattery, "1.3.6.1.2.1.33.1.2.2.0", SECONDS, Category::Battery, "Time on Battery"),
    register(Param::RuntimeRemaining, "1.3.6.1.4.1.534.1.2.1.0", SECONDS, Category::Battery, "Runtime Remaining"),
    register(Param::BatteryVoltage, "1.3.6.1.4.1.534.1.2.2.0", units("V", None), Category::Battery, "Battery Voltage"),
    register(Param::BatteryCapacity, "1.3.6.1.4.1.534.1.2.4.0", units("%", Some(Metric::BatteryCapacity)), Category::Battery, "Battery Capacity"),
    register(Param::BatteryTemperature, "1.3.6.1.2.1.33.1.2.7.0", units("°C", None), Category::Battery, "Battery Temperature"),
    // input
    register(Param::InputFrequency, "1.3.6.1.4.1.534.1.3.1.0", DecodeRule::Scaled { scale: 10.0, unit: "Hz", metric: None }, Category::Input, "Input Frequency"),
    register(Param::InputVoltage, "1.3.6.1.4.1.534.1.3.4.1.2.1", units("V", None), Category::Input, "Input Voltage"),
    // output
    register(Param::OutputLoad, "1.3.6.1.4.1.534.1.4.1.0", units("%", Some(Metric::BatteryLoad)), Category::Output, "Output Load"),
    register(Param::OutputFrequency, "1.3.6.1.4.1.534.1.4.2.0", DecodeRule::Scaled { scale: 10.0, unit: "Hz", metric: None }, Category::Output, "Output Frequency"),
    register(Param::OutputVoltage, "1.3.6.1.4.1.534.1.4.4.1.2.1", units("V", None), Category::Output, "Output Voltage"),
    register(Param::OutputCurrent, "1.3.6.1.4.1.534.1.4.4.1.3.1", units("A", None), Category::Output, "Output Current"),
    register(Param::OutputPower, "1.3.6.1.4.1.534.1.4.4.1.4.1", units("W", None), Category::Output, "Output Power"),
    register(Param::OutputSource, "1.3.6.1.4.1.534.1.4.5.0", DecodeRule::Enumeration(OUTPUT_SOURCE), Category::Output, "Output Source"),
    // system
    register(Param::UpsUptime, mib2::SYS_UPTIME, DecodeRule::Duration { ticks_per_second: 100 }, Category::System, "UPS Uptime"),
    register(Param::EnvTemp, "1.3.6.1.4.1.534.1.6.1.0", units("°C", Some(Metric::EnvTemp)), Category::System, "Environment Temperature"),
    register(Param::LastSelfTestResult, "1.3.6.1.4.1.534.1.8.2.0", DecodeRule::Enumeration(SELF_TEST), Category::System, "Last Self Test Result"),
];

pub(super) static DIALECT: Dialect = Dialect {
    vendor: VendorType::EatonPw,
    registers: REGISTERS,
};
