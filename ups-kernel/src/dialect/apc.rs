//! APC AP96xx network management card (PowerNet MIB, enterprise 318)

use super::{code, flag, mib2, register, DecodeRule, Dialect, EnumCode, FlagBit, RegisterSpec, VendorType};
use crate::models::{Category, Param, Severity};
use crate::thresholds::Metric;

const TICKS: DecodeRule = DecodeRule::Duration { ticks_per_second: 100 };

const fn tenths(unit: &'static str, metric: Option<Metric>) -> DecodeRule {
    DecodeRule::Scaled { scale: 10.0, unit, metric }
}

const BATTERY_STATUS: &[EnumCode] = &[
    code(1, "Unknown", Severity::Unknown),
    code(2, "Normal", Severity::Normal),
    code(3, "Low", Severity::Critical),
    code(4, "Fault Condition", Severity::Critical),
];

const BATTERY_REPLACE: &[EnumCode] = &[
    code(1, "No", Severity::Normal),
    code(2, "Replace Battery", Severity::Warning),
];

const TRANSFER_REASON: &[EnumCode] = &[
    code(1, "No Transfer", Severity::Normal),
    code(2, "High Line Voltage", Severity::Normal),
    code(3, "Brownout", Severity::Normal),
    code(4, "Blackout", Severity::Normal),
    code(5, "Small Momentary Sag", Severity::Normal),
    code(6, "Deep Momentary Sag", Severity::Normal),
    code(7, "Small Momentary Spike", Severity::Normal),
    code(8, "Large Momentary Spike", Severity::Normal),
    code(9, "Self Test", Severity::Normal),
    code(10, "Rate of Voltage Change", Severity::Normal),
];

const OUTPUT_SOURCE: &[EnumCode] = &[
    code(1, "Unknown", Severity::Unknown),
    code(2, "On Line", Severity::Normal),
    code(3, "On Battery", Severity::Warning),
    code(4, "On Smart Boost", Severity::Normal),
    code(5, "Timed Sleeping", Severity::Warning),
    code(6, "Software Bypass", Severity::Warning),
    code(7, "Off", Severity::Critical),
    code(8, "Rebooting", Severity::Warning),
    code(9, "Switched Bypass", Severity::Warning),
    code(10, "Hardware Failure Bypass", Severity::Critical),
    code(11, "Sleeping Until Power Return", Severity::Warning),
    code(12, "On Smart Trim", Severity::Normal),
];

const COMMS: &[EnumCode] = &[
    code(1, "OK", Severity::Normal),
    code(2, "No Communication", Severity::Critical),
];

const SELF_TEST: &[EnumCode] = &[
    code(1, "OK", Severity::Normal),
    code(2, "Failed", Severity::Critical),
    code(3, "Invalid Test", Severity::Warning),
    code(4, "Test In Progress", Severity::Normal),
];

// upsBasicStateOutputState: position 0 is the first character of the flag string
const OUTPUT_STATE: &[FlagBit] = &[
    flag(0, "Abnormal Condition Present"),
    flag(1, "On Battery"),
    flag(2, "Low Battery"),
    flag(3, "On Line"),
    flag(4, "Replace Battery"),
    flag(5, "Serial Communication Established"),
    flag(6, "AVR Boost Active"),
    flag(7, "AVR Trim Active"),
    flag(8, "Overload"),
    flag(9, "Runtime Calibration"),
    flag(10, "Batteries Discharged"),
    flag(11, "Manual Bypass"),
    flag(12, "Software Bypass"),
    flag(13, "In Bypass due to Internal Fault"),
    flag(14, "In Bypass due to Supply Failure"),
    flag(15, "In Bypass due to Fan Failure"),
    flag(16, "Sleeping on a Timer"),
    flag(17, "Sleeping until Utility Power Returns"),
    flag(18, "On"),
    flag(19, "Rebooting"),
    flag(20, "Battery Communication Lost"),
    flag(21, "Graceful Shutdown Initiated"),
    flag(22, "Smart Boost or Smart Trim Fault"),
    flag(23, "Bad Output Voltage"),
    flag(24, "Battery Charger Failure"),
    flag(25, "High Battery Temperature"),
    flag(26, "Warning Battery Temperature"),
    flag(27, "Critical Battery Temperature"),
    flag(28, "Self Test In Progress"),
];

const OUTPUT_STATE_FAULTS: u64 = 1 << 2
    | 1 << 8
    | 1 << 10
    | 1 << 13
    | 1 << 14
    | 1 << 15
    | 1 << 23
    | 1 << 24
    | 1 << 27;

#[rustfmt::skip]
const REGISTERS: &[RegisterSpec] = &[
    // identity
    register(Param::UpsInfo, mib2::SYS_DESCR, DecodeRule::Text, Category::Static, "UPS Info"),
    register(Param::UpsName, mib2::SYS_NAME, DecodeRule::Text, Category::Static, "UPS Name"),
    register(Param::UpsContact, mib2::SYS_CONTACT, DecodeRule::Text, Category::Static, "Contact"),
    register(Param::UpsLocation, mib2::SYS_LOCATION, DecodeRule::Text, Category::Static, "Location"),
    register(Param::UpsType, "1.3.6.1.4.1.318.1.1.1.1.1.1.0", DecodeRule::Text, Category::Static, "UPS Type"),
    register(Param::UpsModel, "1.3.6.1.4.1.318.1.1.1.1.2.5.0", DecodeRule::Text, Category::Static, "UPS Model"),
    register(Param::FirmwareRevision, "1.3.6.1.4.1.318.1.1.1.1.2.1.0", DecodeRule::Text, Category::Static, "Firmware Revision"),
    register(Param::ManufactureDate, "1.3.6.1.4.1.318.1.1.1.1.2.2.0", DecodeRule::Text, Category::Static, "Manufacture Date"),
    register(Param::SerialNumber, "1.3.6.1.4.1.318.1.1.1.1.2.3.0", DecodeRule::Text, Category::Static, "Serial Number"),
    // battery
    register(Param::BatteryStatus, "1.3.6.1.4.1.318.1.1.1.2.1.1.0", DecodeRule::Enumeration(BATTERY_STATUS), Category::Battery, "Battery Status"),
    register(Param::TimeOnBattery, "1.3.6.1.4.1.318.1.1.1.2.1.2.0", TICKS, Category::Battery, "Time on Battery"),
    register(Param::RuntimeRemaining, "1.3.6.1.4.1.318.1.1.1.2.2.3.0", TICKS, Category::Battery, "Runtime Remaining"),
    register(Param::BatteryReplace, "1.3.6.1.4.1.318.1.1.1.2.2.4.0", DecodeRule::Enumeration(BATTERY_REPLACE), Category::Battery, "Battery Replace"),
    register(Param::BatteryCapacity, "1.3.6.1.4.1.318.1.1.1.2.3.1.0", tenths("%", Some(Metric::BatteryCapacity)), Category::Battery, "Battery Capacity"),
    register(Param::BatteryTemperature, "1.3.6.1.4.1.318.1.1.1.2.3.2.0", tenths("°C", None), Category::Battery, "Battery Temperature"),
    register(Param::BatteryVoltage, "1.3.6.1.4.1.318.1.1.1.2.3.4.0", tenths("V", None), Category::Battery, "Battery Voltage"),
    // input
    register(Param::InputVoltage, "1.3.6.1.4.1.318.1.1.1.3.3.1.0", tenths("V", None), Category::Input, "Input Voltage"),
    register(Param::InputFrequency, "1.3.6.1.4.1.318.1.1.1.3.3.4.0", tenths("Hz", None), Category::Input, "Input Frequency"),
    register(Param::LastTransferReason, "1.3.6.1.4.1.318.1.1.1.3.2.5.0", DecodeRule::Enumeration(TRANSFER_REASON), Category::Input, "Last Transfer Reason"),
    // output
    register(Param::OutputSource, "1.3.6.1.4.1.318.1.1.1.4.1.1.0", DecodeRule::Enumeration(OUTPUT_SOURCE), Category::Output, "Output Source"),
    register(Param::OutputVoltage, "1.3.6.1.4.1.318.1.1.1.4.3.1.0", tenths("V", None), Category::Output, "Output Voltage"),
    register(Param::OutputFrequency, "1.3.6.1.4.1.318.1.1.1.4.3.2.0", tenths("Hz", None), Category::Output, "Output Frequency"),
    register(Param::OutputLoad, "1.3.6.1.4.1.318.1.1.1.4.3.3.0", tenths("%", Some(Metric::BatteryLoad)), Category::Output, "Output Load"),
    register(Param::OutputCurrent, "1.3.6.1.4.1.318.1.1.1.4.3.4.0", tenths("A", None), Category::Output, "Output Current"),
    register(Param::OutputPower, "1.3.6.1.4.1.318.1.1.1.4.2.8.0", DecodeRule::Scaled { scale: 1.0, unit: "W", metric: None }, Category::Output, "Output Power"),
    // system
    register(Param::UpsUptime, mib2::SYS_UPTIME, TICKS, Category::System, "UPS Uptime"),
    register(Param::SystemStatus, "1.3.6.1.4.1.318.1.1.1.11.1.1.0", DecodeRule::BitFlags { flags: OUTPUT_STATE, fault_mask: OUTPUT_STATE_FAULTS }, Category::System, "System Status"),
    register(Param::Comms, "1.3.6.1.4.1.318.1.1.1.8.1.0", DecodeRule::Enumeration(COMMS), Category::System, "Communications"),
    register(Param::LastSelfTestResult, "1.3.6.1.4.1.318.1.1.1.7.2.3.0", DecodeRule::Enumeration(SELF_TEST), Category::System, "Last Self Test Result"),
    register(Param::LastSelfTestDate, "1.3.6.1.4.1.318.1.1.1.7.2.4.0", DecodeRule::Text, Category::System, "Last Self Test Date"),
    register(Param::EnvTemp, "1.3.6.1.4.1.318.1.1.25.1.2.1.6.1.1", DecodeRule::Scaled { scale: 1.0, unit: "°C", metric: Some(Metric::EnvTemp) }, Category::System, "Environment Temperature"),
];

pub(super) static DIALECT: Dialect = Dialect {
    vendor: VendorType::ApcAp96xx,
    registers: REGISTERS,
};
