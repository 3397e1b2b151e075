//! Vendor dialect registry
//!
//! Maps the canonical parameter vocabulary onto per-vendor OIDs and decode
//! rules. Each `VendorType` variant owns one static `Dialect` table; adding
//! a vendor means adding a table and a variant, consumers only ever go
//! through `VendorType::dialect` or the `register_specs_*` functions.

mod apc;
mod eaton;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::KernelError;
use crate::models::{Category, Param, Severity};
use crate::thresholds::Metric;

/// Known network management card dialects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VendorType {
    /// APC AP96xx NMC (PowerNet MIB)
    ApcAp96xx,
    /// Eaton PowerWare ConnectUPS (XUPS MIB + RFC 1628)
    EatonPw,
}

impl VendorType {
    pub const ALL: &'static [VendorType] = &[VendorType::ApcAp96xx, VendorType::EatonPw];

    pub fn tag(self) -> &'static str {
        match self {
            VendorType::ApcAp96xx => "apc_ap96xx",
            VendorType::EatonPw => "eaton_pw",
        }
    }

    pub fn dialect(self) -> &'static Dialect {
        match self {
            VendorType::ApcAp96xx => &apc::DIALECT,
            VendorType::EatonPw => &eaton::DIALECT,
        }
    }
}

impl fmt::Display for VendorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for VendorType {
    type Err = KernelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "apc_ap96xx" | "apc" => Ok(VendorType::ApcAp96xx),
            "eaton_pw" | "eaton" => Ok(VendorType::EatonPw),
            _ => Err(KernelError::UnsupportedVendorType(s.to_string())),
        }
    }
}

/// Enumeration code entry
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnumCode {
    pub code: i64,
    pub label: &'static str,
    pub severity: Severity,
}

pub(crate) const fn code(code: i64, label: &'static str, severity: Severity) -> EnumCode {
    EnumCode { code, label, severity }
}

/// Named position in a bit-flag register (0 = least significant bit, or
/// the first character of a flag string)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlagBit {
    pub bit: u8,
    pub name: &'static str,
}

pub(crate) const fn flag(bit: u8, name: &'static str) -> FlagBit {
    FlagBit { bit, name }
}

/// How a raw register string becomes a `DecodedValue`
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DecodeRule {
    /// Pass-through string, always `normal`
    Text,
    /// Integer code looked up in a fixed table
    Enumeration(&'static [EnumCode]),
    /// Integer divided by `scale`, classified against `metric` when set
    Scaled {
        scale: f64,
        unit: &'static str,
        metric: Option<Metric>,
    },
    /// Bitmask; `critical` when any bit in `fault_mask` is set
    BitFlags {
        flags: &'static [FlagBit],
        fault_mask: u64,
    },
    /// Tick counter converted to minutes, severity always `unknown`
    Duration { ticks_per_second: u32 },
}

/// One register of a dialect
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegisterSpec {
    pub param: Param,
    pub oid: &'static str,
    pub rule: DecodeRule,
    pub category: Category,
    /// Human label for listings
    pub label: &'static str,
}

pub(crate) const fn register(
    param: Param,
    oid: &'static str,
    rule: DecodeRule,
    category: Category,
    label: &'static str,
) -> RegisterSpec {
    RegisterSpec { param, oid, rule, category, label }
}

/// A vendor's full register table
#[derive(Debug)]
pub struct Dialect {
    pub vendor: VendorType,
    pub registers: &'static [RegisterSpec],
}

impl Dialect {
    pub fn lookup(&self, param: Param) -> Option<&'static RegisterSpec> {
        self.registers.iter().find(|r| r.param == param)
    }

    pub fn in_category(&self, category: Category) -> impl Iterator<Item = &'static RegisterSpec> {
        self.registers.iter().filter(move |r| r.category == category)
    }

    pub fn provides(&self, param: Param) -> bool {
        self.lookup(param).is_some()
    }
}

/// Ordered register table for a vendor tag.
pub fn register_specs_for(vendor_tag: &str) -> Result<&'static [RegisterSpec], KernelError> {
    Ok(vendor_tag.parse::<VendorType>()?.dialect().registers)
}

/// Registers of one category for a vendor tag, in table order.
pub fn register_specs_in(
    vendor_tag: &str,
    category: Category,
) -> Result<Vec<&'static RegisterSpec>, KernelError> {
    let dialect = vendor_tag.parse::<VendorType>()?.dialect();
    Ok(dialect.in_category(category).collect())
}

/// OIDs shared by every SNMP agent (MIB-II system group).
pub(crate) mod mib2 {
    pub const SYS_DESCR: &str = "1.3.6.1.2.1.1.1.0";
    pub const SYS_UPTIME: &str = "1.3.6.1.2.1.1.3.0";
    pub const SYS_CONTACT: &str = "1.3.6.1.2.1.1.4.0";
    pub const SYS_NAME: &str = "1.3.6.1.2.1.1.5.0";
    pub const SYS_LOCATION: &str = "1.3.6.1.2.1.1.6.0";
}
