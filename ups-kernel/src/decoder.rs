//! Raw register decoding
//!
//! `decode` is total: anything it cannot interpret becomes
//! `DecodedValue::unknown()` so one bad register never aborts a snapshot.
//! Raw strings may carry net-snmp decoration (`INTEGER: 3`,
//! `STRING: "Smart-UPS"`, `Timeticks: (12345) 0:02:03.45`, `batteryLow(3)`),
//! which is stripped before parsing.

use crate::dialect::{DecodeRule, EnumCode, FlagBit};
use crate::models::{DecodedValue, Severity, Value};
use crate::thresholds::{Metric, ThresholdConfig};

/// Decode one raw register string according to its rule.
pub fn decode(raw: &str, rule: &DecodeRule, thresholds: &ThresholdConfig) -> DecodedValue {
    let Some(cleaned) = clean(raw) else {
        return DecodedValue::unknown();
    };

    match rule {
        DecodeRule::Text => DecodedValue::new(Value::Text(cleaned.to_string()), None, Severity::Normal),
        DecodeRule::Enumeration(codes) => decode_enumeration(cleaned, codes),
        DecodeRule::Scaled { scale, unit, metric } => {
            decode_scaled(cleaned, *scale, unit, *metric, thresholds)
        }
        DecodeRule::BitFlags { flags, fault_mask } => decode_flags(cleaned, flags, *fault_mask),
        DecodeRule::Duration { ticks_per_second } => decode_duration(cleaned, *ticks_per_second),
    }
}

const SNMP_TYPES: &[&str] = &[
    "STRING",
    "Hex-STRING",
    "INTEGER",
    "Gauge32",
    "Counter32",
    "Counter64",
    "Timeticks",
    "OID",
    "IpAddress",
    "Opaque",
    "BITS",
];

/// Strip type prefix and quotes; `None` for agent "no such" responses.
fn clean(raw: &str) -> Option<&str> {
    let mut s = raw.trim();
    if s.starts_with("No Such") || s.starts_with("No more variables") {
        return None;
    }
    if let Some((prefix, rest)) = s.split_once(": ") {
        if SNMP_TYPES.contains(&prefix) {
            s = rest.trim();
        }
    }
    if s.len() >= 2 && s.starts_with('"') && s.ends_with('"') {
        s = &s[1..s.len() - 1];
    }
    Some(s)
}

/// Numeric part of `label(3)` or `(12345) 0:02:03.45`, otherwise the whole string.
fn numeric_part(s: &str) -> &str {
    match (s.find('('), s.find(')')) {
        (Some(open), Some(close)) if open < close => s[open + 1..close].trim(),
        _ => s,
    }
}

fn parse_integer(s: &str) -> Option<i64> {
    numeric_part(s).parse().ok()
}

fn decode_enumeration(s: &str, codes: &[EnumCode]) -> DecodedValue {
    let Some(code) = parse_integer(s) else {
        return DecodedValue::unknown();
    };
    match codes.iter().find(|c| c.code == code) {
        Some(entry) => DecodedValue::new(Value::Text(entry.label.to_string()), None, entry.severity),
        None => DecodedValue::new(Value::Text(format!("Unknown ({code})")), None, Severity::Unknown),
    }
}

fn decode_scaled(
    s: &str,
    scale: f64,
    unit: &str,
    metric: Option<Metric>,
    thresholds: &ThresholdConfig,
) -> DecodedValue {
    let raw = match numeric_part(s).parse::<f64>() {
        Ok(n) if n.is_finite() => n,
        _ => return DecodedValue::unknown(),
    };
    let value = raw / scale;
    let severity = metric
        .and_then(|m| thresholds.for_metric(m))
        .map(|t| t.classify(value))
        .unwrap_or(Severity::Normal);
    let unit = (!unit.is_empty()).then_some(unit);
    DecodedValue::new(Value::Number(value), unit, severity)
}

fn decode_flags(s: &str, flags: &[FlagBit], fault_mask: u64) -> DecodedValue {
    let Some(bits) = parse_flag_bits(s) else {
        return DecodedValue::unknown();
    };

    let active: Vec<String> = flags
        .iter()
        .filter(|f| f.bit < 64 && bits & (1u64 << f.bit) != 0)
        .map(|f| f.name.to_string())
        .collect();
    let severity = if bits & fault_mask != 0 {
        Severity::Critical
    } else {
        Severity::Normal
    };
    DecodedValue::new(Value::Flags(active), None, severity)
}

/// A string of `0`/`1` characters longer than one is a flag string (position
/// 0 first); anything else is an integer mask, decimal or `0x` hex.
fn parse_flag_bits(s: &str) -> Option<u64> {
    let s = s.trim();
    if s.len() > 1 && s.chars().all(|c| c == '0' || c == '1') {
        return Some(
            s.chars()
                .take(64)
                .enumerate()
                .filter(|(_, c)| *c == '1')
                .fold(0u64, |acc, (i, _)| acc | 1u64 << i),
        );
    }
    let s = numeric_part(s);
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => s.parse().ok(),
    }
}

fn decode_duration(s: &str, ticks_per_second: u32) -> DecodedValue {
    if ticks_per_second == 0 {
        return DecodedValue::unknown();
    }
    let Ok(ticks) = numeric_part(s).parse::<u64>() else {
        return DecodedValue::unknown();
    };
    let minutes = ticks as f64 / f64::from(ticks_per_second) / 60.0;
    DecodedValue::new(Value::Duration { minutes, ticks }, Some("min"), Severity::Unknown)
}
