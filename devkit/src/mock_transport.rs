/*!
Mock SNMP transport for tests without a real agent

Answers GETs from a table of raw values, records every request and can
simulate timeouts, dead devices and unreachable hosts.
*/

use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Duration;
use tracing::warn;
use ups_kernel::{Endpoint, Param, SnmpTransport, TransportError, VendorType};

use crate::state::{new_state, Shared};
use crate::test_utils::SnapshotBuilder;

/// Response an agent gives for an OID it does not implement
pub const NO_SUCH_OBJECT: &str = "No Such Object available on this agent at this OID";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockRequest {
    pub address: String,
    pub oid: String,
}

#[derive(Default)]
struct MockState {
    /// (address, oid) overrides, then (None, oid) defaults
    values: HashMap<(Option<String>, String), String>,
    queued_timeouts: HashMap<String, VecDeque<()>>,
    dead: HashSet<String>,
    unreachable: HashSet<String>,
    fail_all: bool,
    requests: Vec<MockRequest>,
}

/// Clonable handle: clones share the same table and request log
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Shared<MockState>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            state: new_state(MockState::default()),
        }
    }

    /// Answer `oid` with `raw` for every device.
    pub fn set_oid(&self, oid: &str, raw: &str) -> &Self {
        self.state
            .lock()
            .values
            .insert((None, oid.to_string()), raw.to_string());
        self
    }

    /// Answer a canonical parameter of a dialect with `raw` for every device.
    pub fn set_param(&self, vendor: VendorType, param: Param, raw: &str) -> &Self {
        self.set_param_for(None, vendor, param, raw)
    }

    /// Like `set_param`, restricted to one device address.
    pub fn set_device_param(&self, address: &str, vendor: VendorType, param: Param, raw: &str) -> &Self {
        self.set_param_for(Some(address), vendor, param, raw)
    }

    fn set_param_for(&self, address: Option<&str>, vendor: VendorType, param: Param, raw: &str) -> &Self {
        match vendor.dialect().lookup(param) {
            Some(spec) => {
                self.state.lock().values.insert(
                    (address.map(str::to_string), spec.oid.to_string()),
                    raw.to_string(),
                );
            }
            None => warn!(%vendor, %param, "Parameter not provided by dialect, ignored"),
        }
        self
    }

    /// Load every raw value of a builder, optionally for one address only.
    pub fn apply(&self, address: Option<&str>, builder: &SnapshotBuilder) -> &Self {
        let vendor = builder.vendor();
        for (param, raw) in builder.raw_values() {
            self.set_param_for(address, vendor, param, raw);
        }
        self
    }

    /// Typical readings of an APC unit on line power.
    pub fn apc_online(&self) -> &Self {
        let apc = VendorType::ApcAp96xx;
        for (param, raw) in [
            (Param::UpsInfo, "APC Web/SNMP Management Card (MB:v4.1.0 PF:v6.7.2 AN1:apc_hw05_aos_672.bin)"),
            (Param::UpsName, "rack-ups"),
            (Param::UpsModel, "SMT1500RMI2U"),
            (Param::SerialNumber, "AS1234567890"),
            (Param::FirmwareRevision, "UPS 09.3 (ID18)"),
            (Param::BatteryStatus, "2"),
            (Param::TimeOnBattery, "0"),
            (Param::RuntimeRemaining, "348000"),
            (Param::BatteryCapacity, "1000"),
            (Param::BatteryTemperature, "251"),
            (Param::BatteryVoltage, "546"),
            (Param::BatteryReplace, "1"),
            (Param::InputVoltage, "2301"),
            (Param::InputFrequency, "500"),
            (Param::LastTransferReason, "1"),
            (Param::OutputSource, "2"),
            (Param::OutputVoltage, "2300"),
            (Param::OutputFrequency, "500"),
            (Param::OutputLoad, "250"),
            (Param::OutputCurrent, "19"),
            (Param::OutputPower, "380"),
            (Param::UpsUptime, "123456789"),
            (Param::SystemStatus, "0001010000000000000000000000000000000000000000000000000000000000"),
            (Param::Comms, "1"),
            (Param::LastSelfTestResult, "1"),
            (Param::LastSelfTestDate, "03/14/2026"),
            (Param::EnvTemp, "24"),
        ] {
            self.set_param(apc, param, raw);
        }
        self
    }

    /// The next `count` requests for `oid` time out.
    pub fn fail_next(&self, oid: &str, count: usize) -> &Self {
        self.state
            .lock()
            .queued_timeouts
            .entry(oid.to_string())
            .or_default()
            .extend(std::iter::repeat(()).take(count));
        self
    }

    /// Every request to `address` times out until revived.
    pub fn set_dead(&self, address: &str, dead: bool) -> &Self {
        let mut state = self.state.lock();
        if dead {
            state.dead.insert(address.to_string());
        } else {
            state.dead.remove(address);
        }
        self
    }

    pub fn set_reachable(&self, address: &str, reachable: bool) -> &Self {
        let mut state = self.state.lock();
        if reachable {
            state.unreachable.remove(address);
        } else {
            state.unreachable.insert(address.to_string());
        }
        self
    }

    /// Every request fails with `Unreachable`.
    pub fn fail_all(&self, fail: bool) -> &Self {
        self.state.lock().fail_all = fail;
        self
    }

    pub fn requests(&self) -> Vec<MockRequest> {
        self.state.lock().requests.clone()
    }

    pub fn request_count(&self) -> usize {
        self.state.lock().requests.len()
    }

    pub fn requests_to(&self, address: &str) -> usize {
        self.state
            .lock()
            .requests
            .iter()
            .filter(|r| r.address == address)
            .count()
    }

    pub fn clear_requests(&self) {
        self.state.lock().requests.clear();
    }
}

#[async_trait]
impl SnmpTransport for MockTransport {
    async fn get(&self, endpoint: &Endpoint, oid: &str) -> Result<String, TransportError> {
        let mut state = self.state.lock();
        state.requests.push(MockRequest {
            address: endpoint.address.clone(),
            oid: oid.to_string(),
        });

        if state.fail_all || state.unreachable.contains(&endpoint.address) {
            return Err(TransportError::Unreachable(endpoint.address.clone()));
        }

        let timeout = TransportError::Timeout {
            oid: oid.to_string(),
            after: Duration::from_secs(2),
        };
        if state.dead.contains(&endpoint.address) {
            return Err(timeout);
        }
        if let Some(queue) = state.queued_timeouts.get_mut(oid) {
            if queue.pop_front().is_some() {
                return Err(timeout);
            }
        }

        let value = state
            .values
            .get(&(Some(endpoint.address.clone()), oid.to_string()))
            .or_else(|| state.values.get(&(None, oid.to_string())))
            .cloned()
            .unwrap_or_else(|| NO_SUCH_OBJECT.to_string());
        Ok(value)
    }

    async fn reachable(&self, endpoint: &Endpoint) -> bool {
        let state = self.state.lock();
        !state.fail_all && !state.unreachable.contains(&endpoint.address)
    }
}
