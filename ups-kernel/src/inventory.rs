//! Device inventory and probing
//!
//! Descriptors are built once from configuration and never removed during a
//! run. The three status flags are written only by `probe` and by the
//! snapshot reader's responsiveness bookkeeping.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, error, info};

use crate::dialect::{Dialect, VendorType};
use crate::error::KernelError;
use crate::models::Param;
use crate::transport::{Endpoint, SnmpTransport};

/// Consecutive fully failed cycles before `responsive` is cleared
pub const UNRESPONSIVE_CYCLE_LIMIT: u32 = 2;

/// Configuration entry for one device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceSpec {
    pub address: String,
    pub community: String,
    pub vendor: String,
    #[serde(default)]
    pub display_name: Option<String>,
    /// Power events of this device drive the action scripts
    #[serde(default)]
    pub daemon: bool,
}

/// Probe-derived status flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceFlags {
    pub compatible: bool,
    pub accessible: bool,
    pub responsive: bool,
}

/// A known device and its current flags
#[derive(Debug, Clone)]
pub struct DeviceDescriptor {
    id: String,
    endpoint: Endpoint,
    vendor_tag: String,
    vendor: Option<VendorType>,
    display_name: Option<String>,
    daemon: bool,
    flags: DeviceFlags,
    failed_cycles: u32,
}

impl DeviceDescriptor {
    pub fn new(id: impl Into<String>, spec: &DeviceSpec) -> Self {
        Self {
            id: id.into(),
            endpoint: Endpoint::new(&spec.address, &spec.community),
            vendor_tag: spec.vendor.clone(),
            vendor: spec.vendor.parse().ok(),
            display_name: spec.display_name.clone(),
            daemon: spec.daemon,
            flags: DeviceFlags::default(),
            failed_cycles: 0,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn vendor_tag(&self) -> &str {
        &self.vendor_tag
    }

    pub fn vendor(&self) -> Option<VendorType> {
        self.vendor
    }

    /// Resolved dialect, or `UnsupportedVendorType` for an unknown tag.
    pub fn dialect(&self) -> Result<&'static Dialect, KernelError> {
        self.vendor
            .map(VendorType::dialect)
            .ok_or_else(|| KernelError::UnsupportedVendorType(self.vendor_tag.clone()))
    }

    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.id)
    }

    pub fn is_daemon(&self) -> bool {
        self.daemon
    }

    pub fn flags(&self) -> DeviceFlags {
        self.flags
    }

    /// Record the outcome of one poll cycle: any successful read marks the
    /// device responsive, `UNRESPONSIVE_CYCLE_LIMIT` failed cycles clear it.
    pub(crate) fn record_cycle(&mut self, any_success: bool) {
        if any_success {
            if !self.flags.responsive {
                info!(device = %self.id, "Device responding again");
            }
            self.failed_cycles = 0;
            self.flags.responsive = true;
            return;
        }

        self.failed_cycles = self.failed_cycles.saturating_add(1);
        if self.failed_cycles >= UNRESPONSIVE_CYCLE_LIMIT && self.flags.responsive {
            error!(
                device = %self.id,
                cycles = self.failed_cycles,
                "Device not responding"
            );
            self.flags.responsive = false;
        }
    }
}

/// Flag filter for `Inventory::list_devices`; `None` matches either value
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceFilter {
    pub compatible: Option<bool>,
    pub accessible: Option<bool>,
    pub responsive: Option<bool>,
}

impl DeviceFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn compatible(mut self, value: bool) -> Self {
        self.compatible = Some(value);
        self
    }

    pub fn accessible(mut self, value: bool) -> Self {
        self.accessible = Some(value);
        self
    }

    pub fn responsive(mut self, value: bool) -> Self {
        self.responsive = Some(value);
        self
    }

    pub fn matches(&self, flags: &DeviceFlags) -> bool {
        self.compatible.map_or(true, |v| v == flags.compatible)
            && self.accessible.map_or(true, |v| v == flags.accessible)
            && self.responsive.map_or(true, |v| v == flags.responsive)
    }
}

/// Probe one device and store the derived flags.
pub async fn probe<T>(device: &mut DeviceDescriptor, transport: &T) -> DeviceFlags
where
    T: SnmpTransport + ?Sized,
{
    let compatible = device.vendor.is_some();
    let accessible = transport.reachable(&device.endpoint).await;

    let responsive = match device.dialect().ok().and_then(|d| d.lookup(Param::UpsInfo)) {
        Some(spec) => match transport.get(&device.endpoint, spec.oid).await {
            Ok(_) => true,
            Err(e) => {
                debug!(device = %device.id, error = %e, "Probe read failed");
                false
            }
        },
        None => false,
    };

    device.flags = DeviceFlags {
        compatible,
        accessible,
        responsive,
    };
    device.failed_cycles = if responsive { 0 } else { UNRESPONSIVE_CYCLE_LIMIT };
    device.flags
}

/// Every configured device, keyed and ordered by identifier
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    devices: BTreeMap<String, DeviceDescriptor>,
}

impl Inventory {
    pub fn from_specs<'a, I>(specs: I) -> Self
    where
        I: IntoIterator<Item = (&'a String, &'a DeviceSpec)>,
    {
        let mut devices = BTreeMap::new();
        for (id, spec) in specs {
            let descriptor = DeviceDescriptor::new(id.clone(), spec);
            if let Err(e) = descriptor.dialect() {
                error!(device = %id, error = %e, "Device will not be polled");
            }
            devices.insert(id.clone(), descriptor);
        }
        Self { devices }
    }

    pub fn get(&self, id: &str) -> Option<&DeviceDescriptor> {
        self.devices.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut DeviceDescriptor> {
        self.devices.get_mut(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DeviceDescriptor> {
        self.devices.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut DeviceDescriptor> {
        self.devices.values_mut()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// The device whose power events trigger actions, if one is configured.
    pub fn daemon_device(&self) -> Option<&DeviceDescriptor> {
        self.devices.values().find(|d| d.daemon)
    }

    pub fn list_devices(&self, filter: DeviceFilter) -> Vec<&DeviceDescriptor> {
        self.devices
            .values()
            .filter(|d| filter.matches(&d.flags))
            .collect()
    }

    pub async fn probe_all<T>(&mut self, transport: &T)
    where
        T: SnmpTransport + ?Sized,
    {
        for device in self.devices.values_mut() {
            let flags = probe(device, transport).await;
            info!(
                device = %device.id,
                vendor = %device.vendor_tag,
                compatible = flags.compatible,
                accessible = flags.accessible,
                responsive = flags.responsive,
                "Probed device"
            );
        }
    }
}
