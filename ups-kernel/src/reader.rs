//! Snapshot reader
//!
//! Reads a named subset of one device's registers through the transport,
//! decodes each with its dialect rule and assembles a `Snapshot`. Each
//! register gets one retry; once a register exhausts it, the rest of the
//! cycle is recorded `Unresponsive` without contacting the device again.

use chrono::Utc;
use tracing::{debug, warn};

use crate::decoder::decode;
use crate::dialect::RegisterSpec;
use crate::error::KernelError;
use crate::inventory::DeviceDescriptor;
use crate::models::{Category, Param, Reading, Snapshot};
use crate::thresholds::ThresholdConfig;
use crate::transport::{Endpoint, SnmpTransport, TransportError};

pub struct SnapshotReader<'a, T: ?Sized> {
    transport: &'a T,
    thresholds: &'a ThresholdConfig,
}

impl<'a, T> SnapshotReader<'a, T>
where
    T: SnmpTransport + ?Sized,
{
    pub fn new(transport: &'a T, thresholds: &'a ThresholdConfig) -> Self {
        Self {
            transport,
            thresholds,
        }
    }

    /// Read the given parameters; names the device's dialect lacks are skipped.
    pub async fn read_params(
        &self,
        device: &mut DeviceDescriptor,
        params: &[Param],
    ) -> Result<Snapshot, KernelError> {
        let dialect = device.dialect()?;
        let specs: Vec<&'static RegisterSpec> = params
            .iter()
            .filter_map(|param| {
                let spec = dialect.lookup(*param);
                if spec.is_none() {
                    debug!(device = %device.id(), %param, "Not provided by dialect");
                }
                spec
            })
            .collect();
        Ok(self.read_specs(device, specs).await)
    }

    pub async fn read_category(
        &self,
        device: &mut DeviceDescriptor,
        category: Category,
    ) -> Result<Snapshot, KernelError> {
        self.read_categories(device, &[category]).await
    }

    /// Read several categories into one snapshot, in dialect table order.
    pub async fn read_categories(
        &self,
        device: &mut DeviceDescriptor,
        categories: &[Category],
    ) -> Result<Snapshot, KernelError> {
        let dialect = device.dialect()?;
        let specs: Vec<&'static RegisterSpec> = dialect
            .registers
            .iter()
            .filter(|r| categories.contains(&r.category))
            .collect();
        Ok(self.read_specs(device, specs).await)
    }

    async fn read_specs(&self, device: &mut DeviceDescriptor, specs: Vec<&'static RegisterSpec>) -> Snapshot {
        let mut snapshot = Snapshot::new(device.id(), Utc::now());
        if specs.is_empty() {
            return snapshot;
        }

        let mut any_success = false;
        for spec in specs {
            if !snapshot.responsive {
                snapshot.readings.insert(spec.param, Reading::Unresponsive);
                continue;
            }

            match self.read_register(device.endpoint(), spec).await {
                Ok(raw) => {
                    any_success = true;
                    let value = decode(&raw, &spec.rule, self.thresholds);
                    debug!(device = %device.id(), param = %spec.param, %value, "Read register");
                    snapshot.readings.insert(spec.param, Reading::Value(value));
                }
                Err(e) => {
                    warn!(
                        device = %device.id(),
                        param = %spec.param,
                        error = %e,
                        "Register not responding, skipping rest of cycle"
                    );
                    snapshot.responsive = false;
                    snapshot.readings.insert(spec.param, Reading::Unresponsive);
                }
            }
        }

        device.record_cycle(any_success);
        snapshot
    }

    async fn read_register(&self, endpoint: &Endpoint, spec: &RegisterSpec) -> Result<String, TransportError> {
        match self.transport.get(endpoint, spec.oid).await {
            Ok(raw) => Ok(raw),
            Err(e) => {
                debug!(param = %spec.param, error = %e, "Retrying register");
                self.transport.get(endpoint, spec.oid).await
            }
        }
    }
}
