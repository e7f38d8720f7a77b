//! In-memory provider
//!
//! [`InMemoryProvider`] keeps an inventory of [`ResourceRecord`]s and applies
//! migration writes to it with the same preconditions the real provider
//! enforces (a VM must be deallocated before its disks are replaced, a Basic
//! public IP must be static before it can move to Standard, ...). Faults can
//! be queued per operation to exercise error paths.

use crate::identifier::ResourceIdentifier;
use crate::kind::ResourceKind;
use crate::provider::{
    PowerAction, ProviderClient, ProviderError, ProviderOperation, Relation, ReplacementRequest,
};
use crate::record::{
    AllocationMethod, PowerState, ResourceProperties, ResourceRecord, Sku,
};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, VecDeque};

/// Serialized inventory layout
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Inventory {
    /// All known resources
    pub resources: Vec<ResourceRecord>,
}

/// Provider backed by an in-memory inventory
#[derive(Debug, Default)]
pub struct InMemoryProvider {
    resources: RwLock<BTreeMap<ResourceIdentifier, ResourceRecord>>,
    faults: Mutex<HashMap<ProviderOperation, VecDeque<ProviderError>>>,
}

impl InMemoryProvider {
    /// Create empty provider
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create provider holding the given records
    #[must_use]
    pub fn with_resources(records: impl IntoIterator<Item = ResourceRecord>) -> Self {
        let provider = Self::new();
        for record in records {
            provider.insert(record);
        }
        provider
    }

    /// Load from a JSON [`Inventory`]
    ///
    /// # Errors
    /// Returns the deserialization error for malformed input
    pub fn from_inventory_json(json: &str) -> Result<Self, serde_json::Error> {
        let inventory: Inventory = serde_json::from_str(json)?;
        Ok(Self::with_resources(inventory.resources))
    }

    /// Export the current state as a JSON [`Inventory`]
    ///
    /// # Errors
    /// Returns the serialization error, if any
    pub fn to_inventory_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&Inventory {
            resources: self.records(),
        })
    }

    /// Insert or replace a record
    pub fn insert(&self, record: ResourceRecord) {
        self.resources.write().insert(record.id.clone(), record);
    }

    /// Current record for `id`
    #[must_use]
    pub fn get(&self, id: &ResourceIdentifier) -> Option<ResourceRecord> {
        self.resources.read().get(id).cloned()
    }

    /// All records, ordered by identifier
    #[must_use]
    pub fn records(&self) -> Vec<ResourceRecord> {
        self.resources.read().values().cloned().collect()
    }

    /// Number of records
    #[must_use]
    pub fn len(&self) -> usize {
        self.resources.read().len()
    }

    /// Check if inventory is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.read().is_empty()
    }

    /// Fail the next call of `operation` with `error`
    ///
    /// Faults queue up: injecting twice fails the next two calls.
    pub fn inject_fault(&self, operation: ProviderOperation, error: ProviderError) {
        self.faults.lock().entry(operation).or_default().push_back(error);
    }

    fn take_fault(&self, operation: ProviderOperation) -> Result<(), ProviderError> {
        match self
            .faults
            .lock()
            .get_mut(&operation)
            .and_then(VecDeque::pop_front)
        {
            Some(error) => {
                tracing::debug!(operation = %operation, error = %error, "Injected provider fault");
                Err(error)
            }
            None => Ok(()),
        }
    }

    fn update<F>(&self, id: &ResourceIdentifier, f: F) -> Result<ResourceRecord, ProviderError>
    where
        F: FnOnce(&mut ResourceRecord) -> Result<(), ProviderError>,
    {
        let mut resources = self.resources.write();
        let record = resources
            .get_mut(id)
            .ok_or_else(|| ProviderError::NotFound(id.clone()))?;

        // Work on a copy so a rejected write leaves the record untouched
        let mut updated = record.clone();
        f(&mut updated)?;
        *record = updated.clone();
        Ok(updated)
    }
}

fn managed_disk_id(vm: &ResourceIdentifier, disk_name: &str) -> String {
    ResourceIdentifier::new(
        vm.subscription_id(),
        vm.resource_group(),
        "Microsoft.Compute",
        "disks",
        disk_name,
    )
    .map_or_else(|_| format!("{vm}/disks/{disk_name}"), |id| id.to_string())
}

#[async_trait]
impl ProviderClient for InMemoryProvider {
    async fn fetch_resource(
        &self,
        id: &ResourceIdentifier,
    ) -> Result<ResourceRecord, ProviderError> {
        self.take_fault(ProviderOperation::FetchResource)?;
        self.get(id).ok_or_else(|| ProviderError::NotFound(id.clone()))
    }

    async fn fetch_associated(
        &self,
        id: &ResourceIdentifier,
        relation: Relation,
    ) -> Result<Vec<ResourceRecord>, ProviderError> {
        self.take_fault(ProviderOperation::FetchAssociated)?;
        let resources = self.resources.read();

        match relation {
            Relation::FrontendPublicIps => {
                let lb = resources
                    .get(id)
                    .ok_or_else(|| ProviderError::NotFound(id.clone()))?;
                let lb = lb.as_load_balancer().ok_or_else(|| {
                    ProviderError::InvalidRequest(format!("{id} is not a load balancer"))
                })?;
                Ok(lb
                    .public_ip_ids()
                    .filter_map(|pip| resources.get(pip).cloned())
                    .collect())
            }
            Relation::LoadBalancersInResourceGroup => Ok(resources
                .values()
                .filter(|r| r.kind() == Some(ResourceKind::LoadBalancer))
                .filter(|r| r.id.same_resource_group(id))
                .cloned()
                .collect()),
        }
    }

    async fn apply_sku_change(
        &self,
        id: &ResourceIdentifier,
        sku: &Sku,
    ) -> Result<ResourceRecord, ProviderError> {
        self.take_fault(ProviderOperation::ApplySkuChange)?;
        self.update(id, |record| match &mut record.properties {
            ResourceProperties::LoadBalancer(lb) => {
                lb.sku = sku.clone();
                Ok(())
            }
            ResourceProperties::PublicIpAddress(pip) => {
                if sku.is(Sku::STANDARD) && pip.allocation != AllocationMethod::Static {
                    return Err(ProviderError::InvalidRequest(format!(
                        "{id}: Standard public IPs require static allocation"
                    )));
                }
                pip.sku = sku.clone();
                Ok(())
            }
            ResourceProperties::AvailabilitySet(set) => {
                set.sku = sku.clone();
                Ok(())
            }
            ResourceProperties::VirtualMachine(_) | ResourceProperties::Other(_) => Err(
                ProviderError::InvalidRequest(format!("{id} has no SKU to change")),
            ),
        })
    }

    async fn set_public_ip_allocation(
        &self,
        id: &ResourceIdentifier,
        allocation: AllocationMethod,
    ) -> Result<ResourceRecord, ProviderError> {
        self.take_fault(ProviderOperation::SetPublicIpAllocation)?;
        self.update(id, |record| match &mut record.properties {
            ResourceProperties::PublicIpAddress(pip) => {
                pip.allocation = allocation;
                Ok(())
            }
            _ => Err(ProviderError::InvalidRequest(format!(
                "{id} is not a public IP address"
            ))),
        })
    }

    async fn set_power_state(
        &self,
        id: &ResourceIdentifier,
        action: PowerAction,
    ) -> Result<(), ProviderError> {
        self.take_fault(ProviderOperation::SetPowerState)?;
        self.update(id, |record| match &mut record.properties {
            ResourceProperties::VirtualMachine(vm) => {
                vm.power_state = match action {
                    PowerAction::Deallocate => PowerState::Deallocated,
                    PowerAction::Start => PowerState::Running,
                };
                Ok(())
            }
            _ => Err(ProviderError::InvalidRequest(format!(
                "{id} is not a virtual machine"
            ))),
        })
        .map(|_| ())
    }

    async fn replace_disk(&self, id: &ResourceIdentifier) -> Result<ResourceRecord, ProviderError> {
        self.take_fault(ProviderOperation::ReplaceDisk)?;
        self.update(id, |record| {
            let ResourceProperties::VirtualMachine(vm) = &mut record.properties else {
                return Err(ProviderError::InvalidRequest(format!(
                    "{id} is not a virtual machine"
                )));
            };
            if vm.power_state != PowerState::Deallocated {
                return Err(ProviderError::conflict(
                    id,
                    "virtual machine must be deallocated before disk conversion",
                ));
            }

            if !vm.os_disk.is_managed() {
                vm.os_disk.managed_disk_id = Some(managed_disk_id(id, &vm.os_disk.name));
                vm.os_disk.vhd_uri = None;
            }
            for disk in vm.data_disks.iter_mut().filter(|d| !d.is_managed()) {
                disk.managed_disk_id = Some(managed_disk_id(id, &disk.name));
                disk.vhd_uri = None;
            }
            Ok(())
        })
    }

    async fn create_replacement_resource(
        &self,
        request: &ReplacementRequest,
    ) -> Result<ResourceRecord, ProviderError> {
        self.take_fault(ProviderOperation::CreateReplacementResource)?;
        let id = &request.source;
        self.update(id, |record| match &mut record.properties {
            ResourceProperties::LoadBalancer(lb) => {
                lb.sku = request.target_sku.clone();
                Ok(())
            }
            _ => Err(ProviderError::InvalidRequest(format!(
                "replacement is only supported for load balancers, not {}",
                id.full_type()
            ))),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{
        FrontendIpConfiguration, IpVersion, LoadBalancerProperties, OsDisk, PublicIpProperties,
        VirtualMachineProperties,
    };

    fn id(provider: &str, resource_type: &str, name: &str) -> ResourceIdentifier {
        ResourceIdentifier::new("s", "rg", provider, resource_type, name).unwrap()
    }

    fn pip_id(name: &str) -> ResourceIdentifier {
        id("Microsoft.Network", "publicIPAddresses", name)
    }

    fn lb_record(name: &str, pips: &[&str]) -> ResourceRecord {
        ResourceRecord::new(
            id("Microsoft.Network", "loadBalancers", name),
            "westeurope",
            ResourceProperties::LoadBalancer(LoadBalancerProperties {
                sku: Sku::basic(),
                frontend_ip_configurations: pips
                    .iter()
                    .map(|p| FrontendIpConfiguration {
                        name: format!("fe-{p}"),
                        public_ip_id: Some(pip_id(p)),
                        ip_version: IpVersion::IPv4,
                    })
                    .collect(),
                backend_pools: vec![],
            }),
        )
    }

    fn pip_record(name: &str) -> ResourceRecord {
        ResourceRecord::new(
            pip_id(name),
            "westeurope",
            ResourceProperties::PublicIpAddress(PublicIpProperties {
                sku: Sku::basic(),
                allocation: AllocationMethod::Dynamic,
                ip_version: IpVersion::IPv4,
                attached_to: None,
            }),
        )
    }

    fn vm_record(name: &str) -> ResourceRecord {
        ResourceRecord::new(
            id("Microsoft.Compute", "virtualMachines", name),
            "westeurope",
            ResourceProperties::VirtualMachine(VirtualMachineProperties {
                os_disk: OsDisk::unmanaged("osdisk", "https://acct.blob.core.windows.net/vhds/os.vhd"),
                data_disks: vec![],
                availability_set_id: None,
                power_state: PowerState::Running,
            }),
        )
    }

    #[tokio::test]
    async fn fetch_missing_resource() {
        let provider = InMemoryProvider::new();
        let err = provider.fetch_resource(&pip_id("nope")).await.unwrap_err();
        assert!(matches!(err, ProviderError::NotFound(_)));
    }

    #[tokio::test]
    async fn frontend_public_ips() {
        let provider = InMemoryProvider::with_resources([
            lb_record("lb1", &["pip1", "missing"]),
            pip_record("pip1"),
            pip_record("pip2"),
        ]);
        let lb = id("Microsoft.Network", "loadBalancers", "lb1");
        let pips = provider
            .fetch_associated(&lb, Relation::FrontendPublicIps)
            .await
            .unwrap();
        assert_eq!(pips.len(), 1);
        assert_eq!(pips[0].id, pip_id("pip1"));
    }

    #[tokio::test]
    async fn load_balancers_in_resource_group() {
        let mut elsewhere = lb_record("lb-other", &[]);
        elsewhere.id = ResourceIdentifier::new("s", "rg2", "Microsoft.Network", "loadBalancers", "lb-other")
            .unwrap();
        let provider = InMemoryProvider::with_resources([
            lb_record("lb1", &["pip1"]),
            elsewhere,
            pip_record("pip1"),
        ]);
        let lbs = provider
            .fetch_associated(&pip_id("pip1"), Relation::LoadBalancersInResourceGroup)
            .await
            .unwrap();
        assert_eq!(lbs.len(), 1);
        assert_eq!(lbs[0].id.resource_name(), "lb1");
    }

    #[tokio::test]
    async fn standard_public_ip_requires_static_allocation() {
        let provider = InMemoryProvider::with_resources([pip_record("pip1")]);
        let pip = pip_id("pip1");

        let err = provider.apply_sku_change(&pip, &Sku::standard()).await.unwrap_err();
        assert!(matches!(err, ProviderError::InvalidRequest(_)));
        assert!(provider.get(&pip).unwrap().sku().unwrap().is_basic());

        provider
            .set_public_ip_allocation(&pip, AllocationMethod::Static)
            .await
            .unwrap();
        let updated = provider.apply_sku_change(&pip, &Sku::standard()).await.unwrap();
        assert!(updated.sku().unwrap().is(Sku::STANDARD));
    }

    #[tokio::test]
    async fn replace_disk_requires_deallocation() {
        let provider = InMemoryProvider::with_resources([vm_record("vm1")]);
        let vm = id("Microsoft.Compute", "virtualMachines", "vm1");

        let err = provider.replace_disk(&vm).await.unwrap_err();
        assert!(matches!(err, ProviderError::Conflict { .. }));

        provider.set_power_state(&vm, PowerAction::Deallocate).await.unwrap();
        let record = provider.replace_disk(&vm).await.unwrap();
        let props = record.as_virtual_machine().unwrap();
        assert!(props.all_disks_managed());
        assert!(props.os_disk.vhd_uri.is_none());
        assert!(props
            .os_disk
            .managed_disk_id
            .as_deref()
            .unwrap()
            .ends_with("/providers/Microsoft.Compute/disks/osdisk"));
    }

    #[tokio::test]
    async fn injected_faults_are_consumed_in_order() {
        let provider = InMemoryProvider::with_resources([pip_record("pip1")]);
        provider.inject_fault(
            ProviderOperation::FetchResource,
            ProviderError::Transient("throttled".into()),
        );

        assert!(provider.fetch_resource(&pip_id("pip1")).await.is_err());
        assert!(provider.fetch_resource(&pip_id("pip1")).await.is_ok());
    }

    #[tokio::test]
    async fn replacement_keeps_configuration() {
        let provider = InMemoryProvider::with_resources([lb_record("lb1", &["pip1"])]);
        let lb = id("Microsoft.Network", "loadBalancers", "lb1");
        let record = provider
            .create_replacement_resource(&ReplacementRequest::new(lb.clone(), Sku::standard()))
            .await
            .unwrap();
        let props = record.as_load_balancer().unwrap();
        assert!(props.sku.is(Sku::STANDARD));
        assert_eq!(props.frontend_ip_configurations.len(), 1);
    }

    #[test]
    fn inventory_round_trip() {
        let provider = InMemoryProvider::with_resources([vm_record("vm1"), pip_record("pip1")]);
        let json = provider.to_inventory_json().unwrap();
        let loaded = InMemoryProvider::from_inventory_json(&json).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.records(), provider.records());
    }
}
