//! Provider-reported resource state
//!
//! A [`ResourceRecord`] is a snapshot of the attributes that matter for
//! migration decisions. Records are plain data: they are fetched, inspected
//! and serialized into backups, never mutated in place by the orchestrator.

use crate::identifier::ResourceIdentifier;
use crate::kind::ResourceKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// SKU of a load balancer, public IP or availability set
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sku {
    /// SKU name, compared exactly (`Basic`, `Standard`, `Classic`, `Aligned`)
    pub name: String,
    /// Optional tier (`Regional`, `Global`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<String>,
}

impl Sku {
    /// Retiring network SKU
    pub const BASIC: &'static str = "Basic";
    /// Target network SKU
    pub const STANDARD: &'static str = "Standard";
    /// Legacy availability set SKU
    pub const CLASSIC: &'static str = "Classic";
    /// Managed-disk-compatible availability set SKU
    pub const ALIGNED: &'static str = "Aligned";

    /// SKU with a name and no tier
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tier: None,
        }
    }

    /// `Basic`
    #[must_use]
    pub fn basic() -> Self {
        Self::new(Self::BASIC)
    }

    /// `Standard`
    #[must_use]
    pub fn standard() -> Self {
        Self::new(Self::STANDARD)
    }

    /// `Classic`
    #[must_use]
    pub fn classic() -> Self {
        Self::new(Self::CLASSIC)
    }

    /// `Aligned`
    #[must_use]
    pub fn aligned() -> Self {
        Self::new(Self::ALIGNED)
    }

    /// With tier
    #[inline]
    #[must_use]
    pub fn with_tier(mut self, tier: impl Into<String>) -> Self {
        self.tier = Some(tier.into());
        self
    }

    /// Exact name comparison
    #[inline]
    #[must_use]
    pub fn is(&self, name: &str) -> bool {
        self.name == name
    }

    /// Whether this is the retiring `Basic` SKU
    #[inline]
    #[must_use]
    pub fn is_basic(&self) -> bool {
        self.is(Self::BASIC)
    }
}

/// VM power state as reported by the instance view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PowerState {
    /// Running
    Running,
    /// Stopped but still allocated
    Stopped,
    /// Stopped and deallocated
    Deallocated,
    /// Not reported
    #[default]
    Unknown,
}

/// IP address family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum IpVersion {
    /// IPv4
    #[default]
    IPv4,
    /// IPv6
    IPv6,
}

/// Public IP allocation method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum AllocationMethod {
    /// Address fixed at creation
    Static,
    /// Address assigned on attach
    #[default]
    Dynamic,
}

/// OS disk of a virtual machine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OsDisk {
    /// Disk name
    pub name: String,
    /// Managed disk resource id, absent for unmanaged disks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub managed_disk_id: Option<String>,
    /// Backing VHD blob URI for unmanaged disks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vhd_uri: Option<String>,
}

impl OsDisk {
    /// Unmanaged disk backed by a VHD blob
    #[must_use]
    pub fn unmanaged(name: impl Into<String>, vhd_uri: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            managed_disk_id: None,
            vhd_uri: Some(vhd_uri.into()),
        }
    }

    /// Managed disk
    #[must_use]
    pub fn managed(name: impl Into<String>, managed_disk_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            managed_disk_id: Some(managed_disk_id.into()),
            vhd_uri: None,
        }
    }

    /// Has a managed-disk reference
    #[inline]
    #[must_use]
    pub fn is_managed(&self) -> bool {
        self.managed_disk_id.is_some()
    }
}

/// Data disk of a virtual machine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataDisk {
    /// Logical unit number
    pub lun: u32,
    /// Disk name
    pub name: String,
    /// Managed disk resource id, absent for unmanaged disks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub managed_disk_id: Option<String>,
    /// Backing VHD blob URI for unmanaged disks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vhd_uri: Option<String>,
}

impl DataDisk {
    /// Has a managed-disk reference
    #[inline]
    #[must_use]
    pub fn is_managed(&self) -> bool {
        self.managed_disk_id.is_some()
    }
}

/// Virtual machine attributes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualMachineProperties {
    /// OS disk
    pub os_disk: OsDisk,
    /// Data disks
    #[serde(default)]
    pub data_disks: Vec<DataDisk>,
    /// Availability set the VM is placed in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub availability_set_id: Option<ResourceIdentifier>,
    /// Power state
    #[serde(default)]
    pub power_state: PowerState,
}

impl VirtualMachineProperties {
    /// Whether every disk carries a managed-disk reference
    #[must_use]
    pub fn all_disks_managed(&self) -> bool {
        self.os_disk.is_managed() && self.data_disks.iter().all(DataDisk::is_managed)
    }
}

/// Load balancer frontend IP configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrontendIpConfiguration {
    /// Configuration name
    pub name: String,
    /// Public IP bound to this frontend, if external
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_ip_id: Option<ResourceIdentifier>,
    /// Address family
    #[serde(default)]
    pub ip_version: IpVersion,
}

/// Load balancer backend pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendPool {
    /// Pool name
    pub name: String,
    /// Pool is owned by an AKS cluster
    #[serde(default)]
    pub aks_managed: bool,
}

/// Load balancer attributes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadBalancerProperties {
    /// SKU
    pub sku: Sku,
    /// Frontend IP configurations
    #[serde(default)]
    pub frontend_ip_configurations: Vec<FrontendIpConfiguration>,
    /// Backend pools
    #[serde(default)]
    pub backend_pools: Vec<BackendPool>,
}

impl LoadBalancerProperties {
    /// Whether any frontend is bound to the given public IP
    #[must_use]
    pub fn references_public_ip(&self, public_ip: &ResourceIdentifier) -> bool {
        self.public_ip_ids().any(|id| id == public_ip)
    }

    /// Public IPs bound to this load balancer's frontends
    pub fn public_ip_ids(&self) -> impl Iterator<Item = &ResourceIdentifier> {
        self.frontend_ip_configurations
            .iter()
            .filter_map(|fe| fe.public_ip_id.as_ref())
    }
}

/// Public IP address attributes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicIpProperties {
    /// SKU
    pub sku: Sku,
    /// Allocation method
    #[serde(default)]
    pub allocation: AllocationMethod,
    /// Address family
    #[serde(default)]
    pub ip_version: IpVersion,
    /// IP configuration the address is attached to (NIC, LB frontend, gateway)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attached_to: Option<ResourceIdentifier>,
}

impl PublicIpProperties {
    /// Attached to a virtual network gateway's IP configuration
    #[must_use]
    pub fn attached_to_gateway(&self) -> bool {
        self.attached_to
            .as_ref()
            .is_some_and(|id| id.top_level().resource_type() == "virtualNetworkGateways")
    }
}

/// Availability set attributes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilitySetProperties {
    /// SKU (`Classic` or `Aligned`)
    pub sku: Sku,
    /// Fault domain count
    #[serde(default)]
    pub platform_fault_domain_count: u32,
}

/// Typed attributes, by resource kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "properties")]
pub enum ResourceProperties {
    /// Virtual machine
    VirtualMachine(VirtualMachineProperties),
    /// Load balancer
    LoadBalancer(LoadBalancerProperties),
    /// Public IP address
    PublicIpAddress(PublicIpProperties),
    /// Availability set
    AvailabilitySet(AvailabilitySetProperties),
    /// Anything else, kept verbatim
    Other(serde_json::Value),
}

impl ResourceProperties {
    /// Kind these properties describe, `None` for [`ResourceProperties::Other`]
    #[must_use]
    pub fn kind(&self) -> Option<ResourceKind> {
        match self {
            Self::VirtualMachine(_) => Some(ResourceKind::VirtualMachine),
            Self::LoadBalancer(_) => Some(ResourceKind::LoadBalancer),
            Self::PublicIpAddress(_) => Some(ResourceKind::PublicIpAddress),
            Self::AvailabilitySet(_) => Some(ResourceKind::AvailabilitySet),
            Self::Other(_) => None,
        }
    }
}

/// Snapshot of one resource as reported by the provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRecord {
    /// Identifier
    pub id: ResourceIdentifier,
    /// Azure region
    #[serde(default)]
    pub location: String,
    /// Resource tags
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
    /// Typed attributes
    #[serde(flatten)]
    pub properties: ResourceProperties,
}

impl ResourceRecord {
    /// Create a record
    #[must_use]
    pub fn new(
        id: ResourceIdentifier,
        location: impl Into<String>,
        properties: ResourceProperties,
    ) -> Self {
        Self {
            id,
            location: location.into(),
            tags: BTreeMap::new(),
            properties,
        }
    }

    /// With tag
    #[must_use]
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Kind described by the properties
    #[inline]
    #[must_use]
    pub fn kind(&self) -> Option<ResourceKind> {
        self.properties.kind()
    }

    /// SKU, for kinds that have one
    #[must_use]
    pub fn sku(&self) -> Option<&Sku> {
        match &self.properties {
            ResourceProperties::LoadBalancer(lb) => Some(&lb.sku),
            ResourceProperties::PublicIpAddress(pip) => Some(&pip.sku),
            ResourceProperties::AvailabilitySet(set) => Some(&set.sku),
            ResourceProperties::VirtualMachine(_) | ResourceProperties::Other(_) => None,
        }
    }

    /// Virtual machine attributes
    #[must_use]
    pub fn as_virtual_machine(&self) -> Option<&VirtualMachineProperties> {
        match &self.properties {
            ResourceProperties::VirtualMachine(vm) => Some(vm),
            _ => None,
        }
    }

    /// Load balancer attributes
    #[must_use]
    pub fn as_load_balancer(&self) -> Option<&LoadBalancerProperties> {
        match &self.properties {
            ResourceProperties::LoadBalancer(lb) => Some(lb),
            _ => None,
        }
    }

    /// Public IP attributes
    #[must_use]
    pub fn as_public_ip(&self) -> Option<&PublicIpProperties> {
        match &self.properties {
            ResourceProperties::PublicIpAddress(pip) => Some(pip),
            _ => None,
        }
    }

    /// Availability set attributes
    #[must_use]
    pub fn as_availability_set(&self) -> Option<&AvailabilitySetProperties> {
        match &self.properties {
            ResourceProperties::AvailabilitySet(set) => Some(set),
            _ => None,
        }
    }
}
