//! Supported resource kinds and migration types

use crate::identifier::ResourceIdentifier;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Resource kinds with an automatic migration assessment
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    /// `Microsoft.Compute/virtualMachines`
    VirtualMachine,
    /// `Microsoft.Network/loadBalancers`
    LoadBalancer,
    /// `Microsoft.Network/publicIPAddresses`
    PublicIpAddress,
    /// `Microsoft.Compute/availabilitySets`
    AvailabilitySet,
}

impl ResourceKind {
    /// All supported kinds
    pub const ALL: [Self; 4] = [
        Self::VirtualMachine,
        Self::LoadBalancer,
        Self::PublicIpAddress,
        Self::AvailabilitySet,
    ];

    /// Full ARM type string (`provider/resourceType`)
    #[must_use]
    pub const fn full_type(self) -> &'static str {
        match self {
            Self::VirtualMachine => "Microsoft.Compute/virtualMachines",
            Self::LoadBalancer => "Microsoft.Network/loadBalancers",
            Self::PublicIpAddress => "Microsoft.Network/publicIPAddresses",
            Self::AvailabilitySet => "Microsoft.Compute/availabilitySets",
        }
    }

    /// Look up a kind by exact full type
    #[must_use]
    pub fn from_full_type(full_type: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.full_type() == full_type)
    }

    /// Kind addressed by an identifier, if supported
    #[must_use]
    pub fn of(id: &ResourceIdentifier) -> Option<Self> {
        Self::from_full_type(&id.full_type())
    }

    /// Migration applied to resources of this kind
    #[must_use]
    pub const fn migration_type(self) -> MigrationType {
        match self {
            Self::VirtualMachine => MigrationType::DiskConversion,
            Self::LoadBalancer => MigrationType::LoadBalancerUpgrade,
            Self::PublicIpAddress => MigrationType::PublicIpUpgrade,
            Self::AvailabilitySet => MigrationType::AvailabilitySetConversion,
        }
    }
}

impl Display for ResourceKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.full_type())
    }
}

/// One-way migration transitions the orchestrator knows how to drive
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MigrationType {
    /// Unmanaged (VHD blob) disks to managed disks
    DiskConversion,
    /// Basic load balancer to Standard
    LoadBalancerUpgrade,
    /// Basic public IP to Standard
    #[serde(rename = "PublicIPUpgrade")]
    PublicIpUpgrade,
    /// Classic availability set to Aligned
    AvailabilitySetConversion,
    /// Not assessed automatically
    Unsupported,
}

impl MigrationType {
    /// Priority tier; lower tiers run first.
    ///
    /// A resource's dependencies always sit in a strictly lower tier:
    /// availability sets before the VMs placed in them, load balancers before
    /// the public IPs they front.
    #[must_use]
    pub const fn tier(self) -> u8 {
        match self {
            Self::AvailabilitySetConversion => 0,
            Self::DiskConversion => 1,
            Self::LoadBalancerUpgrade => 2,
            Self::PublicIpUpgrade => 3,
            Self::Unsupported => 4,
        }
    }

    /// Stable display name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DiskConversion => "DiskConversion",
            Self::LoadBalancerUpgrade => "LoadBalancerUpgrade",
            Self::PublicIpUpgrade => "PublicIPUpgrade",
            Self::AvailabilitySetConversion => "AvailabilitySetConversion",
            Self::Unsupported => "Unsupported",
        }
    }
}

impl Display for MigrationType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}
