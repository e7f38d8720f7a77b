//! Provider client contract
//!
//! The orchestrator only ever talks to the cloud through [`ProviderClient`].
//! Errors come back as typed [`ProviderError`] kinds so that retry decisions
//! never depend on matching message text.

use crate::identifier::ResourceIdentifier;
use crate::record::{AllocationMethod, ResourceRecord, Sku};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Relationship queried through [`ProviderClient::fetch_associated`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Relation {
    /// Public IPs bound to a load balancer's frontends
    FrontendPublicIps,
    /// Load balancers in the same resource group as the given resource
    LoadBalancersInResourceGroup,
}

/// VM power operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PowerAction {
    /// Stop and release compute
    Deallocate,
    /// Start
    Start,
}

/// Request to re-create a resource on a different SKU under the same identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplacementRequest {
    /// Resource being replaced
    pub source: ResourceIdentifier,
    /// SKU of the replacement
    pub target_sku: Sku,
}

impl ReplacementRequest {
    /// Create request
    #[inline]
    #[must_use]
    pub fn new(source: ResourceIdentifier, target_sku: Sku) -> Self {
        Self { source, target_sku }
    }
}

/// Operations exposed by [`ProviderClient`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ProviderOperation {
    /// [`ProviderClient::fetch_resource`]
    FetchResource,
    /// [`ProviderClient::fetch_associated`]
    FetchAssociated,
    /// [`ProviderClient::apply_sku_change`]
    ApplySkuChange,
    /// [`ProviderClient::set_public_ip_allocation`]
    SetPublicIpAllocation,
    /// [`ProviderClient::set_power_state`]
    SetPowerState,
    /// [`ProviderClient::replace_disk`]
    ReplaceDisk,
    /// [`ProviderClient::create_replacement_resource`]
    CreateReplacementResource,
}

impl ProviderOperation {
    /// Whether the operation changes provider state
    #[must_use]
    pub const fn is_mutating(self) -> bool {
        !matches!(self, Self::FetchResource | Self::FetchAssociated)
    }

    /// Snake-case name used in logs
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FetchResource => "fetch_resource",
            Self::FetchAssociated => "fetch_associated",
            Self::ApplySkuChange => "apply_sku_change",
            Self::SetPublicIpAllocation => "set_public_ip_allocation",
            Self::SetPowerState => "set_power_state",
            Self::ReplaceDisk => "replace_disk",
            Self::CreateReplacementResource => "create_replacement_resource",
        }
    }
}

impl Display for ProviderOperation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors reported by the provider
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// Resource does not exist
    #[error("resource not found: {0}")]
    NotFound(ResourceIdentifier),

    /// Caller lacks permission
    #[error("permission denied on {resource}: {message}")]
    PermissionDenied {
        /// Resource the call targeted
        resource: ResourceIdentifier,
        /// Provider message
        message: String,
    },

    /// Throttling, timeouts and other transient conditions
    #[error("transient provider error: {0}")]
    Transient(String),

    /// Too many concurrent disk snapshots in the subscription
    #[error("snapshot count exceeded while processing {0}")]
    SnapshotCountExceeded(ResourceIdentifier),

    /// Resource is in a state that forbids the operation
    #[error("conflict on {resource}: {message}")]
    Conflict {
        /// Resource the call targeted
        resource: ResourceIdentifier,
        /// Provider message
        message: String,
    },

    /// Request rejected as invalid
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ProviderError {
    /// Check if error is retryable
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_) | Self::SnapshotCountExceeded(_))
    }

    /// Conflict helper
    pub fn conflict(resource: &ResourceIdentifier, message: impl Into<String>) -> Self {
        Self::Conflict {
            resource: resource.clone(),
            message: message.into(),
        }
    }

    /// Permission denied helper
    pub fn permission_denied(resource: &ResourceIdentifier, message: impl Into<String>) -> Self {
        Self::PermissionDenied {
            resource: resource.clone(),
            message: message.into(),
        }
    }
}

/// Abstract cloud provider client
///
/// Reads never change state. Writes return the resource as the provider
/// reports it after the change, except power operations which return nothing.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Fetch current state of one resource
    async fn fetch_resource(&self, id: &ResourceIdentifier)
        -> Result<ResourceRecord, ProviderError>;

    /// Fetch resources related to `id` through `relation`
    async fn fetch_associated(
        &self,
        id: &ResourceIdentifier,
        relation: Relation,
    ) -> Result<Vec<ResourceRecord>, ProviderError>;

    /// Change the SKU of a resource in place
    async fn apply_sku_change(
        &self,
        id: &ResourceIdentifier,
        sku: &Sku,
    ) -> Result<ResourceRecord, ProviderError>;

    /// Change a public IP's allocation method
    async fn set_public_ip_allocation(
        &self,
        id: &ResourceIdentifier,
        allocation: AllocationMethod,
    ) -> Result<ResourceRecord, ProviderError>;

    /// Start or deallocate a virtual machine
    async fn set_power_state(
        &self,
        id: &ResourceIdentifier,
        action: PowerAction,
    ) -> Result<(), ProviderError>;

    /// Convert all unmanaged disks of a deallocated VM to managed disks
    async fn replace_disk(&self, id: &ResourceIdentifier) -> Result<ResourceRecord, ProviderError>;

    /// Re-create a resource on another SKU, keeping its identifier and configuration
    async fn create_replacement_resource(
        &self,
        request: &ReplacementRequest,
    ) -> Result<ResourceRecord, ProviderError>;
}
