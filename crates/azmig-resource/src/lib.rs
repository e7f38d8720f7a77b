//! azmig Resource Model
//!
//! Everything the migration planner knows about a cloud resource, and the
//! contract through which it reads and changes provider state.
//!
//! # Core Concepts
//!
//! - [`ResourceIdentifier`]: Parsed ARM resource path
//! - [`ResourceRecord`]: Provider-reported attributes relevant to migration
//! - [`ResourceKind`] / [`MigrationType`]: Supported kinds and their transitions
//! - [`ProviderClient`]: Abstract provider API (reads and writes)
//! - [`InMemoryProvider`]: Inventory-backed provider for dry runs and tests
//!
//! # Example
//!
//! ```rust,ignore
//! use azmig_resource::{ResourceIdentifier, ResourceKind};
//!
//! let id: ResourceIdentifier =
//!     "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Network/loadBalancers/lb1".parse()?;
//! assert_eq!(ResourceKind::of(&id), Some(ResourceKind::LoadBalancer));
//! ```

#![warn(unreachable_pub)]

mod identifier;
mod kind;
mod memory;
mod provider;
mod record;

pub use identifier::{IdentifierError, ResourceIdentifier, MIN_SEGMENTS};
pub use kind::{MigrationType, ResourceKind};
pub use memory::{InMemoryProvider, Inventory};
pub use provider::{
    PowerAction, ProviderClient, ProviderError, ProviderOperation, Relation, ReplacementRequest,
};
pub use record::{
    AllocationMethod, AvailabilitySetProperties, BackendPool, DataDisk, FrontendIpConfiguration,
    IpVersion, LoadBalancerProperties, OsDisk, PowerState, PublicIpProperties, ResourceProperties,
    ResourceRecord, Sku, VirtualMachineProperties,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
