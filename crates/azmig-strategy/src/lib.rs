//! Migration strategies
//!
//! Every migration type is driven through the same three-step contract:
//!
//! - [`MigrationStrategy`]: `validate` / `execute` / `verify`
//! - [`StrategyRegistry`]: maps a [`MigrationType`] to its strategy
//! - [`RetryPolicy`]: typed, bounded retry for provider calls
//!
//! Concrete strategies:
//! - [`DiskConversionStrategy`]
//! - [`LoadBalancerUpgradeStrategy`]
//! - [`PublicIpUpgradeStrategy`]
//! - [`AvailabilitySetConversionStrategy`]
//!
//! # Example
//!
//! ```rust,ignore
//! use azmig_strategy::{ExecuteOptions, StrategyRegistry};
//!
//! let registry = StrategyRegistry::with_defaults();
//! let strategy = registry.resolve(MigrationType::PublicIpUpgrade)?;
//!
//! strategy.validate(&record)?;
//! let handle = strategy.execute(&record, &client, &ExecuteOptions::default()).await?;
//! assert!(strategy.verify(&handle, &client).await.passed());
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod availability_set;
mod disk;
mod load_balancer;
mod public_ip;
mod registry;
mod retry;
mod strategy;

pub use availability_set::AvailabilitySetConversionStrategy;
pub use azmig_resource::MigrationType;
pub use disk::DiskConversionStrategy;
pub use load_balancer::LoadBalancerUpgradeStrategy;
pub use public_ip::PublicIpUpgradeStrategy;
pub use registry::{RegistryError, StrategyRegistry};
pub use retry::RetryPolicy;
pub use strategy::{
    ExecuteOptions, ExecutionHandle, MigrationStrategy, StrategyError, VerificationCheck,
    VerificationOutcome,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
