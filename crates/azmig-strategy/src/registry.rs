//! Strategy registry
//!
//! Provides [`StrategyRegistry`], the single place migration types are mapped
//! to their [`MigrationStrategy`] implementation.

use crate::availability_set::AvailabilitySetConversionStrategy;
use crate::disk::DiskConversionStrategy;
use crate::load_balancer::LoadBalancerUpgradeStrategy;
use crate::public_ip::PublicIpUpgradeStrategy;
use crate::strategy::MigrationStrategy;
use azmig_resource::MigrationType;
use std::collections::HashMap;
use std::sync::Arc;

/// Registry of migration strategies keyed by migration type
#[derive(Debug, Default, Clone)]
pub struct StrategyRegistry {
    strategies: HashMap<MigrationType, Arc<dyn MigrationStrategy>>,
}

impl StrategyRegistry {
    /// Create new empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            strategies: HashMap::new(),
        }
    }

    /// Create registry with built-in strategies
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(DiskConversionStrategy::new()));
        registry.register(Arc::new(LoadBalancerUpgradeStrategy::new()));
        registry.register(Arc::new(PublicIpUpgradeStrategy::new()));
        registry.register(Arc::new(AvailabilitySetConversionStrategy::new()));
        registry
    }

    /// Register a strategy under its own migration type
    ///
    /// Returns the strategy previously registered for that type, if any.
    pub fn register(
        &mut self,
        strategy: Arc<dyn MigrationStrategy>,
    ) -> Option<Arc<dyn MigrationStrategy>> {
        let migration_type = strategy.migration_type();
        tracing::debug!(
            migration_type = %migration_type,
            strategy = strategy.name(),
            "Registering migration strategy"
        );
        self.strategies.insert(migration_type, strategy)
    }

    /// Resolve the strategy for a migration type
    ///
    /// # Errors
    /// Returns [`RegistryError::NoStrategy`] when nothing is registered
    pub fn resolve(
        &self,
        migration_type: MigrationType,
    ) -> Result<Arc<dyn MigrationStrategy>, RegistryError> {
        self.strategies
            .get(&migration_type)
            .cloned()
            .ok_or(RegistryError::NoStrategy(migration_type))
    }

    /// Check if a strategy is registered
    #[inline]
    #[must_use]
    pub fn contains(&self, migration_type: MigrationType) -> bool {
        self.strategies.contains_key(&migration_type)
    }

    /// Remove strategy
    #[inline]
    pub fn remove(&mut self, migration_type: MigrationType) -> bool {
        self.strategies.remove(&migration_type).is_some()
    }

    /// Registered migration types, sorted by tier
    #[must_use]
    pub fn types(&self) -> Vec<MigrationType> {
        let mut types: Vec<_> = self.strategies.keys().copied().collect();
        types.sort_by_key(|t| (t.tier(), *t));
        types
    }

    /// Get number of registered strategies
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    /// Check if registry is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

/// Registry errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// No strategy registered for the migration type
    #[error("no strategy registered for migration type {0}")]
    NoStrategy(MigrationType),
}
