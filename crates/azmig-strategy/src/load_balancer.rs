//! Basic to Standard load balancer upgrade

use crate::strategy::{
    ExecuteOptions, ExecutionHandle, MigrationStrategy, StrategyError, VerificationOutcome,
};
use async_trait::async_trait;
use azmig_resource::{
    IpVersion, LoadBalancerProperties, MigrationType, ProviderClient, ReplacementRequest,
    ResourceRecord, Sku,
};

const STEP_REPLACE: &str = "create_replacement_resource";

/// Re-creates a Basic load balancer on the Standard SKU
///
/// Frontend, backend and rule configuration are carried over by the
/// provider; the strategy only checks that nothing it cannot carry is present.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoadBalancerUpgradeStrategy;

impl LoadBalancerUpgradeStrategy {
    /// Create strategy
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

fn lb_properties(record: &ResourceRecord) -> Result<&LoadBalancerProperties, StrategyError> {
    record
        .as_load_balancer()
        .ok_or_else(|| StrategyError::unsupported(&record.id, "resource is not a load balancer"))
}

#[async_trait]
impl MigrationStrategy for LoadBalancerUpgradeStrategy {
    fn migration_type(&self) -> MigrationType {
        MigrationType::LoadBalancerUpgrade
    }

    fn name(&self) -> &'static str {
        "load_balancer_upgrade"
    }

    fn validate(&self, record: &ResourceRecord) -> Result<(), StrategyError> {
        let lb = lb_properties(record)?;

        if !lb.sku.is_basic() {
            return Err(StrategyError::unsupported(
                &record.id,
                format!("expected Basic SKU, found {}", lb.sku.name),
            ));
        }
        if let Some(fe) = lb
            .frontend_ip_configurations
            .iter()
            .find(|fe| fe.ip_version == IpVersion::IPv6)
        {
            return Err(StrategyError::unsupported(
                &record.id,
                format!("IPv6 frontend configuration {} is not supported", fe.name),
            ));
        }
        if let Some(pool) = lb.backend_pools.iter().find(|p| p.aks_managed) {
            return Err(StrategyError::unsupported(
                &record.id,
                format!("backend pool {} is managed by AKS", pool.name),
            ));
        }
        Ok(())
    }

    async fn execute(
        &self,
        record: &ResourceRecord,
        client: &dyn ProviderClient,
        _options: &ExecuteOptions,
    ) -> Result<ExecutionHandle, StrategyError> {
        lb_properties(record)?;
        let mut handle = ExecutionHandle::begin(self.migration_type(), record);

        let request = ReplacementRequest::new(record.id.clone(), Sku::standard());
        client
            .create_replacement_resource(&request)
            .await
            .map_err(|e| StrategyError::execution(&handle, STEP_REPLACE, e))?;
        handle.step(STEP_REPLACE);

        Ok(handle.finish())
    }

    async fn verify(
        &self,
        handle: &ExecutionHandle,
        client: &dyn ProviderClient,
    ) -> VerificationOutcome {
        let record = match client.fetch_resource(&handle.resource).await {
            Ok(record) => record,
            Err(e) => return VerificationOutcome::unreadable(handle.resource.clone(), &e),
        };
        let outcome = VerificationOutcome::new(handle.resource.clone());
        let Some(lb) = record.as_load_balancer() else {
            return outcome.check("resource kind", false, "resource is no longer a load balancer");
        };
        let expected_frontends = handle
            .baseline
            .as_load_balancer()
            .map_or(0, |b| b.frontend_ip_configurations.len());
        let frontends = lb.frontend_ip_configurations.len();

        outcome
            .check("sku", lb.sku.is(Sku::STANDARD), format!("sku is {}", lb.sku.name))
            .check(
                "frontends preserved",
                frontends == expected_frontends,
                format!("{frontends} of {expected_frontends} frontend configuration(s)"),
            )
    }
}
