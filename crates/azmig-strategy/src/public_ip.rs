//! Basic to Standard public IP upgrade

use crate::strategy::{
    ExecuteOptions, ExecutionHandle, MigrationStrategy, StrategyError, VerificationOutcome,
};
use async_trait::async_trait;
use azmig_resource::{
    AllocationMethod, IpVersion, MigrationType, ProviderClient, PublicIpProperties,
    ResourceRecord, Sku,
};

const STEP_STATIC: &str = "set_public_ip_allocation";
const STEP_SKU: &str = "apply_sku_change";

/// Upgrades a Basic public IP to Standard in place
///
/// Standard addresses are always statically allocated, so a dynamic address
/// is switched to static first. The address itself is kept.
#[derive(Debug, Default, Clone, Copy)]
pub struct PublicIpUpgradeStrategy;

impl PublicIpUpgradeStrategy {
    /// Create strategy
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

fn pip_properties(record: &ResourceRecord) -> Result<&PublicIpProperties, StrategyError> {
    record
        .as_public_ip()
        .ok_or_else(|| StrategyError::unsupported(&record.id, "resource is not a public IP address"))
}

#[async_trait]
impl MigrationStrategy for PublicIpUpgradeStrategy {
    fn migration_type(&self) -> MigrationType {
        MigrationType::PublicIpUpgrade
    }

    fn name(&self) -> &'static str {
        "public_ip_upgrade"
    }

    fn validate(&self, record: &ResourceRecord) -> Result<(), StrategyError> {
        let pip = pip_properties(record)?;

        if !pip.sku.is_basic() {
            return Err(StrategyError::unsupported(
                &record.id,
                format!("expected Basic SKU, found {}", pip.sku.name),
            ));
        }
        if pip.ip_version == IpVersion::IPv6 {
            return Err(StrategyError::unsupported(&record.id, "IPv6 addresses are not supported"));
        }
        if pip.attached_to_gateway() {
            return Err(StrategyError::unsupported(
                &record.id,
                "address is attached to a virtual network gateway",
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
        let pip = pip_properties(record)?;
        let id = &record.id;
        let mut handle = ExecutionHandle::begin(self.migration_type(), record);

        if pip.allocation == AllocationMethod::Dynamic {
            client
                .set_public_ip_allocation(id, AllocationMethod::Static)
                .await
                .map_err(|e| StrategyError::execution(&handle, STEP_STATIC, e))?;
            handle.step(STEP_STATIC);
        }

        client
            .apply_sku_change(id, &Sku::standard())
            .await
            .map_err(|e| StrategyError::execution(&handle, STEP_SKU, e))?;
        handle.step(STEP_SKU);

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
        let Some(pip) = record.as_public_ip() else {
            return outcome.check("resource kind", false, "resource is no longer a public IP address");
        };

        outcome
            .check("sku", pip.sku.is(Sku::STANDARD), format!("sku is {}", pip.sku.name))
            .check(
                "static allocation",
                pip.allocation == AllocationMethod::Static,
                format!("allocation is {:?}", pip.allocation),
            )
    }
}
