//! Classic to Aligned availability set conversion

use crate::strategy::{
    ExecuteOptions, ExecutionHandle, MigrationStrategy, StrategyError, VerificationOutcome,
};
use async_trait::async_trait;
use azmig_resource::{MigrationType, ProviderClient, ResourceRecord, Sku};

const STEP_SKU: &str = "apply_sku_change";

/// Moves a Classic availability set to the Aligned SKU
#[derive(Debug, Default, Clone, Copy)]
pub struct AvailabilitySetConversionStrategy;

impl AvailabilitySetConversionStrategy {
    /// Create strategy
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MigrationStrategy for AvailabilitySetConversionStrategy {
    fn migration_type(&self) -> MigrationType {
        MigrationType::AvailabilitySetConversion
    }

    fn name(&self) -> &'static str {
        "availability_set_conversion"
    }

    fn validate(&self, record: &ResourceRecord) -> Result<(), StrategyError> {
        let set = record.as_availability_set().ok_or_else(|| {
            StrategyError::unsupported(&record.id, "resource is not an availability set")
        })?;
        if !set.sku.is(Sku::CLASSIC) {
            return Err(StrategyError::unsupported(
                &record.id,
                format!("expected Classic SKU, found {}", set.sku.name),
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
        let mut handle = ExecutionHandle::begin(self.migration_type(), record);
        client
            .apply_sku_change(&record.id, &Sku::aligned())
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
        match client.fetch_resource(&handle.resource).await {
            Ok(record) => {
                let sku = record.as_availability_set().map(|s| s.sku.name.as_str());
                VerificationOutcome::new(handle.resource.clone()).check(
                    "sku",
                    sku == Some(Sku::ALIGNED),
                    format!("sku is {}", sku.unwrap_or("missing")),
                )
            }
            Err(e) => VerificationOutcome::unreadable(handle.resource.clone(), &e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use azmig_resource::{
        AvailabilitySetProperties, InMemoryProvider, ResourceIdentifier, ResourceProperties,
    };

    fn avset(sku: Sku) -> ResourceRecord {
        ResourceRecord::new(
            ResourceIdentifier::new("s", "rg", "Microsoft.Compute", "availabilitySets", "as1").unwrap(),
            "westeurope",
            ResourceProperties::AvailabilitySet(AvailabilitySetProperties {
                sku,
                platform_fault_domain_count: 2,
            }),
        )
    }

    #[test]
    fn validate_requires_classic() {
        let strategy = AvailabilitySetConversionStrategy::new();
        assert!(strategy.validate(&avset(Sku::classic())).is_ok());
        assert!(strategy.validate(&avset(Sku::aligned())).is_err());
    }

    #[tokio::test]
    async fn converts_to_aligned() {
        let record = avset(Sku::classic());
        let provider = InMemoryProvider::with_resources([record.clone()]);
        let strategy = AvailabilitySetConversionStrategy::new();

        let handle = strategy
            .execute(&record, &provider, &ExecuteOptions::default())
            .await
            .unwrap();
        let outcome = strategy.verify(&handle, &provider).await;
        assert!(outcome.passed());
        assert_eq!(outcome.checks[0].detail, "sku is Aligned");
    }

    #[tokio::test]
    async fn verify_reports_missing_resource() {
        let record = avset(Sku::classic());
        let provider = InMemoryProvider::new();
        let handle = ExecutionHandle::begin(MigrationType::AvailabilitySetConversion, &record);
        let outcome = AvailabilitySetConversionStrategy::new().verify(&handle, &provider).await;
        assert!(!outcome.passed());
        assert!(outcome.failure_summary().contains("resource not found"));
    }
}
