//! Resource classifier
//!
//! Reads current state through the [`ProviderClient`] and applies a pure
//! decision rule per resource kind. Provider failures are surfaced as
//! [`ClassificationError`], never read as "no migration needed".

use crate::assessment::{Classification, MigrationAssessment};
use crate::error::ClassificationError;
use azmig_resource::{
    LoadBalancerProperties, ProviderClient, PublicIpProperties, Relation, ResourceIdentifier,
    ResourceKind, ResourceRecord, Sku, VirtualMachineProperties,
};

/// Determines whether and how a resource must be migrated
#[derive(Debug, Clone, Copy, Default)]
pub struct Classifier {
    skip_dependency_check: bool,
}

impl Classifier {
    /// Create classifier
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With the public IP dependency check override
    ///
    /// When enabled, public IPs are assessed without looking for Basic load
    /// balancers that reference them; the assessment carries a warning instead.
    #[inline]
    #[must_use]
    pub fn with_skip_dependency_check(mut self, skip: bool) -> Self {
        self.skip_dependency_check = skip;
        self
    }

    /// Classify one resource
    ///
    /// # Errors
    /// Returns [`ClassificationError`] if a provider read fails or the provider
    /// reports a different kind of resource than the identifier names
    pub async fn classify(
        &self,
        id: &ResourceIdentifier,
        client: &dyn ProviderClient,
    ) -> Result<Classification, ClassificationError> {
        let Some(kind) = ResourceKind::of(id) else {
            tracing::debug!(resource = %id, "Resource type not supported for assessment");
            return Ok(Classification::new(id.clone(), None, MigrationAssessment::unsupported()));
        };

        let record = client
            .fetch_resource(id)
            .await
            .map_err(|e| ClassificationError::provider(id, e))?;

        let mismatch = || ClassificationError::KindMismatch {
            resource: id.clone(),
            expected: kind,
            found: record.kind(),
        };

        let assessment = match kind {
            ResourceKind::VirtualMachine => {
                assess_vm(record.as_virtual_machine().ok_or_else(mismatch)?)
            }
            ResourceKind::LoadBalancer => {
                let lb = record.as_load_balancer().ok_or_else(mismatch)?;
                let frontends = client
                    .fetch_associated(id, Relation::FrontendPublicIps)
                    .await
                    .map_err(|e| ClassificationError::provider(id, e))?;
                assess_lb(lb, &frontends)
            }
            ResourceKind::PublicIpAddress => {
                let pip = record.as_public_ip().ok_or_else(mismatch)?;
                self.assess_pip(id, pip, client).await?
            }
            ResourceKind::AvailabilitySet => {
                let set = record.as_availability_set().ok_or_else(mismatch)?;
                if set.sku.is(Sku::ALIGNED) {
                    MigrationAssessment::new(kind.migration_type(), false, "availability set is already Aligned")
                } else {
                    MigrationAssessment::new(
                        kind.migration_type(),
                        true,
                        format!("availability set uses the {} SKU", set.sku.name),
                    )
                }
            }
        };

        tracing::info!(
            resource = %id,
            migration_type = %assessment.migration_type,
            needs_migration = assessment.needs_migration,
            dependencies = assessment.dependencies.len(),
            "Resource classified"
        );
        Ok(Classification::new(id.clone(), Some(record), assessment))
    }

    async fn assess_pip(
        &self,
        id: &ResourceIdentifier,
        pip: &PublicIpProperties,
        client: &dyn ProviderClient,
    ) -> Result<MigrationAssessment, ClassificationError> {
        let migration_type = ResourceKind::PublicIpAddress.migration_type();
        if !pip.sku.is_basic() {
            return Ok(MigrationAssessment::new(
                migration_type,
                false,
                format!("public IP already uses the {} SKU", pip.sku.name),
            ));
        }

        let assessment = MigrationAssessment::new(migration_type, true, "public IP uses the Basic SKU");
        if self.skip_dependency_check {
            tracing::warn!(
                resource = %id,
                "Load balancer dependency check skipped by operator override"
            );
            return Ok(assessment.with_dependency_check_skipped());
        }

        let load_balancers = client
            .fetch_associated(id, Relation::LoadBalancersInResourceGroup)
            .await
            .map_err(|e| ClassificationError::provider(id, e))?;

        Ok(basic_load_balancers_referencing(id, &load_balancers)
            .fold(assessment, MigrationAssessment::with_dependency))
    }
}

fn basic_load_balancers_referencing<'a>(
    pip: &'a ResourceIdentifier,
    records: &'a [ResourceRecord],
) -> impl Iterator<Item = ResourceIdentifier> + 'a {
    records.iter().filter_map(move |record| {
        let lb: &LoadBalancerProperties = record.as_load_balancer()?;
        (lb.sku.is_basic() && lb.references_public_ip(pip)).then(|| record.id.clone())
    })
}

fn assess_vm(vm: &VirtualMachineProperties) -> MigrationAssessment {
    let migration_type = ResourceKind::VirtualMachine.migration_type();
    let assessment = if vm.os_disk.is_managed() {
        MigrationAssessment::new(migration_type, false, "OS disk already uses a managed disk")
    } else {
        MigrationAssessment::new(
            migration_type,
            true,
            format!("OS disk {} is an unmanaged VHD", vm.os_disk.name),
        )
    };
    match &vm.availability_set_id {
        Some(set) => assessment.with_dependency(set.clone()),
        None => assessment,
    }
}

fn assess_lb(lb: &LoadBalancerProperties, frontends: &[ResourceRecord]) -> MigrationAssessment {
    let migration_type = ResourceKind::LoadBalancer.migration_type();
    let assessment = if lb.sku.is_basic() {
        MigrationAssessment::new(migration_type, true, "load balancer uses the Basic SKU")
    } else {
        MigrationAssessment::new(
            migration_type,
            false,
            format!("load balancer already uses the {} SKU", lb.sku.name),
        )
    };
    frontends
        .iter()
        .map(|pip| pip.id.clone())
        .fold(assessment, MigrationAssessment::with_dependent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use azmig_resource::{
        AllocationMethod, AvailabilitySetProperties, FrontendIpConfiguration, InMemoryProvider,
        IpVersion, MigrationType, OsDisk, PowerState, ProviderError, ProviderOperation,
        ResourceProperties,
    };

    fn id(provider: &str, resource_type: &str, name: &str) -> ResourceIdentifier {
        ResourceIdentifier::new("s", "rg", provider, resource_type, name).unwrap()
    }

    fn pip_id(name: &str) -> ResourceIdentifier {
        id("Microsoft.Network", "publicIPAddresses", name)
    }

    fn lb_id(name: &str) -> ResourceIdentifier {
        id("Microsoft.Network", "loadBalancers", name)
    }

    fn lb(name: &str, sku: Sku, pips: &[&str]) -> ResourceRecord {
        ResourceRecord::new(
            lb_id(name),
            "westeurope",
            ResourceProperties::LoadBalancer(LoadBalancerProperties {
                sku,
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

    fn pip(name: &str, sku: Sku) -> ResourceRecord {
        ResourceRecord::new(
            pip_id(name),
            "westeurope",
            ResourceProperties::PublicIpAddress(PublicIpProperties {
                sku,
                allocation: AllocationMethod::Dynamic,
                ip_version: IpVersion::IPv4,
                attached_to: None,
            }),
        )
    }

    fn vm(name: &str, os_disk: OsDisk, set: Option<ResourceIdentifier>) -> ResourceRecord {
        ResourceRecord::new(
            id("Microsoft.Compute", "virtualMachines", name),
            "westeurope",
            ResourceProperties::VirtualMachine(VirtualMachineProperties {
                os_disk,
                data_disks: vec![],
                availability_set_id: set,
                power_state: PowerState::Running,
            }),
        )
    }

    #[tokio::test]
    async fn unmanaged_vm_needs_conversion_and_depends_on_its_set() {
        let set = id("Microsoft.Compute", "availabilitySets", "as1");
        let record = vm("vm1", OsDisk::unmanaged("os", "https://a/vhds/os.vhd"), Some(set.clone()));
        let provider = InMemoryProvider::with_resources([record.clone()]);

        let c = Classifier::new().classify(&record.id, &provider).await.unwrap();
        assert!(c.assessment.needs_migration);
        assert_eq!(c.assessment.migration_type, MigrationType::DiskConversion);
        assert_eq!(c.assessment.priority_tier, 1);
        assert!(c.assessment.dependencies.contains(&set));
        assert_eq!(c.record, Some(record));
    }

    #[tokio::test]
    async fn managed_vm_is_clean() {
        let record = vm("vm1", OsDisk::managed("os", "/disks/os"), None);
        let provider = InMemoryProvider::with_resources([record.clone()]);
        let c = Classifier::new().classify(&record.id, &provider).await.unwrap();
        assert!(!c.assessment.needs_migration);
    }

    #[tokio::test]
    async fn basic_lb_lists_its_public_ips_as_dependents() {
        let provider = InMemoryProvider::with_resources([
            lb("lb1", Sku::basic(), &["pip1"]),
            pip("pip1", Sku::basic()),
        ]);
        let c = Classifier::new().classify(&lb_id("lb1"), &provider).await.unwrap();
        assert!(c.assessment.needs_migration);
        assert!(c.assessment.dependencies.is_empty());
        assert!(c.assessment.dependents.contains(&pip_id("pip1")));
    }

    #[tokio::test]
    async fn basic_pip_depends_on_referencing_basic_lb() {
        let provider = InMemoryProvider::with_resources([
            lb("lb1", Sku::basic(), &["pip1"]),
            lb("lb-std", Sku::standard(), &["pip1"]),
            lb("lb-other", Sku::basic(), &["pip2"]),
            pip("pip1", Sku::basic()),
        ]);
        let c = Classifier::new().classify(&pip_id("pip1"), &provider).await.unwrap();
        assert!(c.assessment.needs_migration);
        assert_eq!(
            c.assessment.dependencies.iter().cloned().collect::<Vec<_>>(),
            vec![lb_id("lb1")]
        );
    }

    #[tokio::test]
    async fn standalone_basic_pip_has_no_dependencies() {
        let provider = InMemoryProvider::with_resources([pip("pip1", Sku::basic())]);
        let c = Classifier::new().classify(&pip_id("pip1"), &provider).await.unwrap();
        assert!(c.assessment.needs_migration);
        assert!(c.assessment.dependencies.is_empty());
        assert!(!c.assessment.dependency_check_skipped);
    }

    #[tokio::test]
    async fn override_skips_lookup_and_warns() {
        let provider = InMemoryProvider::with_resources([
            lb("lb1", Sku::basic(), &["pip1"]),
            pip("pip1", Sku::basic()),
        ]);
        // A queued lookup failure proves the lookup is never made
        provider.inject_fault(
            ProviderOperation::FetchAssociated,
            ProviderError::Transient("should not be called".into()),
        );
        let c = Classifier::new()
            .with_skip_dependency_check(true)
            .classify(&pip_id("pip1"), &provider)
            .await
            .unwrap();
        assert!(c.assessment.dependencies.is_empty());
        assert!(c.assessment.dependency_check_skipped);
        assert!(!c.assessment.warnings.is_empty());
    }

    #[tokio::test]
    async fn availability_set_sku() {
        let set = |name: &str, sku: Sku| {
            ResourceRecord::new(
                id("Microsoft.Compute", "availabilitySets", name),
                "westeurope",
                ResourceProperties::AvailabilitySet(AvailabilitySetProperties {
                    sku,
                    platform_fault_domain_count: 2,
                }),
            )
        };
        let provider = InMemoryProvider::with_resources([
            set("classic", Sku::classic()),
            set("aligned", Sku::aligned()),
        ]);
        let classifier = Classifier::new();
        let classic = classifier
            .classify(&id("Microsoft.Compute", "availabilitySets", "classic"), &provider)
            .await
            .unwrap();
        let aligned = classifier
            .classify(&id("Microsoft.Compute", "availabilitySets", "aligned"), &provider)
            .await
            .unwrap();
        assert!(classic.assessment.needs_migration);
        assert_eq!(classic.assessment.priority_tier, 0);
        assert!(!aligned.assessment.needs_migration);
    }

    #[tokio::test]
    async fn unsupported_type_makes_no_provider_call() {
        let provider = InMemoryProvider::new();
        provider.inject_fault(
            ProviderOperation::FetchResource,
            ProviderError::Transient("should not be called".into()),
        );
        let c = Classifier::new()
            .classify(&id("Microsoft.Storage", "storageAccounts", "acct"), &provider)
            .await
            .unwrap();
        assert_eq!(c.assessment.migration_type, MigrationType::Unsupported);
        assert!(!c.assessment.needs_migration);
        assert!(c.record.is_none());
    }

    #[tokio::test]
    async fn provider_failures_are_errors() {
        let provider = InMemoryProvider::new();
        let err = Classifier::new().classify(&pip_id("missing"), &provider).await.unwrap_err();
        assert!(matches!(
            err,
            ClassificationError::Provider {
                source: ProviderError::NotFound(_),
                ..
            }
        ));

        let provider = InMemoryProvider::with_resources([pip("pip1", Sku::basic())]);
        provider.inject_fault(
            ProviderOperation::FetchAssociated,
            ProviderError::permission_denied(&pip_id("pip1"), "denied"),
        );
        assert!(Classifier::new().classify(&pip_id("pip1"), &provider).await.is_err());
    }

    #[tokio::test]
    async fn kind_mismatch_is_reported() {
        let mut record = pip("pip1", Sku::basic());
        record.id = lb_id("lb1");
        let provider = InMemoryProvider::with_resources([record]);
        let err = Classifier::new().classify(&lb_id("lb1"), &provider).await.unwrap_err();
        assert!(matches!(err, ClassificationError::KindMismatch { .. }));
    }
}
