//! Unmanaged to managed disk conversion

use crate::retry::RetryPolicy;
use crate::strategy::{
    ExecuteOptions, ExecutionHandle, MigrationStrategy, StrategyError, VerificationOutcome,
};
use async_trait::async_trait;
use azmig_resource::{
    MigrationType, PowerAction, PowerState, ProviderClient, ResourceRecord,
    VirtualMachineProperties,
};

const STEP_DEALLOCATE: &str = "deallocate";
const STEP_REPLACE_DISK: &str = "replace_disk";
const STEP_START: &str = "start";

/// Converts a VM's VHD-backed disks to managed disks
///
/// The VM is deallocated, its disks replaced in one provider call, and it is
/// started again if it was running beforehand.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiskConversionStrategy;

impl DiskConversionStrategy {
    /// Create strategy
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

fn vm_properties(record: &ResourceRecord) -> Result<&VirtualMachineProperties, StrategyError> {
    record
        .as_virtual_machine()
        .ok_or_else(|| StrategyError::unsupported(&record.id, "resource is not a virtual machine"))
}

#[async_trait]
impl MigrationStrategy for DiskConversionStrategy {
    fn migration_type(&self) -> MigrationType {
        MigrationType::DiskConversion
    }

    fn name(&self) -> &'static str {
        "disk_conversion"
    }

    fn validate(&self, record: &ResourceRecord) -> Result<(), StrategyError> {
        let vm = vm_properties(record)?;
        if vm.os_disk.is_managed() {
            return Err(StrategyError::unsupported(
                &record.id,
                "OS disk already uses a managed disk",
            ));
        }
        Ok(())
    }

    async fn execute(
        &self,
        record: &ResourceRecord,
        client: &dyn ProviderClient,
        options: &ExecuteOptions,
    ) -> Result<ExecutionHandle, StrategyError> {
        let vm = vm_properties(record)?;
        let id = &record.id;
        let was_running = vm.power_state == PowerState::Running;
        let mut handle = ExecutionHandle::begin(self.migration_type(), record);

        if vm.power_state != PowerState::Deallocated {
            client
                .set_power_state(id, PowerAction::Deallocate)
                .await
                .map_err(|e| StrategyError::execution(&handle, STEP_DEALLOCATE, e))?;
            handle.step(STEP_DEALLOCATE);
        }

        let policy = RetryPolicy::snapshot_limit(options.snapshot_retry_backoff);
        let (result, attempts) = policy.run(STEP_REPLACE_DISK, || client.replace_disk(id)).await;
        for _ in 1..attempts {
            handle.retried();
        }
        if let Err(e) = result {
            tracing::warn!(resource = %id, "Disk conversion failed, virtual machine left deallocated");
            return Err(StrategyError::execution(&handle, STEP_REPLACE_DISK, e));
        }
        handle.step(STEP_REPLACE_DISK);

        if was_running && options.restart_vms {
            client
                .set_power_state(id, PowerAction::Start)
                .await
                .map_err(|e| StrategyError::execution(&handle, STEP_START, e))?;
            handle.step(STEP_START);
        }

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
        let Some(vm) = record.as_virtual_machine() else {
            return outcome.check("resource kind", false, "resource is no longer a virtual machine");
        };

        let unmanaged: Vec<&str> = vm
            .data_disks
            .iter()
            .filter(|d| !d.is_managed())
            .map(|d| d.name.as_str())
            .collect();

        let mut outcome = outcome
            .check(
                "os disk managed",
                vm.os_disk.is_managed(),
                vm.os_disk
                    .managed_disk_id
                    .clone()
                    .unwrap_or_else(|| format!("{} has no managed-disk reference", vm.os_disk.name)),
            )
            .check(
                "data disks managed",
                unmanaged.is_empty(),
                if unmanaged.is_empty() {
                    format!("{} data disk(s) managed", vm.data_disks.len())
                } else {
                    format!("unmanaged: {}", unmanaged.join(", "))
                },
            );

        if handle.steps.iter().any(|s| s == STEP_START) {
            outcome = outcome.check(
                "power state restored",
                vm.power_state == PowerState::Running,
                format!("{:?}", vm.power_state),
            );
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use azmig_resource::{
        DataDisk, InMemoryProvider, OsDisk, ProviderError, ProviderOperation, ResourceIdentifier,
        ResourceProperties,
    };
    use std::time::Duration;

    fn vm(power_state: PowerState) -> ResourceRecord {
        ResourceRecord::new(
            ResourceIdentifier::new("s", "rg", "Microsoft.Compute", "virtualMachines", "vm1").unwrap(),
            "westeurope",
            ResourceProperties::VirtualMachine(VirtualMachineProperties {
                os_disk: OsDisk::unmanaged("osdisk", "https://acct.blob.core.windows.net/vhds/os.vhd"),
                data_disks: vec![DataDisk {
                    lun: 0,
                    name: "data0".into(),
                    managed_disk_id: None,
                    vhd_uri: Some("https://acct.blob.core.windows.net/vhds/data0.vhd".into()),
                }],
                availability_set_id: None,
                power_state,
            }),
        )
    }

    fn options() -> ExecuteOptions {
        ExecuteOptions::default().with_snapshot_retry_backoff(Duration::from_millis(1))
    }

    #[test]
    fn validate_rejects_managed_os_disk() {
        let mut record = vm(PowerState::Running);
        if let ResourceProperties::VirtualMachine(props) = &mut record.properties {
            props.os_disk = OsDisk::managed("osdisk", "/disks/osdisk");
        }
        let err = DiskConversionStrategy::new().validate(&record).unwrap_err();
        assert!(err.is_unsupported());
        assert!(DiskConversionStrategy::new().validate(&vm(PowerState::Running)).is_ok());
    }

    #[tokio::test]
    async fn running_vm_is_converted_and_restarted() {
        let record = vm(PowerState::Running);
        let provider = InMemoryProvider::with_resources([record.clone()]);
        let strategy = DiskConversionStrategy::new();

        let handle = strategy.execute(&record, &provider, &options()).await.unwrap();
        assert_eq!(handle.steps, vec!["deallocate", "replace_disk", "start"]);
        assert_eq!(handle.attempts, 3);

        let outcome = strategy.verify(&handle, &provider).await;
        assert!(outcome.passed(), "{}", outcome.failure_summary());
    }

    #[tokio::test]
    async fn deallocated_vm_stays_deallocated() {
        let record = vm(PowerState::Deallocated);
        let provider = InMemoryProvider::with_resources([record.clone()]);

        let handle = DiskConversionStrategy::new()
            .execute(&record, &provider, &options())
            .await
            .unwrap();
        assert_eq!(handle.steps, vec!["replace_disk"]);
        let after = provider.get(&record.id).unwrap();
        assert_eq!(after.as_virtual_machine().unwrap().power_state, PowerState::Deallocated);
    }

    #[tokio::test]
    async fn restart_can_be_disabled() {
        let record = vm(PowerState::Running);
        let provider = InMemoryProvider::with_resources([record.clone()]);
        let handle = DiskConversionStrategy::new()
            .execute(&record, &provider, &options().with_restart_vms(false))
            .await
            .unwrap();
        assert_eq!(handle.steps, vec!["deallocate", "replace_disk"]);
    }

    #[tokio::test]
    async fn snapshot_limit_is_retried_once() {
        let record = vm(PowerState::Deallocated);
        let provider = InMemoryProvider::with_resources([record.clone()]);
        provider.inject_fault(
            ProviderOperation::ReplaceDisk,
            ProviderError::SnapshotCountExceeded(record.id.clone()),
        );

        let handle = DiskConversionStrategy::new()
            .execute(&record, &provider, &options())
            .await
            .unwrap();
        assert_eq!(handle.attempts, 2);
        assert!(provider.get(&record.id).unwrap().as_virtual_machine().unwrap().all_disks_managed());
    }

    #[tokio::test]
    async fn second_snapshot_limit_fails() {
        let record = vm(PowerState::Deallocated);
        let provider = InMemoryProvider::with_resources([record.clone()]);
        for _ in 0..2 {
            provider.inject_fault(
                ProviderOperation::ReplaceDisk,
                ProviderError::SnapshotCountExceeded(record.id.clone()),
            );
        }

        let err = DiskConversionStrategy::new()
            .execute(&record, &provider, &options())
            .await
            .unwrap_err();
        match err {
            StrategyError::Execution { step, attempts, .. } => {
                assert_eq!(step, "replace_disk");
                assert_eq!(attempts, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn permission_denied_is_not_retried() {
        let record = vm(PowerState::Deallocated);
        let provider = InMemoryProvider::with_resources([record.clone()]);
        provider.inject_fault(
            ProviderOperation::ReplaceDisk,
            ProviderError::permission_denied(&record.id, "denied"),
        );
        let err = DiskConversionStrategy::new()
            .execute(&record, &provider, &options())
            .await
            .unwrap_err();
        assert!(matches!(err, StrategyError::Execution { attempts: 1, .. }));
    }

    #[tokio::test]
    async fn verify_reports_unmanaged_disks() {
        let record = vm(PowerState::Deallocated);
        let provider = InMemoryProvider::with_resources([record.clone()]);
        let handle = ExecutionHandle::begin(MigrationType::DiskConversion, &record);

        let outcome = DiskConversionStrategy::new().verify(&handle, &provider).await;
        assert!(!outcome.passed());
        assert_eq!(outcome.failures().count(), 2);
        assert!(outcome.failure_summary().contains("data0"));
    }
}
