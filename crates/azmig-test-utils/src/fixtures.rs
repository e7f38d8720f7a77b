//! Resource fixtures
//!
//! Everything lives in subscription `sub-1`, resource group `rg-1`, region
//! `westeurope`.

use azmig_resource::{
    AllocationMethod, AvailabilitySetProperties, BackendPool, FrontendIpConfiguration,
    InMemoryProvider, IpVersion, LoadBalancerProperties, OsDisk, PowerState, PublicIpProperties,
    ResourceIdentifier, ResourceProperties, ResourceRecord, Sku, VirtualMachineProperties,
};

pub const SUBSCRIPTION: &str = "sub-1";
pub const RESOURCE_GROUP: &str = "rg-1";
pub const LOCATION: &str = "westeurope";

pub fn resource_id(provider: &str, resource_type: &str, name: &str) -> ResourceIdentifier {
    ResourceIdentifier::new(SUBSCRIPTION, RESOURCE_GROUP, provider, resource_type, name).unwrap()
}

pub fn vm_id(name: &str) -> ResourceIdentifier {
    resource_id("Microsoft.Compute", "virtualMachines", name)
}

pub fn lb_id(name: &str) -> ResourceIdentifier {
    resource_id("Microsoft.Network", "loadBalancers", name)
}

pub fn pip_id(name: &str) -> ResourceIdentifier {
    resource_id("Microsoft.Network", "publicIPAddresses", name)
}

pub fn avset_id(name: &str) -> ResourceIdentifier {
    resource_id("Microsoft.Compute", "availabilitySets", name)
}

fn vm(name: &str, os_disk: OsDisk) -> ResourceRecord {
    ResourceRecord::new(
        vm_id(name),
        LOCATION,
        ResourceProperties::VirtualMachine(VirtualMachineProperties {
            os_disk,
            data_disks: vec![],
            availability_set_id: None,
            power_state: PowerState::Running,
        }),
    )
}

/// Running VM with an unmanaged OS disk
pub fn vm_unmanaged(name: &str) -> ResourceRecord {
    vm(
        name,
        OsDisk::unmanaged(format!("{name}-os"), format!("https://store.blob.core.windows.net/vhds/{name}-os.vhd")),
    )
}

/// Running VM already on managed disks
pub fn vm_managed(name: &str) -> ResourceRecord {
    let disk = resource_id("Microsoft.Compute", "disks", &format!("{name}-os"));
    vm(name, OsDisk::managed(format!("{name}-os"), disk.to_string()))
}

/// Place a VM record in an availability set
pub fn in_availability_set(mut record: ResourceRecord, set: &str) -> ResourceRecord {
    if let ResourceProperties::VirtualMachine(vm) = &mut record.properties {
        vm.availability_set_id = Some(avset_id(set));
    }
    record
}

fn lb(name: &str, sku: Sku, pips: &[&str]) -> ResourceRecord {
    ResourceRecord::new(
        lb_id(name),
        LOCATION,
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
            backend_pools: vec![BackendPool {
                name: "pool".to_string(),
                aks_managed: false,
            }],
        }),
    )
}

/// Basic load balancer with one frontend per public IP
pub fn basic_lb(name: &str, pips: &[&str]) -> ResourceRecord {
    lb(name, Sku::basic(), pips)
}

pub fn standard_lb(name: &str, pips: &[&str]) -> ResourceRecord {
    lb(name, Sku::standard(), pips)
}

fn pip(name: &str, sku: Sku, allocation: AllocationMethod) -> ResourceRecord {
    ResourceRecord::new(
        pip_id(name),
        LOCATION,
        ResourceProperties::PublicIpAddress(PublicIpProperties {
            sku,
            allocation,
            ip_version: IpVersion::IPv4,
            attached_to: None,
        }),
    )
}

/// Basic, dynamically allocated public IP
pub fn basic_pip(name: &str) -> ResourceRecord {
    pip(name, Sku::basic(), AllocationMethod::Dynamic)
}

pub fn standard_pip(name: &str) -> ResourceRecord {
    pip(name, Sku::standard(), AllocationMethod::Static)
}

fn avset(name: &str, sku: Sku) -> ResourceRecord {
    ResourceRecord::new(
        avset_id(name),
        LOCATION,
        ResourceProperties::AvailabilitySet(AvailabilitySetProperties {
            sku,
            platform_fault_domain_count: 2,
        }),
    )
}

pub fn classic_avset(name: &str) -> ResourceRecord {
    avset(name, Sku::classic())
}

pub fn aligned_avset(name: &str) -> ResourceRecord {
    avset(name, Sku::aligned())
}

/// vm1 (unmanaged), lb1 (Basic, fronting pip1), pip1 (Basic)
pub fn scenario_provider() -> InMemoryProvider {
    InMemoryProvider::with_resources([vm_unmanaged("vm1"), basic_lb("lb1", &["pip1"]), basic_pip("pip1")])
}

/// Newline-delimited batch of identifiers
pub fn batch_of(ids: &[ResourceIdentifier]) -> String {
    ids.iter().map(ToString::to_string).collect::<Vec<_>>().join("\n")
}
