pub mod allocation_service;
pub mod device;
pub mod error;
pub mod in_memory;
pub mod license;
pub mod license_ledger;
pub mod provisioning_service;
pub mod remote;
pub mod repository;
pub mod validate;

pub use allocation_service::{AllocationService, GrantLicenseRequest};
pub use device::*;
pub use error::{DomainError, DomainResult};
pub use in_memory::{InMemoryDeviceRepository, InMemoryLicenseRepository, InMemoryRemotePlatform};
pub use license::*;
pub use license_ledger::LicenseLedger;
pub use provisioning_service::{ProvisionDeviceRequest, ProvisioningService};
pub use remote::*;
pub use repository::{DeviceRepository, LicenseRepository};
