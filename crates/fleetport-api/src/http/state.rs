use std::sync::Arc;

use fleetport_domain::{AllocationService, DeviceRepository, LicenseLedger, ProvisioningService};

use crate::domain::DeviceInventoryService;

/// Shared service handles for the HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<LicenseLedger>,
    pub allocation: Arc<AllocationService>,
    pub provisioning: Arc<ProvisioningService>,
    pub inventory: Arc<DeviceInventoryService>,
    pub device_repository: Arc<dyn DeviceRepository>,
}
