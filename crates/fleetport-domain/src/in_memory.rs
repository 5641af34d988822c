use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::device::{CreateDeviceRecordInput, Device, GetDeviceInput, ListDevicesInput};
use crate::error::{DomainError, DomainResult};
use crate::license::{
    ActivateBatchInput, ConsumeUnitInput, CreateBatchInputWithId, FindEligibleBatchInput,
    GetBatchInput, LicenseBatch, ListBatchesInput, ReleaseUnitInput,
};
use crate::remote::{
    AssignRemoteDeviceInput, CreateRemoteDeviceInput, DeviceCredentialInput, DeviceCredentials,
    FetchCredentialsInput, FetchCustomerNameInput, FetchRemoteDevicesInput, RemoteDevice,
    RemotePlatform, RemotePlatformError, RemoteResult, UpdateCredentialsInput,
};
use crate::repository::{DeviceRepository, LicenseRepository};

/// In-memory implementation of LicenseRepository.
///
/// The write lock makes consume/release linearizable, matching the
/// conditional-update semantics the Postgres implementation gets from the
/// database. Batches keep insertion order so equal purchase timestamps drain
/// deterministically.
pub struct InMemoryLicenseRepository {
    batches: Arc<RwLock<Vec<LicenseBatch>>>,
}

impl InMemoryLicenseRepository {
    pub fn new() -> Self {
        Self {
            batches: Arc::new(RwLock::new(Vec::new())),
        }
    }
}

impl Default for InMemoryLicenseRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LicenseRepository for InMemoryLicenseRepository {
    async fn insert_batch(&self, input: CreateBatchInputWithId) -> DomainResult<LicenseBatch> {
        let batch = LicenseBatch {
            id: input.id,
            tenant_id: input.tenant_id,
            package_name: input.package_name,
            total_units: input.total_units,
            used_units: 0,
            price: input.price,
            purchased_at: Utc::now(),
            is_assigned: false,
        };
        let mut batches = self.batches.write().await;
        batches.push(batch.clone());
        Ok(batch)
    }

    async fn activate_batch(
        &self,
        input: ActivateBatchInput,
    ) -> DomainResult<Option<LicenseBatch>> {
        let mut batches = self.batches.write().await;
        match batches.iter_mut().find(|b| b.id == input.batch_id) {
            Some(batch) => {
                batch.is_assigned = true;
                Ok(Some(batch.clone()))
            }
            None => Ok(None),
        }
    }

    async fn find_oldest_eligible(
        &self,
        input: FindEligibleBatchInput,
    ) -> DomainResult<Option<LicenseBatch>> {
        let batches = self.batches.read().await;
        Ok(batches
            .iter()
            .filter(|b| {
                b.tenant_id == input.tenant_id && b.is_assigned && b.used_units < b.total_units
            })
            .min_by_key(|b| b.purchased_at)
            .cloned())
    }

    async fn try_consume_unit(&self, input: ConsumeUnitInput) -> DomainResult<Option<LicenseBatch>> {
        let mut batches = self.batches.write().await;
        match batches.iter_mut().find(|b| b.id == input.batch_id) {
            Some(batch) if batch.used_units < batch.total_units => {
                batch.used_units += 1;
                Ok(Some(batch.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn release_unit(&self, input: ReleaseUnitInput) -> DomainResult<LicenseBatch> {
        let mut batches = self.batches.write().await;
        let batch = batches
            .iter_mut()
            .find(|b| b.id == input.batch_id)
            .ok_or_else(|| DomainError::LicenseBatchNotFound(input.batch_id.clone()))?;
        batch.used_units = (batch.used_units - 1).max(0);
        Ok(batch.clone())
    }

    async fn get_batch(&self, input: GetBatchInput) -> DomainResult<Option<LicenseBatch>> {
        let batches = self.batches.read().await;
        Ok(batches.iter().find(|b| b.id == input.batch_id).cloned())
    }

    async fn list_batches(&self, input: ListBatchesInput) -> DomainResult<Vec<LicenseBatch>> {
        let batches = self.batches.read().await;
        let mut result: Vec<LicenseBatch> = batches
            .iter()
            .filter(|b| b.tenant_id == input.tenant_id)
            .cloned()
            .collect();
        result.sort_by(|a, b| b.purchased_at.cmp(&a.purchased_at));
        Ok(result)
    }

    async fn list_all_batches(&self) -> DomainResult<Vec<LicenseBatch>> {
        let batches = self.batches.read().await;
        let mut result: Vec<LicenseBatch> = batches.iter().cloned().collect();
        result.sort_by(|a, b| b.purchased_at.cmp(&a.purchased_at));
        Ok(result)
    }
}

/// In-memory implementation of DeviceRepository
pub struct InMemoryDeviceRepository {
    devices: Arc<RwLock<Vec<Device>>>,
}

impl InMemoryDeviceRepository {
    pub fn new() -> Self {
        Self {
            devices: Arc::new(RwLock::new(Vec::new())),
        }
    }
}

impl Default for InMemoryDeviceRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DeviceRepository for InMemoryDeviceRepository {
    async fn create_device(&self, input: CreateDeviceRecordInput) -> DomainResult<Device> {
        let mut devices = self.devices.write().await;
        if devices.iter().any(|d| d.id == input.id) {
            return Err(DomainError::DeviceAlreadyExists(input.id));
        }
        let device = Device {
            id: input.id,
            tenant_id: input.tenant_id,
            remote_device_id: input.remote_device_id,
            name: input.name,
            credentials_reference: input.credentials_reference,
            created_at: Some(Utc::now()),
        };
        devices.push(device.clone());
        Ok(device)
    }

    async fn get_device(&self, input: GetDeviceInput) -> DomainResult<Option<Device>> {
        let devices = self.devices.read().await;
        Ok(devices.iter().find(|d| d.id == input.device_id).cloned())
    }

    async fn list_devices(&self, input: ListDevicesInput) -> DomainResult<Vec<Device>> {
        let devices = self.devices.read().await;
        let mut result: Vec<Device> = devices
            .iter()
            .filter(|d| d.tenant_id == input.tenant_id)
            .cloned()
            .collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(result)
    }
}

struct RemoteDeviceState {
    name: String,
    customer_id: Option<String>,
    credentials: DeviceCredentialInput,
}

/// In-memory stand-in for the remote platform, for local development and
/// tests that exercise the full provisioning sequence without a network.
pub struct InMemoryRemotePlatform {
    devices: Arc<RwLock<HashMap<String, RemoteDeviceState>>>,
    customers: Arc<RwLock<HashMap<String, String>>>,
}

impl InMemoryRemotePlatform {
    pub fn new() -> Self {
        Self {
            devices: Arc::new(RwLock::new(HashMap::new())),
            customers: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register a tenant's display name so lookups resolve it.
    pub async fn register_customer(&self, customer_id: String, title: String) {
        let mut customers = self.customers.write().await;
        customers.insert(customer_id, title);
    }
}

impl Default for InMemoryRemotePlatform {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemotePlatform for InMemoryRemotePlatform {
    async fn create_device(&self, input: CreateRemoteDeviceInput) -> RemoteResult<String> {
        let remote_device_id = xid::new().to_string();
        let mut devices = self.devices.write().await;
        devices.insert(
            remote_device_id.clone(),
            RemoteDeviceState {
                name: input.name,
                customer_id: None,
                credentials: input.credentials,
            },
        );
        Ok(remote_device_id)
    }

    async fn assign_device(&self, input: AssignRemoteDeviceInput) -> RemoteResult<()> {
        let mut devices = self.devices.write().await;
        let device = devices
            .get_mut(&input.remote_device_id)
            .ok_or_else(|| RemotePlatformError::Api {
                status: 404,
                detail: format!("device {} not found", input.remote_device_id),
            })?;
        device.customer_id = Some(input.tenant_id);
        Ok(())
    }

    async fn fetch_devices(
        &self,
        input: FetchRemoteDevicesInput,
    ) -> RemoteResult<Vec<RemoteDevice>> {
        let devices = self.devices.read().await;
        Ok(devices
            .iter()
            .filter(|(_, state)| state.customer_id.as_deref() == Some(input.tenant_id.as_str()))
            .map(|(id, state)| RemoteDevice {
                remote_device_id: id.clone(),
                name: state.name.clone(),
                customer_id: state.customer_id.clone(),
            })
            .collect())
    }

    async fn fetch_all_devices(&self) -> RemoteResult<Vec<RemoteDevice>> {
        let devices = self.devices.read().await;
        Ok(devices
            .iter()
            .map(|(id, state)| RemoteDevice {
                remote_device_id: id.clone(),
                name: state.name.clone(),
                customer_id: state.customer_id.clone(),
            })
            .collect())
    }

    async fn fetch_credentials(
        &self,
        input: FetchCredentialsInput,
    ) -> RemoteResult<DeviceCredentials> {
        let devices = self.devices.read().await;
        let state = devices
            .get(&input.remote_device_id)
            .ok_or_else(|| RemotePlatformError::Api {
                status: 404,
                detail: format!("device {} not found", input.remote_device_id),
            })?;
        Ok(DeviceCredentials {
            remote_device_id: input.remote_device_id,
            credentials_type: "MQTT_BASIC".to_string(),
            credentials_value: format!(
                "{{\"clientId\":\"\",\"userName\":\"{}\",\"password\":\"{}\"}}",
                state.credentials.username, state.credentials.password
            ),
        })
    }

    async fn update_credentials(&self, input: UpdateCredentialsInput) -> RemoteResult<()> {
        let mut devices = self.devices.write().await;
        let device = devices
            .get_mut(&input.remote_device_id)
            .ok_or_else(|| RemotePlatformError::Api {
                status: 404,
                detail: format!("device {} not found", input.remote_device_id),
            })?;
        device.credentials = input.credentials;
        Ok(())
    }

    async fn fetch_customer_name(
        &self,
        input: FetchCustomerNameInput,
    ) -> RemoteResult<Option<String>> {
        let customers = self.customers.read().await;
        Ok(customers.get(&input.customer_id).cloned())
    }
}
