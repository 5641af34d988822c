use std::sync::Arc;

use garde::Validate;
use tracing::{debug, error, info, instrument, warn};

use crate::device::{CreateDeviceRecordInput, Device};
use crate::error::{DomainError, DomainResult};
use crate::license::{LicenseUnitHandle, ReserveUnitInput};
use crate::license_ledger::LicenseLedger;
use crate::remote::{
    AssignRemoteDeviceInput, CreateRemoteDeviceInput, DeviceCredentialInput, RemotePlatform,
};
use crate::repository::DeviceRepository;
use crate::validate::validate;

/// Service request for provisioning a device
#[derive(Debug, Clone, Validate)]
pub struct ProvisionDeviceRequest {
    #[garde(length(min = 1))]
    pub tenant_id: String,
    #[garde(length(min = 1))]
    pub name: String,
    #[garde(length(min = 1))]
    pub username: String,
    #[garde(length(min = 1))]
    pub password: String,
}

/// Orchestrates license-gated device provisioning.
///
/// Straight-line sequence: reserve a unit, create the device remotely, assign
/// it to the tenant, persist the local record. Each step's failure triggers
/// the stated compensation; there are no retry loops, the caller resubmits on
/// transient failures.
pub struct ProvisioningService {
    ledger: Arc<LicenseLedger>,
    remote_platform: Arc<dyn RemotePlatform>,
    device_repository: Arc<dyn DeviceRepository>,
}

impl ProvisioningService {
    pub fn new(
        ledger: Arc<LicenseLedger>,
        remote_platform: Arc<dyn RemotePlatform>,
        device_repository: Arc<dyn DeviceRepository>,
    ) -> Self {
        Self {
            ledger,
            remote_platform,
            device_repository,
        }
    }

    #[instrument(skip(self, request), fields(tenant_id = %request.tenant_id, device_name = %request.name))]
    pub async fn provision_device(&self, request: ProvisionDeviceRequest) -> DomainResult<Device> {
        validate(&request)?;

        // Step 1: reserve capacity. NoLicenseAvailable short-circuits before
        // any remote call is made.
        let handle = self
            .ledger
            .reserve_unit(ReserveUnitInput {
                tenant_id: request.tenant_id.clone(),
            })
            .await?;

        debug!(batch_id = %handle.batch_id(), "license unit reserved");

        // Step 2: create the device on the remote platform.
        let create_result = self
            .remote_platform
            .create_device(CreateRemoteDeviceInput {
                name: request.name.clone(),
                credentials: DeviceCredentialInput {
                    username: request.username.clone(),
                    password: request.password.clone(),
                },
            })
            .await;

        let remote_device_id = match create_result {
            Ok(id) => id,
            Err(e) => {
                warn!(error = %e, "remote device creation failed, releasing reserved unit");
                self.release_after_failure(&handle).await;
                return Err(DomainError::RemoteCreateFailed(e.to_string()));
            }
        };

        // Step 3: assign the new device to the tenant. On failure the remote
        // device record stays orphaned on the platform; reported, not cleaned
        // up synchronously.
        let assign_result = self
            .remote_platform
            .assign_device(AssignRemoteDeviceInput {
                remote_device_id: remote_device_id.clone(),
                tenant_id: request.tenant_id.clone(),
            })
            .await;

        if let Err(e) = assign_result {
            warn!(
                error = %e,
                remote_device_id = %remote_device_id,
                "remote assignment failed, releasing reserved unit; remote device left orphaned"
            );
            self.release_after_failure(&handle).await;
            return Err(DomainError::RemoteAssignFailed(e.to_string()));
        }

        // Step 4: persist the local record. The unit is NOT released on
        // failure here: the remote side effects already happened and cannot be
        // undone, so the inconsistency is surfaced for reconciliation instead
        // of rolled back silently.
        let record = CreateDeviceRecordInput {
            id: xid::new().to_string(),
            tenant_id: request.tenant_id.clone(),
            remote_device_id: remote_device_id.clone(),
            name: request.name.clone(),
            credentials_reference: Some(request.username.clone()),
        };

        match self.device_repository.create_device(record).await {
            Ok(device) => {
                info!(
                    device_id = %device.id,
                    remote_device_id = %device.remote_device_id,
                    batch_id = %handle.batch_id(),
                    "device provisioned"
                );
                Ok(device)
            }
            Err(e) => {
                error!(
                    error = %e,
                    remote_device_id = %remote_device_id,
                    batch_id = %handle.batch_id(),
                    tenant_id = %request.tenant_id,
                    "device record persistence failed after remote provisioning; \
                     license unit stays consumed, operator reconciliation required"
                );
                Err(DomainError::ReconciliationRequired(format!(
                    "remote device {} exists and batch {} was debited, but no local record was written",
                    remote_device_id,
                    handle.batch_id()
                )))
            }
        }
    }

    /// Best-effort compensation; a failed release is logged and the original
    /// provisioning error is still returned to the caller.
    async fn release_after_failure(&self, handle: &LicenseUnitHandle) {
        if let Err(e) = self.ledger.release_unit(handle).await {
            error!(
                error = %e,
                batch_id = %handle.batch_id(),
                "failed to release license unit after provisioning failure"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::license::{ConsumeUnitInput, FindEligibleBatchInput, LicenseBatch, ReleaseUnitInput};
    use crate::remote::{MockRemotePlatform, RemotePlatformError};
    use crate::repository::{MockDeviceRepository, MockLicenseRepository};
    use chrono::Utc;

    fn batch(used: i32) -> LicenseBatch {
        LicenseBatch {
            id: "batch-1".to_string(),
            tenant_id: "tenant-1".to_string(),
            package_name: "starter".to_string(),
            total_units: 5,
            used_units: used,
            price: 4900,
            purchased_at: Utc::now(),
            is_assigned: true,
        }
    }

    fn request() -> ProvisionDeviceRequest {
        ProvisionDeviceRequest {
            tenant_id: "tenant-1".to_string(),
            name: "boiler-sensor-7".to_string(),
            username: "boiler-sensor-7-mqtt".to_string(),
            password: "s3cret".to_string(),
        }
    }

    fn ledger_with_capacity() -> Arc<LicenseLedger> {
        let mut repo = MockLicenseRepository::new();
        repo.expect_find_oldest_eligible()
            .withf(|input: &FindEligibleBatchInput| input.tenant_id == "tenant-1")
            .returning(|_| Ok(Some(batch(0))));
        repo.expect_try_consume_unit()
            .withf(|input: &ConsumeUnitInput| input.batch_id == "batch-1")
            .returning(|_| Ok(Some(batch(1))));
        Arc::new(LicenseLedger::new(Arc::new(repo)))
    }

    #[tokio::test]
    async fn test_provision_device_success() {
        let ledger = ledger_with_capacity();

        let mut remote = MockRemotePlatform::new();
        remote
            .expect_create_device()
            .withf(|input: &CreateRemoteDeviceInput| {
                input.name == "boiler-sensor-7"
                    && input.credentials.username == "boiler-sensor-7-mqtt"
            })
            .times(1)
            .return_once(|_| Ok("remote-abc".to_string()));
        remote
            .expect_assign_device()
            .withf(|input: &AssignRemoteDeviceInput| {
                input.remote_device_id == "remote-abc" && input.tenant_id == "tenant-1"
            })
            .times(1)
            .return_once(|_| Ok(()));

        let mut devices = MockDeviceRepository::new();
        devices
            .expect_create_device()
            .withf(|input: &CreateDeviceRecordInput| {
                !input.id.is_empty()
                    && input.remote_device_id == "remote-abc"
                    && input.credentials_reference.as_deref() == Some("boiler-sensor-7-mqtt")
            })
            .times(1)
            .returning(|input| {
                Ok(Device {
                    id: input.id,
                    tenant_id: input.tenant_id,
                    remote_device_id: input.remote_device_id,
                    name: input.name,
                    credentials_reference: input.credentials_reference,
                    created_at: Some(Utc::now()),
                })
            });

        let service =
            ProvisioningService::new(ledger, Arc::new(remote), Arc::new(devices));

        let device = service.provision_device(request()).await.unwrap();
        assert_eq!(device.remote_device_id, "remote-abc");
        assert_eq!(device.tenant_id, "tenant-1");
    }

    #[tokio::test]
    async fn test_provision_device_no_capacity_makes_no_remote_calls() {
        let mut repo = MockLicenseRepository::new();
        repo.expect_find_oldest_eligible().returning(|_| Ok(None));
        let ledger = Arc::new(LicenseLedger::new(Arc::new(repo)));

        // No expectations: any remote call fails the test.
        let remote = MockRemotePlatform::new();
        let devices = MockDeviceRepository::new();

        let service =
            ProvisioningService::new(ledger, Arc::new(remote), Arc::new(devices));

        let result = service.provision_device(request()).await;
        assert!(matches!(result, Err(DomainError::NoLicenseAvailable(_))));
    }

    #[tokio::test]
    async fn test_provision_device_remote_create_failure_releases_unit() {
        let mut repo = MockLicenseRepository::new();
        repo.expect_find_oldest_eligible()
            .returning(|_| Ok(Some(batch(0))));
        repo.expect_try_consume_unit()
            .returning(|_| Ok(Some(batch(1))));
        // Compensation must hit the store exactly once.
        repo.expect_release_unit()
            .withf(|input: &ReleaseUnitInput| input.batch_id == "batch-1")
            .times(1)
            .returning(|_| Ok(batch(0)));
        let ledger = Arc::new(LicenseLedger::new(Arc::new(repo)));

        let mut remote = MockRemotePlatform::new();
        remote.expect_create_device().times(1).return_once(|_| {
            Err(RemotePlatformError::Api {
                status: 500,
                detail: "profile not found".to_string(),
            })
        });

        let devices = MockDeviceRepository::new();

        let service =
            ProvisioningService::new(ledger, Arc::new(remote), Arc::new(devices));

        let result = service.provision_device(request()).await;
        assert!(matches!(result, Err(DomainError::RemoteCreateFailed(_))));
    }

    #[tokio::test]
    async fn test_provision_device_remote_assign_failure_releases_unit() {
        let mut repo = MockLicenseRepository::new();
        repo.expect_find_oldest_eligible()
            .returning(|_| Ok(Some(batch(0))));
        repo.expect_try_consume_unit()
            .returning(|_| Ok(Some(batch(1))));
        repo.expect_release_unit()
            .times(1)
            .returning(|_| Ok(batch(0)));
        let ledger = Arc::new(LicenseLedger::new(Arc::new(repo)));

        let mut remote = MockRemotePlatform::new();
        remote
            .expect_create_device()
            .times(1)
            .return_once(|_| Ok("remote-abc".to_string()));
        remote.expect_assign_device().times(1).return_once(|_| {
            Err(RemotePlatformError::Transport("timed out".to_string()))
        });

        // No local record is written when assignment fails.
        let devices = MockDeviceRepository::new();

        let service =
            ProvisioningService::new(ledger, Arc::new(remote), Arc::new(devices));

        let result = service.provision_device(request()).await;
        assert!(matches!(result, Err(DomainError::RemoteAssignFailed(_))));
    }

    #[tokio::test]
    async fn test_provision_device_persist_failure_keeps_unit_consumed() {
        let mut repo = MockLicenseRepository::new();
        repo.expect_find_oldest_eligible()
            .returning(|_| Ok(Some(batch(0))));
        repo.expect_try_consume_unit()
            .returning(|_| Ok(Some(batch(1))));
        // release_unit must NOT be called: the remote side effects happened.
        let ledger = Arc::new(LicenseLedger::new(Arc::new(repo)));

        let mut remote = MockRemotePlatform::new();
        remote
            .expect_create_device()
            .times(1)
            .return_once(|_| Ok("remote-abc".to_string()));
        remote
            .expect_assign_device()
            .times(1)
            .return_once(|_| Ok(()));

        let mut devices = MockDeviceRepository::new();
        devices.expect_create_device().times(1).returning(|_| {
            Err(DomainError::RepositoryError(anyhow::anyhow!(
                "connection reset"
            )))
        });

        let service =
            ProvisioningService::new(ledger, Arc::new(remote), Arc::new(devices));

        let result = service.provision_device(request()).await;
        assert!(matches!(
            result,
            Err(DomainError::ReconciliationRequired(_))
        ));
    }

    #[tokio::test]
    async fn test_provision_device_empty_name_rejected_before_reservation() {
        // No expectations anywhere: validation fails first.
        let repo = MockLicenseRepository::new();
        let ledger = Arc::new(LicenseLedger::new(Arc::new(repo)));
        let remote = MockRemotePlatform::new();
        let devices = MockDeviceRepository::new();

        let service =
            ProvisioningService::new(ledger, Arc::new(remote), Arc::new(devices));

        let mut req = request();
        req.name = "".to_string();

        let result = service.provision_device(req).await;
        assert!(matches!(result, Err(DomainError::ValidationError(_))));
    }
}
