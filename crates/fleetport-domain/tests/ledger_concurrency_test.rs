use std::sync::Arc;

use fleetport_domain::{
    ActivateBatchInput, AllocationService, CreateBatchInput, DeviceRepository, DomainError,
    GetBatchInput, GrantLicenseRequest, InMemoryDeviceRepository, InMemoryLicenseRepository,
    InMemoryRemotePlatform, LicenseLedger, ListBatchesInput, ProvisionDeviceRequest,
    ProvisioningService, ReserveUnitInput,
};

const TENANT: &str = "tenant-1";

fn ledger() -> Arc<LicenseLedger> {
    Arc::new(LicenseLedger::new(Arc::new(
        InMemoryLicenseRepository::new(),
    )))
}

async fn granted_batch(ledger: &LicenseLedger, units: i32) -> String {
    let batch = ledger
        .create_batch(CreateBatchInput {
            tenant_id: TENANT.to_string(),
            package_name: "starter".to_string(),
            total_units: units,
            price: 4900,
        })
        .await
        .unwrap();
    ledger
        .activate_batch(ActivateBatchInput {
            batch_id: batch.id.clone(),
        })
        .await
        .unwrap();
    batch.id
}

#[tokio::test]
async fn concurrent_reservations_never_oversubscribe() {
    let ledger = ledger();
    let batch_id = granted_batch(&ledger, 3).await;

    // 8 concurrent callers race for 3 remaining units.
    let mut handles = Vec::new();
    for _ in 0..8 {
        let ledger = ledger.clone();
        handles.push(tokio::spawn(async move {
            ledger
                .reserve_unit(ReserveUnitInput {
                    tenant_id: TENANT.to_string(),
                })
                .await
        }));
    }

    let mut successes = 0;
    let mut no_capacity = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(DomainError::NoLicenseAvailable(_)) => no_capacity += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    assert_eq!(successes, 3);
    assert_eq!(no_capacity, 5);

    let batch = ledger
        .get_batch(GetBatchInput { batch_id })
        .await
        .unwrap();
    assert_eq!(batch.used_units, batch.total_units);
    assert_eq!(batch.remaining_units(), 0);
}

#[tokio::test]
async fn reservation_drains_batches_oldest_first() {
    let ledger = ledger();
    let older = granted_batch(&ledger, 1).await;
    let newer = granted_batch(&ledger, 1).await;

    let first = ledger
        .reserve_unit(ReserveUnitInput {
            tenant_id: TENANT.to_string(),
        })
        .await
        .unwrap();
    assert_eq!(first.batch_id(), older);

    let second = ledger
        .reserve_unit(ReserveUnitInput {
            tenant_id: TENANT.to_string(),
        })
        .await
        .unwrap();
    assert_eq!(second.batch_id(), newer);
}

#[tokio::test]
async fn release_restores_capacity() {
    let ledger = ledger();
    let batch_id = granted_batch(&ledger, 2).await;

    let handle = ledger
        .reserve_unit(ReserveUnitInput {
            tenant_id: TENANT.to_string(),
        })
        .await
        .unwrap();

    let batch = ledger
        .get_batch(GetBatchInput {
            batch_id: batch_id.clone(),
        })
        .await
        .unwrap();
    assert_eq!(batch.used_units, 1);

    ledger.release_unit(&handle).await.unwrap();

    let batch = ledger
        .get_batch(GetBatchInput { batch_id })
        .await
        .unwrap();
    assert_eq!(batch.used_units, 0);

    // Same handle again: reported, and the counter is untouched.
    let second = ledger.release_unit(&handle).await;
    assert!(matches!(second, Err(DomainError::UnitAlreadyReleased(_))));
}

#[tokio::test]
async fn full_provisioning_sequence_drains_batch_exactly() {
    let ledger = ledger();
    let allocation = AllocationService::new(ledger.clone());
    let remote = Arc::new(InMemoryRemotePlatform::new());
    let devices = Arc::new(InMemoryDeviceRepository::new());
    let provisioning = ProvisioningService::new(ledger.clone(), remote, devices.clone());

    allocation
        .grant_license(GrantLicenseRequest {
            tenant_id: TENANT.to_string(),
            package_name: "fleet-5".to_string(),
            total_units: 5,
            price: 19900,
        })
        .await
        .unwrap();

    for i in 0..5 {
        provisioning
            .provision_device(ProvisionDeviceRequest {
                tenant_id: TENANT.to_string(),
                name: format!("sensor-{i}"),
                username: format!("sensor-{i}-mqtt"),
                password: "s3cret".to_string(),
            })
            .await
            .unwrap();
    }

    // Sixth attempt: capacity exhausted.
    let sixth = provisioning
        .provision_device(ProvisionDeviceRequest {
            tenant_id: TENANT.to_string(),
            name: "sensor-5".to_string(),
            username: "sensor-5-mqtt".to_string(),
            password: "s3cret".to_string(),
        })
        .await;
    assert!(matches!(sixth, Err(DomainError::NoLicenseAvailable(_))));

    let batches = ledger
        .list_batches(ListBatchesInput {
            tenant_id: TENANT.to_string(),
        })
        .await
        .unwrap();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].used_units, 5);

    let devices = devices
        .list_devices(fleetport_domain::ListDevicesInput {
            tenant_id: TENANT.to_string(),
        })
        .await
        .unwrap();
    assert_eq!(devices.len(), 5);
}

#[tokio::test]
async fn grant_then_single_unit_provision_succeeds_once() {
    let ledger = ledger();
    let allocation = AllocationService::new(ledger.clone());
    let remote = Arc::new(InMemoryRemotePlatform::new());
    let devices = Arc::new(InMemoryDeviceRepository::new());
    let provisioning = ProvisioningService::new(ledger.clone(), remote, devices);

    allocation
        .grant_license(GrantLicenseRequest {
            tenant_id: TENANT.to_string(),
            package_name: "single".to_string(),
            total_units: 1,
            price: 4900,
        })
        .await
        .unwrap();

    let first = provisioning
        .provision_device(ProvisionDeviceRequest {
            tenant_id: TENANT.to_string(),
            name: "gauge-1".to_string(),
            username: "gauge-1-mqtt".to_string(),
            password: "s3cret".to_string(),
        })
        .await;
    assert!(first.is_ok());

    let second = provisioning
        .provision_device(ProvisionDeviceRequest {
            tenant_id: TENANT.to_string(),
            name: "gauge-2".to_string(),
            username: "gauge-2-mqtt".to_string(),
            password: "s3cret".to_string(),
        })
        .await;
    assert!(matches!(second, Err(DomainError::NoLicenseAvailable(_))));
}

#[tokio::test]
async fn inactive_batch_is_not_consumable() {
    let ledger = ledger();
    // Created but never activated.
    ledger
        .create_batch(CreateBatchInput {
            tenant_id: TENANT.to_string(),
            package_name: "pending".to_string(),
            total_units: 10,
            price: 9900,
        })
        .await
        .unwrap();

    let result = ledger
        .reserve_unit(ReserveUnitInput {
            tenant_id: TENANT.to_string(),
        })
        .await;
    assert!(matches!(result, Err(DomainError::NoLicenseAvailable(_))));
}
