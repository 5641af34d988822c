use async_trait::async_trait;

use crate::device::{CreateDeviceRecordInput, Device, GetDeviceInput, ListDevicesInput};
use crate::error::DomainResult;
use crate::license::{
    ActivateBatchInput, ConsumeUnitInput, CreateBatchInputWithId, FindEligibleBatchInput,
    GetBatchInput, LicenseBatch, ListBatchesInput, ReleaseUnitInput,
};

/// Repository trait for license batch storage.
/// Infrastructure layer (fleetport-postgres) implements this trait.
///
/// `try_consume_unit` and `release_unit` are the only writers of `used_units`
/// and must be atomic against the backing store.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LicenseRepository: Send + Sync {
    /// Insert a new batch with `used_units = 0` and `is_assigned = false`
    async fn insert_batch(&self, input: CreateBatchInputWithId) -> DomainResult<LicenseBatch>;

    /// Set `is_assigned = true`; returns None if the batch does not exist
    async fn activate_batch(&self, input: ActivateBatchInput) -> DomainResult<Option<LicenseBatch>>;

    /// Oldest batch (by `purchased_at`) with `is_assigned = true` and
    /// remaining capacity, if any
    async fn find_oldest_eligible(
        &self,
        input: FindEligibleBatchInput,
    ) -> DomainResult<Option<LicenseBatch>>;

    /// Increment `used_units` by one, guarded by `used_units < total_units`.
    /// Returns the debited batch, or None if the guard failed.
    async fn try_consume_unit(&self, input: ConsumeUnitInput) -> DomainResult<Option<LicenseBatch>>;

    /// Decrement `used_units` by one, clamped at zero
    async fn release_unit(&self, input: ReleaseUnitInput) -> DomainResult<LicenseBatch>;

    /// Get a batch by ID
    async fn get_batch(&self, input: GetBatchInput) -> DomainResult<Option<LicenseBatch>>;

    /// List a tenant's batches, newest purchase first
    async fn list_batches(&self, input: ListBatchesInput) -> DomainResult<Vec<LicenseBatch>>;

    /// List every batch (admin console listing)
    async fn list_all_batches(&self) -> DomainResult<Vec<LicenseBatch>>;
}

/// Repository trait for local device records.
/// Infrastructure layer (fleetport-postgres) implements this trait.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DeviceRepository: Send + Sync {
    /// Persist a device record
    async fn create_device(&self, input: CreateDeviceRecordInput) -> DomainResult<Device>;

    /// Get a device by local ID
    async fn get_device(&self, input: GetDeviceInput) -> DomainResult<Option<Device>>;

    /// List a tenant's devices, newest first
    async fn list_devices(&self, input: ListDevicesInput) -> DomainResult<Vec<Device>>;
}
