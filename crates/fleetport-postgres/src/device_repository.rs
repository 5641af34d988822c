use async_trait::async_trait;
use tracing::debug;

use fleetport_domain::{
    CreateDeviceRecordInput, Device, DeviceRepository, DomainError, DomainResult, GetDeviceInput,
    ListDevicesInput,
};

use crate::client::PostgresClient;
use crate::models::DeviceRow;

/// PostgreSQL implementation of DeviceRepository trait
#[derive(Clone)]
pub struct PostgresDeviceRepository {
    client: PostgresClient,
}

impl PostgresDeviceRepository {
    pub fn new(client: PostgresClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DeviceRepository for PostgresDeviceRepository {
    async fn create_device(&self, input: CreateDeviceRecordInput) -> DomainResult<Device> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let result = conn
            .query_one(
                "INSERT INTO devices (id, tenant_id, remote_device_id, device_name, credentials_reference)
                 VALUES ($1, $2, $3, $4, $5)
                 RETURNING id, tenant_id, remote_device_id, device_name, credentials_reference, created_at",
                &[
                    &input.id,
                    &input.tenant_id,
                    &input.remote_device_id,
                    &input.name,
                    &input.credentials_reference,
                ],
            )
            .await;

        let row = match result {
            Ok(row) => row,
            Err(e) => {
                // PostgreSQL error code 23505 is unique_violation
                if let Some(db_err) = e.as_db_error() {
                    if db_err.code().code() == "23505" {
                        return Err(DomainError::DeviceAlreadyExists(input.remote_device_id));
                    }
                }
                return Err(DomainError::RepositoryError(e.into()));
            }
        };

        debug!(device_id = %input.id, remote_device_id = %input.remote_device_id, "recorded device");
        Ok(DeviceRow::from_row(&row).into())
    }

    async fn get_device(&self, input: GetDeviceInput) -> DomainResult<Option<Device>> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let row = conn
            .query_opt(
                "SELECT id, tenant_id, remote_device_id, device_name, credentials_reference, created_at
                 FROM devices
                 WHERE id = $1",
                &[&input.device_id],
            )
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        Ok(row.map(|row| DeviceRow::from_row(&row).into()))
    }

    async fn list_devices(&self, input: ListDevicesInput) -> DomainResult<Vec<Device>> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let rows = conn
            .query(
                "SELECT id, tenant_id, remote_device_id, device_name, credentials_reference, created_at
                 FROM devices
                 WHERE tenant_id = $1
                 ORDER BY created_at DESC",
                &[&input.tenant_id],
            )
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        Ok(rows
            .iter()
            .map(|row| DeviceRow::from_row(row).into())
            .collect())
    }
}
