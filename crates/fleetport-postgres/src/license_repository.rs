use async_trait::async_trait;
use tracing::debug;

use fleetport_domain::{
    ActivateBatchInput, ConsumeUnitInput, CreateBatchInputWithId, DomainError, DomainResult,
    FindEligibleBatchInput, GetBatchInput, LicenseBatch, LicenseRepository, ListBatchesInput,
    ReleaseUnitInput,
};

use crate::client::PostgresClient;
use crate::models::LicenseBatchRow;

/// PostgreSQL implementation of LicenseRepository trait.
///
/// `try_consume_unit` and `release_unit` are single guarded UPDATE statements;
/// the database serializes them, so no in-process locking is needed.
#[derive(Clone)]
pub struct PostgresLicenseRepository {
    client: PostgresClient,
}

impl PostgresLicenseRepository {
    pub fn new(client: PostgresClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl LicenseRepository for PostgresLicenseRepository {
    async fn insert_batch(&self, input: CreateBatchInputWithId) -> DomainResult<LicenseBatch> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let row = conn
            .query_one(
                "INSERT INTO license_batches (id, tenant_id, package_name, total_units, price)
                 VALUES ($1, $2, $3, $4, $5)
                 RETURNING id, tenant_id, package_name, total_units, used_units, price,
                           purchased_at, is_assigned",
                &[
                    &input.id,
                    &input.tenant_id,
                    &input.package_name,
                    &input.total_units,
                    &input.price,
                ],
            )
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        debug!(batch_id = %input.id, "inserted license batch");
        Ok(LicenseBatchRow::from_row(&row).into())
    }

    async fn activate_batch(
        &self,
        input: ActivateBatchInput,
    ) -> DomainResult<Option<LicenseBatch>> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let row = conn
            .query_opt(
                "UPDATE license_batches
                 SET is_assigned = TRUE
                 WHERE id = $1
                 RETURNING id, tenant_id, package_name, total_units, used_units, price,
                           purchased_at, is_assigned",
                &[&input.batch_id],
            )
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        Ok(row.map(|row| LicenseBatchRow::from_row(&row).into()))
    }

    async fn find_oldest_eligible(
        &self,
        input: FindEligibleBatchInput,
    ) -> DomainResult<Option<LicenseBatch>> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let row = conn
            .query_opt(
                "SELECT id, tenant_id, package_name, total_units, used_units, price,
                        purchased_at, is_assigned
                 FROM license_batches
                 WHERE tenant_id = $1 AND is_assigned = TRUE AND used_units < total_units
                 ORDER BY purchased_at ASC
                 LIMIT 1",
                &[&input.tenant_id],
            )
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        Ok(row.map(|row| LicenseBatchRow::from_row(&row).into()))
    }

    async fn try_consume_unit(
        &self,
        input: ConsumeUnitInput,
    ) -> DomainResult<Option<LicenseBatch>> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        // The capacity check and the increment are one statement; concurrent
        // callers re-evaluate the guard on the committed row, so the last
        // unit can only be taken once.
        let row = conn
            .query_opt(
                "UPDATE license_batches
                 SET used_units = used_units + 1
                 WHERE id = $1 AND used_units < total_units
                 RETURNING id, tenant_id, package_name, total_units, used_units, price,
                           purchased_at, is_assigned",
                &[&input.batch_id],
            )
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        Ok(row.map(|row| LicenseBatchRow::from_row(&row).into()))
    }

    async fn release_unit(&self, input: ReleaseUnitInput) -> DomainResult<LicenseBatch> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let row = conn
            .query_opt(
                "UPDATE license_batches
                 SET used_units = GREATEST(used_units - 1, 0)
                 WHERE id = $1
                 RETURNING id, tenant_id, package_name, total_units, used_units, price,
                           purchased_at, is_assigned",
                &[&input.batch_id],
            )
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        let row = row.ok_or_else(|| DomainError::LicenseBatchNotFound(input.batch_id.clone()))?;
        debug!(batch_id = %input.batch_id, "released license unit");
        Ok(LicenseBatchRow::from_row(&row).into())
    }

    async fn get_batch(&self, input: GetBatchInput) -> DomainResult<Option<LicenseBatch>> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let row = conn
            .query_opt(
                "SELECT id, tenant_id, package_name, total_units, used_units, price,
                        purchased_at, is_assigned
                 FROM license_batches
                 WHERE id = $1",
                &[&input.batch_id],
            )
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        Ok(row.map(|row| LicenseBatchRow::from_row(&row).into()))
    }

    async fn list_batches(&self, input: ListBatchesInput) -> DomainResult<Vec<LicenseBatch>> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let rows = conn
            .query(
                "SELECT id, tenant_id, package_name, total_units, used_units, price,
                        purchased_at, is_assigned
                 FROM license_batches
                 WHERE tenant_id = $1
                 ORDER BY purchased_at DESC",
                &[&input.tenant_id],
            )
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        Ok(rows
            .iter()
            .map(|row| LicenseBatchRow::from_row(row).into())
            .collect())
    }

    async fn list_all_batches(&self) -> DomainResult<Vec<LicenseBatch>> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let rows = conn
            .query(
                "SELECT id, tenant_id, package_name, total_units, used_units, price,
                        purchased_at, is_assigned
                 FROM license_batches
                 ORDER BY purchased_at DESC",
                &[],
            )
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        Ok(rows
            .iter()
            .map(|row| LicenseBatchRow::from_row(row).into())
            .collect())
    }
}
