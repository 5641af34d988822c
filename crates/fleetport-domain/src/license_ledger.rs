use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::error::{DomainError, DomainResult};
use crate::license::*;
use crate::repository::LicenseRepository;

/// Attempts before a reservation gives up when the guarded debit keeps losing
/// to concurrent callers even though eligible capacity keeps showing up.
const MAX_RESERVE_ATTEMPTS: u32 = 5;

/// Domain service owning license capacity.
///
/// Sole writer of `used_units`: every mutation goes through the repository's
/// atomic guarded operations, never through read-modify-write.
pub struct LicenseLedger {
    repository: Arc<dyn LicenseRepository>,
}

impl LicenseLedger {
    pub fn new(repository: Arc<dyn LicenseRepository>) -> Self {
        Self { repository }
    }

    /// Reserve one unit from the tenant's oldest activated batch with
    /// remaining capacity (FIFO drain order).
    ///
    /// The selection and the increment are decoupled, so the increment is
    /// re-guarded by `used_units < total_units` inside the store and retried
    /// when a concurrent caller debits the same batch first. Two callers can
    /// never both take the last unit.
    #[instrument(skip(self, input), fields(tenant_id = %input.tenant_id))]
    pub async fn reserve_unit(&self, input: ReserveUnitInput) -> DomainResult<LicenseUnitHandle> {
        for attempt in 1..=MAX_RESERVE_ATTEMPTS {
            let candidate = self
                .repository
                .find_oldest_eligible(FindEligibleBatchInput {
                    tenant_id: input.tenant_id.clone(),
                })
                .await?;

            let Some(batch) = candidate else {
                debug!("no eligible batch with remaining capacity");
                return Err(DomainError::NoLicenseAvailable(input.tenant_id.clone()));
            };

            let debited = self
                .repository
                .try_consume_unit(ConsumeUnitInput {
                    batch_id: batch.id.clone(),
                })
                .await?;

            if let Some(debited) = debited {
                debug!(
                    batch_id = %debited.id,
                    used_units = debited.used_units,
                    total_units = debited.total_units,
                    "license unit reserved"
                );
                return Ok(LicenseUnitHandle::new(debited.id));
            }

            debug!(attempt, batch_id = %batch.id, "guarded debit lost the race, reselecting");
        }

        warn!("reservation attempts exhausted under contention");
        Err(DomainError::ReservationContention(input.tenant_id.clone()))
    }

    /// Give a reserved unit back after downstream provisioning failed.
    ///
    /// Each handle releases at most once; a second call reports
    /// `UnitAlreadyReleased` instead of silently double-crediting the batch.
    #[instrument(skip(self, handle), fields(batch_id = %handle.batch_id(), reservation_id = %handle.reservation_id()))]
    pub async fn release_unit(&self, handle: &LicenseUnitHandle) -> DomainResult<LicenseBatch> {
        if !handle.mark_released() {
            warn!("second release attempt for the same reservation");
            return Err(DomainError::UnitAlreadyReleased(
                handle.reservation_id().to_string(),
            ));
        }

        let released = self
            .repository
            .release_unit(ReleaseUnitInput {
                batch_id: handle.batch_id().to_string(),
            })
            .await;

        match released {
            Ok(batch) => {
                debug!(used_units = batch.used_units, "license unit released");
                Ok(batch)
            }
            Err(e) => {
                // The store was not updated; let the caller retry the release.
                handle.unmark_released();
                Err(e)
            }
        }
    }

    /// Record a purchased batch. Inactive until an administrator activates it.
    #[instrument(skip(self, input), fields(tenant_id = %input.tenant_id, package_name = %input.package_name))]
    pub async fn create_batch(&self, input: CreateBatchInput) -> DomainResult<LicenseBatch> {
        if input.total_units <= 0 {
            return Err(DomainError::InvalidUnitCount(format!(
                "total_units must be at least 1, got {}",
                input.total_units
            )));
        }

        if input.tenant_id.trim().is_empty() {
            return Err(DomainError::ValidationError(
                "tenant_id cannot be empty".to_string(),
            ));
        }

        let batch_id = xid::new().to_string();

        let batch = self
            .repository
            .insert_batch(CreateBatchInputWithId {
                id: batch_id,
                tenant_id: input.tenant_id,
                package_name: input.package_name,
                total_units: input.total_units,
                price: input.price,
            })
            .await?;

        info!(batch_id = %batch.id, total_units = batch.total_units, "license batch created");
        Ok(batch)
    }

    /// Mark a batch consumable. Idempotent: activating an already-active batch
    /// succeeds without side effects.
    #[instrument(skip(self, input), fields(batch_id = %input.batch_id))]
    pub async fn activate_batch(&self, input: ActivateBatchInput) -> DomainResult<LicenseBatch> {
        let batch = self
            .repository
            .activate_batch(input.clone())
            .await?
            .ok_or_else(|| DomainError::LicenseBatchNotFound(input.batch_id.clone()))?;

        info!(batch_id = %batch.id, "license batch activated");
        Ok(batch)
    }

    pub async fn get_batch(&self, input: GetBatchInput) -> DomainResult<LicenseBatch> {
        self.repository
            .get_batch(input.clone())
            .await?
            .ok_or_else(|| DomainError::LicenseBatchNotFound(input.batch_id.clone()))
    }

    pub async fn list_batches(&self, input: ListBatchesInput) -> DomainResult<Vec<LicenseBatch>> {
        self.repository.list_batches(input).await
    }

    pub async fn list_all_batches(&self) -> DomainResult<Vec<LicenseBatch>> {
        self.repository.list_all_batches().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MockLicenseRepository;
    use chrono::Utc;

    fn batch(id: &str, used: i32, total: i32) -> LicenseBatch {
        LicenseBatch {
            id: id.to_string(),
            tenant_id: "tenant-1".to_string(),
            package_name: "starter".to_string(),
            total_units: total,
            used_units: used,
            price: 4900,
            purchased_at: Utc::now(),
            is_assigned: true,
        }
    }

    #[tokio::test]
    async fn test_reserve_unit_debits_oldest_eligible_batch() {
        let mut mock_repo = MockLicenseRepository::new();

        let oldest = batch("batch-old", 0, 5);
        mock_repo
            .expect_find_oldest_eligible()
            .withf(|input: &FindEligibleBatchInput| input.tenant_id == "tenant-1")
            .times(1)
            .return_once(move |_| Ok(Some(oldest)));

        mock_repo
            .expect_try_consume_unit()
            .withf(|input: &ConsumeUnitInput| input.batch_id == "batch-old")
            .times(1)
            .return_once(|_| Ok(Some(batch("batch-old", 1, 5))));

        let ledger = LicenseLedger::new(Arc::new(mock_repo));
        let handle = ledger
            .reserve_unit(ReserveUnitInput {
                tenant_id: "tenant-1".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(handle.batch_id(), "batch-old");
    }

    #[tokio::test]
    async fn test_reserve_unit_no_capacity() {
        let mut mock_repo = MockLicenseRepository::new();
        mock_repo
            .expect_find_oldest_eligible()
            .times(1)
            .return_once(|_| Ok(None));

        let ledger = LicenseLedger::new(Arc::new(mock_repo));
        let result = ledger
            .reserve_unit(ReserveUnitInput {
                tenant_id: "tenant-1".to_string(),
            })
            .await;

        assert!(matches!(result, Err(DomainError::NoLicenseAvailable(_))));
    }

    #[tokio::test]
    async fn test_reserve_unit_retries_after_losing_guarded_debit() {
        let mut mock_repo = MockLicenseRepository::new();

        mock_repo
            .expect_find_oldest_eligible()
            .times(2)
            .returning(|_| Ok(Some(batch("batch-1", 4, 5))));

        // First guarded debit loses to a concurrent caller, second wins.
        let mut consume_calls = 0;
        mock_repo
            .expect_try_consume_unit()
            .times(2)
            .returning(move |_| {
                consume_calls += 1;
                if consume_calls == 1 {
                    Ok(None)
                } else {
                    Ok(Some(batch("batch-1", 5, 5)))
                }
            });

        let ledger = LicenseLedger::new(Arc::new(mock_repo));
        let handle = ledger
            .reserve_unit(ReserveUnitInput {
                tenant_id: "tenant-1".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(handle.batch_id(), "batch-1");
    }

    #[tokio::test]
    async fn test_reserve_unit_contention_exhaustion() {
        let mut mock_repo = MockLicenseRepository::new();

        mock_repo
            .expect_find_oldest_eligible()
            .times(MAX_RESERVE_ATTEMPTS as usize)
            .returning(|_| Ok(Some(batch("batch-1", 4, 5))));
        mock_repo
            .expect_try_consume_unit()
            .times(MAX_RESERVE_ATTEMPTS as usize)
            .returning(|_| Ok(None));

        let ledger = LicenseLedger::new(Arc::new(mock_repo));
        let result = ledger
            .reserve_unit(ReserveUnitInput {
                tenant_id: "tenant-1".to_string(),
            })
            .await;

        assert!(matches!(
            result,
            Err(DomainError::ReservationContention(_))
        ));
    }

    #[tokio::test]
    async fn test_release_unit_once() {
        let mut mock_repo = MockLicenseRepository::new();
        mock_repo
            .expect_release_unit()
            .withf(|input: &ReleaseUnitInput| input.batch_id == "batch-1")
            .times(1)
            .return_once(|_| Ok(batch("batch-1", 0, 5)));

        let ledger = LicenseLedger::new(Arc::new(mock_repo));
        let handle = LicenseUnitHandle::new("batch-1".to_string());

        let released = ledger.release_unit(&handle).await.unwrap();
        assert_eq!(released.used_units, 0);
    }

    #[tokio::test]
    async fn test_release_unit_twice_is_detected() {
        let mut mock_repo = MockLicenseRepository::new();
        // The store is touched exactly once.
        mock_repo
            .expect_release_unit()
            .times(1)
            .return_once(|_| Ok(batch("batch-1", 0, 5)));

        let ledger = LicenseLedger::new(Arc::new(mock_repo));
        let handle = LicenseUnitHandle::new("batch-1".to_string());

        ledger.release_unit(&handle).await.unwrap();
        let second = ledger.release_unit(&handle).await;

        assert!(matches!(second, Err(DomainError::UnitAlreadyReleased(_))));
    }

    #[tokio::test]
    async fn test_release_unit_repo_failure_allows_retry() {
        let mut mock_repo = MockLicenseRepository::new();
        let mut calls = 0;
        mock_repo.expect_release_unit().times(2).returning(move |_| {
            calls += 1;
            if calls == 1 {
                Err(DomainError::RepositoryError(anyhow::anyhow!(
                    "connection reset"
                )))
            } else {
                Ok(batch("batch-1", 0, 5))
            }
        });

        let ledger = LicenseLedger::new(Arc::new(mock_repo));
        let handle = LicenseUnitHandle::new("batch-1".to_string());

        assert!(ledger.release_unit(&handle).await.is_err());
        // The failed attempt did not burn the handle.
        assert!(ledger.release_unit(&handle).await.is_ok());
    }

    #[tokio::test]
    async fn test_create_batch_rejects_non_positive_units() {
        let mock_repo = MockLicenseRepository::new();
        let ledger = LicenseLedger::new(Arc::new(mock_repo));

        let result = ledger
            .create_batch(CreateBatchInput {
                tenant_id: "tenant-1".to_string(),
                package_name: "starter".to_string(),
                total_units: 0,
                price: 4900,
            })
            .await;

        assert!(matches!(result, Err(DomainError::InvalidUnitCount(_))));
    }

    #[tokio::test]
    async fn test_create_batch_generates_id() {
        let mut mock_repo = MockLicenseRepository::new();
        mock_repo
            .expect_insert_batch()
            .withf(|input: &CreateBatchInputWithId| {
                !input.id.is_empty() && input.total_units == 10
            })
            .times(1)
            .returning(|input| {
                Ok(LicenseBatch {
                    id: input.id,
                    tenant_id: input.tenant_id,
                    package_name: input.package_name,
                    total_units: input.total_units,
                    used_units: 0,
                    price: input.price,
                    purchased_at: Utc::now(),
                    is_assigned: false,
                })
            });

        let ledger = LicenseLedger::new(Arc::new(mock_repo));
        let created = ledger
            .create_batch(CreateBatchInput {
                tenant_id: "tenant-1".to_string(),
                package_name: "starter".to_string(),
                total_units: 10,
                price: 4900,
            })
            .await
            .unwrap();

        assert!(!created.id.is_empty());
        assert_eq!(created.used_units, 0);
        assert!(!created.is_assigned);
    }

    #[tokio::test]
    async fn test_activate_batch_not_found() {
        let mut mock_repo = MockLicenseRepository::new();
        mock_repo
            .expect_activate_batch()
            .times(1)
            .return_once(|_| Ok(None));

        let ledger = LicenseLedger::new(Arc::new(mock_repo));
        let result = ledger
            .activate_batch(ActivateBatchInput {
                batch_id: "missing".to_string(),
            })
            .await;

        assert!(matches!(result, Err(DomainError::LicenseBatchNotFound(_))));
    }
}
