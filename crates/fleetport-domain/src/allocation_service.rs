use std::sync::Arc;

use garde::Validate;
use tracing::{info, instrument};

use crate::error::DomainResult;
use crate::license::{ActivateBatchInput, CreateBatchInput, LicenseBatch};
use crate::license_ledger::LicenseLedger;
use crate::validate::validate;

/// Administrative request for granting a license batch
#[derive(Debug, Clone, Validate)]
pub struct GrantLicenseRequest {
    #[garde(length(min = 1))]
    pub tenant_id: String,
    #[garde(length(min = 1))]
    pub package_name: String,
    #[garde(skip)] // range-checked by the ledger
    pub total_units: i32,
    #[garde(skip)]
    pub price: i64,
}

/// Administrative workflow over the same ledger: create a batch and mark it
/// usable in one action. No concurrency hazard beyond the ledger's own
/// atomicity since it only creates new rows.
pub struct AllocationService {
    ledger: Arc<LicenseLedger>,
}

impl AllocationService {
    pub fn new(ledger: Arc<LicenseLedger>) -> Self {
        Self { ledger }
    }

    #[instrument(skip(self, request), fields(tenant_id = %request.tenant_id, package_name = %request.package_name))]
    pub async fn grant_license(&self, request: GrantLicenseRequest) -> DomainResult<LicenseBatch> {
        validate(&request)?;

        let created = self
            .ledger
            .create_batch(CreateBatchInput {
                tenant_id: request.tenant_id,
                package_name: request.package_name,
                total_units: request.total_units,
                price: request.price,
            })
            .await?;

        let activated = self
            .ledger
            .activate_batch(ActivateBatchInput {
                batch_id: created.id.clone(),
            })
            .await?;

        info!(batch_id = %activated.id, total_units = activated.total_units, "license granted");
        Ok(activated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DomainError;
    use crate::license::{ActivateBatchInput, CreateBatchInputWithId};
    use crate::repository::MockLicenseRepository;
    use chrono::Utc;

    #[tokio::test]
    async fn test_grant_license_creates_then_activates() {
        let mut mock_repo = MockLicenseRepository::new();

        mock_repo
            .expect_insert_batch()
            .withf(|input: &CreateBatchInputWithId| {
                input.tenant_id == "tenant-1" && input.total_units == 3
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

        mock_repo
            .expect_activate_batch()
            .withf(|input: &ActivateBatchInput| !input.batch_id.is_empty())
            .times(1)
            .returning(|input| {
                Ok(Some(LicenseBatch {
                    id: input.batch_id,
                    tenant_id: "tenant-1".to_string(),
                    package_name: "starter".to_string(),
                    total_units: 3,
                    used_units: 0,
                    price: 4900,
                    purchased_at: Utc::now(),
                    is_assigned: true,
                }))
            });

        let ledger = Arc::new(LicenseLedger::new(Arc::new(mock_repo)));
        let service = AllocationService::new(ledger);

        let granted = service
            .grant_license(GrantLicenseRequest {
                tenant_id: "tenant-1".to_string(),
                package_name: "starter".to_string(),
                total_units: 3,
                price: 4900,
            })
            .await
            .unwrap();

        assert!(granted.is_assigned);
        assert_eq!(granted.total_units, 3);
    }

    #[tokio::test]
    async fn test_grant_license_invalid_units() {
        let mock_repo = MockLicenseRepository::new();
        let ledger = Arc::new(LicenseLedger::new(Arc::new(mock_repo)));
        let service = AllocationService::new(ledger);

        let result = service
            .grant_license(GrantLicenseRequest {
                tenant_id: "tenant-1".to_string(),
                package_name: "starter".to_string(),
                total_units: -2,
                price: 4900,
            })
            .await;

        assert!(matches!(result, Err(DomainError::InvalidUnitCount(_))));
    }

    #[tokio::test]
    async fn test_grant_license_empty_tenant() {
        let mock_repo = MockLicenseRepository::new();
        let ledger = Arc::new(LicenseLedger::new(Arc::new(mock_repo)));
        let service = AllocationService::new(ledger);

        let result = service
            .grant_license(GrantLicenseRequest {
                tenant_id: "".to_string(),
                package_name: "starter".to_string(),
                total_units: 3,
                price: 4900,
            })
            .await;

        assert!(matches!(result, Err(DomainError::ValidationError(_))));
    }
}
