use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};

/// A purchased block of device licenses owned by a tenant.
///
/// `used_units` only moves through the ledger's atomic operations and always
/// satisfies `0 <= used_units <= total_units`. Batches are historical records
/// and are never deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LicenseBatch {
    pub id: String,
    pub tenant_id: String,
    pub package_name: String,
    pub total_units: i32,
    pub used_units: i32,
    /// Purchase price in minor currency units. Display-only.
    pub price: i64,
    pub purchased_at: DateTime<Utc>,
    /// A batch is consumable only after an administrator activates it.
    pub is_assigned: bool,
}

impl LicenseBatch {
    pub fn remaining_units(&self) -> i32 {
        self.total_units - self.used_units
    }
}

/// Proof that one license unit was debited from a batch.
///
/// The handle is the only way to undo a reservation. The released flag is
/// shared across clones so a unit can be given back at most once; a second
/// release attempt is reported as an error.
#[derive(Debug, Clone)]
pub struct LicenseUnitHandle {
    reservation_id: String,
    batch_id: String,
    released: Arc<AtomicBool>,
}

impl LicenseUnitHandle {
    pub(crate) fn new(batch_id: String) -> Self {
        Self {
            reservation_id: xid::new().to_string(),
            batch_id,
            released: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn reservation_id(&self) -> &str {
        &self.reservation_id
    }

    pub fn batch_id(&self) -> &str {
        &self.batch_id
    }

    /// Marks the handle released. Returns false if it was already released.
    pub(crate) fn mark_released(&self) -> bool {
        !self.released.swap(true, Ordering::SeqCst)
    }

    /// Undoes `mark_released` after a failed store update so the caller may
    /// retry the release.
    pub(crate) fn unmark_released(&self) {
        self.released.store(false, Ordering::SeqCst);
    }
}

/// External input for purchasing a batch (no ID)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateBatchInput {
    pub tenant_id: String,
    pub package_name: String,
    pub total_units: i32,
    pub price: i64,
}

/// Internal input with generated ID
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateBatchInputWithId {
    pub id: String,
    pub tenant_id: String,
    pub package_name: String,
    pub total_units: i32,
    pub price: i64,
}

/// Input for activating a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivateBatchInput {
    pub batch_id: String,
}

/// Input for reserving a unit from the tenant's batches
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReserveUnitInput {
    pub tenant_id: String,
}

/// Input for selecting the oldest batch with remaining capacity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FindEligibleBatchInput {
    pub tenant_id: String,
}

/// Input for the guarded single-unit debit of a specific batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumeUnitInput {
    pub batch_id: String,
}

/// Input for giving a unit back to a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseUnitInput {
    pub batch_id: String,
}

/// Input for getting a batch by ID
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetBatchInput {
    pub batch_id: String,
}

/// Input for listing a tenant's batches
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListBatchesInput {
    pub tenant_id: String,
}
