use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_postgres::Row;

/// License batch row for PostgreSQL storage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LicenseBatchRow {
    pub id: String,
    pub tenant_id: String,
    pub package_name: String,
    pub total_units: i32,
    pub used_units: i32,
    pub price: i64,
    pub purchased_at: DateTime<Utc>,
    pub is_assigned: bool,
}

impl LicenseBatchRow {
    /// Column order must match the SELECT/RETURNING lists in the repository.
    pub fn from_row(row: &Row) -> Self {
        Self {
            id: row.get(0),
            tenant_id: row.get(1),
            package_name: row.get(2),
            total_units: row.get(3),
            used_units: row.get(4),
            price: row.get(5),
            purchased_at: row.get(6),
            is_assigned: row.get(7),
        }
    }
}

/// Device row for PostgreSQL storage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceRow {
    pub id: String,
    pub tenant_id: String,
    pub remote_device_id: String,
    pub device_name: String,
    pub credentials_reference: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl DeviceRow {
    pub fn from_row(row: &Row) -> Self {
        Self {
            id: row.get(0),
            tenant_id: row.get(1),
            remote_device_id: row.get(2),
            device_name: row.get(3),
            credentials_reference: row.get(4),
            created_at: row.get(5),
        }
    }
}
