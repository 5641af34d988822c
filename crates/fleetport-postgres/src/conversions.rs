use fleetport_domain::{Device, LicenseBatch};

use crate::models::{DeviceRow, LicenseBatchRow};

impl From<LicenseBatchRow> for LicenseBatch {
    fn from(row: LicenseBatchRow) -> Self {
        LicenseBatch {
            id: row.id,
            tenant_id: row.tenant_id,
            package_name: row.package_name,
            total_units: row.total_units,
            used_units: row.used_units,
            price: row.price,
            purchased_at: row.purchased_at,
            is_assigned: row.is_assigned,
        }
    }
}

impl From<DeviceRow> for Device {
    fn from(row: DeviceRow) -> Self {
        Device {
            id: row.id,
            tenant_id: row.tenant_id,
            remote_device_id: row.remote_device_id,
            name: row.device_name, // Map device_name -> name
            credentials_reference: row.credentials_reference,
            created_at: Some(row.created_at),
        }
    }
}
