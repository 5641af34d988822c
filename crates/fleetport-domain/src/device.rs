use chrono::{DateTime, Utc};

/// Local record of a provisioned device.
///
/// A row exists only for devices that completed the full provisioning
/// sequence: remote creation, remote assignment and one consumed license unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    pub id: String,
    pub tenant_id: String,
    /// Identifier of the device in the remote platform.
    pub remote_device_id: String,
    pub name: String,
    /// Non-secret reference to the device credentials (the MQTT username
    /// chosen at provisioning). Credential material lives only on the remote
    /// platform.
    pub credentials_reference: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Internal input with generated ID for persisting a device record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateDeviceRecordInput {
    pub id: String,
    pub tenant_id: String,
    pub remote_device_id: String,
    pub name: String,
    pub credentials_reference: Option<String>,
}

/// Input for retrieving a device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetDeviceInput {
    pub device_id: String,
}

/// Input for listing a tenant's devices
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListDevicesInput {
    pub tenant_id: String,
}
