use async_trait::async_trait;
use thiserror::Error;

/// Errors surfaced by the remote platform gateway.
///
/// The provisioner maps these into `RemoteCreateFailed` / `RemoteAssignFailed`
/// with the failing call's detail; timeouts surface as `Transport`.
#[derive(Error, Debug)]
pub enum RemotePlatformError {
    #[error("authentication with remote platform failed: {0}")]
    Auth(String),

    #[error("remote platform request failed: {0}")]
    Transport(String),

    #[error("remote platform returned status {status}: {detail}")]
    Api { status: u16, detail: String },

    #[error("failed to decode remote platform response: {0}")]
    Decode(String),
}

pub type RemoteResult<T> = Result<T, RemotePlatformError>;

/// Credentials supplied when a device is created or rotated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceCredentialInput {
    pub username: String,
    pub password: String,
}

/// Device descriptor as reported by the remote platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteDevice {
    pub remote_device_id: String,
    pub name: String,
    /// Tenant the remote platform has the device assigned to, if any.
    pub customer_id: Option<String>,
}

/// Credential payload fetched from the remote platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceCredentials {
    pub remote_device_id: String,
    pub credentials_type: String,
    pub credentials_value: String,
}

/// Input for creating a device on the remote platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRemoteDeviceInput {
    pub name: String,
    pub credentials: DeviceCredentialInput,
}

/// Input for assigning a remote device to a tenant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignRemoteDeviceInput {
    pub remote_device_id: String,
    pub tenant_id: String,
}

/// Input for listing a tenant's remote devices
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRemoteDevicesInput {
    pub tenant_id: String,
}

/// Input for fetching a device's credentials
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchCredentialsInput {
    pub remote_device_id: String,
}

/// Input for rotating a device's credentials
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateCredentialsInput {
    pub remote_device_id: String,
    pub credentials: DeviceCredentialInput,
}

/// Input for resolving a tenant's display name on the remote platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchCustomerNameInput {
    pub customer_id: String,
}

/// Capability interface to the third-party device-management platform.
/// Infrastructure layer (fleetport-remote) implements this trait.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RemotePlatform: Send + Sync {
    /// Create a device with credentials; returns the remote device ID
    async fn create_device(&self, input: CreateRemoteDeviceInput) -> RemoteResult<String>;

    /// Assign an existing remote device to a tenant
    async fn assign_device(&self, input: AssignRemoteDeviceInput) -> RemoteResult<()>;

    /// List the devices assigned to a tenant
    async fn fetch_devices(&self, input: FetchRemoteDevicesInput) -> RemoteResult<Vec<RemoteDevice>>;

    /// List every device the vendor account can see
    async fn fetch_all_devices(&self) -> RemoteResult<Vec<RemoteDevice>>;

    /// Fetch a device's credential payload
    async fn fetch_credentials(&self, input: FetchCredentialsInput)
        -> RemoteResult<DeviceCredentials>;

    /// Replace a device's credentials
    async fn update_credentials(&self, input: UpdateCredentialsInput) -> RemoteResult<()>;

    /// Resolve a tenant's display name, if the remote platform knows it
    async fn fetch_customer_name(
        &self,
        input: FetchCustomerNameInput,
    ) -> RemoteResult<Option<String>>;
}
