use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use fleetport_domain::{
    Device, DeviceRepository, DomainError, GetDeviceInput, ListDevicesInput,
    ProvisionDeviceRequest,
};

use crate::domain::DeviceDetails;
use crate::http::error::ApiError;
use crate::http::extract::TenantId;
use crate::http::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ProvisionDeviceBody {
    pub name: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct DeviceResponse {
    pub id: String,
    pub tenant_id: String,
    pub remote_device_id: String,
    pub name: String,
    pub credentials_reference: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<Device> for DeviceResponse {
    fn from(device: Device) -> Self {
        Self {
            id: device.id,
            tenant_id: device.tenant_id,
            remote_device_id: device.remote_device_id,
            name: device.name,
            credentials_reference: device.credentials_reference,
            created_at: device.created_at,
        }
    }
}

#[instrument(skip(state, body), fields(tenant_id = %tenant_id.0, device_name = %body.name))]
pub async fn provision_device(
    State(state): State<AppState>,
    tenant_id: TenantId,
    Json(body): Json<ProvisionDeviceBody>,
) -> Result<(StatusCode, Json<DeviceResponse>), ApiError> {
    let device = state
        .provisioning
        .provision_device(ProvisionDeviceRequest {
            tenant_id: tenant_id.0,
            name: body.name,
            username: body.username,
            password: body.password,
        })
        .await?;

    debug!(device_id = %device.id, "device provisioned via HTTP");
    Ok((StatusCode::CREATED, Json(device.into())))
}

#[instrument(skip(state), fields(tenant_id = %tenant_id.0, device_id = %device_id))]
pub async fn get_device(
    State(state): State<AppState>,
    tenant_id: TenantId,
    Path(device_id): Path<String>,
) -> Result<Json<DeviceResponse>, ApiError> {
    let device = state
        .device_repository
        .get_device(GetDeviceInput {
            device_id: device_id.clone(),
        })
        .await?
        // A device belonging to another tenant is indistinguishable from a
        // missing one.
        .filter(|device| device.tenant_id == tenant_id.0)
        .ok_or(DomainError::DeviceNotFound(device_id))?;

    Ok(Json(device.into()))
}

#[instrument(skip(state), fields(tenant_id = %tenant_id.0))]
pub async fn list_devices(
    State(state): State<AppState>,
    tenant_id: TenantId,
) -> Result<Json<Vec<DeviceResponse>>, ApiError> {
    let devices = state
        .device_repository
        .list_devices(ListDevicesInput {
            tenant_id: tenant_id.0,
        })
        .await?;

    Ok(Json(devices.into_iter().map(Into::into).collect()))
}

#[derive(Debug, Serialize)]
pub struct RemoteCredentialsResponse {
    pub credentials_type: String,
    pub credentials_value: String,
}

/// A tenant's device as the remote platform sees it, with its credentials.
#[derive(Debug, Serialize)]
pub struct RemoteDeviceResponse {
    pub remote_device_id: String,
    pub name: String,
    pub credentials: Option<RemoteCredentialsResponse>,
}

impl From<DeviceDetails> for RemoteDeviceResponse {
    fn from(details: DeviceDetails) -> Self {
        Self {
            remote_device_id: details.device.remote_device_id,
            name: details.device.name,
            credentials: details.credentials.map(|c| RemoteCredentialsResponse {
                credentials_type: c.credentials_type,
                credentials_value: c.credentials_value,
            }),
        }
    }
}

#[instrument(skip(state), fields(tenant_id = %tenant_id.0))]
pub async fn list_remote_devices(
    State(state): State<AppState>,
    tenant_id: TenantId,
) -> Result<Json<Vec<RemoteDeviceResponse>>, ApiError> {
    let details = state.inventory.list_tenant_devices(tenant_id.0).await?;
    Ok(Json(details.into_iter().map(Into::into).collect()))
}
