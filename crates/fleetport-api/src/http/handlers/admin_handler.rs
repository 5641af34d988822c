use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use fleetport_domain::{DeviceCredentialInput, GrantLicenseRequest};

use crate::domain::{DeviceDetails, LicenseBatchDetails};
use crate::http::error::ApiError;
use crate::http::handlers::license_handler::LicenseBatchResponse;
use crate::http::state::AppState;

#[derive(Debug, Deserialize)]
pub struct GrantLicenseBody {
    pub tenant_id: String,
    pub package_name: String,
    pub total_units: i32,
    pub price: i64,
}

#[derive(Debug, Serialize)]
pub struct AdminLicenseResponse {
    #[serde(flatten)]
    pub batch: LicenseBatchResponse,
    pub customer_name: Option<String>,
}

impl From<LicenseBatchDetails> for AdminLicenseResponse {
    fn from(details: LicenseBatchDetails) -> Self {
        Self {
            batch: details.batch.into(),
            customer_name: details.customer_name,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AdminDeviceCredentials {
    pub credentials_type: String,
    pub credentials_value: String,
}

#[derive(Debug, Serialize)]
pub struct AdminDeviceResponse {
    pub remote_device_id: String,
    pub name: String,
    pub customer_id: Option<String>,
    pub customer_name: Option<String>,
    pub credentials: Option<AdminDeviceCredentials>,
}

impl From<DeviceDetails> for AdminDeviceResponse {
    fn from(details: DeviceDetails) -> Self {
        Self {
            remote_device_id: details.device.remote_device_id,
            name: details.device.name,
            customer_id: details.device.customer_id,
            customer_name: details.customer_name,
            credentials: details.credentials.map(|c| AdminDeviceCredentials {
                credentials_type: c.credentials_type,
                credentials_value: c.credentials_value,
            }),
        }
    }
}

/// Grant a batch to a tenant: create and activate in one administrative
/// action.
#[instrument(skip(state, body), fields(tenant_id = %body.tenant_id, package_name = %body.package_name))]
pub async fn grant_license(
    State(state): State<AppState>,
    Json(body): Json<GrantLicenseBody>,
) -> Result<(StatusCode, Json<LicenseBatchResponse>), ApiError> {
    let batch = state
        .allocation
        .grant_license(GrantLicenseRequest {
            tenant_id: body.tenant_id,
            package_name: body.package_name,
            total_units: body.total_units,
            price: body.price,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(batch.into())))
}

#[instrument(skip(state))]
pub async fn list_all_licenses(
    State(state): State<AppState>,
) -> Result<Json<Vec<AdminLicenseResponse>>, ApiError> {
    let details = state.inventory.list_licenses_with_customer_names().await?;
    Ok(Json(details.into_iter().map(Into::into).collect()))
}

#[instrument(skip(state))]
pub async fn list_all_devices(
    State(state): State<AppState>,
) -> Result<Json<Vec<AdminDeviceResponse>>, ApiError> {
    let details = state.inventory.list_devices_with_details().await?;
    Ok(Json(details.into_iter().map(Into::into).collect()))
}

#[derive(Debug, Deserialize)]
pub struct RotateCredentialsBody {
    pub username: String,
    pub password: String,
}

/// Replace a device's MQTT credentials on the remote platform.
#[instrument(skip(state, body), fields(remote_device_id = %remote_device_id))]
pub async fn rotate_device_credentials(
    State(state): State<AppState>,
    Path(remote_device_id): Path<String>,
    Json(body): Json<RotateCredentialsBody>,
) -> Result<StatusCode, ApiError> {
    state
        .inventory
        .rotate_device_credentials(
            remote_device_id,
            DeviceCredentialInput {
                username: body.username,
                password: body.password,
            },
        )
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
