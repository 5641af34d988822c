use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use fleetport_domain::{
    ActivateBatchInput, CreateBatchInput, LicenseBatch, ListBatchesInput,
};

use crate::http::error::ApiError;
use crate::http::extract::TenantId;
use crate::http::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PurchaseLicenseBody {
    pub package_name: String,
    pub total_units: i32,
    pub price: i64,
}

#[derive(Debug, Serialize)]
pub struct LicenseBatchResponse {
    pub id: String,
    pub tenant_id: String,
    pub package_name: String,
    pub total_units: i32,
    pub used_units: i32,
    pub price: i64,
    pub purchased_at: DateTime<Utc>,
    pub is_assigned: bool,
}

impl From<LicenseBatch> for LicenseBatchResponse {
    fn from(batch: LicenseBatch) -> Self {
        Self {
            id: batch.id,
            tenant_id: batch.tenant_id,
            package_name: batch.package_name,
            total_units: batch.total_units,
            used_units: batch.used_units,
            price: batch.price,
            purchased_at: batch.purchased_at,
            is_assigned: batch.is_assigned,
        }
    }
}

/// Customer purchase. The batch stays inactive until an administrator
/// activates it.
#[instrument(skip(state, body), fields(tenant_id = %tenant_id.0, package_name = %body.package_name))]
pub async fn purchase_license(
    State(state): State<AppState>,
    tenant_id: TenantId,
    Json(body): Json<PurchaseLicenseBody>,
) -> Result<(StatusCode, Json<LicenseBatchResponse>), ApiError> {
    let batch = state
        .ledger
        .create_batch(CreateBatchInput {
            tenant_id: tenant_id.0,
            package_name: body.package_name,
            total_units: body.total_units,
            price: body.price,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(batch.into())))
}

#[instrument(skip(state), fields(tenant_id = %tenant_id.0))]
pub async fn list_licenses(
    State(state): State<AppState>,
    tenant_id: TenantId,
) -> Result<Json<Vec<LicenseBatchResponse>>, ApiError> {
    let batches = state
        .ledger
        .list_batches(ListBatchesInput {
            tenant_id: tenant_id.0,
        })
        .await?;

    Ok(Json(batches.into_iter().map(Into::into).collect()))
}

#[instrument(skip(state), fields(batch_id = %batch_id))]
pub async fn activate_license(
    State(state): State<AppState>,
    Path(batch_id): Path<String>,
) -> Result<Json<LicenseBatchResponse>, ApiError> {
    let batch = state
        .ledger
        .activate_batch(ActivateBatchInput { batch_id })
        .await?;

    Ok(Json(batch.into()))
}
