use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::error;

use fleetport_domain::DomainError;

/// Stable machine-readable error codes for the JSON error body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}

/// HTTP-facing error. Remote failure detail stays in server logs; the caller
/// gets a generic retryable message. Reconciliation detail is for operators
/// only and never reaches the end user.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiError {
    pub fn missing_tenant() -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: "MISSING_TENANT",
            message: "X-Tenant-Id header is required".to_string(),
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(error: DomainError) -> Self {
        let (status, code, message) = match &error {
            DomainError::NoLicenseAvailable(_) => (
                StatusCode::CONFLICT,
                "NO_LICENSE_AVAILABLE",
                "No available licenses. Please purchase more licenses.".to_string(),
            ),
            DomainError::LicenseBatchNotFound(id) => (
                StatusCode::NOT_FOUND,
                "LICENSE_NOT_FOUND",
                format!("License batch not found: {id}"),
            ),
            DomainError::DeviceNotFound(id) => (
                StatusCode::NOT_FOUND,
                "DEVICE_NOT_FOUND",
                format!("Device not found: {id}"),
            ),
            DomainError::DeviceAlreadyExists(id) => (
                StatusCode::CONFLICT,
                "DEVICE_ALREADY_EXISTS",
                format!("Device already exists: {id}"),
            ),
            DomainError::InvalidUnitCount(msg) => {
                (StatusCode::BAD_REQUEST, "INVALID_REQUEST", msg.clone())
            }
            DomainError::ValidationError(msg) => {
                (StatusCode::BAD_REQUEST, "INVALID_REQUEST", msg.clone())
            }
            DomainError::ReservationContention(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "TRY_AGAIN",
                "The request could not be completed, please retry.".to_string(),
            ),
            DomainError::RemoteCreateFailed(_) => (
                StatusCode::BAD_GATEWAY,
                "REMOTE_CREATE_FAILED",
                "Device creation failed on the device platform, please retry.".to_string(),
            ),
            DomainError::RemoteAssignFailed(_) => (
                StatusCode::BAD_GATEWAY,
                "REMOTE_ASSIGN_FAILED",
                "Device assignment failed on the device platform, please retry.".to_string(),
            ),
            DomainError::RemoteQueryFailed(_) => (
                StatusCode::BAD_GATEWAY,
                "REMOTE_QUERY_FAILED",
                "The device platform could not be reached, please retry.".to_string(),
            ),
            DomainError::UnitAlreadyReleased(_)
            | DomainError::ReconciliationRequired(_)
            | DomainError::RepositoryError(_) => {
                error!(error = %error, "internal error surfaced to HTTP layer");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred.".to_string(),
                )
            }
        };

        Self {
            status,
            code,
            message,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorBody {
                error: self.code,
                message: self.message,
            }),
        )
            .into_response()
    }
}
