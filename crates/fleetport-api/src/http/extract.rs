use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::http::error::ApiError;

pub const TENANT_HEADER: &str = "x-tenant-id";

/// Tenant identity of the authenticated caller.
///
/// Session handling is an external collaborator; by the time a request
/// reaches this service the auth layer has resolved the caller to a tenant
/// and put it in the X-Tenant-Id header.
#[derive(Debug, Clone)]
pub struct TenantId(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for TenantId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(TENANT_HEADER)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .map(|value| TenantId(value.to_string()))
            .ok_or_else(ApiError::missing_tenant)
    }
}
