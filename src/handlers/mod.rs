pub mod health;
pub mod locations;
pub mod stock;

use crate::{errors::ServiceError, tenant::TenantContext};
use axum::http::HeaderMap;

pub(crate) const TENANT_HEADER: &str = "x-tenant-id";
pub(crate) const ACTOR_HEADER: &str = "x-actor-id";

/// Resolves the tenant scope from the request headers. A missing header is
/// the explicit administrative scope; a malformed one is a caller error.
pub(crate) fn tenant_from_headers(headers: &HeaderMap) -> Result<TenantContext, ServiceError> {
    let raw = headers
        .get(TENANT_HEADER)
        .map(|value| {
            value.to_str().map_err(|_| {
                ServiceError::InvalidInput("tenant header is not valid UTF-8".to_string())
            })
        })
        .transpose()?;
    TenantContext::from_header(raw)
}

/// Optional actor identifier recorded on ledger entries.
pub(crate) fn actor_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get(ACTOR_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_string())
}
