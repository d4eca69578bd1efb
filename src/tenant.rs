use crate::errors::ServiceError;
use sea_orm::{ColumnTrait, Condition};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Capability value identifying the tenant an operation runs as. Passed
/// explicitly to every service, command and query entry point; there is no
/// ambient tenant state.
///
/// `Global` is the administrative scope: it passes every ownership check and
/// list queries under it are unfiltered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TenantContext {
    Global,
    Scoped(Uuid),
}

impl TenantContext {
    /// Builds a context from an optional `X-Tenant-Id` header value.
    pub fn from_header(value: Option<&str>) -> Result<Self, ServiceError> {
        match value {
            None => Ok(TenantContext::Global),
            Some(raw) => {
                let id = Uuid::parse_str(raw.trim()).map_err(|_| {
                    ServiceError::InvalidInput(format!("Malformed tenant identifier: {}", raw))
                })?;
                Ok(TenantContext::Scoped(id))
            }
        }
    }

    pub fn tenant_id(&self) -> Option<Uuid> {
        match self {
            TenantContext::Global => None,
            TenantContext::Scoped(id) => Some(*id),
        }
    }

    /// The owner to stamp on records created under this context.
    pub fn as_owner(&self) -> Option<Uuid> {
        self.tenant_id()
    }

    /// Capability check against a record's denormalized owner. Must be called
    /// on every mutating and every single-record read path.
    pub fn ensure_owns(&self, owner: Option<Uuid>, what: &str) -> Result<(), ServiceError> {
        match self {
            TenantContext::Global => Ok(()),
            TenantContext::Scoped(tenant) if owner == Some(*tenant) => Ok(()),
            TenantContext::Scoped(_) => Err(ServiceError::PermissionDenied(format!(
                "{} belongs to another tenant",
                what
            ))),
        }
    }

    /// Query predicate for list and aggregate views: scoped contexts only see
    /// rows whose owner column matches the tenant.
    pub fn scope_condition<C: ColumnTrait>(&self, owner_column: C) -> Condition {
        match self {
            TenantContext::Global => Condition::all(),
            TenantContext::Scoped(tenant) => Condition::all().add(owner_column.eq(*tenant)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn global_context_passes_any_owner() {
        let ctx = TenantContext::Global;
        assert!(ctx.ensure_owns(Some(Uuid::new_v4()), "location").is_ok());
        assert!(ctx.ensure_owns(None, "location").is_ok());
    }

    #[test]
    fn scoped_context_rejects_foreign_and_unowned() {
        let tenant = Uuid::new_v4();
        let ctx = TenantContext::Scoped(tenant);
        assert!(ctx.ensure_owns(Some(tenant), "location").is_ok());
        assert_matches!(
            ctx.ensure_owns(Some(Uuid::new_v4()), "location"),
            Err(ServiceError::PermissionDenied(_))
        );
        assert_matches!(
            ctx.ensure_owns(None, "location"),
            Err(ServiceError::PermissionDenied(_))
        );
    }

    #[test]
    fn header_parsing() {
        assert_eq!(
            TenantContext::from_header(None).unwrap(),
            TenantContext::Global
        );
        let id = Uuid::new_v4();
        assert_eq!(
            TenantContext::from_header(Some(&id.to_string())).unwrap(),
            TenantContext::Scoped(id)
        );
        assert_matches!(
            TenantContext::from_header(Some("not-a-uuid")),
            Err(ServiceError::InvalidInput(_))
        );
    }
}
