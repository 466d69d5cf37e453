//! API-side authorization guard.
//!
//! Permissions are enforced at the route boundary, before any domain
//! mutation runs; entities and infra stay auth-agnostic. Reads are
//! tenant-scoped but not permission-gated.

use forgescan_auth::{authorize, AuthzError, CommandAuthorization, Permission, Principal, TenantMembership};

use crate::context::{PrincipalContext, TenantContext};

/// Permission set guarding one mutating route.
struct OperationGuard {
    required: Vec<Permission>,
}

impl CommandAuthorization for OperationGuard {
    fn required_permissions(&self) -> &[Permission] {
        &self.required
    }
}

/// Check one operation permission in the current request context.
pub fn require(
    tenant: &TenantContext,
    principal: &PrincipalContext,
    permission: &'static str,
) -> Result<(), AuthzError> {
    let guard = OperationGuard {
        required: vec![Permission::new(permission)],
    };
    authorize_command(tenant, principal, &guard)
}

/// Check every permission a command declares.
pub fn authorize_command<C: CommandAuthorization>(
    tenant: &TenantContext,
    principal: &PrincipalContext,
    command: &C,
) -> Result<(), AuthzError> {
    let membership = TenantMembership {
        tenant_id: tenant.tenant_id(),
        roles: principal.roles().to_vec(),
        permissions: permissions_for(principal),
    };

    let resolved = Principal {
        principal_id: principal.principal_id(),
        active_tenant_id: tenant.tenant_id(),
        membership,
    };

    for perm in command.required_permissions() {
        authorize(&resolved, perm)?;
    }

    Ok(())
}

/// Minimal role-to-permission mapping.
///
/// This stays a convention ("admin" grants everything in its tenant) until a
/// real policy source exists.
fn permissions_for(principal: &PrincipalContext) -> Vec<Permission> {
    if principal.has_role("admin") {
        return vec![Permission::new("*")];
    }

    Vec::new()
}
