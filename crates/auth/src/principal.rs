use serde::{Deserialize, Serialize};
use uuid::Uuid;

use forgescan_core::TenantId;

/// Identity of an authenticated principal (human user, service account, etc).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrincipalId(Uuid);

forgescan_core::impl_uuid_newtype!(PrincipalId, "PrincipalId");

impl Default for PrincipalId {
    fn default() -> Self {
        Self::new()
    }
}

/// What a principal may do inside one tenant: the tenant boundary plus the
/// roles and explicit permissions granted there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantMembership {
    pub tenant_id: TenantId,
    pub roles: Vec<crate::Role>,
    pub permissions: Vec<crate::Permission>,
}
