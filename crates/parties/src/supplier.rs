use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use forgescan_core::{DomainError, DomainResult, Entity, TenantId};

/// Supplier identifier (tenant-scoped via the owning record).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SupplierId(Uuid);

forgescan_core::impl_uuid_newtype!(SupplierId, "SupplierId");

/// Supplier status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SupplierStatus {
    Active,
    Suspended,
}

/// Contact information for a supplier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// Supplier master record.
///
/// Extracted vendor names are matched against these records; only active
/// suppliers are eligible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Supplier {
    id: SupplierId,
    tenant_id: TenantId,
    name: String,
    contact: ContactInfo,
    status: SupplierStatus,
    suspended_reason: Option<String>,
    created_at: DateTime<Utc>,
}

impl Supplier {
    pub fn new(
        tenant_id: TenantId,
        name: impl Into<String>,
        contact: Option<ContactInfo>,
    ) -> DomainResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }

        Ok(Self {
            id: SupplierId::new(),
            tenant_id,
            name,
            contact: contact.unwrap_or_default(),
            status: SupplierStatus::Active,
            suspended_reason: None,
            created_at: Utc::now(),
        })
    }

    pub fn id(&self) -> SupplierId {
        self.id
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn contact(&self) -> &ContactInfo {
        &self.contact
    }

    pub fn status(&self) -> SupplierStatus {
        self.status
    }

    pub fn suspended_reason(&self) -> Option<&str> {
        self.suspended_reason.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Invariant helper: whether this supplier is allowed to transact.
    ///
    /// Suspended suppliers cannot transact.
    pub fn can_transact(&self) -> bool {
        self.status == SupplierStatus::Active
    }

    /// Replace name and/or contact; `None` keeps the existing value.
    pub fn update_details(
        &mut self,
        name: Option<String>,
        contact: Option<ContactInfo>,
    ) -> DomainResult<()> {
        if let Some(name) = name {
            if name.trim().is_empty() {
                return Err(DomainError::validation("name cannot be empty"));
            }
            self.name = name;
        }
        if let Some(contact) = contact {
            self.contact = contact;
        }
        Ok(())
    }

    pub fn suspend(&mut self, reason: Option<String>) -> DomainResult<()> {
        if self.status == SupplierStatus::Suspended {
            return Err(DomainError::conflict("supplier is already suspended"));
        }
        self.status = SupplierStatus::Suspended;
        self.suspended_reason = reason;
        Ok(())
    }
}

impl Entity for Supplier {
    type Id = SupplierId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_tenant_id() -> TenantId {
        TenantId::new()
    }

    #[test]
    fn new_supplier_is_active_and_can_transact() {
        let supplier = Supplier::new(test_tenant_id(), "Acme Supplies Ltd", None).unwrap();
        assert_eq!(supplier.status(), SupplierStatus::Active);
        assert_eq!(supplier.name(), "Acme Supplies Ltd");
        assert!(supplier.can_transact());
    }

    #[test]
    fn new_supplier_rejects_empty_name() {
        let err = Supplier::new(test_tenant_id(), "   ", None).unwrap_err();
        match err {
            DomainError::Validation(_) => {}
            _ => panic!("Expected Validation error for empty name"),
        }
    }

    #[test]
    fn update_details_replaces_name_and_contact() {
        let mut supplier = Supplier::new(test_tenant_id(), "Old Name", None).unwrap();
        let contact = ContactInfo {
            email: Some("billing@example.com".to_string()),
            phone: Some("+123456789".to_string()),
            address: None,
        };

        supplier
            .update_details(Some("New Name".to_string()), Some(contact.clone()))
            .unwrap();

        assert_eq!(supplier.name(), "New Name");
        assert_eq!(supplier.contact(), &contact);
    }

    #[test]
    fn update_details_none_keeps_existing_values() {
        let contact = ContactInfo {
            email: Some("billing@example.com".to_string()),
            phone: None,
            address: None,
        };
        let mut supplier =
            Supplier::new(test_tenant_id(), "Acme", Some(contact.clone())).unwrap();

        supplier.update_details(None, None).unwrap();

        assert_eq!(supplier.name(), "Acme");
        assert_eq!(supplier.contact(), &contact);
    }

    #[test]
    fn update_details_rejects_empty_name() {
        let mut supplier = Supplier::new(test_tenant_id(), "Acme", None).unwrap();

        let err = supplier
            .update_details(Some("  ".to_string()), None)
            .unwrap_err();
        match err {
            DomainError::Validation(_) => {}
            _ => panic!("Expected Validation error for empty name"),
        }

        // Rejected update must leave the record untouched.
        assert_eq!(supplier.name(), "Acme");
    }

    #[test]
    fn suspend_blocks_transacting_and_records_reason() {
        let mut supplier = Supplier::new(test_tenant_id(), "Acme", None).unwrap();
        assert!(supplier.can_transact());

        supplier.suspend(Some("Risk review".to_string())).unwrap();

        assert_eq!(supplier.status(), SupplierStatus::Suspended);
        assert_eq!(supplier.suspended_reason(), Some("Risk review"));
        assert!(!supplier.can_transact());
    }

    #[test]
    fn suspend_rejects_already_suspended() {
        let mut supplier = Supplier::new(test_tenant_id(), "Acme", None).unwrap();
        supplier.suspend(None).unwrap();

        let err = supplier.suspend(None).unwrap_err();
        match err {
            DomainError::Conflict(_) => {}
            _ => panic!("Expected Conflict error for already suspended supplier"),
        }
    }
}
