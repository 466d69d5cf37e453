use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use forgescan_core::{DomainError, DomainResult, Entity, TenantId};

use crate::uom::{effective_uom, is_standard_uom};

/// Catalog item identifier (tenant-scoped via the owning record).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CatalogItemId(Uuid);

forgescan_core::impl_uuid_newtype!(CatalogItemId, "CatalogItemId");

/// Catalog item status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogItemStatus {
    Active,
    Archived,
}

/// Purchasable catalog item.
///
/// Extracted line descriptions are matched against these records; only
/// active items are eligible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogItem {
    id: CatalogItemId,
    tenant_id: TenantId,
    name: String,
    stock_uom: String,
    status: CatalogItemStatus,
    created_at: DateTime<Utc>,
}

impl CatalogItem {
    /// Create an active item. A blank `stock_uom` falls back to the default
    /// unit; a non-standard unit is rejected.
    pub fn new(
        tenant_id: TenantId,
        name: impl Into<String>,
        stock_uom: Option<String>,
    ) -> DomainResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }

        let stock_uom = effective_uom(stock_uom.as_deref().unwrap_or("")).to_string();
        if !is_standard_uom(&stock_uom) {
            return Err(DomainError::validation(format!(
                "unknown unit of measure: {stock_uom}"
            )));
        }

        Ok(Self {
            id: CatalogItemId::new(),
            tenant_id,
            name,
            stock_uom,
            status: CatalogItemStatus::Active,
            created_at: Utc::now(),
        })
    }

    pub fn id(&self) -> CatalogItemId {
        self.id
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stock_uom(&self) -> &str {
        &self.stock_uom
    }

    pub fn status(&self) -> CatalogItemStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Invariant helper: whether this item participates in matching.
    pub fn can_match(&self) -> bool {
        self.status == CatalogItemStatus::Active
    }

    pub fn archive(&mut self) -> DomainResult<()> {
        if self.status == CatalogItemStatus::Archived {
            return Err(DomainError::conflict("item is already archived"));
        }
        self.status = CatalogItemStatus::Archived;
        Ok(())
    }
}

impl Entity for CatalogItem {
    type Id = CatalogItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
