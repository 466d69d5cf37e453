//! Tenant-scoped persistence for domain records.

pub mod tenant_store;

pub use tenant_store::{InMemoryTenantStore, TenantStore};
