//! Parties domain module (suppliers).
//!
//! This crate contains business rules for suppliers, implemented purely as
//! deterministic domain logic (no IO, no HTTP, no storage).

pub mod supplier;

pub use supplier::{ContactInfo, Supplier, SupplierId, SupplierStatus};
