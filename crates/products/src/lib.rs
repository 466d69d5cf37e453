//! Products domain module (catalog items + units of measure).
//!
//! This crate contains business rules for the purchasable catalog, implemented
//! purely as deterministic domain logic (no IO, no HTTP, no storage).

pub mod item;
pub mod uom;

pub use item::{CatalogItem, CatalogItemId, CatalogItemStatus};
pub use uom::{effective_uom, is_standard_uom, DEFAULT_UOM, STANDARD_UOMS};
