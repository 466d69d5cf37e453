//! Purchasing domain module (purchase invoices).
//!
//! This crate contains business rules for purchase invoices promoted from
//! fully matched captures, implemented purely as deterministic domain logic
//! (no IO, no HTTP, no storage).

pub mod purchase_invoice;

pub use purchase_invoice::{PurchaseInvoice, PurchaseInvoiceId, PurchaseInvoiceLine};
