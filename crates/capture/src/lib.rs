//! Capture domain module (invoice captures).
//!
//! This crate contains business rules for the invoice-capture document the
//! extraction flow populates, implemented purely as deterministic domain
//! logic (no IO, no HTTP, no storage).

pub mod capture;

pub use capture::{
    CaptureId, CaptureItem, CaptureStatus, ExtractedFields, ExtractedItemFields,
    InvoiceCapture, ItemMatchResult, MatchStatus,
};
