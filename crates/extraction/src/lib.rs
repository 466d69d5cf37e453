//! `forgescan-extraction`
//!
//! **Responsibility:** Boundary to the external vision-language model.
//!
//! This crate is intentionally **not** part of the domain model:
//! - It must not depend on capture/party/product entities.
//! - It must not mutate domain state.
//! - It turns one invoice image into **extracted fields**, nothing more.

pub mod client;
pub mod error;
pub mod fields;
pub mod parse;
pub mod prompt;

pub use client::{OllamaVisionClient, VisionClient};
pub use error::ExtractionError;
pub use fields::{ExtractedInvoice, ExtractedLineItem};
pub use parse::{parse_model_output, ExtractionOutcome};
pub use prompt::INVOICE_PROMPT;
