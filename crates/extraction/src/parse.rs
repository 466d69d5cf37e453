use serde_json::Value as JsonValue;

use crate::error::ExtractionError;
use crate::fields::ExtractedInvoice;

/// Outcome of parsing one model reply.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionOutcome {
    /// Structured fields, leniently mapped (missing keys become `""` / `0`).
    pub invoice: ExtractedInvoice,

    /// The exact JSON object the model produced, kept for audit display.
    pub raw: JsonValue,
}

/// Parse the free-form text a vision model produced for
/// [`crate::INVOICE_PROMPT`].
///
/// Models occasionally ignore the contract and wrap the object in prose or a
/// markdown fence; anything that does not start with `{` after trimming is
/// rejected outright instead of guessed at.
pub fn parse_model_output(text: &str) -> Result<ExtractionOutcome, ExtractionError> {
    let text = text.trim();

    if !text.starts_with('{') {
        return Err(ExtractionError::NonJsonOutput);
    }

    let raw: JsonValue =
        serde_json::from_str(text).map_err(|e| ExtractionError::ParseFailed(e.to_string()))?;

    let invoice = ExtractedInvoice::from_value(&raw);
    Ok(ExtractionOutcome { invoice, raw })
}
