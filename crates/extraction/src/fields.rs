use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Structured fields pulled out of one invoice image.
///
/// Every field is best-effort: a key the model omitted (or answered with the
/// wrong type) degrades to `""` / `0` rather than failing the extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedInvoice {
    pub vendor_name: String,
    pub invoice_no: String,
    pub invoice_date: String,
    pub total_amount: f64,
    pub items: Vec<ExtractedLineItem>,
}

/// One line item as reported by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedLineItem {
    pub description: String,
    pub quantity: f64,
    pub unit_price: f64,
    pub total_price: f64,
}

impl ExtractedInvoice {
    /// Lenient mapping from the model's parsed reply.
    ///
    /// Rows in `items` that are not JSON objects are skipped; a missing or
    /// wrong-typed `items` key yields an empty list.
    pub fn from_value(value: &JsonValue) -> Self {
        let items = value
            .get("items")
            .and_then(|v| v.as_array())
            .map(|rows| {
                rows.iter()
                    .filter(|row| row.is_object())
                    .map(ExtractedLineItem::from_value)
                    .collect()
            })
            .unwrap_or_default();

        Self {
            vendor_name: string_field(value, "vendor_name"),
            invoice_no: string_field(value, "invoice_no"),
            invoice_date: string_field(value, "invoice_date"),
            total_amount: number_field(value, "total_amount"),
            items,
        }
    }
}

impl ExtractedLineItem {
    fn from_value(row: &JsonValue) -> Self {
        Self {
            description: string_field(row, "description"),
            quantity: number_field(row, "quantity"),
            unit_price: number_field(row, "unit_price"),
            total_price: number_field(row, "total_price"),
        }
    }
}

fn string_field(obj: &JsonValue, key: &str) -> String {
    obj.get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

/// Numbers sometimes come back quoted; accept either form.
fn number_field(obj: &JsonValue, key: &str) -> f64 {
    obj.get(key)
        .and_then(|v| {
            v.as_f64()
                .or_else(|| v.as_str().and_then(|s| s.trim().parse::<f64>().ok()))
        })
        .unwrap_or(0.0)
}
