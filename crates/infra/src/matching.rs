//! Catalog matching for extracted invoice fields.
//!
//! Statuses are recomputed after extraction, on demand, and again before a
//! capture is promoted. Name comparisons trim and lowercase both sides; only
//! active records participate.

use forgescan_capture::{InvoiceCapture, ItemMatchResult, MatchStatus};
use forgescan_parties::{Supplier, SupplierId};
use forgescan_products::{effective_uom, is_standard_uom, CatalogItem, CatalogItemId};

/// Match verdicts for one capture, with the resolved record ids.
#[derive(Debug, Clone)]
pub struct CaptureMatch {
    pub supplier_status: MatchStatus,
    pub supplier_id: Option<SupplierId>,
    pub rows: Vec<RowMatch>,
}

/// Match verdict for one item row.
#[derive(Debug, Clone, Copy)]
pub struct RowMatch {
    pub item_status: MatchStatus,
    pub uom_status: MatchStatus,
    pub item_id: Option<CatalogItemId>,
}

impl CaptureMatch {
    /// Row verdicts in the shape [`InvoiceCapture::apply_match_results`] takes.
    pub fn item_results(&self) -> Vec<ItemMatchResult> {
        self.rows
            .iter()
            .map(|row| ItemMatchResult {
                item_status: row.item_status,
                uom_status: row.uom_status,
            })
            .collect()
    }

    /// Item ids for promotion, in row order; `None` unless every row resolved.
    pub fn resolved_item_ids(&self) -> Option<Vec<CatalogItemId>> {
        self.rows.iter().map(|row| row.item_id).collect()
    }
}

/// Compute match statuses for a capture against the supplier directory and
/// the item catalog.
pub fn match_capture(
    capture: &InvoiceCapture,
    suppliers: &[Supplier],
    items: &[CatalogItem],
) -> CaptureMatch {
    let supplier = find_supplier(capture.vendor_name(), suppliers);

    let rows = capture
        .items()
        .iter()
        .map(|row| {
            let item = find_item(&row.description, items);
            RowMatch {
                item_status: found_or_missing(item.is_some()),
                uom_status: found_or_missing(is_standard_uom(effective_uom(&row.uom))),
                item_id: item.map(|i| i.id()),
            }
        })
        .collect();

    CaptureMatch {
        supplier_status: found_or_missing(supplier.is_some()),
        supplier_id: supplier.map(|s| s.id()),
        rows,
    }
}

fn find_supplier<'a>(vendor_name: &str, suppliers: &'a [Supplier]) -> Option<&'a Supplier> {
    let wanted = normalized(vendor_name);
    if wanted.is_empty() {
        return None;
    }
    suppliers
        .iter()
        .find(|s| s.can_transact() && normalized(s.name()) == wanted)
}

fn find_item<'a>(description: &str, items: &'a [CatalogItem]) -> Option<&'a CatalogItem> {
    let wanted = normalized(description);
    if wanted.is_empty() {
        return None;
    }
    items
        .iter()
        .find(|i| i.can_match() && normalized(i.name()) == wanted)
}

fn found_or_missing(found: bool) -> MatchStatus {
    if found {
        MatchStatus::Found
    } else {
        MatchStatus::Missing
    }
}

fn normalized(s: &str) -> String {
    s.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use forgescan_capture::{ExtractedFields, ExtractedItemFields};
    use forgescan_core::TenantId;

    fn tenant() -> TenantId {
        TenantId::new()
    }

    fn supplier(name: &str) -> Supplier {
        Supplier::new(tenant(), name.to_string(), None).unwrap()
    }

    fn item(name: &str) -> CatalogItem {
        CatalogItem::new(tenant(), name.to_string(), None).unwrap()
    }

    fn extracted_capture(vendor: &str, descriptions: &[&str]) -> InvoiceCapture {
        let mut capture = InvoiceCapture::new(tenant());
        capture.attach_image("files/invoice.jpg").unwrap();
        capture.mark_queued().unwrap();
        capture.mark_processing().unwrap();
        capture
            .apply_extracted(ExtractedFields {
                vendor_name: vendor.to_string(),
                invoice_no: "INV-1".to_string(),
                invoice_date: "2024-03-18".to_string(),
                total_amount: 100.0,
                items: descriptions
                    .iter()
                    .map(|d| ExtractedItemFields {
                        description: d.to_string(),
                        quantity: 1.0,
                        unit_price: 1.0,
                        total_price: 1.0,
                    })
                    .collect(),
                raw: serde_json::json!({}),
            })
            .unwrap();
        capture
    }

    #[test]
    fn supplier_match_trims_and_ignores_case() {
        let directory = vec![supplier("Acme Supplies Ltd")];
        let capture = extracted_capture("  ACME supplies ltd ", &[]);

        let verdict = match_capture(&capture, &directory, &[]);
        assert_eq!(verdict.supplier_status, MatchStatus::Found);
        assert_eq!(verdict.supplier_id, Some(directory[0].id()));
    }

    #[test]
    fn empty_vendor_is_missing() {
        let directory = vec![supplier("Acme Supplies Ltd")];
        let capture = extracted_capture("   ", &[]);

        let verdict = match_capture(&capture, &directory, &[]);
        assert_eq!(verdict.supplier_status, MatchStatus::Missing);
        assert!(verdict.supplier_id.is_none());
    }

    #[test]
    fn suspended_supplier_does_not_match() {
        let mut vendor = supplier("Acme Supplies Ltd");
        vendor.suspend(None).unwrap();
        let capture = extracted_capture("Acme Supplies Ltd", &[]);

        let verdict = match_capture(&capture, &[vendor], &[]);
        assert_eq!(verdict.supplier_status, MatchStatus::Missing);
    }

    #[test]
    fn item_rows_match_by_description() {
        let catalog = vec![item("Steel brackets")];
        let capture = extracted_capture("Acme", &["steel brackets", "Unknown thing"]);

        let verdict = match_capture(&capture, &[], &catalog);
        assert_eq!(verdict.rows.len(), 2);
        assert_eq!(verdict.rows[0].item_status, MatchStatus::Found);
        assert_eq!(verdict.rows[0].item_id, Some(catalog[0].id()));
        assert_eq!(verdict.rows[1].item_status, MatchStatus::Missing);
        assert!(verdict.rows[1].item_id.is_none());
    }

    #[test]
    fn archived_item_does_not_match() {
        let mut archived = item("Steel brackets");
        archived.archive().unwrap();
        let capture = extracted_capture("Acme", &["Steel brackets"]);

        let verdict = match_capture(&capture, &[], &[archived]);
        assert_eq!(verdict.rows[0].item_status, MatchStatus::Missing);
    }

    #[test]
    fn blank_uom_falls_back_to_the_default_unit() {
        // apply_extracted leaves every row's uom blank.
        let capture = extracted_capture("Acme", &["Steel brackets"]);

        let verdict = match_capture(&capture, &[], &[]);
        assert_eq!(verdict.rows[0].uom_status, MatchStatus::Found);
    }

    #[test]
    fn uom_is_checked_against_the_standard_set() {
        let mut capture = extracted_capture("Acme", &["Steel brackets", "Gravel"]);
        capture
            .update_item_row(0, None, Some("kg".to_string()), None, None)
            .unwrap();
        capture
            .update_item_row(1, None, Some("Bundle".to_string()), None, None)
            .unwrap();

        let verdict = match_capture(&capture, &[], &[]);
        assert_eq!(verdict.rows[0].uom_status, MatchStatus::Found);
        assert_eq!(verdict.rows[1].uom_status, MatchStatus::Missing);
    }

    #[test]
    fn resolved_item_ids_requires_every_row() {
        let catalog = vec![item("Steel brackets"), item("Gravel")];

        let complete = extracted_capture("Acme", &["Steel brackets", "Gravel"]);
        let verdict = match_capture(&complete, &[], &catalog);
        let ids = verdict.resolved_item_ids().unwrap();
        assert_eq!(ids, vec![catalog[0].id(), catalog[1].id()]);

        let partial = extracted_capture("Acme", &["Steel brackets", "Sand"]);
        let verdict = match_capture(&partial, &[], &catalog);
        assert!(verdict.resolved_item_ids().is_none());
    }

    #[test]
    fn verdicts_feed_apply_match_results() {
        let directory = vec![supplier("Acme")];
        let catalog = vec![item("Steel brackets")];
        let mut capture = extracted_capture("Acme", &["Steel brackets"]);

        let verdict = match_capture(&capture, &directory, &catalog);
        capture
            .apply_match_results(verdict.supplier_status, &verdict.item_results())
            .unwrap();

        assert!(capture.can_create_purchase_invoice());
    }
}
