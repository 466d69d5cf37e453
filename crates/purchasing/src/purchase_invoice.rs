use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use forgescan_capture::{CaptureId, InvoiceCapture};
use forgescan_core::{DomainError, DomainResult, Entity, TenantId};
use forgescan_parties::SupplierId;
use forgescan_products::{effective_uom, CatalogItemId};

/// Purchase invoice identifier (tenant-scoped via the owning record).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PurchaseInvoiceId(Uuid);

forgescan_core::impl_uuid_newtype!(PurchaseInvoiceId, "PurchaseInvoiceId");

/// Purchase invoice line built from one capture row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseInvoiceLine {
    pub line_no: u32,
    pub item_id: CatalogItemId,
    pub description: String,
    pub uom: String,
    pub quantity: f64,
    pub unit_price: f64,
    /// Line amount: `quantity × unit_price`. The extracted `total_price` is
    /// advisory and stays on the capture.
    pub amount: f64,
}

/// Purchase invoice promoted from a fully matched capture.
#[derive(Debug, Clone, PartialEq)]
pub struct PurchaseInvoice {
    id: PurchaseInvoiceId,
    tenant_id: TenantId,
    supplier_id: SupplierId,
    capture_id: CaptureId,
    bill_no: String,
    bill_date: String,
    lines: Vec<PurchaseInvoiceLine>,
    total_amount: f64,
    created_at: DateTime<Utc>,
}

impl PurchaseInvoice {
    /// Build a purchase invoice from a capture that passed the promotion
    /// gate.
    ///
    /// `item_ids` carries the resolved catalog item per capture row, in row
    /// order.
    pub fn from_capture(
        supplier_id: SupplierId,
        capture: &InvoiceCapture,
        item_ids: &[CatalogItemId],
    ) -> DomainResult<Self> {
        if !capture.can_create_purchase_invoice() {
            return Err(DomainError::invariant(
                "supplier and all item rows must be matched",
            ));
        }
        if capture.items().is_empty() {
            return Err(DomainError::validation(
                "cannot create a purchase invoice without item rows",
            ));
        }
        if item_ids.len() != capture.items().len() {
            return Err(DomainError::invariant(
                "item ids must cover every item row",
            ));
        }

        let mut lines = Vec::with_capacity(capture.items().len());
        for (index, (row, item_id)) in capture.items().iter().zip(item_ids).enumerate() {
            if row.quantity <= 0.0 {
                return Err(DomainError::validation(format!(
                    "row {}: quantity must be positive",
                    index + 1
                )));
            }
            if row.unit_price < 0.0 {
                return Err(DomainError::validation(format!(
                    "row {}: unit price cannot be negative",
                    index + 1
                )));
            }

            lines.push(PurchaseInvoiceLine {
                line_no: (index + 1) as u32,
                item_id: *item_id,
                description: row.description.clone(),
                uom: effective_uom(&row.uom).to_string(),
                quantity: row.quantity,
                unit_price: row.unit_price,
                amount: row.quantity * row.unit_price,
            });
        }

        let total_amount = lines.iter().map(|line| line.amount).sum();

        Ok(Self {
            id: PurchaseInvoiceId::new(),
            tenant_id: capture.tenant_id(),
            supplier_id,
            capture_id: capture.id(),
            bill_no: capture.invoice_no().to_string(),
            bill_date: capture.invoice_date().to_string(),
            lines,
            total_amount,
            created_at: Utc::now(),
        })
    }

    pub fn id(&self) -> PurchaseInvoiceId {
        self.id
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    pub fn supplier_id(&self) -> SupplierId {
        self.supplier_id
    }

    /// Capture this invoice was promoted from (provenance).
    pub fn capture_id(&self) -> CaptureId {
        self.capture_id
    }

    pub fn bill_no(&self) -> &str {
        &self.bill_no
    }

    /// Supplier bill date as extracted. Free text, never parsed as a date.
    pub fn bill_date(&self) -> &str {
        &self.bill_date
    }

    pub fn lines(&self) -> &[PurchaseInvoiceLine] {
        &self.lines
    }

    /// Sum of line amounts.
    pub fn total_amount(&self) -> f64 {
        self.total_amount
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Entity for PurchaseInvoice {
    type Id = PurchaseInvoiceId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forgescan_capture::{ExtractedFields, ExtractedItemFields, ItemMatchResult, MatchStatus};
    use serde_json::json;

    fn matched_capture() -> InvoiceCapture {
        let mut capture = InvoiceCapture::new(TenantId::new());
        capture.attach_image("files/invoice.jpg").unwrap();
        capture.mark_queued().unwrap();
        capture.mark_processing().unwrap();
        capture
            .apply_extracted(ExtractedFields {
                vendor_name: "Acme Supplies Ltd".to_string(),
                invoice_no: "INV-2024-0042".to_string(),
                invoice_date: "2024-03-18".to_string(),
                total_amount: 1450.5,
                items: vec![
                    ExtractedItemFields {
                        description: "Steel brackets".to_string(),
                        quantity: 10.0,
                        unit_price: 120.0,
                        total_price: 1200.0,
                    },
                    ExtractedItemFields {
                        description: "Delivery".to_string(),
                        quantity: 1.0,
                        unit_price: 250.5,
                        total_price: 999.0, // deliberately off; amount must ignore it
                    },
                ],
                raw: json!({"vendor_name": "Acme Supplies Ltd"}),
            })
            .unwrap();
        let found = ItemMatchResult {
            item_status: MatchStatus::Found,
            uom_status: MatchStatus::Found,
        };
        capture
            .apply_match_results(MatchStatus::Found, &[found, found])
            .unwrap();
        capture
    }

    fn two_item_ids() -> Vec<CatalogItemId> {
        vec![CatalogItemId::new(), CatalogItemId::new()]
    }

    #[test]
    fn builds_invoice_from_matched_capture() {
        let capture = matched_capture();
        let supplier_id = SupplierId::new();
        let item_ids = two_item_ids();

        let invoice = PurchaseInvoice::from_capture(supplier_id, &capture, &item_ids).unwrap();

        assert_eq!(invoice.tenant_id(), capture.tenant_id());
        assert_eq!(invoice.supplier_id(), supplier_id);
        assert_eq!(invoice.capture_id(), capture.id());
        assert_eq!(invoice.bill_no(), "INV-2024-0042");
        assert_eq!(invoice.bill_date(), "2024-03-18");
        assert_eq!(invoice.lines().len(), 2);
        assert_eq!(invoice.lines()[0].line_no, 1);
        assert_eq!(invoice.lines()[0].item_id, item_ids[0]);
        assert_eq!(invoice.lines()[0].uom, "Nos");
    }

    #[test]
    fn line_amount_is_quantity_times_unit_price() {
        let capture = matched_capture();
        let invoice =
            PurchaseInvoice::from_capture(SupplierId::new(), &capture, &two_item_ids()).unwrap();

        // Row 2's extracted total_price (999.0) must not leak into the amount.
        assert_eq!(invoice.lines()[0].amount, 1200.0);
        assert_eq!(invoice.lines()[1].amount, 250.5);
        assert_eq!(invoice.total_amount(), 1450.5);
    }

    #[test]
    fn corrected_row_uom_flows_onto_the_line() {
        let mut capture = matched_capture();
        capture
            .update_item_row(0, None, Some("Kg".to_string()), None, None)
            .unwrap();
        let found = ItemMatchResult {
            item_status: MatchStatus::Found,
            uom_status: MatchStatus::Found,
        };
        capture
            .apply_match_results(MatchStatus::Found, &[found, found])
            .unwrap();

        let invoice =
            PurchaseInvoice::from_capture(SupplierId::new(), &capture, &two_item_ids()).unwrap();
        assert_eq!(invoice.lines()[0].uom, "Kg");
    }

    #[test]
    fn rejects_unmatched_capture() {
        let mut capture = matched_capture();
        let missing = ItemMatchResult {
            item_status: MatchStatus::Missing,
            uom_status: MatchStatus::Found,
        };
        let found = ItemMatchResult {
            item_status: MatchStatus::Found,
            uom_status: MatchStatus::Found,
        };
        capture
            .apply_match_results(MatchStatus::Found, &[missing, found])
            .unwrap();

        let err = PurchaseInvoice::from_capture(SupplierId::new(), &capture, &two_item_ids())
            .unwrap_err();
        match err {
            DomainError::InvariantViolation(_) => {}
            _ => panic!("Expected InvariantViolation for unmatched capture"),
        }
    }

    #[test]
    fn rejects_item_id_arity_mismatch() {
        let capture = matched_capture();
        let err = PurchaseInvoice::from_capture(
            SupplierId::new(),
            &capture,
            &[CatalogItemId::new()],
        )
        .unwrap_err();
        match err {
            DomainError::InvariantViolation(_) => {}
            _ => panic!("Expected InvariantViolation for wrong item id count"),
        }
    }

    #[test]
    fn rejects_capture_without_item_rows() {
        let mut capture = InvoiceCapture::new(TenantId::new());
        capture.attach_image("files/invoice.jpg").unwrap();
        capture.mark_queued().unwrap();
        capture.mark_processing().unwrap();
        capture
            .apply_extracted(ExtractedFields {
                vendor_name: "Acme Supplies Ltd".to_string(),
                invoice_no: String::new(),
                invoice_date: String::new(),
                total_amount: 0.0,
                items: vec![],
                raw: json!({}),
            })
            .unwrap();
        capture.apply_match_results(MatchStatus::Found, &[]).unwrap();
        assert!(capture.can_create_purchase_invoice());

        let err = PurchaseInvoice::from_capture(SupplierId::new(), &capture, &[]).unwrap_err();
        match err {
            DomainError::Validation(_) => {}
            _ => panic!("Expected Validation error for empty item list"),
        }
    }

    #[test]
    fn rejects_non_positive_quantity() {
        let mut capture = matched_capture();
        capture.update_item_row(1, None, None, Some(0.0), None).unwrap();
        let found = ItemMatchResult {
            item_status: MatchStatus::Found,
            uom_status: MatchStatus::Found,
        };
        capture
            .apply_match_results(MatchStatus::Found, &[found, found])
            .unwrap();

        let err = PurchaseInvoice::from_capture(SupplierId::new(), &capture, &two_item_ids())
            .unwrap_err();
        match err {
            DomainError::Validation(msg) => assert!(msg.contains("quantity")),
            _ => panic!("Expected Validation error for zero quantity"),
        }
    }

    #[test]
    fn rejects_negative_unit_price() {
        let mut capture = matched_capture();
        capture
            .update_item_row(0, None, None, None, Some(-1.0))
            .unwrap();
        let found = ItemMatchResult {
            item_status: MatchStatus::Found,
            uom_status: MatchStatus::Found,
        };
        capture
            .apply_match_results(MatchStatus::Found, &[found, found])
            .unwrap();

        let err = PurchaseInvoice::from_capture(SupplierId::new(), &capture, &two_item_ids())
            .unwrap_err();
        match err {
            DomainError::Validation(msg) => assert!(msg.contains("unit price")),
            _ => panic!("Expected Validation error for negative unit price"),
        }
    }
}
