use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use forgescan_core::{DomainError, DomainResult, Entity, TenantId};

/// Capture identifier (tenant-scoped via the owning record).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CaptureId(Uuid);

forgescan_core::impl_uuid_newtype!(CaptureId, "CaptureId");

/// Capture status lifecycle.
///
/// `draft → queued → processing → extracted | failed`. Extracted and failed
/// captures can be queued again (repeat extraction is allowed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureStatus {
    Draft,
    Queued,
    Processing,
    Extracted,
    Failed,
}

/// Verdict linking one extracted value to a catalog record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    Pending,
    Found,
    Missing,
}

/// One extracted line item row on the capture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureItem {
    pub description: String,
    pub quantity: f64,
    pub unit_price: f64,
    pub total_price: f64,
    /// Raw unit as extracted; blank means "use the default unit".
    pub uom: String,
    pub item_status: MatchStatus,
    pub uom_status: MatchStatus,
}

/// Field values handed to [`InvoiceCapture::apply_extracted`].
///
/// This is the capture-side view of one model reply: the extraction runner
/// maps whatever its client produced into these plain values.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedFields {
    pub vendor_name: String,
    pub invoice_no: String,
    pub invoice_date: String,
    pub total_amount: f64,
    pub items: Vec<ExtractedItemFields>,
    /// The exact parsed model JSON, retained for audit.
    pub raw: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedItemFields {
    pub description: String,
    pub quantity: f64,
    pub unit_price: f64,
    pub total_price: f64,
}

/// Match verdicts for one item row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemMatchResult {
    pub item_status: MatchStatus,
    pub uom_status: MatchStatus,
}

/// The invoice-capture document.
///
/// One capture tracks one uploaded invoice image through extraction:
/// upload → queue → model call → extracted fields → match statuses.
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceCapture {
    id: CaptureId,
    tenant_id: TenantId,
    upload_file: Option<String>,
    vendor_name: String,
    invoice_no: String,
    invoice_date: String,
    total_amount: f64,
    extracted_data: Option<String>,
    items: Vec<CaptureItem>,
    supplier_status: MatchStatus,
    status: CaptureStatus,
    extraction_error: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl InvoiceCapture {
    pub fn new(tenant_id: TenantId) -> Self {
        let now = Utc::now();
        Self {
            id: CaptureId::new(),
            tenant_id,
            upload_file: None,
            vendor_name: String::new(),
            invoice_no: String::new(),
            invoice_date: String::new(),
            total_amount: 0.0,
            extracted_data: None,
            items: Vec::new(),
            supplier_status: MatchStatus::Pending,
            status: CaptureStatus::Draft,
            extraction_error: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id(&self) -> CaptureId {
        self.id
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    pub fn upload_file(&self) -> Option<&str> {
        self.upload_file.as_deref()
    }

    pub fn vendor_name(&self) -> &str {
        &self.vendor_name
    }

    pub fn invoice_no(&self) -> &str {
        &self.invoice_no
    }

    /// Invoice date as extracted. Free text, never parsed as a date.
    pub fn invoice_date(&self) -> &str {
        &self.invoice_date
    }

    pub fn total_amount(&self) -> f64 {
        self.total_amount
    }

    /// The parsed model JSON, pretty-printed, as applied by the latest
    /// successful extraction.
    pub fn extracted_data(&self) -> Option<&str> {
        self.extracted_data.as_deref()
    }

    pub fn items(&self) -> &[CaptureItem] {
        &self.items
    }

    pub fn supplier_status(&self) -> MatchStatus {
        self.supplier_status
    }

    pub fn status(&self) -> CaptureStatus {
        self.status
    }

    pub fn extraction_error(&self) -> Option<&str> {
        self.extraction_error.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// File-store key of the uploaded image, or the validation error shown
    /// when extraction is attempted without one.
    pub fn require_image(&self) -> DomainResult<&str> {
        self.upload_file
            .as_deref()
            .ok_or_else(|| DomainError::validation("invoice image upload is required"))
    }

    /// Attach (or replace) the uploaded image. Not allowed while an
    /// extraction is queued or running.
    pub fn attach_image(&mut self, file_key: impl Into<String>) -> DomainResult<()> {
        let file_key = file_key.into();
        if file_key.trim().is_empty() {
            return Err(DomainError::validation("file key cannot be empty"));
        }
        self.ensure_not_in_flight()?;
        self.upload_file = Some(file_key);
        self.touch();
        Ok(())
    }

    /// Transition into `queued` ahead of the enqueue call.
    pub fn mark_queued(&mut self) -> DomainResult<()> {
        self.require_image()?;
        self.ensure_not_in_flight()?;
        self.status = CaptureStatus::Queued;
        self.touch();
        Ok(())
    }

    /// Transition into `processing` when the job picks the capture up.
    pub fn mark_processing(&mut self) -> DomainResult<()> {
        if self.status != CaptureStatus::Queued {
            return Err(DomainError::conflict("capture is not queued"));
        }
        self.status = CaptureStatus::Processing;
        self.touch();
        Ok(())
    }

    /// Record an extraction failure. Previously extracted fields are kept.
    pub fn mark_failed(&mut self, error: impl Into<String>) -> DomainResult<()> {
        if !matches!(self.status, CaptureStatus::Queued | CaptureStatus::Processing) {
            return Err(DomainError::conflict("capture is not being processed"));
        }
        self.status = CaptureStatus::Failed;
        self.extraction_error = Some(error.into());
        self.touch();
        Ok(())
    }

    /// Apply one successful extraction.
    ///
    /// Replaces the entire item list and resets all match statuses to
    /// `pending`; the parsed model JSON is retained pretty-printed.
    pub fn apply_extracted(&mut self, fields: ExtractedFields) -> DomainResult<()> {
        if self.status != CaptureStatus::Processing {
            return Err(DomainError::conflict("capture is not being processed"));
        }

        self.vendor_name = fields.vendor_name;
        self.invoice_no = fields.invoice_no;
        self.invoice_date = fields.invoice_date;
        self.total_amount = fields.total_amount;
        self.extracted_data = serde_json::to_string_pretty(&fields.raw).ok();

        self.items = fields
            .items
            .into_iter()
            .map(|row| CaptureItem {
                description: row.description,
                quantity: row.quantity,
                unit_price: row.unit_price,
                total_price: row.total_price,
                uom: String::new(),
                item_status: MatchStatus::Pending,
                uom_status: MatchStatus::Pending,
            })
            .collect();

        self.supplier_status = MatchStatus::Pending;
        self.status = CaptureStatus::Extracted;
        self.extraction_error = None;
        self.touch();
        Ok(())
    }

    /// Apply recomputed match statuses.
    ///
    /// `rows` must cover every item row, in order.
    pub fn apply_match_results(
        &mut self,
        supplier_status: MatchStatus,
        rows: &[ItemMatchResult],
    ) -> DomainResult<()> {
        if self.status != CaptureStatus::Extracted {
            return Err(DomainError::conflict("capture has no extracted data"));
        }
        if rows.len() != self.items.len() {
            return Err(DomainError::invariant(
                "match results must cover every item row",
            ));
        }

        self.supplier_status = supplier_status;
        for (item, result) in self.items.iter_mut().zip(rows) {
            item.item_status = result.item_status;
            item.uom_status = result.uom_status;
        }
        self.touch();
        Ok(())
    }

    /// Correct header fields manually; `None` keeps the existing value.
    ///
    /// Changing the vendor name resets `supplier_status` to `pending` so the
    /// next match run re-evaluates it.
    pub fn update_header(
        &mut self,
        vendor_name: Option<String>,
        invoice_no: Option<String>,
        invoice_date: Option<String>,
        total_amount: Option<f64>,
    ) -> DomainResult<()> {
        self.ensure_not_in_flight()?;

        if let Some(vendor_name) = vendor_name {
            if vendor_name != self.vendor_name {
                self.supplier_status = MatchStatus::Pending;
            }
            self.vendor_name = vendor_name;
        }
        if let Some(invoice_no) = invoice_no {
            self.invoice_no = invoice_no;
        }
        if let Some(invoice_date) = invoice_date {
            self.invoice_date = invoice_date;
        }
        if let Some(total_amount) = total_amount {
            self.total_amount = total_amount;
        }
        self.touch();
        Ok(())
    }

    /// Correct one item row manually; `None` keeps the existing value.
    ///
    /// `index` addresses the row in list order. The row's match statuses
    /// reset to `pending`.
    pub fn update_item_row(
        &mut self,
        index: usize,
        description: Option<String>,
        uom: Option<String>,
        quantity: Option<f64>,
        unit_price: Option<f64>,
    ) -> DomainResult<()> {
        self.ensure_not_in_flight()?;

        let row = self.items.get_mut(index).ok_or(DomainError::NotFound)?;
        if let Some(description) = description {
            row.description = description;
        }
        if let Some(uom) = uom {
            row.uom = uom;
        }
        if let Some(quantity) = quantity {
            row.quantity = quantity;
        }
        if let Some(unit_price) = unit_price {
            row.unit_price = unit_price;
        }
        row.item_status = MatchStatus::Pending;
        row.uom_status = MatchStatus::Pending;
        self.touch();
        Ok(())
    }

    /// Promotion gate: the supplier and every item row must be matched.
    ///
    /// An empty item list passes vacuously; the supplier match alone decides.
    pub fn can_create_purchase_invoice(&self) -> bool {
        self.status == CaptureStatus::Extracted
            && self.supplier_status == MatchStatus::Found
            && self.items.iter().all(|row| {
                row.item_status == MatchStatus::Found && row.uom_status == MatchStatus::Found
            })
    }

    fn ensure_not_in_flight(&self) -> DomainResult<()> {
        match self.status {
            CaptureStatus::Queued => Err(DomainError::conflict("extraction already queued")),
            CaptureStatus::Processing => Err(DomainError::conflict("extraction in progress")),
            _ => Ok(()),
        }
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl Entity for InvoiceCapture {
    type Id = CaptureId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_tenant_id() -> TenantId {
        TenantId::new()
    }

    fn uploaded_capture() -> InvoiceCapture {
        let mut capture = InvoiceCapture::new(test_tenant_id());
        capture.attach_image("files/invoice.jpg").unwrap();
        capture
    }

    fn processing_capture() -> InvoiceCapture {
        let mut capture = uploaded_capture();
        capture.mark_queued().unwrap();
        capture.mark_processing().unwrap();
        capture
    }

    fn two_item_fields() -> ExtractedFields {
        ExtractedFields {
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
                    total_price: 250.5,
                },
            ],
            raw: json!({"vendor_name": "Acme Supplies Ltd", "total_amount": 1450.5}),
        }
    }

    fn all_found(rows: usize) -> Vec<ItemMatchResult> {
        vec![
            ItemMatchResult {
                item_status: MatchStatus::Found,
                uom_status: MatchStatus::Found,
            };
            rows
        ]
    }

    #[test]
    fn new_capture_starts_as_draft_with_defaults() {
        let capture = InvoiceCapture::new(test_tenant_id());
        assert_eq!(capture.status(), CaptureStatus::Draft);
        assert_eq!(capture.vendor_name(), "");
        assert_eq!(capture.total_amount(), 0.0);
        assert_eq!(capture.supplier_status(), MatchStatus::Pending);
        assert!(capture.upload_file().is_none());
        assert!(capture.items().is_empty());
        assert!(capture.extracted_data().is_none());
    }

    #[test]
    fn attach_image_sets_file_key() {
        let mut capture = InvoiceCapture::new(test_tenant_id());
        capture.attach_image("files/invoice.jpg").unwrap();
        assert_eq!(capture.upload_file(), Some("files/invoice.jpg"));
    }

    #[test]
    fn attach_image_rejects_blank_key() {
        let mut capture = InvoiceCapture::new(test_tenant_id());
        let err = capture.attach_image("  ").unwrap_err();
        match err {
            DomainError::Validation(_) => {}
            _ => panic!("Expected Validation error for blank file key"),
        }
    }

    #[test]
    fn attach_image_rejects_in_flight_extraction() {
        let mut capture = uploaded_capture();
        capture.mark_queued().unwrap();

        let err = capture.attach_image("files/other.jpg").unwrap_err();
        match err {
            DomainError::Conflict(_) => {}
            _ => panic!("Expected Conflict error while extraction is queued"),
        }
        assert_eq!(capture.upload_file(), Some("files/invoice.jpg"));
    }

    #[test]
    fn mark_queued_requires_an_image() {
        let mut capture = InvoiceCapture::new(test_tenant_id());
        let err = capture.mark_queued().unwrap_err();
        assert_eq!(
            err,
            DomainError::validation("invoice image upload is required")
        );
        assert_eq!(capture.status(), CaptureStatus::Draft);
    }

    #[test]
    fn mark_queued_rejects_double_queue() {
        let mut capture = uploaded_capture();
        capture.mark_queued().unwrap();

        let err = capture.mark_queued().unwrap_err();
        match err {
            DomainError::Conflict(_) => {}
            _ => panic!("Expected Conflict error for double queue"),
        }
    }

    #[test]
    fn extraction_can_be_repeated_after_success_or_failure() {
        let mut capture = processing_capture();
        capture.apply_extracted(two_item_fields()).unwrap();
        assert_eq!(capture.status(), CaptureStatus::Extracted);

        // Extracted captures can be queued again.
        capture.mark_queued().unwrap();
        capture.mark_processing().unwrap();
        capture.mark_failed("model request timed out").unwrap();
        assert_eq!(capture.status(), CaptureStatus::Failed);

        // So can failed ones.
        capture.mark_queued().unwrap();
        assert_eq!(capture.status(), CaptureStatus::Queued);
    }

    #[test]
    fn mark_processing_requires_queued() {
        let mut capture = uploaded_capture();
        let err = capture.mark_processing().unwrap_err();
        match err {
            DomainError::Conflict(_) => {}
            _ => panic!("Expected Conflict error for processing a non-queued capture"),
        }
    }

    #[test]
    fn mark_failed_records_error_and_keeps_fields() {
        let mut capture = processing_capture();
        capture.apply_extracted(two_item_fields()).unwrap();

        capture.mark_queued().unwrap();
        capture.mark_failed("model returned non-JSON output").unwrap();

        assert_eq!(capture.status(), CaptureStatus::Failed);
        assert_eq!(
            capture.extraction_error(),
            Some("model returned non-JSON output")
        );
        // The previous extraction's fields survive the failure.
        assert_eq!(capture.vendor_name(), "Acme Supplies Ltd");
        assert_eq!(capture.items().len(), 2);
    }

    #[test]
    fn mark_failed_rejects_idle_capture() {
        let mut capture = uploaded_capture();
        let err = capture.mark_failed("boom").unwrap_err();
        match err {
            DomainError::Conflict(_) => {}
            _ => panic!("Expected Conflict error for failing an idle capture"),
        }
    }

    #[test]
    fn apply_extracted_replaces_items_and_resets_statuses() {
        let mut capture = processing_capture();
        capture.apply_extracted(two_item_fields()).unwrap();
        capture.apply_match_results(MatchStatus::Found, &all_found(2)).unwrap();

        // A second extraction rebuilds the list and drops earlier verdicts.
        capture.mark_queued().unwrap();
        capture.mark_processing().unwrap();
        let mut second = two_item_fields();
        second.items.truncate(1);
        second.vendor_name = "Other Vendor".to_string();
        capture.apply_extracted(second).unwrap();

        assert_eq!(capture.status(), CaptureStatus::Extracted);
        assert_eq!(capture.vendor_name(), "Other Vendor");
        assert_eq!(capture.items().len(), 1);
        assert_eq!(capture.supplier_status(), MatchStatus::Pending);
        assert_eq!(capture.items()[0].item_status, MatchStatus::Pending);
        assert_eq!(capture.items()[0].uom_status, MatchStatus::Pending);
        assert_eq!(capture.items()[0].uom, "");
    }

    #[test]
    fn apply_extracted_retains_pretty_printed_raw_json() {
        let mut capture = processing_capture();
        capture.apply_extracted(two_item_fields()).unwrap();

        let retained = capture.extracted_data().expect("raw JSON must be retained");
        assert!(retained.contains("\"vendor_name\": \"Acme Supplies Ltd\""));
        // Pretty printing spans multiple lines.
        assert!(retained.lines().count() > 1);
    }

    #[test]
    fn apply_extracted_clears_previous_error() {
        let mut capture = uploaded_capture();
        capture.mark_queued().unwrap();
        capture.mark_failed("model request timed out").unwrap();

        capture.mark_queued().unwrap();
        capture.mark_processing().unwrap();
        capture.apply_extracted(two_item_fields()).unwrap();

        assert!(capture.extraction_error().is_none());
    }

    #[test]
    fn apply_extracted_requires_processing() {
        let mut capture = uploaded_capture();
        let err = capture.apply_extracted(two_item_fields()).unwrap_err();
        match err {
            DomainError::Conflict(_) => {}
            _ => panic!("Expected Conflict error for applying to an idle capture"),
        }
    }

    #[test]
    fn apply_match_results_sets_statuses() {
        let mut capture = processing_capture();
        capture.apply_extracted(two_item_fields()).unwrap();

        let rows = [
            ItemMatchResult {
                item_status: MatchStatus::Found,
                uom_status: MatchStatus::Found,
            },
            ItemMatchResult {
                item_status: MatchStatus::Missing,
                uom_status: MatchStatus::Found,
            },
        ];
        capture.apply_match_results(MatchStatus::Found, &rows).unwrap();

        assert_eq!(capture.supplier_status(), MatchStatus::Found);
        assert_eq!(capture.items()[0].item_status, MatchStatus::Found);
        assert_eq!(capture.items()[1].item_status, MatchStatus::Missing);
    }

    #[test]
    fn apply_match_results_rejects_arity_mismatch() {
        let mut capture = processing_capture();
        capture.apply_extracted(two_item_fields()).unwrap();

        let err = capture
            .apply_match_results(MatchStatus::Found, &all_found(1))
            .unwrap_err();
        match err {
            DomainError::InvariantViolation(_) => {}
            _ => panic!("Expected InvariantViolation for wrong row count"),
        }
    }

    #[test]
    fn gate_requires_supplier_and_all_rows_found() {
        let mut capture = processing_capture();
        capture.apply_extracted(two_item_fields()).unwrap();
        assert!(!capture.can_create_purchase_invoice());

        capture.apply_match_results(MatchStatus::Found, &all_found(2)).unwrap();
        assert!(capture.can_create_purchase_invoice());

        // One missing item row closes the gate.
        let mut rows = all_found(2);
        rows[1].item_status = MatchStatus::Missing;
        capture.apply_match_results(MatchStatus::Found, &rows).unwrap();
        assert!(!capture.can_create_purchase_invoice());

        // So does an unmatched unit.
        let mut rows = all_found(2);
        rows[0].uom_status = MatchStatus::Missing;
        capture.apply_match_results(MatchStatus::Found, &rows).unwrap();
        assert!(!capture.can_create_purchase_invoice());

        // And a missing supplier.
        capture
            .apply_match_results(MatchStatus::Missing, &all_found(2))
            .unwrap();
        assert!(!capture.can_create_purchase_invoice());
    }

    #[test]
    fn update_header_resets_supplier_status_on_vendor_change() {
        let mut capture = processing_capture();
        capture.apply_extracted(two_item_fields()).unwrap();
        capture.apply_match_results(MatchStatus::Found, &all_found(2)).unwrap();

        capture
            .update_header(Some("Corrected Vendor".to_string()), None, None, None)
            .unwrap();

        assert_eq!(capture.vendor_name(), "Corrected Vendor");
        assert_eq!(capture.supplier_status(), MatchStatus::Pending);
        // Untouched fields keep their values.
        assert_eq!(capture.invoice_no(), "INV-2024-0042");
    }

    #[test]
    fn update_header_keeps_supplier_status_when_vendor_unchanged() {
        let mut capture = processing_capture();
        capture.apply_extracted(two_item_fields()).unwrap();
        capture.apply_match_results(MatchStatus::Found, &all_found(2)).unwrap();

        capture
            .update_header(None, Some("INV-FIXED".to_string()), None, Some(1500.0))
            .unwrap();

        assert_eq!(capture.supplier_status(), MatchStatus::Found);
        assert_eq!(capture.invoice_no(), "INV-FIXED");
        assert_eq!(capture.total_amount(), 1500.0);
    }

    #[test]
    fn update_header_rejects_in_flight_extraction() {
        let mut capture = uploaded_capture();
        capture.mark_queued().unwrap();

        let err = capture
            .update_header(Some("X".to_string()), None, None, None)
            .unwrap_err();
        match err {
            DomainError::Conflict(_) => {}
            _ => panic!("Expected Conflict error while extraction is queued"),
        }
    }

    #[test]
    fn update_item_row_resets_row_statuses() {
        let mut capture = processing_capture();
        capture.apply_extracted(two_item_fields()).unwrap();
        capture.apply_match_results(MatchStatus::Found, &all_found(2)).unwrap();

        capture
            .update_item_row(1, None, Some("Kg".to_string()), Some(2.0), None)
            .unwrap();

        let row = &capture.items()[1];
        assert_eq!(row.uom, "Kg");
        assert_eq!(row.quantity, 2.0);
        assert_eq!(row.item_status, MatchStatus::Pending);
        assert_eq!(row.uom_status, MatchStatus::Pending);
        // The other row keeps its verdicts.
        assert_eq!(capture.items()[0].item_status, MatchStatus::Found);
    }

    #[test]
    fn update_item_row_rejects_unknown_index() {
        let mut capture = processing_capture();
        capture.apply_extracted(two_item_fields()).unwrap();

        let err = capture
            .update_item_row(5, None, None, None, None)
            .unwrap_err();
        assert_eq!(err, DomainError::NotFound);
    }

    #[test]
    fn gate_passes_vacuously_with_no_item_rows() {
        let mut capture = processing_capture();
        let mut fields = two_item_fields();
        fields.items.clear();
        capture.apply_extracted(fields).unwrap();

        capture.apply_match_results(MatchStatus::Found, &[]).unwrap();
        assert!(capture.can_create_purchase_invoice());
    }

    #[test]
    fn gate_is_closed_before_extraction() {
        let capture = uploaded_capture();
        assert!(!capture.can_create_purchase_invoice());
    }
}
