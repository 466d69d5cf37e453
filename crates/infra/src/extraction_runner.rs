//! Invoice-extraction job handler.
//!
//! Runs on the job executor thread: resolve the capture and its uploaded
//! image, call the vision model, apply the extracted fields, recompute match
//! statuses, save. Extraction failures mark the capture `failed` and stop;
//! the job runs once and is never retried automatically.

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info, warn};

use forgescan_capture::{
    CaptureId, ExtractedFields, ExtractedItemFields, InvoiceCapture,
};
use forgescan_core::TenantId;
use forgescan_extraction::{ExtractionOutcome, VisionClient};
use forgescan_parties::Supplier;
use forgescan_products::CatalogItem;

use crate::files::FileStore;
use crate::jobs::{Job, JobExecutor, JobKind, JobResult, JobStore, RetryPolicy};
use crate::matching::match_capture;
use crate::store::TenantStore;

/// Routing key for invoice extraction jobs.
pub const INVOICE_EXTRACTION_JOB: &str = "extraction.invoice";

/// Everything the extraction handler reaches for.
///
/// `runtime` bridges the synchronous executor thread into the async HTTP
/// client; it must belong to a multi-threaded runtime so connection tasks
/// keep running while the handler blocks.
pub struct ExtractionDeps {
    pub captures: Arc<dyn TenantStore<InvoiceCapture>>,
    pub suppliers: Arc<dyn TenantStore<Supplier>>,
    pub items: Arc<dyn TenantStore<CatalogItem>>,
    pub files: Arc<dyn FileStore>,
    pub vision: Arc<dyn VisionClient>,
    pub runtime: tokio::runtime::Handle,
}

/// Build the job that extracts one capture. One attempt, no retry.
pub fn extraction_job(tenant_id: TenantId, capture_id: CaptureId) -> Job {
    Job::new(
        tenant_id,
        JobKind::extraction(INVOICE_EXTRACTION_JOB),
        json!({ "capture_id": capture_id }),
    )
    .with_retry_policy(RetryPolicy::no_retry())
}

/// Register the invoice extraction handler on an executor.
pub fn register_extraction_handler<S: JobStore + 'static>(
    executor: &mut JobExecutor<S>,
    deps: ExtractionDeps,
) {
    executor.register_handler(INVOICE_EXTRACTION_JOB, move |job| run_extraction(&deps, job));
}

fn run_extraction(deps: &ExtractionDeps, job: &Job) -> JobResult {
    let Some(capture_id) = job
        .payload
        .get("capture_id")
        .and_then(|v| serde_json::from_value::<CaptureId>(v.clone()).ok())
    else {
        return JobResult::Failure("job payload is missing capture_id".to_string());
    };

    info!(job_id = %job.id, capture = %capture_id, "invoice extraction started");

    let Some(mut capture) = deps.captures.get(job.tenant_id, &capture_id) else {
        warn!(job_id = %job.id, capture = %capture_id, "capture not found");
        return JobResult::Failure(format!("capture not found: {capture_id}"));
    };

    // Guard and file resolution failures mark the capture failed so it does
    // not sit queued forever.
    let image = match load_image(deps, &capture) {
        Ok(bytes) => bytes,
        Err(error) => return fail_capture(deps, capture, error),
    };

    if let Err(e) = capture.mark_processing() {
        return JobResult::Failure(format!("capture cannot start processing: {e}"));
    }
    deps.captures.save(job.tenant_id, capture.clone());

    let outcome = deps.runtime.block_on(deps.vision.extract_invoice(&image));
    let fields = match outcome {
        Ok(outcome) => extracted_fields(outcome),
        Err(e) => return fail_capture(deps, capture, e.to_string()),
    };

    debug!(
        capture = %capture_id,
        vendor = %fields.vendor_name,
        items = fields.items.len(),
        "model fields parsed"
    );

    if let Err(e) = capture.apply_extracted(fields) {
        return fail_capture(deps, capture, format!("could not apply extracted fields: {e}"));
    }

    let suppliers = deps.suppliers.list(job.tenant_id);
    let items = deps.items.list(job.tenant_id);
    let verdict = match_capture(&capture, &suppliers, &items);
    if let Err(e) = capture.apply_match_results(verdict.supplier_status, &verdict.item_results()) {
        return JobResult::Failure(format!("could not apply match results: {e}"));
    }

    info!(
        capture = %capture_id,
        supplier_status = ?capture.supplier_status(),
        items = capture.items().len(),
        "invoice extraction completed"
    );
    deps.captures.save(job.tenant_id, capture);

    JobResult::Success
}

/// Resolve the capture's uploaded image to bytes.
fn load_image(deps: &ExtractionDeps, capture: &InvoiceCapture) -> Result<Vec<u8>, String> {
    let key = capture.require_image().map_err(|e| e.to_string())?;

    match deps.files.get(capture.tenant_id(), key) {
        Ok(Some(file)) => {
            debug!(
                capture = %capture.id(),
                file_name = %file.file_name,
                bytes = file.bytes.len(),
                "resolved uploaded image"
            );
            Ok(file.bytes)
        }
        Ok(None) => Err(format!("uploaded file not found: {key}")),
        Err(e) => Err(format!("file resolution failed: {e}")),
    }
}

/// Record the failure on the capture (when its state allows) and fail the job.
fn fail_capture(deps: &ExtractionDeps, mut capture: InvoiceCapture, error: String) -> JobResult {
    warn!(capture = %capture.id(), error = %error, "invoice extraction failed");
    if capture.mark_failed(error.clone()).is_ok() {
        deps.captures.save(capture.tenant_id(), capture);
    }
    JobResult::Failure(error)
}

/// Map the client's outcome into the capture's field values.
fn extracted_fields(outcome: ExtractionOutcome) -> ExtractedFields {
    let invoice = outcome.invoice;
    ExtractedFields {
        vendor_name: invoice.vendor_name,
        invoice_no: invoice.invoice_no,
        invoice_date: invoice.invoice_date,
        total_amount: invoice.total_amount,
        items: invoice
            .items
            .into_iter()
            .map(|row| ExtractedItemFields {
                description: row.description,
                quantity: row.quantity,
                unit_price: row.unit_price,
                total_price: row.total_price,
            })
            .collect(),
        raw: outcome.raw,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use forgescan_capture::{CaptureStatus, MatchStatus};
    use forgescan_extraction::{parse_model_output, ExtractionError};
    use forgescan_parties::Supplier;
    use forgescan_products::CatalogItem;

    use crate::files::InMemoryFileStore;
    use crate::store::InMemoryTenantStore;

    struct StubVision {
        reply: Result<ExtractionOutcome, ExtractionError>,
    }

    #[async_trait]
    impl VisionClient for StubVision {
        async fn extract_invoice(
            &self,
            _image: &[u8],
        ) -> Result<ExtractionOutcome, ExtractionError> {
            self.reply.clone()
        }
    }

    struct Harness {
        deps: ExtractionDeps,
        captures: Arc<InMemoryTenantStore<InvoiceCapture>>,
        suppliers: Arc<InMemoryTenantStore<Supplier>>,
        items: Arc<InMemoryTenantStore<CatalogItem>>,
        files: Arc<InMemoryFileStore>,
        _runtime: tokio::runtime::Runtime,
    }

    fn harness(reply: Result<ExtractionOutcome, ExtractionError>) -> Harness {
        let captures = InMemoryTenantStore::<InvoiceCapture>::arc();
        let suppliers = InMemoryTenantStore::<Supplier>::arc();
        let items = InMemoryTenantStore::<CatalogItem>::arc();
        let files = InMemoryFileStore::arc();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();

        let deps = ExtractionDeps {
            captures: captures.clone(),
            suppliers: suppliers.clone(),
            items: items.clone(),
            files: files.clone(),
            vision: Arc::new(StubVision { reply }),
            runtime: runtime.handle().clone(),
        };

        Harness {
            deps,
            captures,
            suppliers,
            items,
            files,
            _runtime: runtime,
        }
    }

    fn model_reply(text: &str) -> Result<ExtractionOutcome, ExtractionError> {
        parse_model_output(text)
    }

    /// Capture with an uploaded image, queued for extraction.
    fn queued_capture(h: &Harness, tenant: TenantId) -> CaptureId {
        let key = h
            .files
            .put(tenant, "invoice.jpg", vec![0xFF, 0xD8, 0xFF, 0xE0])
            .unwrap();

        let mut capture = InvoiceCapture::new(tenant);
        capture.attach_image(key).unwrap();
        capture.mark_queued().unwrap();

        let id = capture.id();
        h.captures.save(tenant, capture);
        id
    }

    #[test]
    fn successful_extraction_applies_fields_and_matches() {
        let h = harness(model_reply(
            r#"{"vendor_name": " ACME Supplies Ltd ", "invoice_no": "INV-42",
                "invoice_date": "2024-03-18", "total_amount": 1200.0,
                "items": [{"description": "Steel brackets", "quantity": 10,
                           "unit_price": 120, "total_price": 1200}]}"#,
        ));
        let tenant = TenantId::new();

        h.suppliers.save(
            tenant,
            Supplier::new(tenant, "Acme Supplies Ltd".to_string(), None).unwrap(),
        );
        h.items.save(
            tenant,
            CatalogItem::new(tenant, "Steel brackets".to_string(), None).unwrap(),
        );

        let capture_id = queued_capture(&h, tenant);
        let job = extraction_job(tenant, capture_id);

        assert!(matches!(run_extraction(&h.deps, &job), JobResult::Success));

        let capture = h.captures.get(tenant, &capture_id).unwrap();
        assert_eq!(capture.status(), CaptureStatus::Extracted);
        assert_eq!(capture.vendor_name(), " ACME Supplies Ltd ");
        assert_eq!(capture.invoice_no(), "INV-42");
        assert_eq!(capture.total_amount(), 1200.0);
        assert_eq!(capture.supplier_status(), MatchStatus::Found);
        assert_eq!(capture.items().len(), 1);
        assert_eq!(capture.items()[0].item_status, MatchStatus::Found);
        assert_eq!(capture.items()[0].uom_status, MatchStatus::Found);
        assert!(capture.extracted_data().unwrap().contains("INV-42"));
    }

    #[test]
    fn unmatched_vendor_and_item_report_missing() {
        let h = harness(model_reply(
            r#"{"vendor_name": "Unknown Vendor", "invoice_no": "", "invoice_date": "",
                "total_amount": 0,
                "items": [{"description": "Mystery part", "quantity": 1,
                           "unit_price": 0, "total_price": 0}]}"#,
        ));
        let tenant = TenantId::new();

        let capture_id = queued_capture(&h, tenant);
        let job = extraction_job(tenant, capture_id);

        assert!(matches!(run_extraction(&h.deps, &job), JobResult::Success));

        let capture = h.captures.get(tenant, &capture_id).unwrap();
        assert_eq!(capture.status(), CaptureStatus::Extracted);
        assert_eq!(capture.supplier_status(), MatchStatus::Missing);
        assert_eq!(capture.items()[0].item_status, MatchStatus::Missing);
    }

    #[test]
    fn model_error_marks_capture_failed() {
        let h = harness(Err(ExtractionError::Timeout));
        let tenant = TenantId::new();

        let capture_id = queued_capture(&h, tenant);
        let job = extraction_job(tenant, capture_id);

        assert!(matches!(run_extraction(&h.deps, &job), JobResult::Failure(_)));

        let capture = h.captures.get(tenant, &capture_id).unwrap();
        assert_eq!(capture.status(), CaptureStatus::Failed);
        assert!(capture.extraction_error().unwrap().contains("timed out"));
    }

    #[test]
    fn non_json_model_output_marks_capture_failed() {
        let h = harness(model_reply("The invoice shows a purchase from Acme."));
        let tenant = TenantId::new();

        let capture_id = queued_capture(&h, tenant);
        let job = extraction_job(tenant, capture_id);

        assert!(matches!(run_extraction(&h.deps, &job), JobResult::Failure(_)));

        let capture = h.captures.get(tenant, &capture_id).unwrap();
        assert_eq!(capture.status(), CaptureStatus::Failed);
        assert_eq!(
            capture.extraction_error(),
            Some("model returned non-JSON output")
        );
    }

    #[test]
    fn missing_stored_file_marks_capture_failed() {
        let h = harness(model_reply("{}"));
        let tenant = TenantId::new();

        // Key attached but no file behind it.
        let mut capture = InvoiceCapture::new(tenant);
        capture.attach_image("0-vanished.jpg").unwrap();
        capture.mark_queued().unwrap();
        let capture_id = capture.id();
        h.captures.save(tenant, capture);

        let job = extraction_job(tenant, capture_id);
        assert!(matches!(run_extraction(&h.deps, &job), JobResult::Failure(_)));

        let capture = h.captures.get(tenant, &capture_id).unwrap();
        assert_eq!(capture.status(), CaptureStatus::Failed);
        assert!(capture
            .extraction_error()
            .unwrap()
            .contains("uploaded file not found"));
    }

    #[test]
    fn capture_without_image_fails_the_job_only() {
        let h = harness(model_reply("{}"));
        let tenant = TenantId::new();

        let capture = InvoiceCapture::new(tenant);
        let capture_id = capture.id();
        h.captures.save(tenant, capture);

        let job = extraction_job(tenant, capture_id);
        assert!(matches!(run_extraction(&h.deps, &job), JobResult::Failure(_)));

        // A draft capture cannot be marked failed; it stays untouched.
        let capture = h.captures.get(tenant, &capture_id).unwrap();
        assert_eq!(capture.status(), CaptureStatus::Draft);
    }

    #[test]
    fn unknown_capture_fails_the_job() {
        let h = harness(model_reply("{}"));
        let tenant = TenantId::new();

        let job = extraction_job(tenant, CaptureId::new());
        match run_extraction(&h.deps, &job) {
            JobResult::Failure(error) => assert!(error.contains("capture not found")),
            other => panic!("Expected Failure, got {other:?}"),
        }
    }

    #[test]
    fn payload_without_capture_id_fails_the_job() {
        let h = harness(model_reply("{}"));
        let tenant = TenantId::new();

        let job = Job::new(
            tenant,
            JobKind::extraction(INVOICE_EXTRACTION_JOB),
            json!({}),
        );
        match run_extraction(&h.deps, &job) {
            JobResult::Failure(error) => assert!(error.contains("capture_id")),
            other => panic!("Expected Failure, got {other:?}"),
        }
    }
}
