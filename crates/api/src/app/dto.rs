use serde::Deserialize;

use forgescan_capture::{CaptureItem, InvoiceCapture, MatchStatus};
use forgescan_infra::{DeadLetterEntry, Job, JobStatus};
use forgescan_parties::{ContactInfo, Supplier};
use forgescan_products::CatalogItem;
use forgescan_purchasing::PurchaseInvoice;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct UploadImageRequest {
    pub file_name: String,
    /// Raw image bytes, standard base64.
    pub content_base64: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCaptureRequest {
    pub vendor_name: Option<String>,
    pub invoice_no: Option<String>,
    pub invoice_date: Option<String>,
    pub total_amount: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCaptureItemRequest {
    pub description: Option<String>,
    pub uom: Option<String>,
    pub quantity: Option<f64>,
    pub unit_price: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct CreateSupplierRequest {
    pub name: String,
    pub contact: Option<ContactInfo>,
}

#[derive(Debug, Deserialize)]
pub struct SuspendSupplierRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateItemRequest {
    pub name: String,
    pub stock_uom: Option<String>,
}

// -------------------------
// JSON mapping helpers
// -------------------------

pub fn capture_to_json(capture: &InvoiceCapture) -> serde_json::Value {
    serde_json::json!({
        "id": capture.id().to_string(),
        "status": status_label(capture.status()),
        "upload_file": capture.upload_file(),
        "vendor_name": capture.vendor_name(),
        "invoice_no": capture.invoice_no(),
        "invoice_date": capture.invoice_date(),
        "total_amount": capture.total_amount(),
        "supplier_status": match_label(capture.supplier_status()),
        "items": capture.items().iter().map(capture_item_to_json).collect::<Vec<_>>(),
        "extracted_data": capture.extracted_data(),
        "extraction_error": capture.extraction_error(),
        "created_at": capture.created_at().to_rfc3339(),
        "updated_at": capture.updated_at().to_rfc3339(),
    })
}

fn capture_item_to_json(item: &CaptureItem) -> serde_json::Value {
    serde_json::json!({
        "description": item.description,
        "uom": item.uom,
        "quantity": item.quantity,
        "unit_price": item.unit_price,
        "total_price": item.total_price,
        "item_status": match_label(item.item_status),
        "uom_status": match_label(item.uom_status),
    })
}

pub fn supplier_to_json(supplier: &Supplier) -> serde_json::Value {
    serde_json::json!({
        "id": supplier.id().to_string(),
        "name": supplier.name(),
        "contact": {
            "email": supplier.contact().email,
            "phone": supplier.contact().phone,
            "address": supplier.contact().address,
        },
        "status": format!("{:?}", supplier.status()).to_lowercase(),
        "suspended_reason": supplier.suspended_reason(),
    })
}

pub fn item_to_json(item: &CatalogItem) -> serde_json::Value {
    serde_json::json!({
        "id": item.id().to_string(),
        "name": item.name(),
        "stock_uom": item.stock_uom(),
        "status": format!("{:?}", item.status()).to_lowercase(),
    })
}

pub fn purchase_invoice_to_json(invoice: &PurchaseInvoice) -> serde_json::Value {
    serde_json::json!({
        "id": invoice.id().to_string(),
        "supplier_id": invoice.supplier_id().to_string(),
        "capture_id": invoice.capture_id().to_string(),
        "bill_no": invoice.bill_no(),
        "bill_date": invoice.bill_date(),
        "total_amount": invoice.total_amount(),
        "lines": invoice.lines().iter().map(|line| serde_json::json!({
            "line_no": line.line_no,
            "item_id": line.item_id.to_string(),
            "description": line.description,
            "uom": line.uom,
            "quantity": line.quantity,
            "unit_price": line.unit_price,
            "amount": line.amount,
        })).collect::<Vec<_>>(),
        "created_at": invoice.created_at().to_rfc3339(),
    })
}

pub fn job_to_json(job: &Job) -> serde_json::Value {
    let (status, error) = match &job.status {
        JobStatus::Pending => ("pending", None),
        JobStatus::Running => ("running", None),
        JobStatus::Completed => ("completed", None),
        JobStatus::Failed { error, .. } => ("failed", Some(error.clone())),
        JobStatus::DeadLettered { error, .. } => ("dead_lettered", Some(error.clone())),
        JobStatus::Cancelled => ("cancelled", None),
    };

    serde_json::json!({
        "id": job.id.to_string(),
        "kind": job.kind.type_name(),
        "status": status,
        "error": error,
        "attempt": job.attempt,
        "created_at": job.created_at.to_rfc3339(),
        "updated_at": job.updated_at.to_rfc3339(),
        "scheduled_at": job.scheduled_at.map(|t| t.to_rfc3339()),
    })
}

pub fn dead_letter_to_json(entry: &DeadLetterEntry) -> serde_json::Value {
    serde_json::json!({
        "job": job_to_json(&entry.job),
        "reason": entry.reason,
        "dead_lettered_at": entry.dead_lettered_at.to_rfc3339(),
    })
}

fn status_label(status: forgescan_capture::CaptureStatus) -> String {
    format!("{status:?}").to_lowercase()
}

fn match_label(status: MatchStatus) -> String {
    format!("{status:?}").to_lowercase()
}
