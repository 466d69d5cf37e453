use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post},
    Json, Router,
};
use base64::prelude::*;

use forgescan_capture::{CaptureId, InvoiceCapture};
use forgescan_infra::{FileStore, FileStoreError, JobStore};
use forgescan_purchasing::PurchaseInvoice;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::{PrincipalContext, TenantContext};

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_capture))
        .route("/:id", get(get_capture).patch(update_capture))
        .route("/:id/image", post(upload_image))
        .route("/:id/items/:index", patch(update_capture_item))
        .route("/:id/extract", post(extract_capture))
        .route("/:id/rematch", post(rematch_capture))
        .route("/:id/purchase-invoice", post(promote_capture))
}

pub async fn create_capture(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    if let Err(e) = crate::authz::require(&tenant, &principal, "captures.create") {
        return errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string());
    }

    let capture = InvoiceCapture::new(tenant.tenant_id());
    let id = capture.id();
    services.capture_save(capture);

    (
        StatusCode::CREATED,
        Json(serde_json::json!({ "id": id.to_string() })),
    )
        .into_response()
}

pub async fn get_capture(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let capture_id: CaptureId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid capture id"),
    };

    match services.capture_get(tenant.tenant_id(), &capture_id) {
        Some(capture) => (StatusCode::OK, Json(dto::capture_to_json(&capture))).into_response(),
        None => errors::json_error(StatusCode::NOT_FOUND, "not_found", "capture not found"),
    }
}

/// Store the uploaded invoice image and attach its key to the capture.
pub async fn upload_image(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::UploadImageRequest>,
) -> axum::response::Response {
    if let Err(e) = crate::authz::require(&tenant, &principal, "captures.upload") {
        return errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string());
    }

    let capture_id: CaptureId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid capture id"),
    };
    let Some(mut capture) = services.capture_get(tenant.tenant_id(), &capture_id) else {
        return errors::json_error(StatusCode::NOT_FOUND, "not_found", "capture not found");
    };

    let bytes = match BASE64_STANDARD.decode(&body.content_base64) {
        Ok(bytes) => bytes,
        Err(_) => {
            return errors::json_error(
                StatusCode::BAD_REQUEST,
                "invalid_base64",
                "content_base64 is not valid base64",
            )
        }
    };

    let key = match services.files().put(tenant.tenant_id(), &body.file_name, bytes) {
        Ok(key) => key,
        Err(FileStoreError::InvalidFileName(msg)) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_file_name", msg)
        }
        Err(FileStoreError::Io(e)) => {
            return errors::json_error(StatusCode::INTERNAL_SERVER_ERROR, "storage_error", e.to_string())
        }
    };

    if let Err(e) = capture.attach_image(&key) {
        return errors::domain_error_to_response(e);
    }
    services.capture_save(capture);

    (
        StatusCode::OK,
        Json(serde_json::json!({ "file_key": key })),
    )
        .into_response()
}

/// Correct header fields manually.
pub async fn update_capture(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateCaptureRequest>,
) -> axum::response::Response {
    if let Err(e) = crate::authz::require(&tenant, &principal, "captures.update") {
        return errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string());
    }

    let capture_id: CaptureId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid capture id"),
    };
    let Some(mut capture) = services.capture_get(tenant.tenant_id(), &capture_id) else {
        return errors::json_error(StatusCode::NOT_FOUND, "not_found", "capture not found");
    };

    if let Err(e) = capture.update_header(
        body.vendor_name,
        body.invoice_no,
        body.invoice_date,
        body.total_amount,
    ) {
        return errors::domain_error_to_response(e);
    }

    let rendered = dto::capture_to_json(&capture);
    services.capture_save(capture);

    (StatusCode::OK, Json(rendered)).into_response()
}

/// Correct one item row manually. `index` addresses the row in list order.
pub async fn update_capture_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path((id, index)): Path<(String, usize)>,
    Json(body): Json<dto::UpdateCaptureItemRequest>,
) -> axum::response::Response {
    if let Err(e) = crate::authz::require(&tenant, &principal, "captures.update") {
        return errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string());
    }

    let capture_id: CaptureId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid capture id"),
    };
    let Some(mut capture) = services.capture_get(tenant.tenant_id(), &capture_id) else {
        return errors::json_error(StatusCode::NOT_FOUND, "not_found", "capture not found");
    };

    if let Err(e) = capture.update_item_row(
        index,
        body.description,
        body.uom,
        body.quantity,
        body.unit_price,
    ) {
        return errors::domain_error_to_response(e);
    }

    let rendered = dto::capture_to_json(&capture);
    services.capture_save(capture);

    (StatusCode::OK, Json(rendered)).into_response()
}

/// Queue the capture for extraction and hand back the job id.
pub async fn extract_capture(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(e) = crate::authz::require(&tenant, &principal, "captures.extract") {
        return errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string());
    }

    let capture_id: CaptureId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid capture id"),
    };
    let Some(mut capture) = services.capture_get(tenant.tenant_id(), &capture_id) else {
        return errors::json_error(StatusCode::NOT_FOUND, "not_found", "capture not found");
    };

    if let Err(e) = capture.mark_queued() {
        return errors::domain_error_to_response(e);
    }
    services.capture_save(capture);

    let job = forgescan_infra::extraction_job(tenant.tenant_id(), capture_id);
    let job_id = match services.jobs().enqueue(job) {
        Ok(id) => id,
        Err(e) => return errors::job_store_error_to_response(e),
    };

    (
        StatusCode::ACCEPTED,
        Json(serde_json::json!({ "job_id": job_id.to_string() })),
    )
        .into_response()
}

/// Re-run supplier/item/uom matching against the current directory and
/// catalog, e.g. after a missing supplier was created.
pub async fn rematch_capture(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(e) = crate::authz::require(&tenant, &principal, "captures.match") {
        return errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string());
    }

    let capture_id: CaptureId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid capture id"),
    };
    let Some(mut capture) = services.capture_get(tenant.tenant_id(), &capture_id) else {
        return errors::json_error(StatusCode::NOT_FOUND, "not_found", "capture not found");
    };

    let verdicts = services.match_capture(&capture);
    if let Err(e) = capture.apply_match_results(verdicts.supplier_status, &verdicts.item_results()) {
        return errors::domain_error_to_response(e);
    }

    let rendered = dto::capture_to_json(&capture);
    services.capture_save(capture);

    (StatusCode::OK, Json(rendered)).into_response()
}

/// Promote a fully matched capture into a purchase invoice.
///
/// Match statuses are recomputed first, so a stale `found` cannot slip
/// through after the directory changed.
pub async fn promote_capture(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(e) = crate::authz::require(&tenant, &principal, "captures.promote") {
        return errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string());
    }

    let capture_id: CaptureId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid capture id"),
    };
    let Some(mut capture) = services.capture_get(tenant.tenant_id(), &capture_id) else {
        return errors::json_error(StatusCode::NOT_FOUND, "not_found", "capture not found");
    };

    let verdicts = services.match_capture(&capture);
    if let Err(e) = capture.apply_match_results(verdicts.supplier_status, &verdicts.item_results()) {
        return errors::domain_error_to_response(e);
    }

    let (supplier_id, item_ids) = match (verdicts.supplier_id, verdicts.resolved_item_ids()) {
        (Some(supplier_id), Some(item_ids)) => (supplier_id, item_ids),
        _ => {
            services.capture_save(capture);
            return errors::json_error(
                StatusCode::UNPROCESSABLE_ENTITY,
                "invariant_violation",
                "supplier and all item rows must be matched",
            );
        }
    };

    let invoice = match PurchaseInvoice::from_capture(supplier_id, &capture, &item_ids) {
        Ok(invoice) => invoice,
        Err(e) => {
            services.capture_save(capture);
            return errors::domain_error_to_response(e);
        }
    };
    services.capture_save(capture);

    let invoice_id = invoice.id();
    services.purchase_invoice_save(invoice);

    (
        StatusCode::CREATED,
        Json(serde_json::json!({ "id": invoice_id.to_string() })),
    )
        .into_response()
}
