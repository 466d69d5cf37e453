use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use forgescan_purchasing::PurchaseInvoiceId;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::TenantContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_purchase_invoices))
        .route("/:id", get(get_purchase_invoice))
}

pub async fn list_purchase_invoices(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
) -> axum::response::Response {
    let items = services
        .purchase_invoices_list(tenant.tenant_id())
        .iter()
        .map(dto::purchase_invoice_to_json)
        .collect::<Vec<_>>();
    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}

pub async fn get_purchase_invoice(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let invoice_id: PurchaseInvoiceId = match id.parse() {
        Ok(v) => v,
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid invoice id")
        }
    };

    match services.purchase_invoice_get(tenant.tenant_id(), &invoice_id) {
        Some(invoice) => {
            (StatusCode::OK, Json(dto::purchase_invoice_to_json(&invoice))).into_response()
        }
        None => errors::json_error(StatusCode::NOT_FOUND, "not_found", "purchase invoice not found"),
    }
}
