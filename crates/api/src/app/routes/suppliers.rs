use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use forgescan_parties::{Supplier, SupplierId};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::{PrincipalContext, TenantContext};

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_supplier).get(list_suppliers))
        .route("/:id", get(get_supplier))
        .route("/:id/suspend", post(suspend_supplier))
}

pub async fn create_supplier(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::CreateSupplierRequest>,
) -> axum::response::Response {
    if let Err(e) = crate::authz::require(&tenant, &principal, "suppliers.create") {
        return errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string());
    }

    let supplier = match Supplier::new(tenant.tenant_id(), body.name, body.contact) {
        Ok(supplier) => supplier,
        Err(e) => return errors::domain_error_to_response(e),
    };

    let id = supplier.id();
    services.supplier_save(supplier);

    (
        StatusCode::CREATED,
        Json(serde_json::json!({ "id": id.to_string() })),
    )
        .into_response()
}

pub async fn list_suppliers(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
) -> axum::response::Response {
    let items = services
        .suppliers_list(tenant.tenant_id())
        .iter()
        .map(dto::supplier_to_json)
        .collect::<Vec<_>>();
    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}

pub async fn get_supplier(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let supplier_id: SupplierId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid supplier id"),
    };

    match services.supplier_get(tenant.tenant_id(), &supplier_id) {
        Some(supplier) => (StatusCode::OK, Json(dto::supplier_to_json(&supplier))).into_response(),
        None => errors::json_error(StatusCode::NOT_FOUND, "not_found", "supplier not found"),
    }
}

/// Suspend a supplier; suspended suppliers stop matching extracted vendors.
pub async fn suspend_supplier(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::SuspendSupplierRequest>,
) -> axum::response::Response {
    if let Err(e) = crate::authz::require(&tenant, &principal, "suppliers.suspend") {
        return errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string());
    }

    let supplier_id: SupplierId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid supplier id"),
    };
    let Some(mut supplier) = services.supplier_get(tenant.tenant_id(), &supplier_id) else {
        return errors::json_error(StatusCode::NOT_FOUND, "not_found", "supplier not found");
    };

    if let Err(e) = supplier.suspend(body.reason) {
        return errors::domain_error_to_response(e);
    }

    let rendered = dto::supplier_to_json(&supplier);
    services.supplier_save(supplier);

    (StatusCode::OK, Json(rendered)).into_response()
}
