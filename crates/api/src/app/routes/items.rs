use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use forgescan_products::{CatalogItem, CatalogItemId};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::{PrincipalContext, TenantContext};

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_item).get(list_items))
        .route("/:id", get(get_item))
        .route("/:id/archive", post(archive_item))
}

pub async fn create_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::CreateItemRequest>,
) -> axum::response::Response {
    if let Err(e) = crate::authz::require(&tenant, &principal, "items.create") {
        return errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string());
    }

    let item = match CatalogItem::new(tenant.tenant_id(), body.name, body.stock_uom) {
        Ok(item) => item,
        Err(e) => return errors::domain_error_to_response(e),
    };

    let id = item.id();
    services.item_save(item);

    (
        StatusCode::CREATED,
        Json(serde_json::json!({ "id": id.to_string() })),
    )
        .into_response()
}

pub async fn list_items(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
) -> axum::response::Response {
    let items = services
        .items_list(tenant.tenant_id())
        .iter()
        .map(dto::item_to_json)
        .collect::<Vec<_>>();
    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}

pub async fn get_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let item_id: CatalogItemId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid item id"),
    };

    match services.item_get(tenant.tenant_id(), &item_id) {
        Some(item) => (StatusCode::OK, Json(dto::item_to_json(&item))).into_response(),
        None => errors::json_error(StatusCode::NOT_FOUND, "not_found", "item not found"),
    }
}

/// Archive an item; archived items stop matching extracted rows.
pub async fn archive_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(e) = crate::authz::require(&tenant, &principal, "items.archive") {
        return errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string());
    }

    let item_id: CatalogItemId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid item id"),
    };
    let Some(mut item) = services.item_get(tenant.tenant_id(), &item_id) else {
        return errors::json_error(StatusCode::NOT_FOUND, "not_found", "item not found");
    };

    if let Err(e) = item.archive() {
        return errors::domain_error_to_response(e);
    }

    let rendered = dto::item_to_json(&item);
    services.item_save(item);

    (StatusCode::OK, Json(rendered)).into_response()
}
