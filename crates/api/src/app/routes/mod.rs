use axum::{routing::get, Router};

pub mod captures;
pub mod items;
pub mod jobs;
pub mod purchase_invoices;
pub mod suppliers;
pub mod system;

/// Router for all authenticated (tenant-scoped) endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .nest("/captures", captures::router())
        .nest("/suppliers", suppliers::router())
        .nest("/items", items::router())
        .nest("/purchase-invoices", purchase_invoices::router())
        .nest("/jobs", jobs::router())
}
