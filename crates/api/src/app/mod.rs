//! HTTP application wiring (Axum router + service construction).
//!
//! Layout:
//! - `services.rs`: config + infrastructure wiring (stores, file storage,
//!   job queue, extraction worker)
//! - `routes/`: HTTP routes and handlers, one file per resource
//! - `dto.rs`: request DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower::ServiceBuilder;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs` and the
/// black-box tests).
///
/// Must be called from within a Tokio runtime: the extraction worker keeps a
/// handle to it for the model HTTP calls.
pub async fn build_app(config: services::ApiConfig) -> Router {
    let jwt = Arc::new(forgescan_auth::Hs256JwtValidator::new(
        config.jwt_secret.clone().into_bytes(),
    ));
    let auth_state = middleware::AuthState { jwt };

    let services = Arc::new(services::build_services(&config));

    // Protected routes: require auth + tenant context.
    let protected = routes::router().layer(
        ServiceBuilder::new()
            .layer(axum::middleware::from_fn_with_state(
                auth_state,
                middleware::auth_middleware,
            ))
            .layer(Extension(services)),
    );

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(protected)
}
