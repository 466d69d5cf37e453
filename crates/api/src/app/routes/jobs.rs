use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};

use forgescan_infra::{JobId, JobStatus, JobStore};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::{PrincipalContext, TenantContext};

/// How many dead letters one listing returns at most.
const DEAD_LETTER_PAGE: usize = 100;

pub fn router() -> Router {
    Router::new()
        .route("/stats", get(job_stats))
        .route("/dead-letters", get(list_dead_letters))
        .route("/dead-letters/:id/retry", post(retry_dead_letter))
        .route("/dead-letters/:id", delete(delete_dead_letter))
        .route("/:id", get(get_job))
        .route("/:id/cancel", post(cancel_job))
}

/// Look a job up by id, falling back to the dead-letter queue so an
/// exhausted job stays visible under the id the client was handed.
pub async fn get_job(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let job_id: JobId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid job id"),
    };

    match services.jobs().get(tenant.tenant_id(), job_id) {
        Ok(Some(job)) => (StatusCode::OK, Json(dto::job_to_json(&job))).into_response(),
        Ok(None) => match services.jobs().get_dead_letter(tenant.tenant_id(), job_id) {
            Ok(Some(entry)) => (StatusCode::OK, Json(dto::job_to_json(&entry.job))).into_response(),
            Ok(None) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "job not found"),
            Err(e) => errors::job_store_error_to_response(e),
        },
        Err(e) => errors::job_store_error_to_response(e),
    }
}

pub async fn job_stats(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
) -> axum::response::Response {
    match services.jobs().stats(tenant.tenant_id()) {
        Ok(stats) => (StatusCode::OK, Json(stats)).into_response(),
        Err(e) => errors::job_store_error_to_response(e),
    }
}

pub async fn list_dead_letters(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
) -> axum::response::Response {
    match services
        .jobs()
        .list_dead_letters(tenant.tenant_id(), DEAD_LETTER_PAGE)
    {
        Ok(entries) => {
            let items = entries.iter().map(dto::dead_letter_to_json).collect::<Vec<_>>();
            (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
        }
        Err(e) => errors::job_store_error_to_response(e),
    }
}

/// Move a dead-lettered job back to the pending queue with a fresh attempt
/// budget.
pub async fn retry_dead_letter(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(e) = crate::authz::require(&tenant, &principal, "jobs.retry") {
        return errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string());
    }

    let job_id: JobId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid job id"),
    };

    match services.jobs().retry_dead_letter(tenant.tenant_id(), job_id) {
        Ok(job) => (StatusCode::OK, Json(dto::job_to_json(&job))).into_response(),
        Err(e) => errors::job_store_error_to_response(e),
    }
}

pub async fn delete_dead_letter(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(e) = crate::authz::require(&tenant, &principal, "jobs.delete") {
        return errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string());
    }

    let job_id: JobId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid job id"),
    };

    match services.jobs().delete_dead_letter(tenant.tenant_id(), job_id) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::job_store_error_to_response(e),
    }
}

/// Cancel a job that has not started yet. Running and finished jobs are left
/// alone.
pub async fn cancel_job(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(e) = crate::authz::require(&tenant, &principal, "jobs.cancel") {
        return errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string());
    }

    let job_id: JobId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid job id"),
    };

    let mut job = match services.jobs().get(tenant.tenant_id(), job_id) {
        Ok(Some(job)) => job,
        Ok(None) => return errors::json_error(StatusCode::NOT_FOUND, "not_found", "job not found"),
        Err(e) => return errors::job_store_error_to_response(e),
    };

    if !matches!(job.status, JobStatus::Pending) {
        return errors::json_error(
            StatusCode::CONFLICT,
            "conflict",
            "only pending jobs can be cancelled",
        );
    }

    job.mark_cancelled();
    if let Err(e) = services.jobs().update(&job) {
        return errors::job_store_error_to_response(e);
    }

    (StatusCode::OK, Json(dto::job_to_json(&job))).into_response()
}
