use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use sembrador::dashboard::{dashboard_router, DashboardService};
use sembrador::registration::{registration_router, RegistrationBackend, RegistrationService};
use serde_json::json;
use std::sync::Arc;

/// Public registration routes, the admin dashboard, and the operational probes.
pub(crate) fn with_service_routes(
    backend: Arc<dyn RegistrationBackend>,
    admin_api_key: Option<String>,
) -> axum::Router {
    let registrations = Arc::new(RegistrationService::new(backend.clone()));
    let dashboard = Arc::new(DashboardService::new(backend));

    registration_router(registrations)
        .merge(dashboard_router(dashboard, admin_api_key))
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
