use std::sync::Arc;

use axum::{
    extract::{Path, Query, Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use super::service::{DashboardError, DashboardService};
use super::table::SubscriberSort;
use crate::export::CSV_MEDIA_TYPE;
use crate::registration::backend::RegistrationBackend;

/// Router builder for the admin dashboard. When `admin_api_key` is set every
/// route requires `Authorization: Bearer <key>`.
pub fn dashboard_router<B>(
    service: Arc<DashboardService<B>>,
    admin_api_key: Option<String>,
) -> Router
where
    B: RegistrationBackend + ?Sized + 'static,
{
    let admin_key: AdminKey = admin_api_key.map(Arc::from);

    Router::new()
        .route("/api/v1/dashboard/events", get(overview_handler::<B>))
        .route("/api/v1/dashboard/search", get(search_handler::<B>))
        .route(
            "/api/v1/dashboard/events/:event_id/subscribers.csv",
            get(export_handler::<B>),
        )
        .route_layer(middleware::from_fn_with_state(admin_key, require_admin))
        .with_state(service)
}

type AdminKey = Option<Arc<str>>;

#[derive(Debug, Deserialize)]
pub(crate) struct SearchQuery {
    #[serde(default)]
    pub(crate) q: String,
}

async fn require_admin(State(admin_key): State<AdminKey>, request: Request, next: Next) -> Response {
    let Some(expected) = admin_key else {
        return next.run(request).await;
    };

    if bearer_token(request.headers()) == Some(&*expected) {
        next.run(request).await
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "admin credentials required" })),
        )
            .into_response()
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
}

pub(crate) async fn overview_handler<B>(
    State(service): State<Arc<DashboardService<B>>>,
) -> Response
where
    B: RegistrationBackend + ?Sized + 'static,
{
    match service.overview().await {
        Ok(events) => (StatusCode::OK, Json(json!({ "events": events }))).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn search_handler<B>(
    State(service): State<Arc<DashboardService<B>>>,
    Query(query): Query<SearchQuery>,
) -> Response
where
    B: RegistrationBackend + ?Sized + 'static,
{
    match service.search(&query.q).await {
        Ok(results) => (StatusCode::OK, Json(json!({ "results": results }))).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn export_handler<B>(
    State(service): State<Arc<DashboardService<B>>>,
    Path(event_id): Path<String>,
    Query(order): Query<SubscriberSort>,
) -> Response
where
    B: RegistrationBackend + ?Sized + 'static,
{
    let today = Utc::now().date_naive();
    match service.export(&event_id, order, today).await {
        Ok(export) => {
            let disposition = content_disposition(&export.filename);
            let mut response = export.payload().into_bytes().into_response();
            let headers = response.headers_mut();
            headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(CSV_MEDIA_TYPE));
            headers.insert(header::CONTENT_DISPOSITION, disposition);
            response
        }
        Err(error) => error_response(error),
    }
}

/// Attachment header with an ASCII fallback name and the exact UTF-8 name.
pub(crate) fn content_disposition(filename: &str) -> HeaderValue {
    let fallback: String = filename
        .chars()
        .map(|ch| {
            if ch.is_ascii_graphic() && ch != '"' && ch != '\\' {
                ch
            } else {
                '_'
            }
        })
        .collect();

    let encoded = urlencoding::encode(filename);

    HeaderValue::from_str(&format!(
        "attachment; filename=\"{fallback}\"; filename*=UTF-8''{encoded}"
    ))
    .unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}

fn error_response(error: DashboardError) -> Response {
    let status = match &error {
        DashboardError::UnknownEvent(_) => StatusCode::NOT_FOUND,
        DashboardError::Backend(backend) => {
            warn!(error = %backend, "dashboard backend call failed");
            StatusCode::BAD_GATEWAY
        }
    };
    (status, Json(json!({ "error": error.to_string() }))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disposition_keeps_ascii_names() {
        let value = content_disposition("paz-financiera-inscritos-2026-02-16.csv");
        assert_eq!(
            value.to_str().expect("ascii header"),
            "attachment; filename=\"paz-financiera-inscritos-2026-02-16.csv\"; filename*=UTF-8''paz-financiera-inscritos-2026-02-16.csv"
        );
    }

    #[test]
    fn disposition_encodes_accented_names() {
        let value = content_disposition("sábado-inscritos-2026-02-16.csv");
        let rendered = value.to_str().expect("ascii header");
        assert!(rendered.contains("filename=\"s_bado-inscritos-2026-02-16.csv\""));
        assert!(rendered.contains("filename*=UTF-8''s%C3%A1bado-inscritos-2026-02-16.csv"));
    }

    #[test]
    fn disposition_encodes_separators_and_spaces() {
        let value = content_disposition("año nuevo;v2.csv");
        let rendered = value.to_str().expect("ascii header");
        assert!(rendered.contains("filename=\"a_o_nuevo;v2.csv\""));
        assert!(rendered.ends_with("filename*=UTF-8''a%C3%B1o%20nuevo%3Bv2.csv"));
    }

    #[test]
    fn bearer_token_is_extracted() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer secret"));
        assert_eq!(bearer_token(&headers), Some("secret"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);
    }
}
