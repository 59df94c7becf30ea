use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use super::backend::{BackendError, RegistrationBackend};
use super::domain::RegistrationInput;
use super::service::{RegistrationError, RegistrationService};
use super::validation::validate_registration;

/// Router builder exposing the public subscription and attendance endpoints.
pub fn registration_router<B>(service: Arc<RegistrationService<B>>) -> Router
where
    B: RegistrationBackend + ?Sized + 'static,
{
    Router::new()
        .route("/api/v1/events", get(events_handler::<B>))
        .route("/api/v1/subscriptions", post(register_handler::<B>))
        .route("/api/v1/subscriptions/validate", post(validate_handler))
        .route("/api/v1/attendance/:token", get(attendance_handler::<B>))
        .route(
            "/api/v1/attendance/:token/confirm",
            post(confirm_handler::<B>),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ConfirmAttendanceRequest {
    #[serde(default)]
    pub(crate) event_ids: Vec<String>,
}

pub(crate) async fn events_handler<B>(
    State(service): State<Arc<RegistrationService<B>>>,
) -> Response
where
    B: RegistrationBackend + ?Sized + 'static,
{
    match service.events().await {
        Ok(events) => (StatusCode::OK, Json(json!({ "events": events }))).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn validate_handler(Json(input): Json<RegistrationInput>) -> Response {
    let report = validate_registration(&input);
    (StatusCode::OK, Json(report.view())).into_response()
}

pub(crate) async fn register_handler<B>(
    State(service): State<Arc<RegistrationService<B>>>,
    Json(input): Json<RegistrationInput>,
) -> Response
where
    B: RegistrationBackend + ?Sized + 'static,
{
    match service.register(input).await {
        Ok(registration) => {
            let payload = json!({
                "status": "registered",
                "eventId": registration.input().event_id,
            });
            (StatusCode::CREATED, Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn attendance_handler<B>(
    State(service): State<Arc<RegistrationService<B>>>,
    Path(token): Path<String>,
) -> Response
where
    B: RegistrationBackend + ?Sized + 'static,
{
    match service.attendance(&token).await {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn confirm_handler<B>(
    State(service): State<Arc<RegistrationService<B>>>,
    Path(token): Path<String>,
    Json(request): Json<ConfirmAttendanceRequest>,
) -> Response
where
    B: RegistrationBackend + ?Sized + 'static,
{
    match service
        .confirm_attendance(&token, &request.event_ids)
        .await
    {
        Ok(outcome) => {
            let payload = json!({
                "outcome": outcome,
                "message": outcome.message(),
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) fn error_response(error: RegistrationError) -> Response {
    let status = match &error {
        RegistrationError::Invalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
        RegistrationError::UnknownToken => StatusCode::NOT_FOUND,
        RegistrationError::NothingSelected => StatusCode::BAD_REQUEST,
        RegistrationError::Backend(
            BackendError::CapacityExceeded | BackendError::AlreadySubscribed,
        ) => StatusCode::CONFLICT,
        RegistrationError::Backend(other) => {
            warn!(error = %other, "backend call failed while serving request");
            StatusCode::BAD_GATEWAY
        }
    };

    let mut payload = json!({ "error": error.user_message() });
    if let RegistrationError::Invalid(report) = &error {
        payload["validation"] = json!(report.view());
    }

    (status, Json(payload)).into_response()
}
