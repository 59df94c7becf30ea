use std::sync::Arc;

use super::common::*;
use crate::registration::backend::BackendError;
use crate::registration::domain::ConfirmationOutcome;
use crate::registration::validation::Field;
use crate::registration::{RegistrationError, RegistrationService};

#[tokio::test]
async fn register_forwards_valid_forms_to_backend() {
    let (service, backend) = memory_service();

    let registration = service.register(input()).await.expect("registered");

    assert_eq!(registration.input().event_id, "evt-paz");
    let created = backend.created.lock().expect("lock");
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].email, "jorge@gmail.com");
}

#[tokio::test]
async fn register_never_calls_backend_for_invalid_forms() {
    let (service, backend) = memory_service();
    let mut form = input();
    form.email = "maria@yopmail.com".to_string();

    let error = service.register(form).await.expect_err("rejected");

    match error {
        RegistrationError::Invalid(report) => {
            assert_eq!(report.invalid_fields().collect::<Vec<_>>(), [Field::Email]);
        }
        other => panic!("expected validation failure, got {other:?}"),
    }
    assert!(backend.created.lock().expect("lock").is_empty());
}

#[tokio::test]
async fn capacity_and_duplicate_failures_are_distinguishable() {
    let full = RegistrationService::new(Arc::new(RejectingBackend::full()));
    let error = full.register(input()).await.expect_err("full");
    assert!(matches!(
        error,
        RegistrationError::Backend(BackendError::CapacityExceeded)
    ));
    assert_eq!(error.user_message(), "Este evento ya alcanzó su capacidad máxima");

    let duplicate = RegistrationService::new(Arc::new(RejectingBackend::duplicate()));
    let error = duplicate.register(input()).await.expect_err("duplicate");
    assert!(matches!(
        error,
        RegistrationError::Backend(BackendError::AlreadySubscribed)
    ));
    assert_eq!(error.user_message(), "Ya estás inscrito en este evento");
}

#[tokio::test]
async fn attendance_preselects_unconfirmed_events() {
    let (service, _) = memory_service();

    let view = service.attendance(TOKEN).await.expect("view");

    assert_eq!(view.subscriptions.len(), 2);
    assert!(!view.all_confirmed);
    assert_eq!(view.preselected_event_ids, ["evt-emociones"]);
}

#[tokio::test]
async fn attendance_for_unknown_or_blank_token_is_rejected() {
    let (service, _) = memory_service();

    assert!(matches!(
        service.attendance("tok-999999").await,
        Err(RegistrationError::UnknownToken)
    ));
    assert!(matches!(
        service.attendance("   ").await,
        Err(RegistrationError::UnknownToken)
    ));
}

#[tokio::test]
async fn confirming_twice_reports_already_confirmed() {
    let (service, _) = memory_service();
    let selection = vec!["evt-emociones".to_string()];

    let first = service
        .confirm_attendance(TOKEN, &selection)
        .await
        .expect("first");
    let second = service
        .confirm_attendance(TOKEN, &selection)
        .await
        .expect("second");

    assert_eq!(first, ConfirmationOutcome::Confirmed);
    assert_eq!(second, ConfirmationOutcome::AlreadyConfirmed);
}

#[tokio::test]
async fn confirming_requires_a_selection() {
    let (service, _) = memory_service();
    assert!(matches!(
        service.confirm_attendance(TOKEN, &[]).await,
        Err(RegistrationError::NothingSelected)
    ));
}

#[tokio::test]
async fn confirming_with_unknown_token_is_rejected() {
    let (service, backend) = memory_service();
    let result = service
        .confirm_attendance("tok-123456", &["evt-paz".to_string()])
        .await;
    assert!(matches!(result, Err(RegistrationError::UnknownToken)));
    assert!(backend.confirmed.lock().expect("lock").is_empty());
}

#[tokio::test]
async fn only_unconfirmed_events_of_the_token_are_sent() {
    let (service, backend) = memory_service();
    let selection = vec![
        "evt-paz".to_string(),
        "evt-emociones".to_string(),
        "evt-ajeno".to_string(),
        "evt-emociones".to_string(),
    ];

    let outcome = service
        .confirm_attendance(TOKEN, &selection)
        .await
        .expect("outcome");

    assert_eq!(outcome, ConfirmationOutcome::Confirmed);
    assert_eq!(outcome.message(), "¡Asistencia confirmada!");
    let confirmed = backend.confirmed.lock().expect("lock");
    assert_eq!(confirmed[TOKEN], ["evt-emociones"]);
}

#[tokio::test]
async fn selecting_only_confirmed_events_is_nothing_to_confirm() {
    let (service, backend) = memory_service();
    let result = service
        .confirm_attendance(TOKEN, &["evt-paz".to_string()])
        .await;
    assert!(matches!(result, Err(RegistrationError::NothingSelected)));
    assert!(backend.confirmed.lock().expect("lock").is_empty());
}
