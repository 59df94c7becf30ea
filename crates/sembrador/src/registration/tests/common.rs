use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::response::Response;
use chrono::{TimeZone, Utc};
use serde_json::Value;

use crate::registration::backend::{BackendError, RegistrationBackend};
use crate::registration::domain::{
    ConfirmationOutcome, Event, EventWithSubscriptions, RegistrationInput, SubscriptionByToken,
};
use crate::registration::validation::ValidatedRegistration;
use crate::registration::{registration_router, RegistrationService};

pub(super) const TOKEN: &str = "tok-000001";

pub(super) fn input() -> RegistrationInput {
    RegistrationInput {
        name: "Jorge Pérez".to_string(),
        email: "jorge@gmail.com".to_string(),
        phone: "3001234567".to_string(),
        event_id: "evt-paz".to_string(),
        accepts_data_policy: true,
    }
}

fn token_rows() -> Vec<SubscriptionByToken> {
    vec![
        SubscriptionByToken {
            subscription_id: "sub-1".to_string(),
            event_id: "evt-paz".to_string(),
            event_name: "Paz Financiera".to_string(),
            confirmed_at: Some(
                Utc.with_ymd_and_hms(2026, 2, 10, 15, 0, 0)
                    .single()
                    .expect("valid timestamp"),
            ),
        },
        SubscriptionByToken {
            subscription_id: "sub-2".to_string(),
            event_id: "evt-emociones".to_string(),
            event_name: "Emociones y Liderazgo".to_string(),
            confirmed_at: None,
        },
    ]
}

/// Backend double that records created subscriptions and confirmations.
#[derive(Default)]
pub(super) struct MemoryBackend {
    pub(super) created: Mutex<Vec<RegistrationInput>>,
    pub(super) confirmed: Mutex<HashMap<String, Vec<String>>>,
}

#[async_trait]
impl RegistrationBackend for MemoryBackend {
    async fn fetch_events(&self) -> Result<Vec<Event>, BackendError> {
        Ok(vec![
            Event {
                id: "evt-paz".to_string(),
                name: "Paz Financiera".to_string(),
                max_capacity: 200,
                current_count: 50,
            },
            Event {
                id: "evt-emociones".to_string(),
                name: "Emociones y Liderazgo".to_string(),
                max_capacity: 200,
                current_count: 200,
            },
        ])
    }

    async fn create_subscription(
        &self,
        registration: &ValidatedRegistration,
    ) -> Result<(), BackendError> {
        self.created
            .lock()
            .expect("lock")
            .push(registration.input().clone());
        Ok(())
    }

    async fn fetch_subscriptions_by_token(
        &self,
        token: &str,
    ) -> Result<Vec<SubscriptionByToken>, BackendError> {
        if token == TOKEN {
            Ok(token_rows())
        } else {
            Ok(Vec::new())
        }
    }

    async fn confirm_attendance_by_token(
        &self,
        token: &str,
        event_ids: &[String],
    ) -> Result<ConfirmationOutcome, BackendError> {
        if token != TOKEN {
            return Ok(ConfirmationOutcome::NotFound);
        }
        let mut confirmed = self.confirmed.lock().expect("lock");
        let entry = confirmed.entry(token.to_string()).or_default();
        let fresh: Vec<String> = event_ids
            .iter()
            .filter(|id| !entry.contains(id))
            .cloned()
            .collect();
        if fresh.is_empty() {
            return Ok(ConfirmationOutcome::AlreadyConfirmed);
        }
        entry.extend(fresh);
        Ok(ConfirmationOutcome::Confirmed)
    }

    async fn fetch_events_with_subscriptions(
        &self,
    ) -> Result<Vec<EventWithSubscriptions>, BackendError> {
        Ok(Vec::new())
    }
}

/// Backend double whose subscription call always fails with a fixed error.
pub(super) struct RejectingBackend {
    pub(super) code: Option<&'static str>,
    pub(super) message: &'static str,
}

impl RejectingBackend {
    pub(super) fn full() -> Self {
        Self {
            code: Some("P0001"),
            message: "Event capacity exceeded",
        }
    }

    pub(super) fn duplicate() -> Self {
        Self {
            code: Some("23505"),
            message: "duplicate key value violates unique constraint",
        }
    }

    pub(super) fn broken() -> Self {
        Self {
            code: Some("42883"),
            message: "function does not exist",
        }
    }
}

#[async_trait]
impl RegistrationBackend for RejectingBackend {
    async fn fetch_events(&self) -> Result<Vec<Event>, BackendError> {
        Err(BackendError::classify(self.code, self.message))
    }

    async fn create_subscription(
        &self,
        _registration: &ValidatedRegistration,
    ) -> Result<(), BackendError> {
        Err(BackendError::classify(self.code, self.message))
    }

    async fn fetch_subscriptions_by_token(
        &self,
        _token: &str,
    ) -> Result<Vec<SubscriptionByToken>, BackendError> {
        Err(BackendError::classify(self.code, self.message))
    }

    async fn confirm_attendance_by_token(
        &self,
        _token: &str,
        _event_ids: &[String],
    ) -> Result<ConfirmationOutcome, BackendError> {
        Err(BackendError::classify(self.code, self.message))
    }

    async fn fetch_events_with_subscriptions(
        &self,
    ) -> Result<Vec<EventWithSubscriptions>, BackendError> {
        Err(BackendError::classify(self.code, self.message))
    }
}

pub(super) fn memory_service() -> (Arc<RegistrationService<MemoryBackend>>, Arc<MemoryBackend>) {
    let backend = Arc::new(MemoryBackend::default());
    let service = Arc::new(RegistrationService::new(backend.clone()));
    (service, backend)
}

pub(super) fn memory_router() -> (axum::Router, Arc<MemoryBackend>) {
    let (service, backend) = memory_service();
    (registration_router(service), backend)
}

pub(super) fn rejecting_router(backend: RejectingBackend) -> axum::Router {
    registration_router(Arc::new(RegistrationService::new(Arc::new(backend))))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
