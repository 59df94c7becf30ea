use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use sembrador::config::{AppConfig, AppEnvironment, ConfigError};
use sembrador::error::AppError;
use sembrador::registration::{
    BackendError, ConfirmationOutcome, Event, EventWithSubscriptions, RegistrationBackend,
    Subscription, SubscriptionByToken, SupabaseBackend, ValidatedRegistration,
};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{info, warn};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Hosted backend when a project is configured, otherwise a seeded local store.
/// The local store is for development only and is refused in production.
pub(crate) fn build_backend(config: &AppConfig) -> Result<Arc<dyn RegistrationBackend>, AppError> {
    match &config.backend.project {
        Some(project) => {
            info!(url = %project.url, "using hosted registration backend");
            Ok(Arc::new(SupabaseBackend::new(project, config.backend.timeout)?))
        }
        None if config.environment == AppEnvironment::Production => {
            Err(ConfigError::MissingBackendUrl.into())
        }
        None => {
            warn!("SUPABASE_URL not set; registrations are kept in memory only");
            Ok(Arc::new(InMemoryRegistrationBackend::seeded()))
        }
    }
}

const SEED_CAPACITY: u32 = 200;

#[derive(Default)]
struct Store {
    events: Vec<Event>,
    subscriptions: Vec<Subscription>,
    issued_tokens: u64,
}

impl Store {
    fn token_for(&mut self, email: &str) -> String {
        let existing = self.subscriptions.iter().find_map(|subscription| {
            if subscription.email.eq_ignore_ascii_case(email) {
                subscription.confirmation_token.clone()
            } else {
                None
            }
        });
        existing.unwrap_or_else(|| {
            self.issued_tokens += 1;
            format!("tok-{:06}", self.issued_tokens)
        })
    }
}

/// Local stand-in for the hosted backend. Enforces capacity, one seat per email
/// and event, and hands out one confirmation token per email.
#[derive(Default, Clone)]
pub(crate) struct InMemoryRegistrationBackend {
    store: Arc<Mutex<Store>>,
}

impl InMemoryRegistrationBackend {
    pub(crate) fn with_events(events: Vec<Event>) -> Self {
        Self {
            store: Arc::new(Mutex::new(Store {
                events,
                ..Store::default()
            })),
        }
    }

    pub(crate) fn seeded() -> Self {
        Self::with_events(vec![
            Event {
                id: "paz-financiera".to_string(),
                name: "Paz Financiera".to_string(),
                max_capacity: SEED_CAPACITY,
                current_count: 0,
            },
            Event {
                id: "emociones-y-liderazgo".to_string(),
                name: "Emociones y Liderazgo".to_string(),
                max_capacity: SEED_CAPACITY,
                current_count: 0,
            },
        ])
    }

    fn store(&self) -> MutexGuard<'_, Store> {
        self.store
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl RegistrationBackend for InMemoryRegistrationBackend {
    async fn fetch_events(&self) -> Result<Vec<Event>, BackendError> {
        Ok(self.store().events.clone())
    }

    async fn create_subscription(
        &self,
        registration: &ValidatedRegistration,
    ) -> Result<(), BackendError> {
        let input = registration.input();
        let mut store = self.store();

        let event = store
            .events
            .iter()
            .find(|event| event.id == input.event_id)
            .ok_or_else(|| BackendError::Rpc {
                code: Some("P0002".to_string()),
                message: format!("event {} not found", input.event_id),
            })?;
        if event.is_full() {
            return Err(BackendError::CapacityExceeded);
        }
        let duplicate = store.subscriptions.iter().any(|subscription| {
            subscription.event_id == input.event_id
                && subscription.email.eq_ignore_ascii_case(&input.email)
        });
        if duplicate {
            return Err(BackendError::AlreadySubscribed);
        }

        let token = store.token_for(&input.email);
        let id = format!("sub-{}", store.subscriptions.len() + 1);
        store.subscriptions.push(Subscription {
            id,
            name: input.name.clone(),
            email: input.email.clone(),
            phone: input.phone.clone(),
            event_id: input.event_id.clone(),
            accepts_data_policy: input.accepts_data_policy,
            created_at: Some(Utc::now()),
            confirmed_at: None,
            confirmation_token: Some(token),
        });
        if let Some(event) = store
            .events
            .iter_mut()
            .find(|event| event.id == input.event_id)
        {
            event.current_count += 1;
        }
        Ok(())
    }

    async fn fetch_subscriptions_by_token(
        &self,
        token: &str,
    ) -> Result<Vec<SubscriptionByToken>, BackendError> {
        let store = self.store();
        Ok(store
            .subscriptions
            .iter()
            .filter(|subscription| subscription.confirmation_token.as_deref() == Some(token))
            .map(|subscription| SubscriptionByToken {
                subscription_id: subscription.id.clone(),
                event_id: subscription.event_id.clone(),
                event_name: store
                    .events
                    .iter()
                    .find(|event| event.id == subscription.event_id)
                    .map(|event| event.name.clone())
                    .unwrap_or_default(),
                confirmed_at: subscription.confirmed_at,
            })
            .collect())
    }

    async fn confirm_attendance_by_token(
        &self,
        token: &str,
        event_ids: &[String],
    ) -> Result<ConfirmationOutcome, BackendError> {
        let mut store = self.store();
        let now = Utc::now();
        let mut matched = false;
        let mut confirmed = false;

        for subscription in store.subscriptions.iter_mut().filter(|subscription| {
            subscription.confirmation_token.as_deref() == Some(token)
                && event_ids.contains(&subscription.event_id)
        }) {
            matched = true;
            if subscription.confirmed_at.is_none() {
                subscription.confirmed_at = Some(now);
                confirmed = true;
            }
        }

        Ok(match (matched, confirmed) {
            (false, _) => ConfirmationOutcome::NotFound,
            (true, true) => ConfirmationOutcome::Confirmed,
            (true, false) => ConfirmationOutcome::AlreadyConfirmed,
        })
    }

    async fn fetch_events_with_subscriptions(
        &self,
    ) -> Result<Vec<EventWithSubscriptions>, BackendError> {
        let store = self.store();
        Ok(store
            .events
            .iter()
            .map(|event| {
                let mut subscriptions: Vec<Subscription> = store
                    .subscriptions
                    .iter()
                    .filter(|subscription| subscription.event_id == event.id)
                    .cloned()
                    .collect();
                subscriptions.reverse();
                EventWithSubscriptions {
                    id: event.id.clone(),
                    name: event.name.clone(),
                    max_capacity: event.max_capacity,
                    current_count: event.current_count,
                    subscriptions,
                }
            })
            .collect())
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
