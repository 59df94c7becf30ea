use async_trait::async_trait;

use super::domain::{ConfirmationOutcome, Event, EventWithSubscriptions, SubscriptionByToken};
use super::validation::ValidatedRegistration;

/// Postgres unique-violation code raised when an email already holds a seat.
pub const UNIQUE_VIOLATION_CODE: &str = "23505";

/// Hosted backend holding events and subscriptions. Capacity checks, duplicate
/// prevention and token handling all happen behind these calls.
#[async_trait]
pub trait RegistrationBackend: Send + Sync {
    async fn fetch_events(&self) -> Result<Vec<Event>, BackendError>;

    async fn create_subscription(
        &self,
        registration: &ValidatedRegistration,
    ) -> Result<(), BackendError>;

    async fn fetch_subscriptions_by_token(
        &self,
        token: &str,
    ) -> Result<Vec<SubscriptionByToken>, BackendError>;

    async fn confirm_attendance_by_token(
        &self,
        token: &str,
        event_ids: &[String],
    ) -> Result<ConfirmationOutcome, BackendError>;

    async fn fetch_events_with_subscriptions(
        &self,
    ) -> Result<Vec<EventWithSubscriptions>, BackendError>;
}

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("event capacity exceeded")]
    CapacityExceeded,
    #[error("already subscribed to this event")]
    AlreadySubscribed,
    #[error("backend rejected the call ({}): {message}", .code.as_deref().unwrap_or("no code"))]
    Rpc {
        code: Option<String>,
        message: String,
    },
    #[error("backend unreachable: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected backend payload: {0}")]
    Decode(String),
}

impl BackendError {
    /// Map a remote-procedure failure onto the kinds callers can act on.
    pub fn classify(code: Option<&str>, message: &str) -> Self {
        if message.contains("capacity") {
            return Self::CapacityExceeded;
        }
        if code == Some(UNIQUE_VIOLATION_CODE) {
            return Self::AlreadySubscribed;
        }
        Self::Rpc {
            code: code.map(str::to_string),
            message: message.to_string(),
        }
    }
}
