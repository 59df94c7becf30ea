use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Raw subscription form as submitted. Missing fields default to empty values so
/// that they surface as field errors rather than payload errors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegistrationInput {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub event_id: String,
    pub accepts_data_policy: bool,
}

/// Event as listed on the public registration page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    pub name: String,
    pub max_capacity: u32,
    pub current_count: u32,
}

impl Event {
    pub fn seats_left(&self) -> u32 {
        self.max_capacity.saturating_sub(self.current_count)
    }

    pub fn is_full(&self) -> bool {
        self.max_capacity > 0 && self.current_count >= self.max_capacity
    }
}

/// Stored subscription row as read by the admin dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub event_id: String,
    pub accepts_data_policy: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub confirmed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing)]
    pub confirmation_token: Option<String>,
}

impl Subscription {
    pub fn is_confirmed(&self) -> bool {
        self.confirmed_at.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventWithSubscriptions {
    pub id: String,
    pub name: String,
    pub max_capacity: u32,
    pub current_count: u32,
    pub subscriptions: Vec<Subscription>,
}

/// One of the events a confirmation token grants access to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionByToken {
    pub subscription_id: String,
    pub event_id: String,
    pub event_name: String,
    pub confirmed_at: Option<DateTime<Utc>>,
}

impl SubscriptionByToken {
    pub fn is_confirmed(&self) -> bool {
        self.confirmed_at.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationOutcome {
    Confirmed,
    AlreadyConfirmed,
    NotFound,
}

impl ConfirmationOutcome {
    pub const fn message(self) -> &'static str {
        match self {
            Self::Confirmed => "¡Asistencia confirmada!",
            Self::AlreadyConfirmed => "Los eventos seleccionados ya fueron confirmados.",
            Self::NotFound => "No se encontró la inscripción. Verifica tu enlace.",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "confirmed" => Some(Self::Confirmed),
            "already_confirmed" => Some(Self::AlreadyConfirmed),
            "not_found" => Some(Self::NotFound),
            _ => None,
        }
    }
}

/// Attendance page state for a token: what is confirmed and what is pre-selected.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceView {
    pub subscriptions: Vec<SubscriptionByToken>,
    pub all_confirmed: bool,
    pub preselected_event_ids: Vec<String>,
}

impl AttendanceView {
    pub fn new(subscriptions: Vec<SubscriptionByToken>) -> Self {
        let all_confirmed = subscriptions.iter().all(SubscriptionByToken::is_confirmed);
        let preselected_event_ids = subscriptions
            .iter()
            .filter(|subscription| !subscription.is_confirmed())
            .map(|subscription| subscription.event_id.clone())
            .collect();

        Self {
            subscriptions,
            all_confirmed,
            preselected_event_ids,
        }
    }
}
