use std::sync::Arc;

use tracing::info;

use super::backend::{BackendError, RegistrationBackend};
use super::domain::{
    AttendanceView, ConfirmationOutcome, Event, RegistrationInput, SubscriptionByToken,
};
use super::validation::{ValidatedRegistration, ValidationReport};

/// Service composing the form rules with the hosted backend calls.
pub struct RegistrationService<B: ?Sized> {
    backend: Arc<B>,
}

impl<B> RegistrationService<B>
where
    B: RegistrationBackend + ?Sized + 'static,
{
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    /// Events open for registration with their current counts.
    pub async fn events(&self) -> Result<Vec<Event>, RegistrationError> {
        Ok(self.backend.fetch_events().await?)
    }

    /// Validate and, when every field passes, hand the registration to the backend.
    pub async fn register(
        &self,
        input: RegistrationInput,
    ) -> Result<ValidatedRegistration, RegistrationError> {
        let registration = ValidatedRegistration::try_from(input)?;
        self.backend.create_subscription(&registration).await?;
        info!(
            event_id = %registration.input().event_id,
            "subscription created"
        );
        Ok(registration)
    }

    pub async fn attendance(&self, token: &str) -> Result<AttendanceView, RegistrationError> {
        let token = non_empty_token(token)?;
        let subscriptions = self.backend.fetch_subscriptions_by_token(token).await?;
        if subscriptions.is_empty() {
            return Err(RegistrationError::UnknownToken);
        }
        Ok(AttendanceView::new(subscriptions))
    }

    /// Confirm the selected events that belong to the token and are still
    /// unconfirmed. A selection with nothing left to confirm is rejected.
    pub async fn confirm_attendance(
        &self,
        token: &str,
        event_ids: &[String],
    ) -> Result<ConfirmationOutcome, RegistrationError> {
        let token = non_empty_token(token)?;
        if event_ids.is_empty() {
            return Err(RegistrationError::NothingSelected);
        }

        let subscriptions = self.backend.fetch_subscriptions_by_token(token).await?;
        if subscriptions.is_empty() {
            return Err(RegistrationError::UnknownToken);
        }
        let pending = pending_selection(&subscriptions, event_ids);
        if pending.is_empty() {
            return Err(RegistrationError::NothingSelected);
        }

        let outcome = self
            .backend
            .confirm_attendance_by_token(token, &pending)
            .await?;
        info!(?outcome, events = pending.len(), "attendance confirmation processed");
        Ok(outcome)
    }
}

/// Selected event ids, in selection order and without repeats, that the token
/// holds an unconfirmed subscription for.
fn pending_selection(subscriptions: &[SubscriptionByToken], selected: &[String]) -> Vec<String> {
    let mut pending: Vec<String> = Vec::new();
    for event_id in selected {
        let unconfirmed = subscriptions.iter().any(|subscription| {
            &subscription.event_id == event_id && !subscription.is_confirmed()
        });
        if unconfirmed && !pending.contains(event_id) {
            pending.push(event_id.clone());
        }
    }
    pending
}

fn non_empty_token(token: &str) -> Result<&str, RegistrationError> {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        Err(RegistrationError::UnknownToken)
    } else {
        Ok(trimmed)
    }
}

/// Error raised by the registration service.
#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    #[error("registration has invalid fields")]
    Invalid(ValidationReport),
    #[error("confirmation link does not match any subscription")]
    UnknownToken,
    #[error("no events selected for confirmation")]
    NothingSelected,
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl From<ValidationReport> for RegistrationError {
    fn from(report: ValidationReport) -> Self {
        Self::Invalid(report)
    }
}

impl RegistrationError {
    /// Message suitable for showing to the person filling the form.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Invalid(_) => "Revisa los campos marcados e intenta de nuevo.",
            Self::UnknownToken => {
                "Este enlace no corresponde a ninguna inscripción. Verifica el enlace que recibiste."
            }
            Self::NothingSelected => "Selecciona al menos un evento para confirmar.",
            Self::Backend(BackendError::CapacityExceeded) => {
                "Este evento ya alcanzó su capacidad máxima"
            }
            Self::Backend(BackendError::AlreadySubscribed) => "Ya estás inscrito en este evento",
            Self::Backend(_) => "Ocurrió un error. Por favor intenta de nuevo.",
        }
    }
}
