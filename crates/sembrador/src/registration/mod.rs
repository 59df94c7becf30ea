//! Public subscription flow: form rules, the hosted backend seam, and the
//! attendance confirmation reached through emailed tokens.

pub mod backend;
pub mod domain;
pub mod router;
pub mod service;
pub mod supabase;
pub mod validation;

#[cfg(test)]
mod tests;

pub use backend::{BackendError, RegistrationBackend, UNIQUE_VIOLATION_CODE};
pub use domain::{
    AttendanceView, ConfirmationOutcome, Event, EventWithSubscriptions, RegistrationInput,
    Subscription, SubscriptionByToken,
};
pub use router::registration_router;
pub use service::{RegistrationError, RegistrationService};
pub use supabase::SupabaseBackend;
pub use validation::{
    validate_email, validate_registration, Field, ValidatedRegistration, ValidationError,
    ValidationReport,
};
