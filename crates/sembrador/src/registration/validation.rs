//! Field rules for the public subscription form.
//!
//! Every rule is a small pure predicate; [`validate_registration`] runs all of
//! them and collects the outcome per field so callers can re-validate on every
//! keystroke and again before submitting.

use std::collections::{BTreeMap, HashSet};
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::domain::RegistrationInput;

const DISPOSABLE_EMAIL_DOMAINS: [&str; 31] = [
    "mailinator.com",
    "guerrillamail.com",
    "guerrillamail.net",
    "guerrillamail.org",
    "tempmail.com",
    "temp-mail.org",
    "yopmail.com",
    "yopmail.fr",
    "throwaway.email",
    "sharklasers.com",
    "guerrillamailblock.com",
    "grr.la",
    "dispostable.com",
    "trashmail.com",
    "trashmail.net",
    "mailnesia.com",
    "maildrop.cc",
    "fakeinbox.com",
    "tempail.com",
    "tempr.email",
    "10minutemail.com",
    "mohmal.com",
    "burnermail.io",
    "getnada.com",
    "emailondeck.com",
    "mintemail.com",
    "mailcatch.com",
    "mytemp.email",
    "harakirimail.com",
    "jetable.org",
    "meltmail.com",
];

const TEST_EMAIL_LOCAL_PARTS: [&str; 21] = [
    "test",
    "foo",
    "bar",
    "baz",
    "example",
    "admin",
    "user",
    "demo",
    "fake",
    "asdf",
    "qwerty",
    "prueba",
    "ejemplo",
    "none",
    "noreply",
    "no-reply",
    "nobody",
    "null",
    "undefined",
    "temp",
    "tmp",
];

const MIN_NAME_CHARS: usize = 2;
const PHONE_DIGITS: usize = 10;

fn disposable_domains() -> &'static HashSet<&'static str> {
    static SET: OnceLock<HashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| DISPOSABLE_EMAIL_DOMAINS.into_iter().collect())
}

fn test_local_parts() -> &'static HashSet<&'static str> {
    static SET: OnceLock<HashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| TEST_EMAIL_LOCAL_PARTS.into_iter().collect())
}

// Leading dots and consecutive dots are checked separately; the regex crate has
// no look-around.
fn email_shape() -> &'static Regex {
    static SHAPE: OnceLock<Regex> = OnceLock::new();
    SHAPE.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9_'+\-.]*[A-Za-z0-9_+\-]@([A-Za-z0-9][A-Za-z0-9\-]*\.)+[A-Za-z]{2,}$")
            .unwrap_or_else(|err| panic!("email shape pattern is valid: {err}"))
    })
}

/// Form fields in the order they are presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    Name,
    Email,
    Phone,
    EventId,
    AcceptsDataPolicy,
}

impl Field {
    pub const fn ordered() -> [Self; 5] {
        [
            Self::Name,
            Self::Email,
            Self::Phone,
            Self::EventId,
            Self::AcceptsDataPolicy,
        ]
    }
}

/// Reasons a field can be rejected. The display text is shown to the user as is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, thiserror::Error)]
#[serde(rename_all = "snake_case")]
pub enum ValidationError {
    #[error("Correo electrónico inválido")]
    InvalidFormat,
    #[error("No se permiten correos temporales o desechables. Usa tu correo personal.")]
    DisposableDomain,
    #[error("Por favor ingresa tu correo electrónico real.")]
    PlaceholderLocalPart,
    #[error("El correo electrónico no parece válido. Verifica e intenta de nuevo.")]
    SuspiciousPattern,
    #[error("El nombre debe tener al menos 2 caracteres")]
    TooShort,
    #[error("El teléfono debe tener 10 dígitos")]
    InvalidPhone,
    #[error("Debes seleccionar un evento")]
    EventRequired,
    #[error("Debes aceptar la política de tratamiento de datos")]
    ConsentRequired,
}

pub fn validate_name(name: &str) -> Result<(), ValidationError> {
    if name.chars().count() < MIN_NAME_CHARS {
        return Err(ValidationError::TooShort);
    }
    Ok(())
}

/// Syntactic check followed by the address-quality heuristics, in that order.
pub fn validate_email(raw: &str) -> Result<(), ValidationError> {
    if !has_email_shape(raw) {
        return Err(ValidationError::InvalidFormat);
    }

    let lowered = raw.to_lowercase();
    let Some((local_part, domain)) = lowered.rsplit_once('@') else {
        return Err(ValidationError::InvalidFormat);
    };

    if disposable_domains().contains(domain) {
        return Err(ValidationError::DisposableDomain);
    }

    if test_local_parts().contains(local_part) {
        return Err(ValidationError::PlaceholderLocalPart);
    }

    if has_repeated_char_pattern(local_part) {
        return Err(ValidationError::SuspiciousPattern);
    }

    Ok(())
}

pub fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    if phone.len() == PHONE_DIGITS && phone.bytes().all(|byte| byte.is_ascii_digit()) {
        Ok(())
    } else {
        Err(ValidationError::InvalidPhone)
    }
}

pub fn validate_event_id(event_id: &str) -> Result<(), ValidationError> {
    if event_id.is_empty() {
        return Err(ValidationError::EventRequired);
    }
    Ok(())
}

pub fn validate_consent(accepts_data_policy: bool) -> Result<(), ValidationError> {
    if accepts_data_policy {
        Ok(())
    } else {
        Err(ValidationError::ConsentRequired)
    }
}

fn has_email_shape(raw: &str) -> bool {
    if raw.starts_with('.') || raw.contains("..") {
        return false;
    }
    email_shape().is_match(raw)
}

/// Short local parts made of a single character ("x", "aa") or any run of three
/// identical characters ("aaa", "joooorge").
pub(crate) fn has_repeated_char_pattern(local_part: &str) -> bool {
    let chars: Vec<char> = local_part.chars().collect();

    if chars.len() <= 2 {
        if let Some(first) = chars.first() {
            if chars.iter().all(|ch| ch == first) {
                return true;
            }
        }
    }

    chars
        .windows(3)
        .any(|window| window[0] == window[1] && window[1] == window[2])
}

/// Per-field outcome of a validation pass. A field with no recorded errors is ok.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    errors: BTreeMap<Field, Vec<ValidationError>>,
}

impl ValidationReport {
    fn record(&mut self, field: Field, outcome: Result<(), ValidationError>) {
        if let Err(error) = outcome {
            self.errors.entry(field).or_default().push(error);
        }
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors_for(&self, field: Field) -> &[ValidationError] {
        self.errors.get(&field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_field_ok(&self, field: Field) -> bool {
        self.errors_for(field).is_empty()
    }

    pub fn invalid_fields(&self) -> impl Iterator<Item = Field> + '_ {
        self.errors.keys().copied()
    }

    /// Serializable view consumed by the HTTP layer.
    pub fn view(&self) -> ValidationReportView {
        let fields = Field::ordered()
            .into_iter()
            .map(|field| {
                let errors = self
                    .errors_for(field)
                    .iter()
                    .map(|error| FieldErrorView {
                        code: *error,
                        message: error.to_string(),
                    })
                    .collect::<Vec<_>>();
                let outcome = if errors.is_empty() {
                    FieldOutcomeView::Ok
                } else {
                    FieldOutcomeView::Rejected { errors }
                };
                (field, outcome)
            })
            .collect();

        ValidationReportView {
            valid: self.is_valid(),
            fields,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationReportView {
    pub valid: bool,
    pub fields: BTreeMap<Field, FieldOutcomeView>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FieldOutcomeView {
    Ok,
    Rejected { errors: Vec<FieldErrorView> },
}

#[derive(Debug, Clone, Serialize)]
pub struct FieldErrorView {
    pub code: ValidationError,
    pub message: String,
}

/// Registration that passed every field rule. Only this type reaches the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRegistration(RegistrationInput);

impl ValidatedRegistration {
    pub fn input(&self) -> &RegistrationInput {
        &self.0
    }

    pub fn into_inner(self) -> RegistrationInput {
        self.0
    }
}

impl TryFrom<RegistrationInput> for ValidatedRegistration {
    type Error = ValidationReport;

    fn try_from(input: RegistrationInput) -> Result<Self, Self::Error> {
        let report = validate_registration(&input);
        if report.is_valid() {
            Ok(Self(input))
        } else {
            Err(report)
        }
    }
}

pub fn validate_registration(input: &RegistrationInput) -> ValidationReport {
    let mut report = ValidationReport::default();
    report.record(Field::Name, validate_name(&input.name));
    report.record(Field::Email, validate_email(&input.email));
    report.record(Field::Phone, validate_phone(&input.phone));
    report.record(Field::EventId, validate_event_id(&input.event_id));
    report.record(
        Field::AcceptsDataPolicy,
        validate_consent(input.accepts_data_policy),
    );
    report
}
