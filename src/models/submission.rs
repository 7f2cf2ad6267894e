//! Inbound survey submission and its schema validation.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};

/// Loose contact-address shape: one `@`, no whitespace, dotted domain.
static EMAIL_SHAPE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@.]+(\.[^\s@.]+)+$")
        .map_err(|err| tracing::error!(%err, "email pattern failed to compile"))
        .ok()
});

/// Classification of a single field failure.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FieldErrorKind {
    /// Required field absent (or `null`).
    Missing,
    /// Value present but not a JSON string.
    StringType,
    /// Value present but not a JSON integer.
    IntType,
    /// Value present but not a JSON boolean.
    BoolType,
    /// Value has the right type but an invalid shape.
    ValueError,
}

/// One entry of the `detail` list in a `validation_error` response.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FieldError {
    /// Path to the offending field, outermost first.
    pub loc: Vec<String>,
    /// Machine-readable failure kind.
    #[serde(rename = "type")]
    pub kind: FieldErrorKind,
    /// Human-readable explanation.
    pub msg: String,
}

impl FieldError {
    fn new(field: &str, kind: FieldErrorKind, msg: impl Into<String>) -> Self {
        Self {
            loc: vec![field.to_owned()],
            kind,
            msg: msg.into(),
        }
    }

    fn missing(field: &str) -> Self {
        Self::new(field, FieldErrorKind::Missing, "Field required")
    }

    /// Name of the top-level field this error refers to.
    #[must_use]
    pub fn field(&self) -> Option<&str> {
        self.loc.first().map(String::as_str)
    }
}

/// A survey submission whose fields are all present and correctly typed.
///
/// Exists only for the duration of a single request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurveySubmission {
    /// Respondent name.
    pub name: String,
    /// Contact address; hashed before storage.
    pub email: String,
    /// Respondent age; hashed before storage.
    pub age: i64,
    /// Whether the respondent consented to processing.
    pub consent: bool,
    /// Survey rating.
    pub rating: i64,
    /// Free-text comments.
    pub comments: Option<String>,
    /// Client-declared user agent, preferred over the request header.
    pub user_agent: Option<String>,
    /// Caller-chosen idempotency key.
    pub submission_id: Option<String>,
}

impl SurveySubmission {
    /// Validate a decoded JSON object against the submission schema.
    ///
    /// Every failing field is reported, not just the first. Unknown keys are
    /// ignored and `null` counts as absent.
    ///
    /// # Errors
    ///
    /// Returns the list of [`FieldError`]s when any constraint is violated.
    pub fn from_object(payload: &Map<String, Value>) -> Result<Self, Vec<FieldError>> {
        let mut errors = Vec::new();

        let name = required_string(payload, "name", &mut errors);
        let email = required_string(payload, "email", &mut errors)
            .and_then(|email| check_email(email, &mut errors));
        let age = required_int(payload, "age", &mut errors);
        let consent = required_bool(payload, "consent", &mut errors);
        let rating = required_int(payload, "rating", &mut errors);
        let comments = optional_string(payload, "comments", &mut errors);
        let user_agent = optional_string(payload, "user_agent", &mut errors);
        let submission_id = optional_string(payload, "submission_id", &mut errors);

        match (name, email, age, consent, rating) {
            (Some(name), Some(email), Some(age), Some(consent), Some(rating))
                if errors.is_empty() =>
            {
                Ok(Self {
                    name,
                    email,
                    age,
                    consent,
                    rating,
                    comments,
                    user_agent,
                    submission_id,
                })
            }
            _ => Err(errors),
        }
    }
}

fn present<'a>(payload: &'a Map<String, Value>, field: &str) -> Option<&'a Value> {
    payload.get(field).filter(|v| !v.is_null())
}

fn required_string(
    payload: &Map<String, Value>,
    field: &str,
    errors: &mut Vec<FieldError>,
) -> Option<String> {
    let Some(value) = present(payload, field) else {
        errors.push(FieldError::missing(field));
        return None;
    };
    as_string(value, field, errors)
}

fn optional_string(
    payload: &Map<String, Value>,
    field: &str,
    errors: &mut Vec<FieldError>,
) -> Option<String> {
    present(payload, field).and_then(|value| as_string(value, field, errors))
}

fn as_string(value: &Value, field: &str, errors: &mut Vec<FieldError>) -> Option<String> {
    if let Some(s) = value.as_str() {
        Some(s.to_owned())
    } else {
        errors.push(FieldError::new(
            field,
            FieldErrorKind::StringType,
            "Input should be a valid string",
        ));
        None
    }
}

fn required_int(
    payload: &Map<String, Value>,
    field: &str,
    errors: &mut Vec<FieldError>,
) -> Option<i64> {
    let Some(value) = present(payload, field) else {
        errors.push(FieldError::missing(field));
        return None;
    };
    if let Some(n) = value.as_i64() {
        Some(n)
    } else {
        errors.push(FieldError::new(
            field,
            FieldErrorKind::IntType,
            "Input should be a valid integer",
        ));
        None
    }
}

fn required_bool(
    payload: &Map<String, Value>,
    field: &str,
    errors: &mut Vec<FieldError>,
) -> Option<bool> {
    let Some(value) = present(payload, field) else {
        errors.push(FieldError::missing(field));
        return None;
    };
    if let Some(b) = value.as_bool() {
        Some(b)
    } else {
        errors.push(FieldError::new(
            field,
            FieldErrorKind::BoolType,
            "Input should be a valid boolean",
        ));
        None
    }
}

fn check_email(email: String, errors: &mut Vec<FieldError>) -> Option<String> {
    if is_contact_address(&email) {
        Some(email)
    } else {
        errors.push(FieldError::new(
            "email",
            FieldErrorKind::ValueError,
            "value is not a valid email address",
        ));
        None
    }
}

/// Whether `candidate` is shaped like `local@domain.tld`.
#[must_use]
pub fn is_contact_address(candidate: &str) -> bool {
    EMAIL_SHAPE
        .as_ref()
        .is_some_and(|re| re.is_match(candidate))
}
