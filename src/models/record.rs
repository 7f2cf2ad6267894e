//! Persisted survey record and the pseudonymizing record builder.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::context::RequestContext;
use super::submission::SurveySubmission;

/// Hour-granularity stamp mixed into derived submission identifiers.
pub const SUBMISSION_HOUR_FORMAT: &str = "%Y%m%d%H";

/// An accepted survey submission as written to the append log.
///
/// Raw email and age never reach this type; only their digests do.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredSurveyRecord {
    /// Respondent name.
    pub name: String,
    /// SHA-256 hex digest of the raw email.
    pub hashed_email: String,
    /// SHA-256 hex digest of the decimal age string.
    pub hashed_age: String,
    /// Consent flag as submitted.
    pub consent: bool,
    /// Rating as submitted.
    pub rating: i64,
    /// Free-text comments, if any.
    pub comments: Option<String>,
    /// Caller-declared user agent, falling back to the request header.
    pub user_agent: Option<String>,
    /// Caller-supplied or derived idempotency key.
    pub submission_id: String,
    /// Instant the request was accepted.
    pub received_at: DateTime<Utc>,
    /// Resolved client address; empty when unknown.
    pub ip: String,
}

/// Compute the lowercase SHA-256 hex digest of a UTF-8 string.
#[must_use]
pub fn sha256_hex(value: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Derive a submission id stable for one email within one UTC clock hour.
///
/// The digest input is the hex email digest followed by `YYYYMMDDHH`.
#[must_use]
pub fn derive_submission_id(hashed_email: &str, now: DateTime<Utc>) -> String {
    let hour = now.format(SUBMISSION_HOUR_FORMAT);
    sha256_hex(&format!("{hashed_email}{hour}"))
}

/// Turn a validated submission into the record that gets persisted.
///
/// `now` is read once by the caller and used both for `received_at` and the
/// hour stamp of a derived submission id.
#[must_use]
pub fn build_record(
    submission: SurveySubmission,
    context: &RequestContext,
    now: DateTime<Utc>,
) -> StoredSurveyRecord {
    let hashed_email = sha256_hex(&submission.email);
    let hashed_age = sha256_hex(&submission.age.to_string());

    let submission_id = match submission.submission_id {
        Some(id) if !id.is_empty() => id,
        _ => derive_submission_id(&hashed_email, now),
    };

    let user_agent = submission
        .user_agent
        .or_else(|| context.user_agent.clone());

    StoredSurveyRecord {
        name: submission.name,
        hashed_email,
        hashed_age,
        consent: submission.consent,
        rating: submission.rating,
        comments: submission.comments,
        user_agent,
        submission_id,
        received_at: now,
        ip: context.ip.clone(),
    }
}
