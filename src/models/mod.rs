//! Domain model module declarations.

pub mod context;
pub mod record;
pub mod submission;

pub use context::RequestContext;
pub use record::{build_record, StoredSurveyRecord};
pub use submission::{FieldError, FieldErrorKind, SurveySubmission};
