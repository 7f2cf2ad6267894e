//! Append-only persistence for accepted survey records.
//!
//! Provides the [`SurveyLog`] trait. The primary implementation,
//! [`JsonlSurveyWriter`], appends one JSON object per line to a single file.

pub mod writer;

use crate::models::StoredSurveyRecord;

/// Writes stored survey records to a persistent, append-only store.
///
/// Implementations must be [`Send`] and [`Sync`] to allow sharing across
/// async task boundaries via [`std::sync::Arc`].
pub trait SurveyLog: Send + Sync {
    /// Append a single record.
    ///
    /// Either the whole record is persisted or nothing is.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the underlying write fails.
    fn append(&self, record: &StoredSurveyRecord) -> crate::Result<()>;
}

pub use writer::{JsonlSurveyWriter, LineSink};
