//! JSONL survey log writer.

use std::{
    fs::{self, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
    sync::Mutex,
};

use tracing::{error, warn};

use super::SurveyLog;
use crate::models::StoredSurveyRecord;
use crate::{AppError, Result};

/// Byte sink a [`JsonlSurveyWriter`] appends lines to.
///
/// Writes must go straight to the backing store (no user-space buffer), so
/// that a failed line can be cut off again with [`LineSink::truncate_to`].
pub trait LineSink: Write + Send {
    /// Current end offset of the sink.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error.
    fn end_offset(&self) -> io::Result<u64>;

    /// Discard everything past `len`.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error.
    fn truncate_to(&mut self, len: u64) -> io::Result<()>;
}

impl LineSink for fs::File {
    fn end_offset(&self) -> io::Result<u64> {
        self.metadata().map(|m| m.len())
    }

    fn truncate_to(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)
    }
}

/// An append-only JSONL writer for [`StoredSurveyRecord`]s.
///
/// Every record becomes exactly one `\n`-terminated line. Writes are
/// serialized through an internal mutex. A write that fails part-way is
/// rolled back to the previous end of file before the error is returned,
/// so the log only ever holds complete lines.
pub struct JsonlSurveyWriter<S = fs::File> {
    path: PathBuf,
    sink: Mutex<S>,
}

impl JsonlSurveyWriter {
    /// Open (or create) the log file at `path` in append mode.
    ///
    /// Creates missing parent directories.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Io`] if the directory or file cannot be created.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                AppError::Io(format!(
                    "failed to create survey log directory {}: {e}",
                    parent.display()
                ))
            })?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| {
                AppError::Io(format!("failed to open survey log {}: {e}", path.display()))
            })?;

        Ok(Self::from_sink(path, file))
    }
}

impl<S: LineSink> JsonlSurveyWriter<S> {
    /// Wrap an already-open sink; `path` is only used for reporting.
    pub fn from_sink(path: impl Into<PathBuf>, sink: S) -> Self {
        Self {
            path: path.into(),
            sink: Mutex::new(sink),
        }
    }

    /// Location of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<S: LineSink> SurveyLog for JsonlSurveyWriter<S> {
    fn append(&self, record: &StoredSurveyRecord) -> Result<()> {
        // Serialize before taking the lock so a bad record never touches the file.
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        let mut sink = self
            .sink
            .lock()
            .map_err(|_| AppError::Io("survey log mutex poisoned".to_string()))?;

        let prev_len = sink
            .end_offset()
            .map_err(|e| AppError::Io(format!("survey log stat failed: {e}")))?;

        if let Err(e) = sink.write_all(&line).and_then(|()| sink.flush()) {
            warn!(path = %self.path.display(), "failed to write survey record: {e}");
            if let Err(rollback) = sink.truncate_to(prev_len) {
                error!(
                    path = %self.path.display(),
                    prev_len,
                    "failed to roll back partial survey record: {rollback}"
                );
            }
            return Err(AppError::Io(format!("survey log write failed: {e}")));
        }

        Ok(())
    }
}
