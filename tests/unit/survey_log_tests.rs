//! Unit tests for `JsonlSurveyWriter`.
//!
//! Validates line-per-record output, directory creation, append semantics
//! across reopen, concurrent write safety, and rollback of short writes.

use std::fs;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use chrono::Utc;

use survey_intake::models::StoredSurveyRecord;
use survey_intake::storage::{JsonlSurveyWriter, LineSink, SurveyLog};

/// Helper: build a stored record with a recognizable id.
fn record(id: &str) -> StoredSurveyRecord {
    StoredSurveyRecord {
        name: "Ada".to_owned(),
        hashed_email: "a".repeat(64),
        hashed_age: "b".repeat(64),
        consent: true,
        rating: 4,
        comments: None,
        user_agent: Some("test-agent".to_owned()),
        submission_id: id.to_owned(),
        received_at: Utc::now(),
        ip: "127.0.0.1".to_owned(),
    }
}

#[test]
fn open_creates_missing_parent_directories() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("nested").join("dir").join("survey.ndjson");

    let writer = JsonlSurveyWriter::open(path.clone()).expect("open");

    assert!(path.exists(), "log file must exist after open");
    assert_eq!(writer.path(), path.as_path());
}

#[test]
fn record_written_as_single_json_line() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("survey.ndjson");
    let writer = JsonlSurveyWriter::open(path.clone()).expect("open");

    writer.append(&record("sub-1")).expect("append");

    let contents = fs::read_to_string(&path).expect("read");
    assert!(contents.ends_with('\n'), "line must be newline-terminated");
    assert_eq!(contents.lines().count(), 1);

    let parsed: StoredSurveyRecord =
        serde_json::from_str(contents.trim_end()).expect("line parses back");
    assert_eq!(parsed.submission_id, "sub-1");
    assert_eq!(parsed.rating, 4);
}

#[test]
fn reopen_appends_instead_of_truncating() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("survey.ndjson");

    JsonlSurveyWriter::open(path.clone())
        .expect("open")
        .append(&record("first"))
        .expect("append");
    JsonlSurveyWriter::open(path.clone())
        .expect("reopen")
        .append(&record("second"))
        .expect("append");

    let contents = fs::read_to_string(&path).expect("read");
    let ids: Vec<String> = contents
        .lines()
        .map(|l| {
            serde_json::from_str::<StoredSurveyRecord>(l)
                .expect("valid line")
                .submission_id
        })
        .collect();
    assert_eq!(ids, vec!["first".to_owned(), "second".to_owned()]);
}

#[test]
fn concurrent_appends_never_interleave() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("survey.ndjson");
    let writer = Arc::new(JsonlSurveyWriter::open(path.clone()).expect("open"));

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let w = Arc::clone(&writer);
            std::thread::spawn(move || {
                for j in 0..8 {
                    w.append(&record(&format!("t{i}-{j}")))
                        .expect("concurrent append");
                }
            })
        })
        .collect();

    for h in handles {
        h.join().expect("thread should not panic");
    }

    let contents = fs::read_to_string(&path).expect("read");
    assert_eq!(contents.lines().count(), 128);
    for line in contents.lines() {
        let parsed: serde_json::Result<StoredSurveyRecord> = serde_json::from_str(line);
        assert!(parsed.is_ok(), "each line must be a complete record: {line}");
    }
}

#[test]
fn open_fails_when_parent_is_a_file() {
    let temp = tempfile::tempdir().expect("tempdir");
    let blocker = temp.path().join("blocker");
    fs::write(&blocker, b"not a dir").expect("write blocker");

    let result = JsonlSurveyWriter::open(blocker.join("survey.ndjson"));
    assert!(result.is_err());
    assert!(result
        .err()
        .map(|e| e.to_string())
        .unwrap_or_default()
        .starts_with("io:"));
}

// ── Short writes are rolled back ─────────────────────────────────────────────

/// In-memory sink that accepts bytes until `capacity` is reached, then fails,
/// like a disk that fills up in the middle of a line.
#[derive(Clone, Default)]
struct CappedSink {
    data: Arc<Mutex<Vec<u8>>>,
    capacity: Arc<Mutex<usize>>,
}

impl CappedSink {
    fn with_capacity(capacity: usize) -> Self {
        let sink = Self::default();
        sink.set_capacity(capacity);
        sink
    }

    fn set_capacity(&self, capacity: usize) {
        *self.capacity.lock().unwrap() = capacity;
    }

    fn contents(&self) -> String {
        String::from_utf8(self.data.lock().unwrap().clone()).expect("utf8 log")
    }
}

impl Write for CappedSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut data = self.data.lock().unwrap();
        let room = self.capacity.lock().unwrap().saturating_sub(data.len());
        if room == 0 {
            return Err(io::Error::other("no space left on device"));
        }
        let n = room.min(buf.len());
        data.extend_from_slice(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl LineSink for CappedSink {
    fn end_offset(&self) -> io::Result<u64> {
        Ok(self.data.lock().unwrap().len() as u64)
    }

    fn truncate_to(&mut self, len: u64) -> io::Result<()> {
        self.data
            .lock()
            .unwrap()
            .truncate(usize::try_from(len).expect("offset fits usize"));
        Ok(())
    }
}

fn line_len(record: &StoredSurveyRecord) -> usize {
    serde_json::to_vec(record).expect("serialize").len() + 1
}

#[test]
fn failed_append_leaves_no_partial_line() {
    let first = record("sub-1");
    let first_len = line_len(&first);
    // Room for the first record plus half of the next one.
    let sink = CappedSink::with_capacity(first_len + first_len / 2);
    let writer = JsonlSurveyWriter::from_sink("capped.ndjson", sink.clone());

    writer.append(&first).expect("first append fits");
    let err = writer
        .append(&record("sub-2"))
        .expect_err("second append must fail");
    assert!(err.to_string().starts_with("io:"));

    let contents = sink.contents();
    assert_eq!(contents.len(), first_len, "partial bytes must be rolled back");
    assert!(contents.ends_with('\n'));
    assert_eq!(contents.lines().count(), 1);
    let only: StoredSurveyRecord =
        serde_json::from_str(contents.trim_end()).expect("complete record");
    assert_eq!(only.submission_id, "sub-1");
}

#[test]
fn append_after_failure_starts_on_a_clean_line() {
    let first = record("sub-1");
    let first_len = line_len(&first);
    let sink = CappedSink::with_capacity(first_len + 10);
    let writer = JsonlSurveyWriter::from_sink("capped.ndjson", sink.clone());

    writer.append(&first).expect("first append fits");
    assert!(writer.append(&record("lost")).is_err());

    sink.set_capacity(usize::MAX);
    writer.append(&record("sub-3")).expect("append after space frees up");

    let ids: Vec<String> = sink
        .contents()
        .lines()
        .map(|l| {
            serde_json::from_str::<StoredSurveyRecord>(l)
                .expect("every line is a complete record")
                .submission_id
        })
        .collect();
    assert_eq!(ids, vec!["sub-1".to_owned(), "sub-3".to_owned()]);
}

#[test]
fn file_sink_reports_and_truncates_length() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("survey.ndjson");
    let writer = JsonlSurveyWriter::open(path.clone()).expect("open");
    writer.append(&record("keep")).expect("append");
    let kept_len = fs::metadata(&path).expect("stat").len();

    let mut file = fs::OpenOptions::new()
        .append(true)
        .open(&path)
        .expect("reopen");
    file.write_all(b"{\"partial\":").expect("write fragment");
    assert!(file.end_offset().expect("offset") > kept_len);

    file.truncate_to(kept_len).expect("truncate");
    writer.append(&record("next")).expect("append after truncate");

    let contents = fs::read_to_string(&path).expect("read");
    assert_eq!(contents.lines().count(), 2);
    for line in contents.lines() {
        assert!(serde_json::from_str::<StoredSurveyRecord>(line).is_ok());
    }
}
