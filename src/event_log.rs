//! Structured NDJSON event log — an ambient, opt-in concern (no Non-goal
//! names it, but logging/observability is carried regardless per the
//! ambient-stack rule). Grounded directly in the teacher's
//! `util::audit::AuditLogger`: one JSON object per line, a timestamp from
//! `chrono`, and `fs2::FileExt` locking around each append so a log
//! shared across processes never interleaves partial lines.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::Mutex;

use fs2::FileExt;
use serde::Serialize;

/// One entry in the event log.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    SessionStart { page_size: u32 },
    PageAllocated { page: u64, offset: u64, stored_size: u32 },
    PageFreed { page: u64, offset: u64, size: u32 },
    Flush { pages: usize, write_calls: usize, bytes: usize },
    ChecksumMismatch { page: u64, reason: String },
    SessionEnd,
}

#[derive(Serialize)]
struct LogLine<'a> {
    timestamp: String,
    #[serde(flatten)]
    event: &'a Event,
}

struct Inner {
    file: File,
}

/// A handle to an append-only NDJSON event log file.
pub struct EventLog {
    inner: Mutex<Inner>,
}

impl EventLog {
    /// Open (creating if necessary) an event log at `path`, appending to
    /// any existing content.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        Ok(EventLog {
            inner: Mutex::new(Inner { file }),
        })
    }

    /// Append one event as a single JSON line, holding an exclusive file
    /// lock only for the duration of the write.
    pub fn record(&self, event: Event) -> io::Result<()> {
        let line = LogLine {
            timestamp: chrono::Local::now().to_rfc3339(),
            event: &event,
        };
        let mut json = serde_json::to_string(&line)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        json.push('\n');

        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.file.lock_exclusive()?;
        let result = inner.file.write_all(json.as_bytes());
        inner.file.unlock()?;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::NamedTempFile;

    #[test]
    fn record_appends_a_json_line() {
        let file = NamedTempFile::new().unwrap();
        let log = EventLog::open(file.path()).unwrap();
        log.record(Event::SessionStart { page_size: 4096 }).unwrap();
        log.record(Event::PageAllocated {
            page: 1,
            offset: 256,
            stored_size: 100,
        })
        .unwrap();

        let mut contents = String::new();
        File::open(file.path())
            .unwrap()
            .read_to_string(&mut contents)
            .unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("\"event\":\"session_start\""));
        assert!(lines[1].contains("\"page_allocated\""));
    }

    #[test]
    fn open_creates_the_file_if_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.ndjson");
        assert!(!path.exists());
        EventLog::open(&path).unwrap();
        assert!(path.exists());
    }
}
