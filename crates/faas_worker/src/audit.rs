//! Newline-delimited JSON audit log (SPEC_FULL.md §6, grounded on the
//! original `file_logger.py`). Records registrations and cache hits
//! (spec.md §4.4: "record a cache-hit audit entry").

use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuditEvent {
    Registered { func_id: String, client: String },
    CacheHit { func_id: String },
    Unregistered { func_id: String, client: String },
}

/// One audit line on disk: the event plus the wall-clock time it was
/// recorded, mirroring the original `file_logger.py`'s
/// `[{timestamp}, ...]` prefix.
#[derive(Debug, Clone, Serialize)]
struct AuditRecord {
    timestamp: chrono::DateTime<chrono::Utc>,
    #[serde(flatten)]
    event: AuditEvent,
}

pub struct AuditLog {
    path: Mutex<PathBuf>,
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Mutex::new(path.into()),
        }
    }

    pub fn record(&self, event: AuditEvent) {
        let path = self.path.lock().expect("audit log path mutex poisoned");
        let record = AuditRecord {
            timestamp: chrono::Utc::now(),
            event,
        };
        if let Err(err) = append_record(&path, &record) {
            warn!("failed to write audit record: {err}");
        }
    }
}

fn append_record(path: &Path, record: &AuditRecord) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    let line = serde_json::to_string(record).unwrap_or_else(|_| "{}".to_string());
    writeln!(file, "{line}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::BufRead;

    #[test]
    fn writes_one_json_line_per_event() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.ndjson");
        let log = AuditLog::new(&path);
        log.record(AuditEvent::Registered { func_id: "f1".into(), client: "client-1".into() });
        log.record(AuditEvent::CacheHit { func_id: "f1".into() });

        let file = std::fs::File::open(&path).unwrap();
        let lines: Vec<String> = std::io::BufReader::new(file)
            .lines()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("\"event\":\"registered\""));
        assert!(lines[1].contains("\"event\":\"cache_hit\""));
    }
}
