//! Append-only JSONL log
//!
//! The durable store for fingerprints and attack events: one JSON
//! object per line, flushed per write. Writers are serialized through
//! a mutex so concurrent records cannot interleave partial lines.
//! Writes are best-effort - an I/O failure bumps a counter and the
//! request continues.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::telemetry::DegradeCounters;

/// Default fingerprint log filename.
pub const FINGERPRINT_LOG: &str = "fingerprints.jsonl";

/// Default attack log filename.
pub const ATTACK_LOG: &str = "attacks.jsonl";

/// Append-only JSONL file with serialized writers.
pub struct AppendLog {
    path: PathBuf,
    writer: Mutex<Option<BufWriter<File>>>,
    counters: Arc<DegradeCounters>,
}

impl AppendLog {
    /// The file and its parent directory are created lazily on first
    /// append, so constructing a log never touches the filesystem.
    pub fn new(path: impl Into<PathBuf>, counters: Arc<DegradeCounters>) -> Self {
        Self {
            path: path.into(),
            writer: Mutex::new(None),
            counters,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry as a JSON line. Returns whether the write
    /// landed; failure is recorded and otherwise swallowed.
    pub fn append<T: Serialize>(&self, entry: &T) -> bool {
        let line = match serde_json::to_string(entry) {
            Ok(line) => line,
            Err(err) => {
                self.counters.record_log_write_failure();
                tracing::warn!("log entry serialization failed: {}", err);
                return false;
            }
        };

        match self.write_line(&line) {
            Ok(()) => true,
            Err(err) => {
                self.counters.record_log_write_failure();
                tracing::warn!("append to {:?} failed: {}", self.path, err);
                // Drop the writer so the next append reopens the file.
                *self.writer.lock() = None;
                false
            }
        }
    }

    fn write_line(&self, line: &str) -> std::io::Result<()> {
        let mut guard = self.writer.lock();

        if guard.is_none() {
            if let Some(parent) = self.path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)?;
            *guard = Some(BufWriter::new(file));
        }

        if let Some(writer) = guard.as_mut() {
            writer.write_all(line.as_bytes())?;
            writer.write_all(b"\n")?;
            // Flush per line: readers scan this file while we hold it open.
            writer.flush()?;
        }
        Ok(())
    }

    /// Read every parseable entry, oldest first. Unreadable files and
    /// malformed lines yield nothing rather than an error.
    pub fn entries<T: DeserializeOwned>(&self) -> Vec<T> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(_) => return Vec::new(),
        };

        BufReader::new(file)
            .lines()
            .map_while(Result::ok)
            .filter_map(|line| serde_json::from_str(line.trim()).ok())
            .collect()
    }
}
