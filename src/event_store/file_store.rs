//! File-backed store for raw GitHub event records.
//!
//! All events live in a single JSON container file of the shape
//! `{ "githubEvents": [ ... ] }`, appended in arrival order with:
//! - A store-assigned `createdAt` timestamp on every record
//! - Atomic writes via temp file + rename
//! - Writer serialization via an in-process mutex plus a file lock

use crate::event_store::error::StoreError;
use chrono::{SecondsFormat, Utc};
use fs2::FileExt;
use serde_json::{json, Map, Value};
use std::fs::OpenOptions;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Key holding the ordered event sequence inside the container file.
const COLLECTION_KEY: &str = "githubEvents";

/// Operational state of the event container, for status tooling.
///
/// Read paths deliberately collapse `Missing` and `Corrupt` into "empty";
/// this probe exists so corruption stays visible to operators anyway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerStatus {
    /// No container file exists yet; nothing has been written.
    Missing,
    /// The container parses and holds `events` records.
    Healthy { events: usize },
    /// The container exists but cannot be read as an event sequence.
    Corrupt { detail: String },
}

impl std::fmt::Display for ContainerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing => write!(f, "missing (no events recorded yet)"),
            Self::Healthy { events } => write!(f, "healthy ({} events)", events),
            Self::Corrupt { detail } => write!(f, "corrupt: {}", detail),
        }
    }
}

/// Append-only store for schema-less GitHub event records.
///
/// Constructed once at startup and passed by handle to collaborators.
/// Clones share the writer lock, so concurrent `save` calls against the
/// same store serialize their read-modify-write cycles.
#[derive(Debug, Clone)]
pub struct FileEventStore {
    path: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl FileEventStore {
    /// Creates a store for the container at `path`. The file is created
    /// lazily on first write, never by construction or by reads.
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Path of the container file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Idempotently (re)creates the container when it is missing,
    /// unreadable, or not shaped as `{ "githubEvents": [...] }`.
    pub fn ensure_initialized(&self) -> Result<(), StoreError> {
        let _guard = self.lock_writer();
        if self.read_events().is_none() {
            self.write_container(&[])?;
        }
        Ok(())
    }

    /// Appends `record` to the container, stamping `createdAt` with the
    /// current UTC time. Initializes the container first if needed.
    ///
    /// Persistence failures are hard errors and are never retried here.
    pub fn save(&self, record: Map<String, Value>) -> Result<(), StoreError> {
        let _guard = self.lock_writer();
        let _file_lock = self.lock_container_file()?;

        let mut events = match self.read_events() {
            Some(events) => events,
            None => {
                if self.path.exists() {
                    tracing::warn!(
                        path = %self.path.display(),
                        "event container unreadable, reinitializing"
                    );
                }
                Vec::new()
            }
        };

        let mut stamped = record;
        stamped.insert(
            "createdAt".to_string(),
            Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
        );
        events.push(Value::Object(stamped));

        self.write_container(&events)
    }

    /// Returns the first record whose `id` field equals `id`.
    ///
    /// Absence is a normal outcome: a missing container, a corrupt
    /// container, and a lookup miss all yield `None`.
    pub fn get(&self, id: &str) -> Option<Value> {
        self.read_events()?
            .into_iter()
            .find(|event| event.get("id").and_then(Value::as_str) == Some(id))
    }

    /// Returns the full collection in append order, or an empty vec when
    /// the container is missing or corrupt. Never errors, never creates
    /// the container as a side effect.
    pub fn all_raw(&self) -> Vec<Value> {
        self.read_events().unwrap_or_default()
    }

    /// Probes the container without touching it.
    pub fn status(&self) -> ContainerStatus {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return ContainerStatus::Missing,
            Err(e) => {
                return ContainerStatus::Corrupt {
                    detail: e.to_string(),
                }
            }
        };

        match serde_json::from_str::<Value>(&content) {
            Ok(parsed) => match parsed.get(COLLECTION_KEY).and_then(Value::as_array) {
                Some(events) => ContainerStatus::Healthy {
                    events: events.len(),
                },
                None => ContainerStatus::Corrupt {
                    detail: format!("`{}` is not an array", COLLECTION_KEY),
                },
            },
            Err(e) => ContainerStatus::Corrupt {
                detail: e.to_string(),
            },
        }
    }

    /// Reads the event sequence, treating every failure mode (missing
    /// file, I/O error, parse error, wrong shape) as "not initialized".
    fn read_events(&self) -> Option<Vec<Value>> {
        let content = std::fs::read_to_string(&self.path).ok()?;
        let parsed: Value = serde_json::from_str(&content).ok()?;
        parsed.get(COLLECTION_KEY)?.as_array().cloned()
    }

    /// Persists the full container atomically (write temp, then rename),
    /// so concurrent readers observe either the old or the new snapshot.
    fn write_container(&self, events: &[Value]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| self.persistence_error(&e))?;
            }
        }

        let container = json!({ COLLECTION_KEY: events });
        let content =
            serde_json::to_string_pretty(&container).map_err(|e| StoreError::Serialization {
                message: e.to_string(),
            })?;

        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, content).map_err(|e| self.persistence_error(&e))?;
        std::fs::rename(&tmp_path, &self.path).map_err(|e| self.persistence_error(&e))?;

        Ok(())
    }

    /// Takes the in-process writer lock. A poisoned lock is still usable:
    /// atomic replace means a panicking writer cannot leave the container
    /// itself in a torn state.
    fn lock_writer(&self) -> std::sync::MutexGuard<'_, ()> {
        self.write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Acquires an exclusive advisory lock on a sidecar lock file for the
    /// duration of a read-modify-write cycle. The lock releases when the
    /// returned handle drops. A sidecar is used because the container
    /// file itself is replaced by rename on every write.
    fn lock_container_file(&self) -> Result<std::fs::File, StoreError> {
        let lock_path = self.path.with_extension("json.lock");
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| self.persistence_error(&e))?;
        file.lock_exclusive()
            .map_err(|e| self.persistence_error(&e))?;
        Ok(file)
    }

    fn persistence_error(&self, e: &std::io::Error) -> StoreError {
        StoreError::Persistence {
            message: format!("{}: {}", self.path.display(), e),
        }
    }
}

#[cfg(test)]
#[path = "tests/file_store_tests.rs"]
mod tests;
