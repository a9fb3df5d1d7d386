//! # On-Device Snapshot Storage
//!
//! Key-value persistence for store snapshots.
//!
//! ## Persistence Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Snapshot Lifecycle                                   │
//! │                                                                         │
//! │  Store action succeeds                                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  persist_snapshot("car-storage", { cars, selected_car, owner_cars })   │
//! │       │            (whitelisted fields only - never loading/error)     │
//! │       ▼                                                                 │
//! │  { "schema_version": 1, "data": { ... } }  → one document per store    │
//! │                                                                         │
//! │  App cold start                                                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  load_snapshot("car-storage")                                          │
//! │       ├── version matches  → restore fields synchronously              │
//! │       └── version differs / parse fails → discard, start empty         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Persist failures are logged and swallowed: the cache is a convenience
//! mirror of remote state, and losing a snapshot only costs a refetch.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::warn;

// =============================================================================
// Storage Namespaces
// =============================================================================

pub const AUTH_NAMESPACE: &str = "auth-storage";
pub const CAR_NAMESPACE: &str = "car-storage";
pub const REVENUE_NAMESPACE: &str = "revenue-storage";
pub const EXPENSE_NAMESPACE: &str = "expense-storage";
pub const USER_NAMESPACE: &str = "user-storage";

/// Version stamped into every persisted snapshot.
///
/// Bump this when a snapshot shape changes; old snapshots are then discarded
/// on rehydration instead of being misread.
pub const SNAPSHOT_SCHEMA_VERSION: u32 = 1;

// =============================================================================
// KvStorage Trait
// =============================================================================

/// On-device key-value storage, one JSON document per namespace.
pub trait KvStorage: Send + Sync {
    fn get(&self, namespace: &str) -> io::Result<Option<String>>;
    fn set(&self, namespace: &str, value: &str) -> io::Result<()>;
    fn remove(&self, namespace: &str) -> io::Result<()>;
}

// =============================================================================
// File Storage
// =============================================================================

/// Storage backed by one file per namespace under an app-data directory.
#[derive(Debug)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Opens (and creates, if needed) the storage directory.
    pub fn new(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(FileStorage { dir })
    }

    fn path(&self, namespace: &str) -> PathBuf {
        self.dir.join(format!("{}.json", namespace))
    }
}

impl KvStorage for FileStorage {
    fn get(&self, namespace: &str) -> io::Result<Option<String>> {
        match fs::read_to_string(self.path(namespace)) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn set(&self, namespace: &str, value: &str) -> io::Result<()> {
        fs::write(self.path(namespace), value)
    }

    fn remove(&self, namespace: &str) -> io::Result<()> {
        match fs::remove_file(self.path(namespace)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err),
        }
    }
}

// =============================================================================
// Memory Storage
// =============================================================================

/// Storage held in memory; used by tests.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        MemoryStorage::default()
    }
}

impl KvStorage for MemoryStorage {
    fn get(&self, namespace: &str) -> io::Result<Option<String>> {
        Ok(self
            .entries
            .lock()
            .expect("storage poisoned")
            .get(namespace)
            .cloned())
    }

    fn set(&self, namespace: &str, value: &str) -> io::Result<()> {
        self.entries
            .lock()
            .expect("storage poisoned")
            .insert(namespace.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, namespace: &str) -> io::Result<()> {
        self.entries
            .lock()
            .expect("storage poisoned")
            .remove(namespace);
        Ok(())
    }
}

// =============================================================================
// Versioned Snapshot Envelope
// =============================================================================

#[derive(Serialize)]
struct EnvelopeOut<'a, T: Serialize> {
    schema_version: u32,
    data: &'a T,
}

#[derive(Deserialize)]
struct EnvelopeIn<T> {
    schema_version: u32,
    data: T,
}

/// Writes a snapshot under `namespace`, best-effort.
pub(crate) fn persist_snapshot<T: Serialize>(storage: &dyn KvStorage, namespace: &str, data: &T) {
    let envelope = EnvelopeOut {
        schema_version: SNAPSHOT_SCHEMA_VERSION,
        data,
    };

    match serde_json::to_string(&envelope) {
        Ok(json) => {
            if let Err(err) = storage.set(namespace, &json) {
                warn!(namespace = %namespace, error = %err, "Failed to persist snapshot");
            }
        }
        Err(err) => {
            warn!(namespace = %namespace, error = %err, "Failed to serialize snapshot");
        }
    }
}

/// Reads a snapshot back, discarding unreadable or version-mismatched data.
pub(crate) fn load_snapshot<T: DeserializeOwned>(
    storage: &dyn KvStorage,
    namespace: &str,
) -> Option<T> {
    let raw = match storage.get(namespace) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(err) => {
            warn!(namespace = %namespace, error = %err, "Failed to read snapshot");
            return None;
        }
    };

    match serde_json::from_str::<EnvelopeIn<T>>(&raw) {
        Ok(envelope) if envelope.schema_version == SNAPSHOT_SCHEMA_VERSION => Some(envelope.data),
        Ok(envelope) => {
            warn!(
                namespace = %namespace,
                found = envelope.schema_version,
                expected = SNAPSHOT_SCHEMA_VERSION,
                "Discarding snapshot with mismatched schema version"
            );
            None
        }
        Err(err) => {
            warn!(namespace = %namespace, error = %err, "Discarding unreadable snapshot");
            None
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        name: String,
        count: u32,
    }

    #[test]
    fn test_snapshot_round_trip() {
        let storage = MemoryStorage::new();
        let sample = Sample {
            name: "fleet".to_string(),
            count: 3,
        };

        persist_snapshot(&storage, "test-storage", &sample);
        let restored: Sample = load_snapshot(&storage, "test-storage").unwrap();
        assert_eq!(restored, sample);
    }

    #[test]
    fn test_missing_snapshot_is_none() {
        let storage = MemoryStorage::new();
        let restored: Option<Sample> = load_snapshot(&storage, "absent");
        assert!(restored.is_none());
    }

    #[test]
    fn test_version_mismatch_discarded() {
        let storage = MemoryStorage::new();
        storage
            .set(
                "test-storage",
                r#"{"schema_version":99,"data":{"name":"old","count":1}}"#,
            )
            .unwrap();

        let restored: Option<Sample> = load_snapshot(&storage, "test-storage");
        assert!(restored.is_none());
    }

    #[test]
    fn test_garbage_discarded() {
        let storage = MemoryStorage::new();
        storage.set("test-storage", "not json at all").unwrap();

        let restored: Option<Sample> = load_snapshot(&storage, "test-storage");
        assert!(restored.is_none());
    }

    #[test]
    fn test_file_storage_round_trip() {
        let dir = std::env::temp_dir().join(format!("drivelink-test-{}", uuid::Uuid::new_v4()));
        let storage = FileStorage::new(&dir).unwrap();

        assert_eq!(storage.get("ns").unwrap(), None);
        storage.set("ns", "{\"a\":1}").unwrap();
        assert_eq!(storage.get("ns").unwrap().as_deref(), Some("{\"a\":1}"));

        storage.remove("ns").unwrap();
        assert_eq!(storage.get("ns").unwrap(), None);
        // Removing twice is fine
        storage.remove("ns").unwrap();

        std::fs::remove_dir_all(&dir).ok();
    }
}
