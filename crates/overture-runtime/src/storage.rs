#![forbid(unsafe_code)]

//! Durable key/value storage for client-side flags.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         SkipFlag                              │
//! │   - one fixed key, value "1" means set                        │
//! │   - swallows and logs every StorageError                      │
//! └──────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     StorageBackend                            │
//! │   - MemoryStorage: in-process map (tests, ephemeral)          │
//! │   - DisabledStorage: always unavailable                       │
//! │   - FileStorage: JSON file (requires file-storage)            │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Design Invariants
//!
//! 1. **Graceful degradation**: backends return `Result`; callers above this
//!    module never surface storage failures to the user.
//! 2. **Durable on return**: a successful `set` has reached stable storage
//!    (file storage writes a temp file, syncs it, then renames).
//! 3. **String values**: values are opaque strings, mirroring browser
//!    `localStorage`.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | `StorageError::Io` | File I/O failure | Returned; file left intact |
//! | `StorageError::Serialization` | JSON encode/decode | Returned; read treats as absent |
//! | `StorageError::Unavailable` | Storage disabled | Returned; read treats as absent |
//! | Missing key | First visit | `Ok(None)` |

use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;

// ─────────────────────────────────────────────────────────────────────────────
// Error Types
// ─────────────────────────────────────────────────────────────────────────────

/// Errors from storage backends.
#[derive(Debug)]
pub enum StorageError {
    /// I/O error during file operations.
    Io(std::io::Error),
    /// The stored document could not be encoded or decoded.
    Serialization(String),
    /// Backend cannot be used (disabled, quota, poisoned lock).
    Unavailable(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Io(e) => write!(f, "I/O error: {e}"),
            StorageError::Serialization(msg) => write!(f, "serialization error: {msg}"),
            StorageError::Unavailable(msg) => write!(f, "storage unavailable: {msg}"),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::Io(e) => Some(e),
            StorageError::Serialization(_) | StorageError::Unavailable(_) => None,
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        StorageError::Io(e)
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

// ─────────────────────────────────────────────────────────────────────────────
// Storage Backend Trait
// ─────────────────────────────────────────────────────────────────────────────

/// Pluggable string key/value store.
pub trait StorageBackend: Send + Sync {
    /// Human-readable name for logging.
    fn name(&self) -> &str;

    /// Value stored under `key`, if any.
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Store `value` under `key`. Durable once this returns `Ok`.
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Delete `key`. Deleting a missing key is not an error.
    fn remove(&self, key: &str) -> StorageResult<()>;

    /// Whether the backend looks usable.
    fn is_available(&self) -> bool {
        true
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Memory Storage
// ─────────────────────────────────────────────────────────────────────────────

/// In-process storage. Lost on exit.
#[derive(Default)]
pub struct MemoryStorage {
    data: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `entries`.
    #[must_use]
    pub fn with_entries<K: Into<String>, V: Into<String>>(
        entries: impl IntoIterator<Item = (K, V)>,
    ) -> Self {
        Self {
            data: RwLock::new(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }
}

fn poisoned<T>(_: T) -> StorageError {
    StorageError::Unavailable("lock poisoned".into())
}

impl StorageBackend for MemoryStorage {
    fn name(&self) -> &str {
        "MemoryStorage"
    }

    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.data.read().map_err(poisoned)?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.data
            .write()
            .map_err(poisoned)?
            .insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.data.write().map_err(poisoned)?.remove(key);
        Ok(())
    }
}

impl fmt::Debug for MemoryStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self.data.read().map(|g| g.len()).unwrap_or(0);
        f.debug_struct("MemoryStorage")
            .field("entries", &count)
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Disabled Storage
// ─────────────────────────────────────────────────────────────────────────────

/// Storage that refuses every operation, like a browser with storage blocked.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledStorage;

impl StorageBackend for DisabledStorage {
    fn name(&self) -> &str {
        "DisabledStorage"
    }

    fn get(&self, _key: &str) -> StorageResult<Option<String>> {
        Err(StorageError::Unavailable("storage disabled".into()))
    }

    fn set(&self, _key: &str, _value: &str) -> StorageResult<()> {
        Err(StorageError::Unavailable("storage disabled".into()))
    }

    fn remove(&self, _key: &str) -> StorageResult<()> {
        Err(StorageError::Unavailable("storage disabled".into()))
    }

    fn is_available(&self) -> bool {
        false
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// File Storage (requires file-storage feature)
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(feature = "file-storage")]
mod file_storage {
    use super::*;
    use serde::{Deserialize, Serialize};
    use std::fs::{self, File};
    use std::io::{BufReader, BufWriter, Write};
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;

    /// On-disk document.
    #[derive(Serialize, Deserialize, Default)]
    struct StoreFile {
        format_version: u32,
        entries: HashMap<String, String>,
    }

    impl StoreFile {
        const FORMAT_VERSION: u32 = 1;
    }

    /// JSON file storage with atomic replace.
    ///
    /// # File Format
    ///
    /// ```json
    /// {
    ///   "format_version": 1,
    ///   "entries": { "phechaan_intro_skipped": "1" }
    /// }
    /// ```
    ///
    /// Every `set`/`remove` rewrites the whole document:
    /// 1. Write to `{path}.tmp`
    /// 2. Flush and `sync_all`
    /// 3. Rename `{path}.tmp` -> `{path}`
    pub struct FileStorage {
        path: PathBuf,
        /// Serializes read-modify-write cycles within this process.
        write_lock: Mutex<()>,
    }

    impl FileStorage {
        /// Storage at `path`. The file is created on first write.
        #[must_use]
        pub fn new(path: impl AsRef<Path>) -> Self {
            Self {
                path: path.as_ref().to_path_buf(),
                write_lock: Mutex::new(()),
            }
        }

        /// `$XDG_STATE_HOME/overture/{app_name}/storage.json`, falling back
        /// to `~/.local/state` and finally the working directory.
        #[must_use]
        pub fn default_for_app(app_name: &str) -> Self {
            Self::new(state_dir().join("overture").join(app_name).join("storage.json"))
        }

        /// Location of the backing file.
        #[must_use]
        pub fn path(&self) -> &Path {
            &self.path
        }

        fn temp_path(&self) -> PathBuf {
            let mut tmp = self.path.clone();
            tmp.set_extension("json.tmp");
            tmp
        }

        fn load(&self) -> StorageResult<StoreFile> {
            if !self.path.exists() {
                return Ok(StoreFile {
                    format_version: StoreFile::FORMAT_VERSION,
                    entries: HashMap::new(),
                });
            }
            let reader = BufReader::new(File::open(&self.path)?);
            let doc: StoreFile = serde_json::from_reader(reader)
                .map_err(|e| StorageError::Serialization(format!("failed to parse store: {e}")))?;
            if doc.format_version != StoreFile::FORMAT_VERSION {
                tracing::warn!(
                    stored = doc.format_version,
                    expected = StoreFile::FORMAT_VERSION,
                    "storage format version mismatch, ignoring stored entries"
                );
                return Ok(StoreFile {
                    format_version: StoreFile::FORMAT_VERSION,
                    entries: HashMap::new(),
                });
            }
            Ok(doc)
        }

        fn store(&self, doc: &StoreFile) -> StorageResult<()> {
            if let Some(parent) = self.path.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent)?;
                }
            }
            let tmp_path = self.temp_path();
            {
                let mut writer = BufWriter::new(File::create(&tmp_path)?);
                serde_json::to_writer_pretty(&mut writer, doc).map_err(|e| {
                    StorageError::Serialization(format!("failed to encode store: {e}"))
                })?;
                writer.flush()?;
                writer.get_ref().sync_all()?;
            }
            fs::rename(&tmp_path, &self.path)?;
            tracing::debug!(path = %self.path.display(), entries = doc.entries.len(), "storage saved");
            Ok(())
        }

        fn modify(&self, edit: impl FnOnce(&mut HashMap<String, String>)) -> StorageResult<()> {
            let _guard = self.write_lock.lock().map_err(poisoned)?;
            let mut doc = self.load()?;
            edit(&mut doc.entries);
            doc.format_version = StoreFile::FORMAT_VERSION;
            self.store(&doc)
        }
    }

    fn state_dir() -> PathBuf {
        if let Ok(state_home) = std::env::var("XDG_STATE_HOME") {
            return PathBuf::from(state_home);
        }
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(".local").join("state");
        }
        PathBuf::from(".")
    }

    impl StorageBackend for FileStorage {
        fn name(&self) -> &str {
            "FileStorage"
        }

        fn get(&self, key: &str) -> StorageResult<Option<String>> {
            Ok(self.load()?.entries.remove(key))
        }

        fn set(&self, key: &str, value: &str) -> StorageResult<()> {
            self.modify(|entries| {
                entries.insert(key.to_owned(), value.to_owned());
            })
        }

        fn remove(&self, key: &str) -> StorageResult<()> {
            self.modify(|entries| {
                entries.remove(key);
            })
        }

        fn is_available(&self) -> bool {
            let Some(parent) = self.path.parent() else {
                return false;
            };
            if !parent.exists() && fs::create_dir_all(parent).is_err() {
                return false;
            }
            let probe = parent.join(".overture_write_probe");
            if fs::write(&probe, b"probe").is_ok() {
                let _ = fs::remove_file(&probe);
                return true;
            }
            false
        }
    }

    impl fmt::Debug for FileStorage {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.debug_struct("FileStorage")
                .field("path", &self.path)
                .finish()
        }
    }
}

#[cfg(feature = "file-storage")]
pub use file_storage::FileStorage;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_round_trip_and_remove() {
        let store = MemoryStorage::new();
        assert_eq!(store.get("k").unwrap(), None);
        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
        store.remove("k").unwrap();
        store.remove("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn memory_with_entries() {
        let store = MemoryStorage::with_entries([("a", "1")]);
        assert_eq!(store.get("a").unwrap().as_deref(), Some("1"));
    }

    #[test]
    fn disabled_refuses_everything() {
        let store = DisabledStorage;
        assert!(!store.is_available());
        assert!(matches!(store.get("k"), Err(StorageError::Unavailable(_))));
        assert!(store.set("k", "1").is_err());
        assert!(store.remove("k").is_err());
    }

    #[test]
    fn error_display() {
        let e = StorageError::Unavailable("quota".into());
        assert_eq!(e.to_string(), "storage unavailable: quota");
        let io = StorageError::from(std::io::Error::other("disk"));
        assert!(std::error::Error::source(&io).is_some());
    }

    #[cfg(feature = "file-storage")]
    mod file {
        use super::super::*;

        #[test]
        fn file_round_trip_and_no_temp_left() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("nested").join("storage.json");
            let store = FileStorage::new(&path);
            assert_eq!(store.get("k").unwrap(), None);
            store.set("k", "1").unwrap();
            assert!(path.exists());
            assert!(!path.with_extension("json.tmp").exists());

            let reopened = FileStorage::new(&path);
            assert_eq!(reopened.get("k").unwrap().as_deref(), Some("1"));
        }

        #[test]
        fn corrupt_file_is_a_serialization_error() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("storage.json");
            std::fs::write(&path, b"{ not json").unwrap();
            let store = FileStorage::new(&path);
            assert!(matches!(store.get("k"), Err(StorageError::Serialization(_))));
        }

        #[test]
        fn foreign_format_version_reads_empty() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("storage.json");
            std::fs::write(&path, br#"{"format_version":99,"entries":{"k":"1"}}"#).unwrap();
            let store = FileStorage::new(&path);
            assert_eq!(store.get("k").unwrap(), None);
        }
    }
}
