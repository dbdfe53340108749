#![forbid(unsafe_code)]

//! The durable "intro already skipped" flag.

use std::fmt;
use std::sync::Arc;

use crate::storage::StorageBackend;

/// Storage key used when none is configured.
pub const DEFAULT_SKIP_KEY: &str = "phechaan_intro_skipped";

/// The only stored value that counts as "skipped".
const SET_VALUE: &str = "1";

/// One boolean persisted under a fixed key.
///
/// Storage failures never escape: reads degrade to "not skipped" and writes
/// to a logged no-op.
#[derive(Clone)]
pub struct SkipFlag {
    backend: Arc<dyn StorageBackend>,
    key: String,
}

impl fmt::Debug for SkipFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SkipFlag")
            .field("backend", &self.backend.name())
            .field("key", &self.key)
            .finish()
    }
}

impl SkipFlag {
    /// Flag stored under `key` in `backend`.
    pub fn new(backend: Arc<dyn StorageBackend>, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
        }
    }

    /// Key the flag lives under.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Whether the flag was previously set.
    #[must_use]
    pub fn read(&self) -> bool {
        match self.backend.get(&self.key) {
            Ok(Some(value)) => value == SET_VALUE,
            Ok(None) => false,
            Err(e) => {
                tracing::warn!(
                    backend = self.backend.name(),
                    key = %self.key,
                    error = %e,
                    "skip flag unreadable, treating as absent"
                );
                false
            }
        }
    }

    /// Set the flag. Returns whether it reached storage.
    pub fn write(&self) -> bool {
        match self.backend.set(&self.key, SET_VALUE) {
            Ok(()) => {
                tracing::debug!(backend = self.backend.name(), key = %self.key, "skip flag written");
                true
            }
            Err(e) => {
                tracing::warn!(
                    backend = self.backend.name(),
                    key = %self.key,
                    error = %e,
                    "skip flag not persisted"
                );
                false
            }
        }
    }

    /// Forget the flag so the intro plays again.
    pub fn clear(&self) -> bool {
        match self.backend.remove(&self.key) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(backend = self.backend.name(), error = %e, "skip flag not cleared");
                false
            }
        }
    }
}
