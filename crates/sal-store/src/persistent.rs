//! Typed accessor for the persisted anchor-handle array

use crate::backend::KeyValueStore;
use crate::error::StoreError;
use crate::handle::AnchorHandle;
use std::sync::Arc;

/// Key under which the handle array is stored unless configured otherwise
pub const DEFAULT_HANDLES_KEY: &str = "webxr_ar_anchors_handles";

/// Persisted set of anchor handles
///
/// Always read and written as a whole array. There is a single writer (the
/// session's event handlers), so read-modify-write needs no locking here.
#[derive(Debug, Clone)]
pub struct PersistentHandleStore {
    backend: Arc<dyn KeyValueStore>,
    key: String,
}

impl PersistentHandleStore {
    /// Create accessor using [`DEFAULT_HANDLES_KEY`]
    #[inline]
    #[must_use]
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self::with_key(backend, DEFAULT_HANDLES_KEY)
    }

    /// Create accessor using a custom key
    #[inline]
    #[must_use]
    pub fn with_key(backend: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
        }
    }

    /// Key in use
    #[inline]
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Load the persisted handles in insertion order
    ///
    /// Never fails: an absent key, a `null` value, a read error or anything
    /// that is not a JSON array of strings all yield an empty list.
    #[must_use]
    pub fn load(&self) -> Vec<AnchorHandle> {
        let raw = match self.backend.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                tracing::warn!(key = %self.key, "failed to read persisted handles: {}", e);
                return Vec::new();
            }
        };

        match serde_json::from_str::<Option<Vec<AnchorHandle>>>(&raw) {
            Ok(handles) => handles.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(key = %self.key, "discarding unparsable handle array: {}", e);
                Vec::new()
            }
        }
    }

    /// Overwrite the persisted array
    ///
    /// # Errors
    /// Backend write failures
    pub fn save(&self, handles: &[AnchorHandle]) -> Result<(), StoreError> {
        let encoded = serde_json::to_string(handles)?;
        self.backend.set(&self.key, encoded)?;
        tracing::debug!(key = %self.key, count = handles.len(), "persisted anchor handles");
        Ok(())
    }

    /// Remove the key entirely
    ///
    /// # Errors
    /// Backend write failures
    pub fn clear(&self) -> Result<(), StoreError> {
        self.backend.remove(&self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryStore;
    use pretty_assertions::assert_eq;

    fn handles(raw: &[&str]) -> Vec<AnchorHandle> {
        raw.iter().map(|h| AnchorHandle::new(*h)).collect()
    }

    #[test]
    fn load_missing_key_is_empty() {
        let store = PersistentHandleStore::new(Arc::new(MemoryStore::new()));
        assert!(store.load().is_empty());
    }

    #[test]
    fn load_null_is_empty() {
        let backend = MemoryStore::with_entry(DEFAULT_HANDLES_KEY, "null");
        let store = PersistentHandleStore::new(Arc::new(backend));
        assert!(store.load().is_empty());
    }

    #[test]
    fn load_garbage_is_empty() {
        for raw in ["{not json", "42", r#"{"a":1}"#, "[1,2]", r#"["a",3]"#] {
            let backend = MemoryStore::with_entry(DEFAULT_HANDLES_KEY, raw);
            let store = PersistentHandleStore::new(Arc::new(backend));
            assert!(store.load().is_empty(), "expected empty for {raw}");
        }
    }

    #[test]
    fn save_overwrites_previous_value() {
        let store = PersistentHandleStore::new(Arc::new(MemoryStore::new()));
        store.save(&handles(&["a", "b"])).unwrap();
        store.save(&handles(&["c"])).unwrap();
        assert_eq!(store.load(), handles(&["c"]));
    }

    #[test]
    fn save_empty_writes_empty_array() {
        let backend = Arc::new(MemoryStore::new());
        let store = PersistentHandleStore::new(backend.clone());
        store.save(&[]).unwrap();
        assert_eq!(
            backend.get(DEFAULT_HANDLES_KEY).unwrap().as_deref(),
            Some("[]")
        );
    }

    #[test]
    fn custom_key_is_isolated() {
        let backend: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let a = PersistentHandleStore::with_key(backend.clone(), "a");
        let b = PersistentHandleStore::with_key(backend, "b");

        a.save(&handles(&["x"])).unwrap();
        assert!(b.load().is_empty());
        assert_eq!(a.key(), "a");
    }

    #[test]
    fn clear_removes_key() {
        let store = PersistentHandleStore::new(Arc::new(MemoryStore::new()));
        store.save(&handles(&["a"])).unwrap();
        store.clear().unwrap();
        assert!(store.load().is_empty());
    }
}
