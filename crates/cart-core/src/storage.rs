//! # Key-Value Storage Trait
//!
//! Durable key-value storage the cart snapshot is mirrored into.
//! Implementations: in-memory (here), file-backed (`cart-file`).
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   KeyValueStore (trait)                     │
//! │  ├── get_item()                                             │
//! │  ├── set_item()                                             │
//! │  ├── remove_item()                                          │
//! │  └── backend_name()                                         │
//! └─────────────────────────────────────────────────────────────┘
//!                            ▲
//!                  ┌─────────┴─────────┐
//!                  │                   │
//!          ┌───────┴───────┐   ┌───────┴───────┐
//!          │  MemoryStore  │   │   FileStore   │
//!          │  (cart-core)  │   │  (cart-file)  │
//!          └───────────────┘   └───────────────┘
//! ```

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::error::{CartError, CartResult};

/// Local persistent key-value storage.
///
/// Values are whole blobs: `set_item` replaces the stored value for a key,
/// never patches it.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`, or `None` if absent.
    async fn get_item(&self, key: &str) -> CartResult<Option<String>>;

    /// Replace the value stored under `key`.
    async fn set_item(&self, key: &str, value: &str) -> CartResult<()>;

    /// Delete `key`. Removing an absent key succeeds.
    async fn remove_item(&self, key: &str) -> CartResult<()>;

    /// Backend name (for logging).
    fn backend_name(&self) -> &'static str;
}

/// Type alias for a shared storage backend (dynamic dispatch)
pub type BoxedKeyValueStore = Arc<dyn KeyValueStore>;

/// In-process storage, lost on exit
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: seed a value
    pub fn with_item(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        if let Ok(entries) = self.entries.get_mut() {
            entries.insert(key.into(), value.into());
        }
        self
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or_default()
    }

    /// Check if nothing is stored
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn poisoned() -> CartError {
        CartError::storage("memory", "lock poisoned")
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get_item(&self, key: &str) -> CartResult<Option<String>> {
        let entries = self.entries.read().map_err(|_| Self::poisoned())?;
        Ok(entries.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: &str) -> CartResult<()> {
        let mut entries = self.entries.write().map_err(|_| Self::poisoned())?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> CartResult<()> {
        let mut entries = self.entries.write().map_err(|_| Self::poisoned())?;
        entries.remove(key);
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_roundtrip() {
        let store = MemoryStore::new();

        assert_eq!(store.get_item("cart").await.unwrap(), None);

        store.set_item("cart", "[]").await.unwrap();
        assert_eq!(store.get_item("cart").await.unwrap().as_deref(), Some("[]"));

        store.set_item("cart", "[1]").await.unwrap();
        assert_eq!(store.get_item("cart").await.unwrap().as_deref(), Some("[1]"));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_remove_absent_key_succeeds() {
        let store = MemoryStore::new().with_item("a", "1");

        store.remove_item("missing").await.unwrap();
        store.remove_item("a").await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_shared_as_trait_object() {
        let store: BoxedKeyValueStore = Arc::new(MemoryStore::new());
        store.set_item("k", "v").await.unwrap();

        assert_eq!(store.backend_name(), "memory");
        assert_eq!(store.get_item("k").await.unwrap().as_deref(), Some("v"));
    }
}
