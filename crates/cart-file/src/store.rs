//! # File-Backed Key-Value Store
//!
//! Each key is stored as `<data_dir>/<hex(key)>.json`. Hex-encoding keeps
//! keys such as `@GoMarketplace:cart` valid on every filesystem.
//! Writes go to a `.tmp` sibling and are renamed into place, so readers
//! never observe a partially written snapshot.
//!
//! Hex doubles the key length, and most filesystems cap a file name at 255
//! bytes, so keys longer than [`MAX_KEY_LEN`] bytes are rejected.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use cart_core::{CartError, CartResult, KeyValueStore};
use tokio::fs;
use tracing::{debug, instrument};

use crate::config::FileStoreConfig;

const BACKEND: &str = "file";

/// Longest key, in bytes, whose `<hex>.json.tmp` name fits in 255 bytes
pub const MAX_KEY_LEN: usize = 123;

/// File-backed storage
#[derive(Debug, Clone)]
pub struct FileStore {
    config: FileStoreConfig,
}

impl FileStore {
    /// Create a new file store
    pub fn new(config: FileStoreConfig) -> Self {
        Self { config }
    }

    /// Create from environment variables
    pub fn from_env() -> CartResult<Self> {
        let config = FileStoreConfig::from_env()?;
        Ok(Self::new(config))
    }

    /// Directory holding the stored files
    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// File path for `key`
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.config
            .data_dir
            .join(format!("{}.json", hex::encode(key.as_bytes())))
    }

    fn checked_path(&self, key: &str) -> CartResult<PathBuf> {
        if key.len() > MAX_KEY_LEN {
            return Err(CartError::storage(
                BACKEND,
                format!("key is {} bytes, at most {MAX_KEY_LEN} allowed", key.len()),
            ));
        }
        Ok(self.path_for(key))
    }

    fn io_error(err: io::Error) -> CartError {
        CartError::storage(BACKEND, err)
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    #[instrument(skip(self))]
    async fn get_item(&self, key: &str) -> CartResult<Option<String>> {
        match fs::read_to_string(self.checked_path(key)?).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Self::io_error(e)),
        }
    }

    #[instrument(skip(self, value), fields(bytes = value.len()))]
    async fn set_item(&self, key: &str, value: &str) -> CartResult<()> {
        let path = self.checked_path(key)?;
        if self.config.create_dirs {
            fs::create_dir_all(&self.config.data_dir)
                .await
                .map_err(Self::io_error)?;
        }

        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, value).await.map_err(Self::io_error)?;
        fs::rename(&tmp_path, &path).await.map_err(Self::io_error)?;

        debug!(path = %path.display(), "stored item");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn remove_item(&self, key: &str) -> CartResult<()> {
        match fs::remove_file(self.checked_path(key)?).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Self::io_error(e)),
        }
    }

    fn backend_name(&self) -> &'static str {
        BACKEND
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "@GoMarketplace:cart";

    fn store_in(dir: &Path) -> FileStore {
        FileStore::new(FileStoreConfig::new(dir.join("data")))
    }

    #[tokio::test]
    async fn test_missing_key_reads_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());

        assert_eq!(store.get_item(KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());

        store.set_item(KEY, r#"[{"id":"p1"}]"#).await.unwrap();
        store.set_item(KEY, "[]").await.unwrap();

        assert_eq!(store.get_item(KEY).await.unwrap().as_deref(), Some("[]"));
        assert!(store.path_for(KEY).exists());
        assert!(!store.path_for(KEY).with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn test_key_is_hex_encoded() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());

        let file_name = store.path_for("a:b").file_name().unwrap().to_owned();
        assert_eq!(file_name, "613a62.json");
    }

    #[tokio::test]
    async fn test_remove_item() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());

        store.remove_item(KEY).await.unwrap();

        store.set_item(KEY, "[]").await.unwrap();
        store.remove_item(KEY).await.unwrap();
        assert_eq!(store.get_item(KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_write_without_dir_fails_when_not_creating() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(
            FileStoreConfig::new(dir.path().join("absent")).without_create_dirs(),
        );

        let err = store.set_item(KEY, "[]").await.unwrap_err();
        assert!(matches!(err, CartError::Storage { backend: "file", .. }));
    }

    #[tokio::test]
    async fn test_longest_key_fits_file_name_limit() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        let key = "k".repeat(MAX_KEY_LEN);

        store.set_item(&key, "[]").await.unwrap();

        let tmp_name = store.path_for(&key).with_extension("json.tmp");
        assert!(tmp_name.file_name().unwrap().len() <= 255);
        assert_eq!(store.get_item(&key).await.unwrap().as_deref(), Some("[]"));
    }

    #[tokio::test]
    async fn test_overlong_key_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        let key = "k".repeat(MAX_KEY_LEN + 1);

        for result in [
            store.set_item(&key, "[]").await,
            store.get_item(&key).await.map(|_| ()),
            store.remove_item(&key).await,
        ] {
            let err = result.unwrap_err();
            assert!(matches!(err, CartError::Storage { backend: "file", .. }));
        }
        assert!(!dir.path().join("data").exists());
    }
}
