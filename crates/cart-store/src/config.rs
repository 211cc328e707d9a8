//! # Store Configuration
//!
//! Where and under which key the cart snapshot lives.
//! Loaded from environment variables or a TOML document.

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use cart_core::{BoxedKeyValueStore, CartError, CartResult, MemoryStore};
use cart_file::{FileStore, FileStoreConfig, DEFAULT_DATA_DIR, MAX_KEY_LEN};

/// Storage key used by the storefront app
pub const DEFAULT_STORAGE_KEY: &str = "@GoMarketplace:cart";

/// Durable storage backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// In-process only, nothing survives a restart
    Memory,
    /// One JSON file per key under `data_dir`
    File,
}

impl StorageBackend {
    /// Returns the config name of this backend
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageBackend::Memory => "memory",
            StorageBackend::File => "file",
        }
    }
}

impl Default for StorageBackend {
    fn default() -> Self {
        StorageBackend::File
    }
}

impl FromStr for StorageBackend {
    type Err = CartError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StorageBackend::Memory),
            "file" => Ok(StorageBackend::File),
            other => Err(CartError::Configuration(format!(
                "unknown storage backend {other:?} (expected memory or file)"
            ))),
        }
    }
}

impl std::fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cart store configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Key the snapshot is stored under
    pub storage_key: String,

    /// Storage backend
    pub backend: StorageBackend,

    /// Data directory for the file backend
    pub data_dir: PathBuf,
}

impl StoreConfig {
    /// Load from environment variables.
    ///
    /// Optional env vars:
    /// - `CART_STORAGE_KEY` (default `@GoMarketplace:cart`)
    /// - `CART_STORAGE_BACKEND`: `memory` or `file` (default `file`)
    /// - `CART_DATA_DIR` (default `.cart`)
    pub fn from_env() -> CartResult<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();
        let config = Self {
            storage_key: std::env::var("CART_STORAGE_KEY").unwrap_or(defaults.storage_key),
            backend: match std::env::var("CART_STORAGE_BACKEND") {
                Ok(value) => value.parse()?,
                Err(_) => defaults.backend,
            },
            data_dir: std::env::var("CART_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
        };
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML document; missing fields take their defaults
    pub fn from_toml(toml_str: &str) -> CartResult<Self> {
        let config: StoreConfig = toml::from_str(toml_str)
            .map_err(|e| CartError::Configuration(format!("invalid store config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> CartResult<()> {
        if self.storage_key.trim().is_empty() {
            return Err(CartError::Configuration(
                "storage_key must not be empty".to_string(),
            ));
        }
        if self.backend == StorageBackend::File && self.storage_key.len() > MAX_KEY_LEN {
            return Err(CartError::Configuration(format!(
                "storage_key must be at most {MAX_KEY_LEN} bytes for the file backend"
            )));
        }
        if self.backend == StorageBackend::File && self.data_dir.as_os_str().is_empty() {
            return Err(CartError::Configuration(
                "data_dir must not be empty for the file backend".to_string(),
            ));
        }
        Ok(())
    }

    /// Builder: set the storage key
    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }

    /// Builder: use in-memory storage
    pub fn in_memory(mut self) -> Self {
        self.backend = StorageBackend::Memory;
        self
    }

    /// Builder: use file storage under `dir`
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.backend = StorageBackend::File;
        self.data_dir = dir.into();
        self
    }

    /// Create the configured storage backend
    pub fn build_storage(&self) -> CartResult<BoxedKeyValueStore> {
        self.validate()?;
        let storage: BoxedKeyValueStore = match self.backend {
            StorageBackend::Memory => Arc::new(MemoryStore::new()),
            StorageBackend::File => {
                Arc::new(FileStore::new(FileStoreConfig::new(self.data_dir.clone())))
            }
        };
        Ok(storage)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            backend: StorageBackend::default(),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
        }
    }
}
