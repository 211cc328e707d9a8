//! # File Store Configuration
//!
//! Configuration for the file-backed snapshot store.
//! Values are loaded from environment variables.

use cart_core::CartError;
use std::env;
use std::path::PathBuf;

/// Default data directory, relative to the working directory
pub const DEFAULT_DATA_DIR: &str = ".cart";

/// File store configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStoreConfig {
    /// Directory holding one file per key
    pub data_dir: PathBuf,

    /// Create `data_dir` on first write if missing
    pub create_dirs: bool,
}

impl FileStoreConfig {
    /// Load configuration from environment variables.
    ///
    /// Optional env vars:
    /// - `CART_DATA_DIR` (default `.cart`)
    pub fn from_env() -> Result<Self, CartError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let data_dir = match env::var("CART_DATA_DIR") {
            Ok(dir) if dir.trim().is_empty() => {
                return Err(CartError::Configuration(
                    "CART_DATA_DIR must not be empty".to_string(),
                ));
            }
            Ok(dir) => PathBuf::from(dir),
            Err(_) => PathBuf::from(DEFAULT_DATA_DIR),
        };

        Ok(Self::new(data_dir))
    }

    /// Create config with an explicit directory
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            create_dirs: true,
        }
    }

    /// Builder: require the directory to exist already
    pub fn without_create_dirs(mut self) -> Self {
        self.create_dirs = false;
        self
    }
}

impl Default for FileStoreConfig {
    fn default() -> Self {
        Self::new(DEFAULT_DATA_DIR)
    }
}
