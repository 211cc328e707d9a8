//! # cart-file
//!
//! File-backed snapshot storage for lightning-cart-rs.
//!
//! `FileStore` implements `cart_core::KeyValueStore` with one JSON file per
//! key inside a data directory. Writes are atomic (temp file + rename).
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cart_core::KeyValueStore;
//! use cart_file::{FileStore, FileStoreConfig};
//!
//! // From CART_DATA_DIR, or explicitly
//! let store = FileStore::from_env()?;
//! let store = FileStore::new(FileStoreConfig::new("/var/lib/storefront"));
//!
//! store.set_item("@GoMarketplace:cart", "[]").await?;
//! ```

pub mod config;
pub mod store;

// Re-exports
pub use config::{FileStoreConfig, DEFAULT_DATA_DIR};
pub use store::{FileStore, MAX_KEY_LEN};
