//! # cart-store
//!
//! Persistent, observable cart state for lightning-cart storefronts.
//!
//! This crate provides:
//! - `CartStore`: the in-memory cart, its three commands, subscriptions
//! - A background writer mirroring every change into durable storage
//! - `CartProvider`: scoped access that fails fast outside its scope
//! - `StoreConfig`: env/TOML configuration and backend selection
//!
//! ## Usage
//!
//! ```rust,ignore
//! use cart_core::CartProduct;
//! use cart_store::{CartProvider, StoreConfig};
//!
//! cart_store::telemetry::init_tracing()?;
//!
//! let provider = CartProvider::new();
//! provider.mount_from_config(&StoreConfig::from_env()?).await?;
//!
//! // In a screen:
//! let cart = provider.use_cart()?;
//! let _badge = cart.subscribe(|items| println!("{} in cart", items.total_quantity()));
//! cart.add_to_cart(CartProduct::new("p1", "Shoe", "https://img/shoe.png", 10.0));
//! cart.increment("p1");
//! cart.flush().await;
//! ```

pub mod config;
pub mod provider;
pub mod store;
pub mod subscription;
pub mod telemetry;
pub mod writer;

pub use config::{StorageBackend, StoreConfig, DEFAULT_STORAGE_KEY};
pub use provider::CartProvider;
pub use store::{CartSnapshot, CartStore};
pub use subscription::{CartCallback, Subscription};
pub use writer::PersistStatus;
