//! # cart-core
//!
//! Core types and traits for the lightning-cart storefront cart.
//!
//! This crate provides:
//! - `CartItem` and `CartProduct` for cart line items
//! - `CartCollection`, the ordered, id-unique item list and its commands
//! - `KeyValueStore` trait for durable snapshot storage, plus `MemoryStore`
//! - `CartError` for typed error handling
//!
//! ## Example
//!
//! ```rust
//! use cart_core::{CartCollection, CartProduct};
//!
//! let mut cart = CartCollection::new();
//! cart.add(CartProduct::new("p1", "Shoe", "https://img/shoe.png", 10.0));
//! cart.add(CartProduct::new("p1", "Shoe", "https://img/shoe.png", 10.0));
//! cart.decrement("p1");
//!
//! assert_eq!(cart.get("p1").map(|item| item.quantity), Some(1));
//! ```

pub mod collection;
pub mod error;
pub mod item;
pub mod storage;

// Re-exports for convenience
pub use collection::CartCollection;
pub use error::{CartError, CartResult};
pub use item::{CartItem, CartProduct};
pub use storage::{BoxedKeyValueStore, KeyValueStore, MemoryStore};
