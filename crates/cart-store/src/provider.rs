//! # Cart Provider
//!
//! Scope that owns the cart for one UI context.
//!
//! ```text
//! ┌──────────────┐   mount()    ┌──────────────┐   unmount()   ┌──────────────┐
//! │  Unmounted   │─────────────►│   Mounted    │──────────────►│  Unmounted   │
//! │ use_cart():  │              │ use_cart():  │               │ (durable     │
//! │ Usage error  │              │ CartStore    │               │  copy kept)  │
//! └──────────────┘              └──────────────┘               └──────────────┘
//! ```
//!
//! Components resolve the store once via [`CartProvider::use_cart`] and keep
//! the `CartStore` they were handed; holding one means the scope was valid.

use std::sync::{PoisonError, RwLock};

use tracing::info;

use cart_core::{BoxedKeyValueStore, CartError, CartResult};

use crate::config::StoreConfig;
use crate::store::CartStore;

/// Scoped owner of a [`CartStore`]
#[derive(Debug, Default)]
pub struct CartProvider {
    store: RwLock<Option<CartStore>>,
}

impl CartProvider {
    /// Create an unmounted provider
    pub fn new() -> Self {
        Self::default()
    }

    /// Create and initialize a store over `storage`, and install it.
    ///
    /// Fails with `AlreadyMounted` if the provider already holds a store.
    pub async fn mount(
        &self,
        storage: BoxedKeyValueStore,
        config: &StoreConfig,
    ) -> CartResult<CartStore> {
        if self.is_mounted() {
            return Err(CartError::AlreadyMounted);
        }

        let store = CartStore::new(storage, config.storage_key.clone());
        store.initialize().await?;

        let mut slot = self.store.write().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            return Err(CartError::AlreadyMounted);
        }
        *slot = Some(store.clone());

        info!(
            backend = store.backend_name(),
            key = %store.storage_key(),
            items = store.collection().len(),
            "cart provider mounted"
        );
        Ok(store)
    }

    /// Mount using the backend selected by `config`
    pub async fn mount_from_config(&self, config: &StoreConfig) -> CartResult<CartStore> {
        let storage = config.build_storage()?;
        self.mount(storage, config).await
    }

    /// The mounted store.
    ///
    /// Fails fast with a `Usage` error when called outside a mounted scope.
    pub fn use_cart(&self) -> CartResult<CartStore> {
        self.store
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(CartError::Usage {
                accessor: "use_cart",
            })
    }

    /// Check if a store is mounted
    pub fn is_mounted(&self) -> bool {
        self.store
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Tear down the scope and release its store.
    ///
    /// The durable snapshot is left in place for the next mount. Pending
    /// writes still complete once the last handle is dropped.
    pub fn unmount(&self) -> Option<CartStore> {
        let released = self
            .store
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if released.is_some() {
            info!("cart provider unmounted");
        }
        released
    }
}
