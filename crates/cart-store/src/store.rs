//! # Cart Store
//!
//! Owns the authoritative in-memory cart and mirrors it into durable storage.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart Store Operations                                │
//! │                                                                         │
//! │  UI Action            Command              State Change                 │
//! │  ─────────            ───────              ────────────                 │
//! │                                                                         │
//! │  Tap "Add" ─────────► add_to_cart() ─────► push / replace in place      │
//! │  Tap "+" ───────────► increment() ───────► qty + 1                      │
//! │  Tap "-" ───────────► decrement() ───────► max(qty - 1, 1)              │
//! │                                                                         │
//! │  Every change: new Arc<CartCollection> installed ──► subscribers        │
//! │                                                  └─► snapshot writer    │
//! │  Unchanged (unknown id, qty already 1): nothing emitted or written.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Commands are synchronous with respect to memory: each one is an atomic
//! read-modify-write of the watch channel value, so commands apply in the
//! order they are issued. Persistence is asynchronous; use [`CartStore::flush`]
//! to wait for it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use cart_core::{BoxedKeyValueStore, CartCollection, CartError, CartProduct, CartResult};

use crate::config::StoreConfig;
use crate::subscription::{CartCallback, Subscribers, Subscription};
use crate::writer::{PersistStatus, Writer};

/// A cart value together with its mutation counter
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CartSnapshot {
    /// Incremented on every state change
    pub version: u64,

    /// The immutable collection at this version
    pub collection: Arc<CartCollection>,
}

struct Shared {
    state: watch::Sender<CartSnapshot>,
    subscribers: Arc<Subscribers>,
    storage: BoxedKeyValueStore,
    storage_key: String,
    initialized: AtomicBool,
    writer: OnceLock<Writer>,
}

/// Handle to the cart state.
///
/// Cheap to clone; every clone addresses the same cart. UI components take
/// a `CartStore` in their constructor.
#[derive(Clone)]
pub struct CartStore {
    shared: Arc<Shared>,
}

impl CartStore {
    /// Create an empty, uninitialized store
    pub fn new(storage: BoxedKeyValueStore, storage_key: impl Into<String>) -> Self {
        let (state, _) = watch::channel(CartSnapshot::default());
        Self {
            shared: Arc::new(Shared {
                state,
                subscribers: Arc::new(Subscribers::default()),
                storage,
                storage_key: storage_key.into(),
                initialized: AtomicBool::new(false),
                writer: OnceLock::new(),
            }),
        }
    }

    /// Build storage from `config`, then create and initialize a store
    pub async fn from_config(config: &StoreConfig) -> CartResult<Self> {
        let storage = config.build_storage()?;
        let store = Self::new(storage, config.storage_key.clone());
        store.initialize().await?;
        Ok(store)
    }

    /// Load the durable snapshot and start the background writer.
    ///
    /// A missing snapshot leaves the cart empty. An unreadable or malformed
    /// one is logged and treated as missing.
    pub async fn initialize(&self) -> CartResult<()> {
        if self.shared.initialized.swap(true, Ordering::AcqRel) {
            return Err(CartError::AlreadyInitialized);
        }

        // Subscribe before loading so no later change can be missed.
        let state_rx = self.shared.state.subscribe();

        let settled_version = match self.load_snapshot().await {
            Some(collection) => {
                info!(
                    backend = self.shared.storage.backend_name(),
                    items = collection.len(),
                    "cart restored from storage"
                );
                let collection = Arc::new(collection);
                let mut version = 0;
                self.shared.state.send_modify(|snapshot| {
                    snapshot.version += 1;
                    snapshot.collection = collection;
                    version = snapshot.version;
                });
                self.notify_subscribers();
                version
            }
            None => 0,
        };

        let writer = Writer::spawn(
            self.shared.storage.clone(),
            self.shared.storage_key.clone(),
            state_rx,
            settled_version,
        );
        // `initialized` guards this slot, so it is always empty here.
        let _ = self.shared.writer.set(writer);

        Ok(())
    }

    async fn load_snapshot(&self) -> Option<CartCollection> {
        let backend = self.shared.storage.backend_name();
        let raw = match self.shared.storage.get_item(&self.shared.storage_key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!(backend, "no stored cart");
                return None;
            }
            Err(e) => {
                warn!(backend, error = %e, "cart snapshot read failed, starting empty");
                return None;
            }
        };

        match CartCollection::from_json(&raw) {
            Ok(collection) => Some(collection),
            Err(e) => {
                warn!(backend, error = %e, "ignoring malformed cart snapshot");
                None
            }
        }
    }

    /// Add a product, or bump its quantity if it is already in the cart.
    ///
    /// When the product is present, its stored title, image and price are
    /// replaced by the ones passed here.
    pub fn add_to_cart(&self, product: CartProduct) {
        debug!(product_id = %product.id, "add_to_cart");
        self.apply(|cart| {
            let price = product.price;
            let added = cart.add(product);
            if !added {
                warn!(price, "ignoring product with non-finite price");
            }
            added
        });
    }

    /// Increase the quantity of `id` by one. Unknown ids are ignored.
    pub fn increment(&self, id: &str) {
        debug!(product_id = %id, "increment");
        self.apply(|cart| cart.increment(id));
    }

    /// Decrease the quantity of `id` by one, never below 1. Unknown ids are
    /// ignored.
    pub fn decrement(&self, id: &str) {
        debug!(product_id = %id, "decrement");
        self.apply(|cart| cart.decrement(id));
    }

    fn apply<F>(&self, mutate: F)
    where
        F: FnOnce(&mut CartCollection) -> bool,
    {
        let changed = self.shared.state.send_if_modified(|snapshot| {
            let mut next = CartCollection::clone(&snapshot.collection);
            if !mutate(&mut next) {
                return false;
            }
            snapshot.version += 1;
            snapshot.collection = Arc::new(next);
            true
        });

        if changed {
            self.notify_subscribers();
        }
    }

    /// Deliver the newest snapshot to every callback that has not seen it.
    ///
    /// Callbacks always receive the state current at delivery time, never an
    /// older one, even when commands race or are issued from a callback.
    fn notify_subscribers(&self) {
        self.shared
            .subscribers
            .notify(|| self.shared.state.borrow().clone());
    }

    /// The current cart
    pub fn collection(&self) -> Arc<CartCollection> {
        self.shared.state.borrow().collection.clone()
    }

    /// The current cart and its version
    pub fn snapshot(&self) -> CartSnapshot {
        self.shared.state.borrow().clone()
    }

    /// Number of state changes so far
    pub fn version(&self) -> u64 {
        self.shared.state.borrow().version
    }

    /// Receiver that yields every new cart value, for async consumers
    pub fn watch(&self) -> watch::Receiver<CartSnapshot> {
        self.shared.state.subscribe()
    }

    /// Register a callback invoked with each new collection.
    ///
    /// The callback stays registered until the returned guard is dropped.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(Arc<CartCollection>) + Send + Sync + 'static,
    {
        let callback: CartCallback = Arc::new(callback);
        let id = self.shared.subscribers.insert(callback, self.version());
        Subscription::new(id, &self.shared.subscribers)
    }

    /// Number of registered callbacks
    pub fn subscriber_count(&self) -> usize {
        self.shared.subscribers.len()
    }

    /// Wait until every change made before this call has been written (or
    /// has failed to write). Returns immediately before `initialize`.
    pub async fn flush(&self) {
        let target = self.version();
        if let Some(writer) = self.shared.writer.get() {
            writer.wait_settled(target).await;
        }
    }

    /// Background writer progress
    pub fn persist_status(&self) -> PersistStatus {
        self.shared
            .writer
            .get()
            .map(Writer::status)
            .unwrap_or_default()
    }

    /// Check if `initialize` has run
    pub fn is_initialized(&self) -> bool {
        self.shared.initialized.load(Ordering::Acquire)
    }

    /// Key the snapshot is stored under
    pub fn storage_key(&self) -> &str {
        &self.shared.storage_key
    }

    /// Name of the storage backend
    pub fn backend_name(&self) -> &'static str {
        self.shared.storage.backend_name()
    }
}

impl std::fmt::Debug for CartStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartStore")
            .field("storage_key", &self.shared.storage_key)
            .field("backend", &self.backend_name())
            .field("version", &self.version())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cart_core::{KeyValueStore, MemoryStore};
    use std::sync::Mutex;

    const KEY: &str = "@GoMarketplace:cart";

    fn shoe() -> CartProduct {
        CartProduct::new("p1", "Shoe", "u", 10.0)
    }

    async fn open(memory: &Arc<MemoryStore>) -> CartStore {
        let store = CartStore::new(memory.clone(), KEY);
        store.initialize().await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_initialize_twice_fails() {
        let store = open(&Arc::new(MemoryStore::new())).await;

        assert!(matches!(
            store.initialize().await,
            Err(CartError::AlreadyInitialized)
        ));
    }

    #[tokio::test]
    async fn test_noop_commands_emit_nothing() {
        let store = open(&Arc::new(MemoryStore::new())).await;
        store.add_to_cart(shoe());
        let version = store.version();

        store.increment("missing-id");
        store.decrement("p1");
        store.decrement("missing-id");

        assert_eq!(store.version(), version);
    }

    #[tokio::test]
    async fn test_collections_are_immutable_values() {
        let store = open(&Arc::new(MemoryStore::new())).await;
        store.add_to_cart(shoe());
        let before = store.collection();

        store.increment("p1");

        assert_eq!(before.get("p1").unwrap().quantity, 1);
        assert_eq!(store.collection().get("p1").unwrap().quantity, 2);
    }

    #[tokio::test]
    async fn test_subscriber_sees_each_change() {
        let store = open(&Arc::new(MemoryStore::new())).await;
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let _subscription = store.subscribe(move |cart| {
            sink.lock().unwrap().push(cart.total_quantity());
        });

        store.add_to_cart(shoe());
        store.increment("p1");
        store.increment("missing-id");
        store.decrement("p1");

        assert_eq!(*seen.lock().unwrap(), vec![1, 2, 1]);
    }

    #[tokio::test]
    async fn test_callback_may_issue_commands() {
        let store = open(&Arc::new(MemoryStore::new())).await;
        let inner = store.clone();
        store
            .subscribe(move |cart| {
                if cart.get("p1").map(|item| item.quantity) == Some(1) {
                    inner.increment("p1");
                }
            })
            .detach();

        store.add_to_cart(shoe());

        assert_eq!(store.collection().get("p1").unwrap().quantity, 2);
    }

    #[tokio::test]
    async fn test_command_from_callback_reaches_every_subscriber() {
        let store = open(&Arc::new(MemoryStore::new())).await;
        let inner = store.clone();
        let _bumper = store.subscribe(move |cart| {
            if cart.get("p1").map(|item| item.quantity) == Some(1) {
                inner.increment("p1");
            }
        });
        let last = Arc::new(Mutex::new(Vec::new()));
        let sink = last.clone();
        let _observer = store.subscribe(move |cart| {
            sink.lock().unwrap().push(cart.get("p1").map(|item| item.quantity));
        });

        store.add_to_cart(shoe());

        assert_eq!(store.collection().get("p1").unwrap().quantity, 2);
        assert_eq!(*last.lock().unwrap(), vec![Some(2)]);
    }

    #[tokio::test]
    async fn test_concurrent_commands_notify_in_order() {
        let store = open(&Arc::new(MemoryStore::new())).await;
        store.add_to_cart(shoe());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let _subscription = store.subscribe(move |cart| {
            sink.lock().unwrap().push(cart.total_quantity());
        });

        std::thread::scope(|scope| {
            for _ in 0..4 {
                let store = store.clone();
                scope.spawn(move || {
                    for _ in 0..50 {
                        store.increment("p1");
                    }
                });
            }
        });

        let seen = seen.lock().unwrap();
        assert!(seen.windows(2).all(|pair| pair[0] < pair[1]), "{seen:?}");
        assert_eq!(seen.last().copied(), Some(201));
        assert_eq!(store.collection().total_quantity(), 201);
    }

    #[tokio::test]
    async fn test_non_finite_price_is_ignored() {
        let memory = Arc::new(MemoryStore::new());
        let store = open(&memory).await;
        store.add_to_cart(shoe());
        let version = store.version();

        store.add_to_cart(CartProduct::new("p1", "Shoe", "u", f64::NAN));
        store.add_to_cart(CartProduct::new("p2", "Hat", "h", f64::INFINITY));
        store.flush().await;

        assert_eq!(store.version(), version);
        assert_eq!(store.collection().items(), &[shoe().with_quantity(1)]);
        let stored = memory.get_item(KEY).await.unwrap().unwrap();
        assert_eq!(CartCollection::from_json(&stored).unwrap(), *store.collection());
    }

    #[tokio::test]
    async fn test_watch_receiver_observes_changes() {
        let store = open(&Arc::new(MemoryStore::new())).await;
        let mut rx = store.watch();

        store.add_to_cart(shoe());

        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().collection.len(), 1);
    }

    #[tokio::test]
    async fn test_rapid_mutations_coalesce_into_one_write() {
        let memory = Arc::new(MemoryStore::new());
        let store = open(&memory).await;

        for _ in 0..10 {
            store.add_to_cart(shoe());
        }
        store.flush().await;

        let status = store.persist_status();
        assert_eq!(status.settled_version, 10);
        assert_eq!(status.last_written_version, Some(10));

        let stored = memory.get_item(KEY).await.unwrap().unwrap();
        let reloaded = CartCollection::from_json(&stored).unwrap();
        assert_eq!(reloaded.get("p1").unwrap().quantity, 10);
    }

    #[tokio::test]
    async fn test_loaded_snapshot_is_not_rewritten() {
        let json = r#"[{"id":"p1","title":"Shoe","image_url":"u","price":10,"quantity":3}]"#;
        let memory = Arc::new(MemoryStore::new().with_item(KEY, json));
        let store = open(&memory).await;

        store.flush().await;

        assert_eq!(store.collection().get("p1").unwrap().quantity, 3);
        assert_eq!(store.persist_status().last_written_version, None);
        assert_eq!(memory.get_item(KEY).await.unwrap().as_deref(), Some(json));
    }

    #[tokio::test]
    async fn test_flush_before_initialize_returns() {
        let store = CartStore::new(Arc::new(MemoryStore::new()), KEY);
        store.add_to_cart(shoe());

        store.flush().await;

        assert!(!store.is_initialized());
        assert_eq!(store.persist_status(), PersistStatus::default());
    }

    #[tokio::test]
    async fn test_mutation_before_initialize_is_persisted_when_nothing_stored() {
        let memory = Arc::new(MemoryStore::new());
        let store = CartStore::new(memory.clone(), KEY);
        store.add_to_cart(shoe());

        store.initialize().await.unwrap();
        store.flush().await;

        assert!(memory.get_item(KEY).await.unwrap().is_some());
    }
}
