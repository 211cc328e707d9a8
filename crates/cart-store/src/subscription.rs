//! # Cart Subscriptions
//!
//! Callback registry notified with every new cart collection.
//!
//! Delivery is serialized: one thread at a time walks the callbacks, always
//! handing out the latest snapshot, and each subscriber only ever sees
//! versions newer than the last one it received. A command issued from a
//! callback (or from another thread mid-delivery) just marks delivery as
//! pending; the delivering thread picks it up in another pass. Callbacks are
//! cloned out of the registry before being invoked, so they may also
//! (un)subscribe without deadlocking.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use cart_core::CartCollection;

use crate::store::CartSnapshot;

/// Callback invoked with the new collection after each change
pub type CartCallback = Arc<dyn Fn(Arc<CartCollection>) + Send + Sync>;

#[derive(Clone)]
struct Entry {
    id: u64,
    callback: CartCallback,
    seen_version: Arc<AtomicU64>,
}

#[derive(Default)]
pub(crate) struct Subscribers {
    next_id: AtomicU64,
    entries: Mutex<Vec<Entry>>,
    pending: AtomicBool,
    delivering: AtomicBool,
}

/// Clears the delivering flag, also when a callback panics
struct DeliveryGuard<'a>(&'a AtomicBool);

impl Drop for DeliveryGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl Subscribers {
    fn lock(&self) -> MutexGuard<'_, Vec<Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register `callback` as having already seen `current_version`
    pub(crate) fn insert(&self, callback: CartCallback, current_version: u64) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.lock().push(Entry {
            id,
            callback,
            seen_version: Arc::new(AtomicU64::new(current_version)),
        });
        id
    }

    pub(crate) fn remove(&self, id: u64) -> bool {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|entry| entry.id != id);
        entries.len() != before
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    /// Bring every subscriber up to the snapshot returned by `latest`.
    pub(crate) fn notify<F>(&self, latest: F)
    where
        F: Fn() -> CartSnapshot,
    {
        self.pending.store(true, Ordering::SeqCst);
        loop {
            // Whoever holds the flag re-checks `pending` after clearing it.
            if self
                .delivering
                .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                .is_err()
            {
                return;
            }
            let guard = DeliveryGuard(&self.delivering);

            while self.pending.swap(false, Ordering::SeqCst) {
                let entries: Vec<Entry> = self.lock().clone();
                for entry in entries {
                    let snapshot = latest();
                    let seen = entry
                        .seen_version
                        .fetch_max(snapshot.version, Ordering::SeqCst);
                    if seen < snapshot.version {
                        (entry.callback)(snapshot.collection);
                    }
                }
            }

            drop(guard);
            if !self.pending.load(Ordering::SeqCst) {
                return;
            }
        }
    }
}

/// Guard for a registered callback.
///
/// The callback is unregistered when the guard is dropped.
#[must_use = "dropping a Subscription unregisters its callback"]
pub struct Subscription {
    id: u64,
    subscribers: Weak<Subscribers>,
}

impl Subscription {
    pub(crate) fn new(id: u64, subscribers: &Arc<Subscribers>) -> Self {
        Self {
            id,
            subscribers: Arc::downgrade(subscribers),
        }
    }

    /// Unregister the callback now
    pub fn unsubscribe(self) {
        drop(self);
    }

    /// Keep the callback registered for the lifetime of the store
    pub fn detach(mut self) {
        self.subscribers = Weak::new();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(subscribers) = self.subscribers.upgrade() {
            subscribers.remove(self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
