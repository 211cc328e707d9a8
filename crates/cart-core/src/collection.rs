//! # Cart Collection
//!
//! Ordered set of cart items keyed by product id.
//!
//! ## Invariants
//! - Items are unique by `id` (adding the same product bumps its quantity)
//! - Every `quantity` is at least 1 (decrement floors at 1, never removes)
//! - Insertion order is preserved; updates replace entries in place
//! - Every `price` is finite (JSON has no NaN or infinity)
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  add(product)   ──► new id:      push { product, qty: 1 }   │
//! │                 ──► existing id: replace { product, qty+1 } │
//! │  increment(id)  ──► qty + 1        (unknown id: no change)  │
//! │  decrement(id)  ──► max(qty-1, 1)  (unknown id: no change)  │
//! └──────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{CartError, CartResult};
use crate::item::{CartItem, CartProduct};

/// Ordered collection of cart items.
///
/// Serializes as a bare JSON array, which is the durable snapshot format.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CartCollection {
    items: Vec<CartItem>,
}

impl CartCollection {
    /// Create an empty collection
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Build a collection from items, checking the invariants
    pub fn from_items(items: Vec<CartItem>) -> CartResult<Self> {
        let collection = Self { items };
        collection.validate()?;
        Ok(collection)
    }

    /// Parse a durable snapshot.
    ///
    /// Fails with `MalformedSnapshot` on invalid JSON, a wrong shape, a
    /// zero quantity or a duplicated id.
    pub fn from_json(json: &str) -> CartResult<Self> {
        let collection: CartCollection = serde_json::from_str(json)
            .map_err(|e| CartError::MalformedSnapshot(e.to_string()))?;
        collection.validate()?;
        Ok(collection)
    }

    /// Serialize to the durable snapshot format.
    ///
    /// Refuses collections that would not parse back, such as a NaN price
    /// (JSON has no encoding for it).
    pub fn to_json(&self) -> CartResult<String> {
        self.validate()?;
        Ok(serde_json::to_string(self)?)
    }

    /// Check the uniqueness, minimum-quantity and finite-price invariants
    pub fn validate(&self) -> CartResult<()> {
        let mut seen = HashSet::with_capacity(self.items.len());
        for item in &self.items {
            if !item.price.is_finite() {
                return Err(CartError::MalformedSnapshot(format!(
                    "item {} has non-finite price",
                    item.id
                )));
            }
            if item.quantity == 0 {
                return Err(CartError::MalformedSnapshot(format!(
                    "item {} has quantity 0",
                    item.id
                )));
            }
            if !seen.insert(item.id.as_str()) {
                return Err(CartError::MalformedSnapshot(format!(
                    "duplicate item id {}",
                    item.id
                )));
            }
        }
        Ok(())
    }

    /// Add a product, or bump its quantity if already present.
    ///
    /// An existing entry is replaced in place by the incoming product's
    /// fields, so a changed title, image or price refreshes the stored one.
    /// Returns false, leaving the cart untouched, if the price is NaN or
    /// infinite.
    pub fn add(&mut self, product: CartProduct) -> bool {
        if !product.price.is_finite() {
            return false;
        }
        match self.position(&product.id) {
            Some(index) => {
                let quantity = self.items[index].quantity.saturating_add(1);
                self.items[index] = CartItem::from_product(product, quantity);
            }
            None => self.items.push(CartItem::from_product(product, 1)),
        }
        true
    }

    /// Increase the quantity of `id` by one.
    ///
    /// Returns false if no item has that id.
    pub fn increment(&mut self, id: &str) -> bool {
        match self.items.iter_mut().find(|item| item.id == id) {
            Some(item) => {
                let next = item.quantity.saturating_add(1);
                let changed = next != item.quantity;
                item.quantity = next;
                changed
            }
            None => false,
        }
    }

    /// Decrease the quantity of `id` by one, flooring at 1.
    ///
    /// Returns false if no item has that id or it is already at 1.
    pub fn decrement(&mut self, id: &str) -> bool {
        match self.items.iter_mut().find(|item| item.id == id) {
            Some(item) if item.quantity > 1 => {
                item.quantity -= 1;
                true
            }
            _ => false,
        }
    }

    /// Find an item by id
    pub fn get(&self, id: &str) -> Option<&CartItem> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Check if an item with `id` is in the cart
    pub fn contains(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    /// Items in insertion order
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    /// Iterate items in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &CartItem> {
        self.items.iter()
    }

    /// Number of distinct products
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the cart is empty
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of all quantities
    pub fn total_quantity(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.items.iter().position(|item| item.id == id)
    }
}

impl<'a> IntoIterator for &'a CartCollection {
    type Item = &'a CartItem;
    type IntoIter = std::slice::Iter<'a, CartItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
