//! # Cart Item Types
//!
//! Line items held in the cart and the product descriptors used to add them.
//! Field names match the persisted snapshot: `id`, `title`, `image_url`,
//! `price`, `quantity`.

use serde::{Deserialize, Serialize};

/// A product as passed to `add_to_cart` (a cart item without a quantity)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartProduct {
    /// Product identifier, the cart key
    pub id: String,

    /// Display title
    pub title: String,

    /// Product image reference
    pub image_url: String,

    /// Unit price
    pub price: f64,
}

impl CartProduct {
    /// Create a new product descriptor
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        image_url: impl Into<String>,
        price: f64,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            image_url: image_url.into(),
            price,
        }
    }

    /// Build a cart item from this product with the given quantity
    pub fn with_quantity(self, quantity: u32) -> CartItem {
        CartItem::from_product(self, quantity)
    }
}

/// One distinct product in the cart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    /// Product identifier, unique within a collection
    pub id: String,

    /// Display title
    pub title: String,

    /// Product image reference
    pub image_url: String,

    /// Unit price
    pub price: f64,

    /// Units in cart, never below 1
    pub quantity: u32,
}

impl CartItem {
    /// Create a cart item from a product descriptor
    pub fn from_product(product: CartProduct, quantity: u32) -> Self {
        Self {
            id: product.id,
            title: product.title,
            image_url: product.image_url,
            price: product.price,
            quantity,
        }
    }

    /// The product fields of this item, without the quantity
    pub fn product(&self) -> CartProduct {
        CartProduct {
            id: self.id.clone(),
            title: self.title.clone(),
            image_url: self.image_url.clone(),
            price: self.price,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_from_product() {
        let item = CartProduct::new("p1", "Shoe", "u", 10.0).with_quantity(1);

        assert_eq!(item.id, "p1");
        assert_eq!(item.title, "Shoe");
        assert_eq!(item.image_url, "u");
        assert_eq!(item.price, 10.0);
        assert_eq!(item.quantity, 1);
    }

    #[test]
    fn test_snapshot_field_names() {
        let item = CartProduct::new("p1", "Shoe", "u", 10.5).with_quantity(2);
        let json = serde_json::to_value(&item).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "id": "p1",
                "title": "Shoe",
                "image_url": "u",
                "price": 10.5,
                "quantity": 2
            })
        );
    }

    #[test]
    fn test_product_strips_quantity() {
        let item = CartProduct::new("p1", "Shoe", "u", 10.0).with_quantity(4);
        assert_eq!(item.product(), CartProduct::new("p1", "Shoe", "u", 10.0));
    }
}
