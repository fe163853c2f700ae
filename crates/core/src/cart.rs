//! The visitor cart.
//!
//! A cart is an ordered list of lines, one per product. Each line keeps a
//! snapshot of the product it was added from, and its quantity always stays
//! within `1..=product.stock`.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::product::{CartStockBadge, Product};
use crate::types::{Dinars, ProductId};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CartError {
    #[error("product {0} is out of stock")]
    OutOfStock(ProductId),
    #[error("product {0} is not in the cart")]
    NotInCart(ProductId),
}

/// One cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: ProductId,
    pub product: Product,
    pub quantity: u32,
}

impl CartItem {
    #[must_use]
    pub fn line_total(&self) -> Dinars {
        self.product.price.times(self.quantity)
    }

    #[must_use]
    pub const fn badge(&self) -> Option<CartStockBadge> {
        CartStockBadge::of(self.product.stock)
    }

    /// Quantity bounds for this line, for the `+`/`-` controls.
    #[must_use]
    pub const fn max_quantity(&self) -> u32 {
        clamp_quantity(u32::MAX, self.product.stock)
    }
}

const fn clamp_quantity(requested: u32, stock: u32) -> u32 {
    // A line whose product ran out keeps quantity 1 until it is removed.
    let max = if stock == 0 { 1 } else { stock };
    if requested < 1 {
        1
    } else if requested > max {
        max
    } else {
        requested
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of distinct lines, shown on the navbar badge.
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn total(&self) -> Dinars {
        self.items.iter().map(CartItem::line_total).sum()
    }

    #[must_use]
    pub fn get(&self, product_id: &ProductId) -> Option<&CartItem> {
        self.items.iter().find(|item| &item.product_id == product_id)
    }

    /// Add one unit of `product`.
    ///
    /// A product already in the cart gets its quantity bumped (capped at the
    /// stock) and its snapshot refreshed. Returns the resulting quantity.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::OutOfStock`] when the product has no stock.
    pub fn add(&mut self, product: &Product) -> Result<u32, CartError> {
        if !product.in_stock() {
            return Err(CartError::OutOfStock(product.id.clone()));
        }

        if let Some(item) = self
            .items
            .iter_mut()
            .find(|item| item.product_id == product.id)
        {
            item.quantity = item.quantity.saturating_add(1).min(product.stock);
            item.product = product.clone();
            return Ok(item.quantity);
        }

        self.items.push(CartItem {
            product_id: product.id.clone(),
            product: product.clone(),
            quantity: 1,
        });
        Ok(1)
    }

    /// Set a line's quantity, clamped to `1..=stock`. Returns the stored
    /// quantity.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::NotInCart`] if no line exists for the product.
    pub fn set_quantity(&mut self, product_id: &ProductId, requested: u32) -> Result<u32, CartError> {
        let item = self
            .items
            .iter_mut()
            .find(|item| &item.product_id == product_id)
            .ok_or_else(|| CartError::NotInCart(product_id.clone()))?;
        item.quantity = clamp_quantity(requested, item.product.stock);
        Ok(item.quantity)
    }

    /// Remove a line. Returns whether a line was removed.
    pub fn remove(&mut self, product_id: &ProductId) -> bool {
        let before = self.items.len();
        self.items.retain(|item| &item.product_id != product_id);
        self.items.len() != before
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Replace every snapshot with the current catalog version.
    ///
    /// Quantities are re-clamped to the new stock and lines whose product no
    /// longer exists are dropped.
    pub fn refresh(&mut self, products: &[Product]) {
        let by_id: HashMap<&ProductId, &Product> = products.iter().map(|p| (&p.id, p)).collect();
        self.items.retain_mut(|item| {
            let Some(current) = by_id.get(&item.product_id) else {
                return false;
            };
            item.product = (*current).clone();
            item.quantity = clamp_quantity(item.quantity, item.product.stock);
            true
        });
    }

    /// The per-user mirror document.
    #[must_use]
    pub fn to_remote(&self, now: DateTime<Utc>) -> RemoteCart {
        RemoteCart {
            items: self
                .items
                .iter()
                .map(|item| RemoteCartLine {
                    product_id: item.product_id.clone(),
                    quantity: item.quantity,
                    price: item.product.price,
                })
                .collect(),
            updated_at: now,
        }
    }

    /// Rebuild a cart from the mirror document, taking product snapshots from
    /// `catalog`. Lines for unknown products are skipped.
    #[must_use]
    pub fn from_remote(remote: &RemoteCart, catalog: &[Product]) -> Self {
        let by_id: HashMap<&ProductId, &Product> = catalog.iter().map(|p| (&p.id, p)).collect();
        let mut cart = Self::new();
        for line in &remote.items {
            let Some(product) = by_id.get(&line.product_id) else {
                continue;
            };
            if cart.get(&line.product_id).is_some() {
                continue;
            }
            cart.items.push(CartItem {
                product_id: line.product_id.clone(),
                product: (*product).clone(),
                quantity: clamp_quantity(line.quantity, product.stock),
            });
        }
        cart
    }
}

/// `users/{uid}/cart/items`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteCart {
    pub items: Vec<RemoteCartLine>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteCartLine {
    pub product_id: ProductId,
    pub quantity: u32,
    pub price: Dinars,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::product::tests::product;

    #[test]
    fn test_add_existing_increments_instead_of_duplicating() {
        let mut cart = Cart::new();
        let p = product("p1", 1500, 10);
        assert_eq!(cart.add(&p).unwrap(), 1);
        assert_eq!(cart.add(&p).unwrap(), 2);
        assert_eq!(cart.line_count(), 1);
        assert_eq!(cart.items()[0].quantity, 2);
    }

    #[test]
    fn test_add_caps_at_stock() {
        let mut cart = Cart::new();
        let p = product("p1", 1500, 2);
        cart.add(&p).unwrap();
        cart.add(&p).unwrap();
        assert_eq!(cart.add(&p).unwrap(), 2);
    }

    #[test]
    fn test_add_rejects_out_of_stock() {
        let mut cart = Cart::new();
        let p = product("p1", 1500, 0);
        assert_eq!(cart.add(&p), Err(CartError::OutOfStock(ProductId::new("p1"))));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_set_quantity_clamps() {
        let mut cart = Cart::new();
        let p = product("p1", 1500, 4);
        cart.add(&p).unwrap();
        let id = ProductId::new("p1");
        assert_eq!(cart.set_quantity(&id, 0).unwrap(), 1);
        assert_eq!(cart.set_quantity(&id, 3).unwrap(), 3);
        assert_eq!(cart.set_quantity(&id, 99).unwrap(), 4);
        assert!(matches!(
            cart.set_quantity(&ProductId::new("nope"), 1),
            Err(CartError::NotInCart(_))
        ));
    }

    #[test]
    fn test_total_is_sum_of_lines() {
        let mut cart = Cart::new();
        cart.add(&product("p1", 1200, 5)).unwrap();
        cart.add(&product("p2", 350, 5)).unwrap();
        cart.set_quantity(&ProductId::new("p1"), 2).unwrap();
        cart.set_quantity(&ProductId::new("p2"), 3).unwrap();
        assert_eq!(cart.total(), Dinars::from_whole(1200 * 2 + 350 * 3));
    }

    #[test]
    fn test_remove_and_clear() {
        let mut cart = Cart::new();
        cart.add(&product("p1", 10, 5)).unwrap();
        cart.add(&product("p2", 10, 5)).unwrap();
        assert!(cart.remove(&ProductId::new("p1")));
        assert!(!cart.remove(&ProductId::new("p1")));
        assert_eq!(cart.line_count(), 1);
        cart.clear();
        assert!(cart.is_empty());
    }

    #[test]
    fn test_refresh_reclamps_and_drops_missing() {
        let mut cart = Cart::new();
        cart.add(&product("p1", 10, 5)).unwrap();
        cart.add(&product("p2", 10, 5)).unwrap();
        cart.set_quantity(&ProductId::new("p1"), 5).unwrap();

        let mut p1 = product("p1", 12, 2);
        p1.name.fr = "Nouveau nom".to_owned();
        cart.refresh(&[p1]);

        assert_eq!(cart.line_count(), 1);
        let line = &cart.items()[0];
        assert_eq!(line.quantity, 2);
        assert_eq!(line.product.name.fr, "Nouveau nom");
        assert_eq!(line.product.price, Dinars::from_whole(12));
    }

    #[test]
    fn test_remote_mirror_rebuilds_cart() {
        let catalog = vec![product("p1", 10, 5), product("p2", 20, 1)];
        let mut cart = Cart::new();
        cart.add(&catalog[0]).unwrap();
        cart.add(&catalog[0]).unwrap();
        cart.add(&catalog[1]).unwrap();

        let remote = cart.to_remote(Utc::now());
        assert_eq!(remote.items.len(), 2);
        assert_eq!(remote.items[0].quantity, 2);
        assert_eq!(remote.items[1].price, Dinars::from_whole(20));

        let rebuilt = Cart::from_remote(&remote, &catalog);
        assert_eq!(rebuilt.items(), cart.items());

        let partial = Cart::from_remote(&remote, &catalog[1..]);
        assert_eq!(partial.line_count(), 1);
    }
}
