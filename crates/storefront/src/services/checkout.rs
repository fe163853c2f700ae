//! Order placement.

use chrono::Utc;
use tracing::instrument;

use gamewar_core::{CheckoutDetails, Language, NewOrder, Order, OrderId, UserProfile};

use super::CartService;
use crate::backend::{AuthSession, Backend, new_document_id};
use crate::error::AppError;

/// Turns the session cart into a stored order.
pub struct CheckoutService<'a> {
    backend: &'a Backend,
}

impl<'a> CheckoutService<'a> {
    #[must_use]
    pub const fn new(backend: &'a Backend) -> Self {
        Self { backend }
    }

    /// Write the order and empty the cart.
    ///
    /// Stock is left untouched. If the write fails the cart is kept so the
    /// visitor can try again.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty cart, missing contact fields, or a
    /// failed write.
    #[instrument(skip_all, fields(uid = %auth.uid))]
    pub async fn place_order(
        &self,
        auth: &AuthSession,
        profile: &UserProfile,
        carts: &CartService<'_>,
        details: CheckoutDetails,
        lang: Language,
    ) -> Result<Order, AppError> {
        let cart = carts.load().await?;
        let order = NewOrder::from_cart(profile, &cart, details, lang, Utc::now())?
            .with_id(OrderId::new(new_document_id()));

        self.backend.create_order(auth, &order).await?;
        carts.clear().await?;

        tracing::info!(
            order_id = %order.id,
            lines = order.items.len(),
            total = %order.total,
            "Order placed"
        );
        Ok(order)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use gamewar_core::{
        Category, Dinars, Localized, OrderStatus, Product, ProductDraft, ProductId,
    };
    use tower_sessions::{MemoryStore, Session};

    use super::*;
    use crate::backend::{MemoryBackend, OrderOwner};

    fn product(id: &str, price: i64) -> Product {
        let draft = ProductDraft {
            name: Localized::new(format!("Casque {id}"), format!("سماعة {id}")),
            price: Dinars::from_whole(price),
            stock: 10,
            category: Category::Headsets,
            ..ProductDraft::default()
        };
        Product::new(ProductId::new(id), draft, None, Utc::now())
    }

    fn details() -> CheckoutDetails {
        CheckoutDetails {
            phone: " 0555 12 34 56 ".to_owned(),
            address: "Alger centre".to_owned(),
            notes: String::new(),
        }
    }

    #[tokio::test]
    async fn test_place_order_snapshots_cart_and_clears_it() {
        let memory = MemoryBackend::new();
        memory.add_account("c@gamewar.dz", "123456", None).await;
        let backend = Backend::from(memory);
        let auth = backend.sign_in("c@gamewar.dz", "123456").await.unwrap();
        let profile = UserProfile::first_sign_in(auth.uid.clone(), "c@gamewar.dz", Utc::now());

        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        let carts = CartService::new(&backend, &session, Some(&auth));
        let a = product("a", 1500);
        carts.add(&a).await.unwrap();
        carts.add(&a).await.unwrap();
        carts.add(&product("b", 700)).await.unwrap();

        let order = CheckoutService::new(&backend)
            .place_order(&auth, &profile, &carts, details(), Language::Ar)
            .await
            .unwrap();

        assert_eq!(order.total, Dinars::from_whole(3700));
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.phone.as_deref(), Some("0555 12 34 56"));
        assert_eq!(order.items.first().unwrap().name, "سماعة a");
        assert!(carts.load().await.unwrap().is_empty());

        let stored = backend.orders_for(&auth, OrderOwner::User(&auth.uid)).await.unwrap();
        assert_eq!(stored, vec![order]);
    }

    #[tokio::test]
    async fn test_empty_cart_is_rejected() {
        let memory = MemoryBackend::new();
        memory.add_account("c@gamewar.dz", "123456", None).await;
        let backend = Backend::from(memory);
        let auth = backend.sign_in("c@gamewar.dz", "123456").await.unwrap();
        let profile = UserProfile::first_sign_in(auth.uid.clone(), "c@gamewar.dz", Utc::now());
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        let carts = CartService::new(&backend, &session, Some(&auth));

        let err = CheckoutService::new(&backend)
            .place_order(&auth, &profile, &carts, details(), Language::Fr)
            .await
            .unwrap_err();
        assert_eq!(err.flash_key(), "emptyCart");
    }
}
