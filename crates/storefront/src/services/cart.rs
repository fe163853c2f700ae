//! The visitor cart.
//!
//! The cart lives in the session. For a signed-in account every change is
//! also written to the per-user mirror document; a failed mirror write is
//! logged and otherwise ignored.

use chrono::Utc;
use tower_sessions::Session;
use tracing::instrument;

use gamewar_core::{Cart, Product, ProductId};

use crate::backend::{AuthSession, Backend};
use crate::error::AppError;
use crate::models::session_keys;

/// Cart operations for one request.
pub struct CartService<'a> {
    backend: &'a Backend,
    session: &'a Session,
    auth: Option<&'a AuthSession>,
}

impl<'a> CartService<'a> {
    #[must_use]
    pub const fn new(backend: &'a Backend, session: &'a Session, auth: Option<&'a AuthSession>) -> Self {
        Self {
            backend,
            session,
            auth,
        }
    }

    /// The cart stored in the session, empty if there is none.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be read.
    pub async fn load(&self) -> Result<Cart, AppError> {
        Ok(self
            .session
            .get::<Cart>(session_keys::CART)
            .await?
            .unwrap_or_default())
    }

    /// Store the cart in the session and mirror it.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be written.
    pub async fn save(&self, cart: &Cart) -> Result<(), AppError> {
        self.session.insert(session_keys::CART, cart).await?;
        self.mirror(cart).await;
        Ok(())
    }

    async fn mirror(&self, cart: &Cart) {
        let Some(auth) = self.auth else {
            return;
        };
        if let Err(e) = self.backend.save_cart(auth, &cart.to_remote(Utc::now())).await {
            tracing::warn!(uid = %auth.uid, error = %e, "Failed to mirror cart");
        }
    }

    /// Add one unit of `product`; returns the new line quantity.
    ///
    /// # Errors
    ///
    /// Returns an error if the product is out of stock or the session fails.
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub async fn add(&self, product: &Product) -> Result<u32, AppError> {
        let mut cart = self.load().await?;
        let quantity = cart.add(product)?;
        self.save(&cart).await?;
        Ok(quantity)
    }

    /// Set a line quantity, clamped to the stock; returns the stored quantity.
    ///
    /// # Errors
    ///
    /// Returns an error if the product is not in the cart or the session fails.
    #[instrument(skip(self))]
    pub async fn set_quantity(&self, product_id: &ProductId, quantity: u32) -> Result<u32, AppError> {
        let mut cart = self.load().await?;
        let quantity = cart.set_quantity(product_id, quantity)?;
        self.save(&cart).await?;
        Ok(quantity)
    }

    /// Remove a line; returns whether it was present.
    ///
    /// # Errors
    ///
    /// Returns an error if the session fails.
    #[instrument(skip(self))]
    pub async fn remove(&self, product_id: &ProductId) -> Result<bool, AppError> {
        let mut cart = self.load().await?;
        let removed = cart.remove(product_id);
        if removed {
            self.save(&cart).await?;
        }
        Ok(removed)
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the session fails.
    pub async fn clear(&self) -> Result<(), AppError> {
        let mut cart = self.load().await?;
        cart.clear();
        self.save(&cart).await
    }

    /// The cart with snapshots taken from the current catalog.
    ///
    /// The session copy is only rewritten when something changed.
    ///
    /// # Errors
    ///
    /// Returns an error if the session fails.
    pub async fn refreshed(&self, products: &[Product]) -> Result<Cart, AppError> {
        let mut cart = self.load().await?;
        let before = cart.clone();
        cart.refresh(products);
        if cart != before {
            self.session.insert(session_keys::CART, &cart).await?;
        }
        Ok(cart)
    }

    /// Reconcile the session cart with the mirror after sign-in.
    ///
    /// An empty session cart is replaced by the mirrored one; otherwise the
    /// session cart wins and overwrites the mirror.
    ///
    /// # Errors
    ///
    /// Returns an error if the session fails.
    #[instrument(skip(self, catalog))]
    pub async fn restore_on_sign_in(&self, catalog: &[Product]) -> Result<(), AppError> {
        let Some(auth) = self.auth else {
            return Ok(());
        };
        let cart = self.load().await?;
        if !cart.is_empty() {
            self.mirror(&cart).await;
            return Ok(());
        }

        match self.backend.load_cart(auth).await {
            Ok(Some(remote)) => {
                let restored = Cart::from_remote(&remote, catalog);
                tracing::debug!(lines = restored.line_count(), "Restored mirrored cart");
                self.session.insert(session_keys::CART, &restored).await?;
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(uid = %auth.uid, error = %e, "Failed to load mirrored cart"),
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use gamewar_core::{Category, Dinars, Localized, ProductDraft};
    use tower_sessions::MemoryStore;

    use super::*;
    use crate::backend::MemoryBackend;

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    fn product(id: &str, stock: u32) -> Product {
        let draft = ProductDraft {
            name: Localized::new("Manette", "يد تحكم"),
            price: Dinars::from_whole(2500),
            stock,
            category: Category::Controllers,
            ..ProductDraft::default()
        };
        Product::new(ProductId::new(id), draft, None, Utc::now())
    }

    async fn signed_in(memory: &MemoryBackend) -> (Backend, AuthSession) {
        memory.add_account("c@gamewar.dz", "123456", None).await;
        let backend = Backend::from(memory.clone());
        let auth = backend.sign_in("c@gamewar.dz", "123456").await.unwrap();
        (backend, auth)
    }

    #[tokio::test]
    async fn test_add_clamps_and_mirrors() {
        let memory = MemoryBackend::new();
        let (backend, auth) = signed_in(&memory).await;
        let session = session();
        let carts = CartService::new(&backend, &session, Some(&auth));
        let pad = product("pad", 2);

        assert_eq!(carts.add(&pad).await.unwrap(), 1);
        assert_eq!(carts.add(&pad).await.unwrap(), 2);
        assert_eq!(carts.add(&pad).await.unwrap(), 2);

        let cart = carts.load().await.unwrap();
        assert_eq!(cart.line_count(), 1);

        let remote = backend.load_cart(&auth).await.unwrap().unwrap();
        assert_eq!(remote.items.len(), 1);
        assert_eq!(remote.items.first().unwrap().quantity, 2);
    }

    #[tokio::test]
    async fn test_guest_cart_stays_in_session() {
        let memory = MemoryBackend::new();
        let (backend, auth) = signed_in(&memory).await;
        let session = session();
        let carts = CartService::new(&backend, &session, None);

        carts.add(&product("pad", 3)).await.unwrap();
        assert_eq!(carts.set_quantity(&ProductId::new("pad"), 9).await.unwrap(), 3);
        assert!(backend.load_cart(&auth).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_restore_on_sign_in_only_fills_empty_cart() {
        let memory = MemoryBackend::new();
        let (backend, auth) = signed_in(&memory).await;
        let catalog = vec![product("pad", 5), product("cable", 5)];

        let first = session();
        let carts = CartService::new(&backend, &first, Some(&auth));
        carts.add(catalog.first().unwrap()).await.unwrap();

        let fresh = session();
        let carts = CartService::new(&backend, &fresh, Some(&auth));
        carts.restore_on_sign_in(&catalog).await.unwrap();
        let restored = carts.load().await.unwrap();
        assert!(restored.get(&ProductId::new("pad")).is_some());

        let other = session();
        let carts = CartService::new(&backend, &other, Some(&auth));
        carts.add(catalog.last().unwrap()).await.unwrap();
        carts.restore_on_sign_in(&catalog).await.unwrap();
        let kept = carts.load().await.unwrap();
        assert!(kept.get(&ProductId::new("pad")).is_none());
        assert!(kept.get(&ProductId::new("cable")).is_some());
    }
}
