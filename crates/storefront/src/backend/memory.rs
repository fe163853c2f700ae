//! In-process backend for development and tests.
//!
//! Keeps accounts, documents and uploaded files in maps behind one lock.
//! Security rules are not simulated: every call succeeds for any signed-in
//! session. Uploads and invoices come back as `data:` URLs.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::Utc;
use tokio::sync::RwLock;

use gamewar_core::{
    CreditLog, Order, OrderId, OrderStatus, Product, ProductId, RemoteCart, UserId, UserProfile,
};

use super::{AuthSession, BackendError, OrderOwner, ProfilePatch, Upload, new_document_id};

/// Token lifetime handed out by the memory backend.
const TOKEN_LIFETIME_SECS: i64 = 3600;
const MIN_PASSWORD_LENGTH: usize = 6;

#[derive(Debug, Clone)]
struct Account {
    uid: UserId,
    email: String,
    password: String,
}

#[derive(Default)]
struct Store {
    /// Keyed by lowercased email.
    accounts: HashMap<String, Account>,
    profiles: HashMap<UserId, UserProfile>,
    /// Insertion order is kept so listings are stable.
    products: Vec<Product>,
    orders: Vec<Order>,
    credit_logs: Vec<CreditLog>,
    carts: HashMap<UserId, RemoteCart>,
    files: HashMap<String, Upload>,
}

/// Backend keeping all state in memory.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    store: RwLock<Store>,
    token_counter: AtomicU64,
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an account with an optional stored profile.
    ///
    /// Used to seed development data and test fixtures.
    pub async fn add_account(&self, email: &str, password: &str, profile: Option<UserProfile>) -> UserId {
        let uid = profile
            .as_ref()
            .map_or_else(|| UserId::new(new_document_id()), |p| p.uid.clone());
        let mut store = self.inner.store.write().await;
        store.accounts.insert(
            email.to_lowercase(),
            Account {
                uid: uid.clone(),
                email: email.to_owned(),
                password: password.to_owned(),
            },
        );
        if let Some(profile) = profile {
            store.profiles.insert(uid.clone(), profile);
        }
        uid
    }

    /// Insert or replace a product without a session.
    pub async fn insert_product(&self, product: Product) {
        let mut store = self.inner.store.write().await;
        upsert_product(&mut store.products, product);
    }

    /// Insert an order without a session.
    pub async fn insert_order(&self, order: Order) {
        self.inner.store.write().await.orders.push(order);
    }

    /// Stored profile, bypassing sessions.
    pub async fn profile(&self, uid: &UserId) -> Option<UserProfile> {
        self.inner.store.read().await.profiles.get(uid).cloned()
    }

    fn issue_session(&self, account: &Account) -> AuthSession {
        let n = self.inner.token_counter.fetch_add(1, Ordering::Relaxed);
        AuthSession::new(
            account.uid.clone(),
            account.email.clone(),
            format!("memory-id:{}:{n}", account.uid),
            format!("memory-refresh:{}:{n}", account.uid),
            TOKEN_LIFETIME_SECS,
            Utc::now(),
        )
    }

    // -------------------------------------------------------------------------
    // Auth
    // -------------------------------------------------------------------------

    pub(crate) async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, BackendError> {
        let store = self.inner.store.read().await;
        let account = store
            .accounts
            .get(&email.trim().to_lowercase())
            .filter(|account| account.password == password)
            .ok_or(BackendError::InvalidCredentials)?;
        Ok(self.issue_session(account))
    }

    pub(crate) async fn refresh(&self, auth: &AuthSession) -> Result<AuthSession, BackendError> {
        let store = self.inner.store.read().await;
        let account = store
            .accounts
            .values()
            .find(|account| account.uid == auth.uid)
            .ok_or(BackendError::SessionExpired)?;
        Ok(self.issue_session(account))
    }

    pub(crate) async fn create_account(&self, email: &str, password: &str) -> Result<UserId, BackendError> {
        let email = email.trim();
        if !email.contains('@') {
            return Err(BackendError::InvalidEmail);
        }
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(BackendError::WeakPassword);
        }
        let mut store = self.inner.store.write().await;
        let key = email.to_lowercase();
        if store.accounts.contains_key(&key) {
            return Err(BackendError::EmailExists);
        }
        let uid = UserId::new(new_document_id());
        store.accounts.insert(
            key,
            Account {
                uid: uid.clone(),
                email: email.to_owned(),
                password: password.to_owned(),
            },
        );
        Ok(uid)
    }

    // -------------------------------------------------------------------------
    // Profiles and credit
    // -------------------------------------------------------------------------

    pub(crate) async fn get_profile(
        &self,
        _auth: &AuthSession,
        uid: &UserId,
    ) -> Result<Option<UserProfile>, BackendError> {
        Ok(self.profile(uid).await)
    }

    pub(crate) async fn put_profile(
        &self,
        _auth: &AuthSession,
        profile: &UserProfile,
    ) -> Result<(), BackendError> {
        self.inner
            .store
            .write()
            .await
            .profiles
            .insert(profile.uid.clone(), profile.clone());
        Ok(())
    }

    pub(crate) async fn list_profiles(&self, _auth: &AuthSession) -> Result<Vec<UserProfile>, BackendError> {
        Ok(self.inner.store.read().await.profiles.values().cloned().collect())
    }

    pub(crate) async fn update_profile(
        &self,
        _auth: &AuthSession,
        uid: &UserId,
        patch: &ProfilePatch,
    ) -> Result<(), BackendError> {
        let mut store = self.inner.store.write().await;
        let profile = store
            .profiles
            .get_mut(uid)
            .ok_or_else(|| BackendError::NotFound(format!("users/{uid}")))?;
        patch.apply(profile);
        Ok(())
    }

    pub(crate) async fn add_credit_log(&self, _auth: &AuthSession, log: &CreditLog) -> Result<(), BackendError> {
        self.inner.store.write().await.credit_logs.push(log.clone());
        Ok(())
    }

    pub(crate) async fn credit_logs_for(
        &self,
        _auth: &AuthSession,
        uid: &UserId,
    ) -> Result<Vec<CreditLog>, BackendError> {
        let store = self.inner.store.read().await;
        Ok(store
            .credit_logs
            .iter()
            .filter(|log| &log.user_id == uid)
            .cloned()
            .collect())
    }

    // -------------------------------------------------------------------------
    // Products
    // -------------------------------------------------------------------------

    pub(crate) async fn list_products(&self) -> Result<Vec<Product>, BackendError> {
        Ok(self.inner.store.read().await.products.clone())
    }

    pub(crate) async fn products_by_creator(&self, uid: &UserId) -> Result<Vec<Product>, BackendError> {
        let store = self.inner.store.read().await;
        Ok(store
            .products
            .iter()
            .filter(|p| p.is_owned_by(uid))
            .cloned()
            .collect())
    }

    pub(crate) async fn get_product(&self, id: &ProductId) -> Result<Option<Product>, BackendError> {
        let store = self.inner.store.read().await;
        Ok(store.products.iter().find(|p| &p.id == id).cloned())
    }

    pub(crate) async fn create_product(&self, _auth: &AuthSession, product: &Product) -> Result<(), BackendError> {
        self.insert_product(product.clone()).await;
        Ok(())
    }

    pub(crate) async fn update_product(&self, _auth: &AuthSession, product: &Product) -> Result<(), BackendError> {
        let mut store = self.inner.store.write().await;
        let stored = find_product(&mut store.products, &product.id)?;
        stored.name = product.name.clone();
        stored.description = product.description.clone();
        stored.price = product.price;
        stored.stock = product.stock;
        stored.category = product.category;
        stored.images = product.images.clone();
        stored.updated_at = product.updated_at;
        Ok(())
    }

    pub(crate) async fn delete_product(&self, _auth: &AuthSession, id: &ProductId) -> Result<(), BackendError> {
        self.inner
            .store
            .write()
            .await
            .products
            .retain(|p| &p.id != id);
        Ok(())
    }

    pub(crate) async fn update_stock(&self, _auth: &AuthSession, product: &Product) -> Result<(), BackendError> {
        let mut store = self.inner.store.write().await;
        let stored = find_product(&mut store.products, &product.id)?;
        stored.stock = product.stock;
        stored.stock_history = product.stock_history.clone();
        stored.updated_at = product.updated_at;
        Ok(())
    }

    pub(crate) async fn upload_image(&self, _auth: &AuthSession, upload: &Upload) -> Result<String, BackendError> {
        let url = format!(
            "data:{};base64,{}",
            upload.content_type,
            STANDARD.encode(&upload.bytes)
        );
        self.inner
            .store
            .write()
            .await
            .files
            .insert(upload.path.clone(), upload.clone());
        Ok(url)
    }

    // -------------------------------------------------------------------------
    // Cart mirror
    // -------------------------------------------------------------------------

    pub(crate) async fn save_cart(&self, auth: &AuthSession, cart: &RemoteCart) -> Result<(), BackendError> {
        self.inner
            .store
            .write()
            .await
            .carts
            .insert(auth.uid.clone(), cart.clone());
        Ok(())
    }

    pub(crate) async fn load_cart(&self, auth: &AuthSession) -> Result<Option<RemoteCart>, BackendError> {
        Ok(self.inner.store.read().await.carts.get(&auth.uid).cloned())
    }

    // -------------------------------------------------------------------------
    // Orders
    // -------------------------------------------------------------------------

    pub(crate) async fn create_order(&self, _auth: &AuthSession, order: &Order) -> Result<(), BackendError> {
        self.insert_order(order.clone()).await;
        Ok(())
    }

    pub(crate) async fn get_order(&self, _auth: &AuthSession, id: &OrderId) -> Result<Option<Order>, BackendError> {
        let store = self.inner.store.read().await;
        Ok(store.orders.iter().find(|o| &o.id == id).cloned())
    }

    pub(crate) async fn list_orders(&self, _auth: &AuthSession) -> Result<Vec<Order>, BackendError> {
        Ok(self.inner.store.read().await.orders.clone())
    }

    pub(crate) async fn orders_for(
        &self,
        _auth: &AuthSession,
        owner: OrderOwner<'_>,
    ) -> Result<Vec<Order>, BackendError> {
        let store = self.inner.store.read().await;
        Ok(store
            .orders
            .iter()
            .filter(|order| match owner {
                OrderOwner::User(uid) => &order.user_id == uid,
                OrderOwner::Email(email) => order.user_email == email,
            })
            .cloned()
            .collect())
    }

    pub(crate) async fn update_order_status(
        &self,
        _auth: &AuthSession,
        id: &OrderId,
        status: OrderStatus,
    ) -> Result<(), BackendError> {
        let mut store = self.inner.store.write().await;
        let order = store
            .orders
            .iter_mut()
            .find(|o| &o.id == id)
            .ok_or_else(|| BackendError::NotFound(format!("orders/{id}")))?;
        order.status = status;
        Ok(())
    }

    pub(crate) async fn generate_invoice(&self, _auth: &AuthSession, id: &OrderId) -> Result<String, BackendError> {
        let store = self.inner.store.read().await;
        let order = store
            .orders
            .iter()
            .find(|o| &o.id == id)
            .ok_or_else(|| BackendError::NotFound(format!("orders/{id}")))?;
        let text = format!("FACTURE GAMEWAR {} - {} DA", order.short_ref(), order.total_with_tax());
        Ok(format!("data:application/pdf;base64,{}", STANDARD.encode(text)))
    }
}

fn upsert_product(products: &mut Vec<Product>, product: Product) {
    match products.iter_mut().find(|p| p.id == product.id) {
        Some(existing) => *existing = product,
        None => products.push(product),
    }
}

fn find_product<'a>(products: &'a mut [Product], id: &ProductId) -> Result<&'a mut Product, BackendError> {
    products
        .iter_mut()
        .find(|p| &p.id == id)
        .ok_or_else(|| BackendError::NotFound(format!("products/{id}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use gamewar_core::{Category, Dinars, Localized, ProductDraft};

    use super::*;

    fn draft() -> ProductDraft {
        ProductDraft {
            name: Localized::new("Câble HDMI", "كابل"),
            price: Dinars::from_whole(800),
            stock: 4,
            category: Category::Cables,
            ..ProductDraft::default()
        }
    }

    #[tokio::test]
    async fn test_sign_in_and_refresh() {
        let backend = MemoryBackend::new();
        let uid = backend.add_account("Admin@GameWar.dz", "s3cret!", None).await;

        assert!(matches!(
            backend.sign_in("admin@gamewar.dz", "wrong").await,
            Err(BackendError::InvalidCredentials)
        ));
        let session = backend.sign_in(" admin@gamewar.dz ", "s3cret!").await.unwrap();
        assert_eq!(session.uid, uid);

        let refreshed = backend.refresh(&session).await.unwrap();
        assert_eq!(refreshed.uid, uid);
        assert_ne!(refreshed.id_token, session.id_token);
    }

    #[tokio::test]
    async fn test_create_account_rules() {
        let backend = MemoryBackend::new();
        backend.create_account("a@b.dz", "123456").await.unwrap();
        assert!(matches!(
            backend.create_account("A@b.dz", "123456").await,
            Err(BackendError::EmailExists)
        ));
        assert!(matches!(
            backend.create_account("c@b.dz", "123").await,
            Err(BackendError::WeakPassword)
        ));
    }

    #[tokio::test]
    async fn test_stock_update_keeps_other_fields() {
        let backend = MemoryBackend::new();
        let uid = backend.add_account("s@b.dz", "123456", None).await;
        let session = backend.sign_in("s@b.dz", "123456").await.unwrap();

        let product = Product::new(ProductId::new("p1"), draft(), Some(uid.clone()), Utc::now());
        backend.create_product(&session, &product).await.unwrap();

        let mut changed = product.clone();
        let entry = changed.stock_change(9, "s@b.dz", Utc::now()).unwrap();
        changed.apply_stock_change(entry);
        changed.name = Localized::new("ignored", "ignored");
        backend.update_stock(&session, &changed).await.unwrap();

        let stored = backend.get_product(&product.id).await.unwrap().unwrap();
        assert_eq!(stored.stock, 9);
        assert_eq!(stored.stock_history.len(), 1);
        assert_eq!(stored.name.fr, "Câble HDMI");
        assert_eq!(backend.products_by_creator(&uid).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_upload_returns_data_url() {
        let backend = MemoryBackend::new();
        backend.add_account("s@b.dz", "123456", None).await;
        let session = backend.sign_in("s@b.dz", "123456").await.unwrap();
        let url = backend
            .upload_image(
                &session,
                &Upload {
                    path: "products/u/1_a.png".to_owned(),
                    content_type: "image/png".to_owned(),
                    bytes: b"png".to_vec(),
                },
            )
            .await
            .unwrap();
        assert_eq!(url, "data:image/png;base64,cG5n");
    }
}
