//! Integration tests for GameWar.
//!
//! Each test serves the full storefront router on a local port, backed by a
//! seeded memory backend, and drives it over HTTP with a cookie-keeping
//! client.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p gamewar-integration-tests
//! ```
//!
//! # Seed Data
//!
//! | Account            | Role   | Status  |
//! |--------------------|--------|---------|
//! | [`ADMIN`]          | admin  | active  |
//! | [`SELLER`]         | seller | active  |
//! | [`CUSTOMER`]       | user   | active  |
//! | [`PENDING`]        | user   | pending |
//!
//! Products: [`PAD`] (seller's, 3 in stock), [`HEADSET`] (admin's, sold
//! out) and [`CABLE`] (another seller's).

#![allow(clippy::expect_used, clippy::missing_panics_doc)]

use std::net::{IpAddr, Ipv4Addr};

use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, Response, redirect};
use secrecy::SecretString;

use gamewar_core::{
    Category, Dinars, Localized, Product, ProductDraft, ProductId, UserId, UserProfile, UserRole,
    UserStatus,
};
use gamewar_storefront::backend::{Backend, MemoryBackend};
use gamewar_storefront::config::{BackendConfig, StorefrontConfig};
use gamewar_storefront::state::AppState;

/// A seeded account.
#[derive(Debug, Clone, Copy)]
pub struct Account {
    pub uid: &'static str,
    pub email: &'static str,
    pub role: UserRole,
    pub status: UserStatus,
}

pub const PASSWORD: &str = "gamewar-pass";

pub const ADMIN: Account = Account {
    uid: "admin-uid",
    email: "admin@gamewar.dz",
    role: UserRole::Admin,
    status: UserStatus::Active,
};
pub const SELLER: Account = Account {
    uid: "seller-uid",
    email: "seller@gamewar.dz",
    role: UserRole::Seller,
    status: UserStatus::Active,
};
pub const CUSTOMER: Account = Account {
    uid: "customer-uid",
    email: "client@gamewar.dz",
    role: UserRole::User,
    status: UserStatus::Active,
};
pub const PENDING: Account = Account {
    uid: "pending-uid",
    email: "nouveau@gamewar.dz",
    role: UserRole::User,
    status: UserStatus::Pending,
};

/// Seeded product ids.
pub const PAD: &str = "pad";
pub const HEADSET: &str = "headset";
pub const CABLE: &str = "cable";

/// French name and price of the pad.
pub const PAD_NAME: &str = "Manette Pro";
pub const PAD_PRICE: i64 = 12_500;

/// A running storefront.
pub struct TestApp {
    pub base_url: String,
    pub memory: MemoryBackend,
    /// Backend handle for reading what the handlers wrote.
    pub backend: Backend,
}

impl TestApp {
    /// Seed a memory backend and serve the storefront on a free port.
    pub async fn spawn() -> Self {
        let memory = seeded_backend().await;
        let backend = Backend::from(memory.clone());
        let state = AppState::with_backend(test_config(), backend.clone());

        let listener = tokio::net::TcpListener::bind((IpAddr::V4(Ipv4Addr::LOCALHOST), 0))
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Failed to read local address");

        tokio::spawn(async move {
            axum::serve(listener, gamewar_storefront::app(state))
                .await
                .expect("Test server error");
        });

        Self {
            base_url: format!("http://{addr}"),
            memory,
            backend,
        }
    }

    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// A visitor's browser: keeps cookies, does not follow redirects, and
    /// comes through the proxy with a client IP.
    #[must_use]
    pub fn client(&self) -> Client {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("105.98.0.7"));
        Client::builder()
            .cookie_store(true)
            .redirect(redirect::Policy::none())
            .default_headers(headers)
            .build()
            .expect("Failed to create HTTP client")
    }

    /// A client signed in as `account`.
    pub async fn signed_in(&self, account: Account) -> Client {
        let client = self.client();
        let resp = self
            .post_form(&client, "/auth/login", &[("email", account.email), ("password", PASSWORD)])
            .await;
        assert_eq!(location(&resp), "/", "sign-in of {} failed", account.email);
        client
    }

    pub async fn get(&self, client: &Client, path: &str) -> Response {
        client
            .get(self.url(path))
            .send()
            .await
            .expect("GET request failed")
    }

    /// GET a page and return its body, asserting a 200.
    pub async fn page(&self, client: &Client, path: &str) -> String {
        let resp = self.get(client, path).await;
        assert_eq!(resp.status(), reqwest::StatusCode::OK, "GET {path}");
        resp.text().await.expect("Failed to read response")
    }

    pub async fn post_form(&self, client: &Client, path: &str, form: &[(&str, &str)]) -> Response {
        client
            .post(self.url(path))
            .form(form)
            .send()
            .await
            .expect("POST request failed")
    }

    pub async fn product(&self, id: &str) -> Product {
        self.backend
            .get_product(&ProductId::new(id))
            .await
            .expect("Failed to read product")
            .expect("Product missing")
    }

    pub async fn profile(&self, account: Account) -> UserProfile {
        self.memory
            .profile(&UserId::new(account.uid))
            .await
            .expect("Profile missing")
    }
}

/// `Location` header of a redirect.
#[must_use]
pub fn location(resp: &Response) -> &str {
    assert!(
        resp.status().is_redirection(),
        "expected a redirect, got {}",
        resp.status()
    );
    resp.headers()
        .get(reqwest::header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

/// Configuration with the memory backend and plain-HTTP cookies.
#[must_use]
pub fn test_config() -> StorefrontConfig {
    StorefrontConfig {
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        base_url: "http://127.0.0.1".to_owned(),
        session_secret: SecretString::from("k8#Qz2!vN5@pL9$wR3^tY7&uE1*oA6(s".to_owned()),
        backend: BackendConfig::Memory,
        whatsapp_number: "213775294279".to_owned(),
        sentry_dsn: None,
        sentry_environment: "test".to_owned(),
    }
}

fn profile(account: Account) -> UserProfile {
    UserProfile {
        uid: UserId::new(account.uid),
        email: account.email.to_owned(),
        role: account.role,
        status: account.status,
        credit: Dinars::ZERO,
        created_at: Utc::now(),
        display_name: Some(account.uid.trim_end_matches("-uid").to_owned()),
        phone: Some("0550 00 00 00".to_owned()),
    }
}

fn product(id: &str, name: (&str, &str), category: Category, price: i64, stock: u32, owner: &str) -> Product {
    let draft = ProductDraft {
        name: Localized::new(name.0, name.1),
        description: Localized::new(format!("{} pour gamers", name.0), name.1),
        price: Dinars::from_whole(price),
        stock,
        category,
        images: Vec::new(),
    };
    Product::new(ProductId::new(id), draft, Some(UserId::new(owner)), Utc::now())
}

async fn seeded_backend() -> MemoryBackend {
    let memory = MemoryBackend::new();
    for account in [ADMIN, SELLER, CUSTOMER, PENDING] {
        memory
            .add_account(account.email, PASSWORD, Some(profile(account)))
            .await;
    }

    memory
        .insert_product(product(PAD, (PAD_NAME, "يد تحكم برو"), Category::Controllers, PAD_PRICE, 3, SELLER.uid))
        .await;
    memory
        .insert_product(product(HEADSET, ("Casque Nova", "سماعة نوفا"), Category::Headsets, 8_900, 0, ADMIN.uid))
        .await;
    memory
        .insert_product(product(CABLE, ("Câble HDMI", "كابل"), Category::Cables, 1_500, 20, "other-seller"))
        .await;
    memory
}
