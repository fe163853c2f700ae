//! REST client for the Firebase platform.
//!
//! - [`auth`] - Identity Toolkit sign-in/sign-up and Secure Token refresh
//! - [`firestore`] - document CRUD and structured queries
//! - [`storage`] - media uploads returning tokenized download URLs
//! - [`functions`] - the `generateInvoice` callable
//!
//! Every request carries the project's web API key. Requests made for a
//! signed-in user also carry that user's ID token, so the platform's
//! security rules apply to them.

mod auth;
pub mod documents;
mod firestore;
mod functions;
mod storage;
pub mod value;

use std::sync::Arc;

use serde::Deserialize;
use url::Url;

use gamewar_core::{
    CreditLog, Order, OrderId, OrderStatus, Product, ProductId, RemoteCart, UserId, UserProfile,
};

use crate::backend::{AuthSession, BackendError, OrderOwner, ProfilePatch, Upload};
use crate::config::FirebaseConfig;

use documents::{
    CREDIT_LOGS, Document, ORDERS, PRODUCTS, USERS, cart_from_fields, cart_fields, cart_path,
    editable_product_fields, stock_fields,
};
use firestore::{Filter, OrderBy};
use value::{Fields, Value};

/// Client for the Firebase REST APIs.
#[derive(Clone)]
pub struct FirebaseClient {
    inner: Arc<FirebaseClientInner>,
}

struct FirebaseClientInner {
    client: reqwest::Client,
    api_key: String,
    project_id: String,
    storage_bucket: String,
    functions_region: String,
}

/// Error body shared by the Google REST APIs.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

impl FirebaseClient {
    /// Create a new client.
    #[must_use]
    pub fn new(config: &FirebaseConfig) -> Self {
        Self {
            inner: Arc::new(FirebaseClientInner {
                client: reqwest::Client::new(),
                api_key: config.api_key().to_string(),
                project_id: config.project_id.clone(),
                storage_bucket: config.storage_bucket.clone(),
                functions_region: config.functions_region.clone(),
            }),
        }
    }

    /// Parse a fixed endpoint and append the API key.
    fn endpoint(&self, base: &str) -> Result<Url, BackendError> {
        let mut url = Url::parse(base).map_err(|e| BackendError::Api {
            status: 0,
            message: format!("invalid endpoint {base}: {e}"),
        })?;
        url.query_pairs_mut().append_pair("key", &self.inner.api_key);
        Ok(url)
    }

    /// Read a response body, turning non-success statuses into errors.
    ///
    /// `404` maps to [`BackendError::NotFound`], `403` to
    /// [`BackendError::PermissionDenied`].
    async fn read_body(response: reqwest::Response) -> Result<String, BackendError> {
        let status = response.status();
        let text = response.text().await?;
        if status.is_success() {
            return Ok(text);
        }

        let message = serde_json::from_str::<ErrorEnvelope>(&text)
            .map(|envelope| envelope.error)
            .map_or_else(
                |_| text.chars().take(200).collect::<String>(),
                |body| match body.status {
                    Some(code) => format!("{code}: {}", body.message),
                    None => body.message,
                },
            );

        tracing::warn!(status = %status, message = %message, "Backend returned non-success status");

        Err(match status {
            reqwest::StatusCode::NOT_FOUND => BackendError::NotFound(message),
            reqwest::StatusCode::FORBIDDEN | reqwest::StatusCode::UNAUTHORIZED => {
                BackendError::PermissionDenied(message)
            }
            reqwest::StatusCode::TOO_MANY_REQUESTS => BackendError::TooManyAttempts,
            _ => BackendError::Api {
                status: status.as_u16(),
                message,
            },
        })
    }

    // -------------------------------------------------------------------------
    // Profiles and credit
    // -------------------------------------------------------------------------

    pub(crate) async fn get_profile(
        &self,
        auth: &AuthSession,
        uid: &UserId,
    ) -> Result<Option<UserProfile>, BackendError> {
        self.get_document(Some(auth), &format!("{USERS}/{uid}"))
            .await?
            .map(|doc| UserProfile::from_fields(uid.as_str(), &doc.fields))
            .transpose()
    }

    pub(crate) async fn put_profile(
        &self,
        auth: &AuthSession,
        profile: &UserProfile,
    ) -> Result<(), BackendError> {
        self.write_document(auth, &format!("{USERS}/{}", profile.uid), &profile.to_fields(), None)
            .await
    }

    pub(crate) async fn list_profiles(
        &self,
        auth: &AuthSession,
    ) -> Result<Vec<UserProfile>, BackendError> {
        let documents = self.list_documents(Some(auth), USERS).await?;
        Ok(decode_lenient(&documents))
    }

    pub(crate) async fn update_profile(
        &self,
        auth: &AuthSession,
        uid: &UserId,
        patch: &ProfilePatch,
    ) -> Result<(), BackendError> {
        let mut fields = Fields::new();
        if let Some(role) = patch.role {
            fields.insert("role".to_owned(), Value::string(role.as_str()));
        }
        if let Some(status) = patch.status {
            fields.insert("status".to_owned(), Value::string(status.as_str()));
        }
        if let Some(credit) = patch.credit {
            fields.insert("credit".to_owned(), Value::dinars(credit));
        }
        if let Some(name) = &patch.display_name {
            fields.insert("displayName".to_owned(), Value::string(name));
        }
        if let Some(phone) = &patch.phone {
            fields.insert("phone".to_owned(), Value::string(phone));
        }
        let mask: Vec<&str> = fields.keys().map(String::as_str).collect();
        self.write_document(auth, &format!("{USERS}/{uid}"), &fields, Some(mask.as_slice()))
            .await
    }

    pub(crate) async fn add_credit_log(
        &self,
        auth: &AuthSession,
        log: &CreditLog,
    ) -> Result<(), BackendError> {
        self.create_document(auth, CREDIT_LOGS, log.id.as_str(), &log.to_fields())
            .await
    }

    pub(crate) async fn credit_logs_for(
        &self,
        auth: &AuthSession,
        uid: &UserId,
    ) -> Result<Vec<CreditLog>, BackendError> {
        let documents = self
            .run_query(Some(auth), CREDIT_LOGS, &Filter::equal("userId", uid.as_str()), None)
            .await?;
        Ok(decode_lenient(&documents))
    }

    // -------------------------------------------------------------------------
    // Products
    // -------------------------------------------------------------------------

    pub(crate) async fn list_products(&self) -> Result<Vec<Product>, BackendError> {
        let documents = self.list_documents(None, PRODUCTS).await?;
        Ok(decode_lenient(&documents))
    }

    pub(crate) async fn products_by_creator(&self, uid: &UserId) -> Result<Vec<Product>, BackendError> {
        let documents = self
            .run_query(
                None,
                PRODUCTS,
                &Filter::equal("createdBy", uid.as_str()),
                Some(OrderBy::descending("createdAt")),
            )
            .await?;
        Ok(decode_lenient(&documents))
    }

    pub(crate) async fn get_product(&self, id: &ProductId) -> Result<Option<Product>, BackendError> {
        self.get_document(None, &format!("{PRODUCTS}/{id}"))
            .await?
            .map(|doc| Product::from_fields(id.as_str(), &doc.fields))
            .transpose()
    }

    pub(crate) async fn create_product(
        &self,
        auth: &AuthSession,
        product: &Product,
    ) -> Result<(), BackendError> {
        self.create_document(auth, PRODUCTS, product.id.as_str(), &product.to_fields())
            .await
    }

    pub(crate) async fn update_product(
        &self,
        auth: &AuthSession,
        product: &Product,
    ) -> Result<(), BackendError> {
        let fields = editable_product_fields(product);
        let mask: Vec<&str> = fields.keys().map(String::as_str).collect();
        self.write_document(auth, &format!("{PRODUCTS}/{}", product.id), &fields, Some(mask.as_slice()))
            .await
    }

    pub(crate) async fn delete_product(
        &self,
        auth: &AuthSession,
        id: &ProductId,
    ) -> Result<(), BackendError> {
        self.delete_document(auth, &format!("{PRODUCTS}/{id}")).await
    }

    pub(crate) async fn update_stock(
        &self,
        auth: &AuthSession,
        product: &Product,
    ) -> Result<(), BackendError> {
        let fields = stock_fields(product);
        let mask: Vec<&str> = fields.keys().map(String::as_str).collect();
        self.write_document(auth, &format!("{PRODUCTS}/{}", product.id), &fields, Some(mask.as_slice()))
            .await
    }

    // -------------------------------------------------------------------------
    // Cart mirror
    // -------------------------------------------------------------------------

    pub(crate) async fn save_cart(
        &self,
        auth: &AuthSession,
        cart: &RemoteCart,
    ) -> Result<(), BackendError> {
        self.write_document(auth, &cart_path(&auth.uid), &cart_fields(cart), None)
            .await
    }

    pub(crate) async fn load_cart(&self, auth: &AuthSession) -> Result<Option<RemoteCart>, BackendError> {
        Ok(self
            .get_document(Some(auth), &cart_path(&auth.uid))
            .await?
            .map(|doc| cart_from_fields(&doc.fields)))
    }

    // -------------------------------------------------------------------------
    // Orders
    // -------------------------------------------------------------------------

    pub(crate) async fn create_order(&self, auth: &AuthSession, order: &Order) -> Result<(), BackendError> {
        self.create_document(auth, ORDERS, order.id.as_str(), &order.to_fields())
            .await
    }

    pub(crate) async fn get_order(
        &self,
        auth: &AuthSession,
        id: &OrderId,
    ) -> Result<Option<Order>, BackendError> {
        self.get_document(Some(auth), &format!("{ORDERS}/{id}"))
            .await?
            .map(|doc| Order::from_fields(id.as_str(), &doc.fields))
            .transpose()
    }

    pub(crate) async fn list_orders(&self, auth: &AuthSession) -> Result<Vec<Order>, BackendError> {
        let documents = self.list_documents(Some(auth), ORDERS).await?;
        Ok(decode_lenient(&documents))
    }

    pub(crate) async fn orders_for(
        &self,
        auth: &AuthSession,
        owner: OrderOwner<'_>,
    ) -> Result<Vec<Order>, BackendError> {
        let filter = match owner {
            OrderOwner::User(uid) => Filter::equal("userId", uid.as_str()),
            OrderOwner::Email(email) => Filter::equal("userEmail", email),
        };
        let documents = self.run_query(Some(auth), ORDERS, &filter, None).await?;
        Ok(decode_lenient(&documents))
    }

    pub(crate) async fn update_order_status(
        &self,
        auth: &AuthSession,
        id: &OrderId,
        status: OrderStatus,
    ) -> Result<(), BackendError> {
        let fields = Fields::from([("status".to_owned(), Value::string(status.as_str()))]);
        self.write_document(auth, &format!("{ORDERS}/{id}"), &fields, Some(&["status"]))
            .await
    }

    pub(crate) async fn upload_image(
        &self,
        auth: &AuthSession,
        upload: &Upload,
    ) -> Result<String, BackendError> {
        self.upload(auth, upload).await
    }

    pub(crate) async fn generate_invoice(
        &self,
        auth: &AuthSession,
        id: &OrderId,
    ) -> Result<String, BackendError> {
        self.call_generate_invoice(auth, id).await
    }
}

/// Decode a listing, skipping documents that do not decode.
///
/// One bad document must not take the whole listing down.
fn decode_lenient<T: Document>(documents: &[firestore::StoredDocument]) -> Vec<T> {
    documents
        .iter()
        .filter_map(|doc| match T::from_fields(doc.id(), &doc.fields) {
            Ok(item) => Some(item),
            Err(e) => {
                tracing::warn!(error = %e, "Skipping malformed document");
                None
            }
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use gamewar_core::UserRole;
    use serde_json::json;

    use super::*;

    fn documents(value: serde_json::Value) -> Vec<firestore::StoredDocument> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_profile_listing_survives_odd_documents() {
        let docs = documents(json!([
            {"name": "projects/p/databases/(default)/documents/users/u1",
             "fields": {"email": {"stringValue": "a@gamewar.dz"}, "role": {"stringValue": "admin"}}},
            {"name": "projects/p/databases/(default)/documents/users/u2",
             "fields": {"email": {"stringValue": "b@gamewar.dz"}, "role": {"stringValue": "owner"}}}
        ]));
        let profiles: Vec<UserProfile> = decode_lenient(&docs);
        assert_eq!(profiles.len(), 2);
        assert_eq!(profiles.last().unwrap().role, UserRole::User);
    }

    #[test]
    fn test_listing_skips_undecodable_documents() {
        let docs = documents(json!([
            {"name": "projects/p/databases/(default)/documents/credit_logs/c1",
             "fields": {"userId": {"stringValue": "u1"}, "amount": {"integerValue": "5"}}},
            {"name": "projects/p/databases/(default)/documents/credit_logs/c2",
             "fields": {"userId": {"stringValue": "u1"}, "type": {"stringValue": "lottery"}}}
        ]));
        let logs: Vec<CreditLog> = decode_lenient(&docs);
        assert_eq!(logs.len(), 1);
        assert_eq!(logs.first().unwrap().id.as_str(), "c1");
    }
}
