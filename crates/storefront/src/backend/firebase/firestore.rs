//! Firestore REST document operations.

use serde::{Deserialize, Serialize};
use serde_json::json;
use url::Url;

use super::FirebaseClient;
use super::value::{Fields, Value};
use crate::backend::{AuthSession, BackendError};

const PAGE_SIZE: &str = "300";

/// A document as returned by the REST API.
#[derive(Debug, Clone, Deserialize)]
pub struct StoredDocument {
    /// Full resource name, `projects/{p}/databases/(default)/documents/{path}`.
    pub name: String,
    #[serde(default)]
    pub fields: Fields,
}

impl StoredDocument {
    /// Last path segment of the resource name.
    pub fn id(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    #[serde(default)]
    documents: Vec<StoredDocument>,
    next_page_token: Option<String>,
}

/// One element of a `runQuery` response stream.
#[derive(Debug, Deserialize)]
struct QueryResult {
    document: Option<StoredDocument>,
}

/// A single-field equality filter.
#[derive(Debug, Clone)]
pub struct Filter {
    field: &'static str,
    value: Value,
}

impl Filter {
    pub fn equal(field: &'static str, value: &str) -> Self {
        Self {
            field,
            value: Value::string(value),
        }
    }

    fn to_json(&self) -> serde_json::Value {
        json!({
            "fieldFilter": {
                "field": {"fieldPath": self.field},
                "op": "EQUAL",
                "value": self.value,
            }
        })
    }
}

/// Sort order of a query.
#[derive(Debug, Clone, Copy)]
pub struct OrderBy {
    field: &'static str,
    descending: bool,
}

impl OrderBy {
    /// Largest values first. Documents without the field are left out of
    /// the results.
    pub const fn descending(field: &'static str) -> Self {
        Self {
            field,
            descending: true,
        }
    }

    fn to_json(self) -> serde_json::Value {
        json!({
            "field": {"fieldPath": self.field},
            "direction": if self.descending { "DESCENDING" } else { "ASCENDING" },
        })
    }
}

fn query_body(collection: &str, filter: &Filter, order_by: Option<OrderBy>) -> serde_json::Value {
    let mut query = json!({
        "from": [{"collectionId": collection}],
        "where": filter.to_json(),
    });
    if let (Some(order_by), Some(fields)) = (order_by, query.as_object_mut()) {
        fields.insert("orderBy".to_owned(), json!([order_by.to_json()]));
    }
    json!({"structuredQuery": query})
}

#[derive(Serialize)]
struct WriteBody<'a> {
    fields: &'a Fields,
}

impl FirebaseClient {
    fn documents_url(&self, path: &str) -> Result<Url, BackendError> {
        let mut url = self.endpoint(&format!(
            "https://firestore.googleapis.com/v1/projects/{}/databases/(default)/documents",
            self.inner.project_id
        ))?;
        if !path.is_empty() {
            url.path_segments_mut()
                .map_err(|()| BackendError::Api {
                    status: 0,
                    message: "documents endpoint cannot be a base".to_owned(),
                })?
                .extend(path.split('/'));
        }
        Ok(url)
    }

    fn request(
        &self,
        method: reqwest::Method,
        url: Url,
        auth: Option<&AuthSession>,
    ) -> reqwest::RequestBuilder {
        let builder = self.inner.client.request(method, url);
        match auth {
            Some(auth) => builder.bearer_auth(&auth.id_token),
            None => builder,
        }
    }

    /// Fetch one document; `None` if it does not exist.
    pub(super) async fn get_document(
        &self,
        auth: Option<&AuthSession>,
        path: &str,
    ) -> Result<Option<StoredDocument>, BackendError> {
        let url = self.documents_url(path)?;
        let response = self.request(reqwest::Method::GET, url, auth).send().await?;
        match Self::read_body(response).await {
            Ok(body) => Ok(Some(serde_json::from_str(&body)?)),
            Err(BackendError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Create a document with a caller-chosen id.
    pub(super) async fn create_document(
        &self,
        auth: &AuthSession,
        collection: &str,
        id: &str,
        fields: &Fields,
    ) -> Result<(), BackendError> {
        let mut url = self.documents_url(collection)?;
        url.query_pairs_mut().append_pair("documentId", id);
        let response = self
            .request(reqwest::Method::POST, url, Some(auth))
            .json(&WriteBody { fields })
            .send()
            .await?;
        Self::read_body(response).await?;
        Ok(())
    }

    /// Write a document.
    ///
    /// Without a mask the document is replaced (or created); with one, only
    /// the named fields are written.
    pub(super) async fn write_document(
        &self,
        auth: &AuthSession,
        path: &str,
        fields: &Fields,
        mask: Option<&[&str]>,
    ) -> Result<(), BackendError> {
        let mut url = self.documents_url(path)?;
        if let Some(mask) = mask {
            let mut query = url.query_pairs_mut();
            for field in mask {
                query.append_pair("updateMask.fieldPaths", field);
            }
            // Only touch existing documents when patching.
            query.append_pair("currentDocument.exists", "true");
        }
        let response = self
            .request(reqwest::Method::PATCH, url, Some(auth))
            .json(&WriteBody { fields })
            .send()
            .await?;
        Self::read_body(response).await?;
        Ok(())
    }

    pub(super) async fn delete_document(
        &self,
        auth: &AuthSession,
        path: &str,
    ) -> Result<(), BackendError> {
        let url = self.documents_url(path)?;
        let response = self
            .request(reqwest::Method::DELETE, url, Some(auth))
            .send()
            .await?;
        Self::read_body(response).await?;
        Ok(())
    }

    /// Every document of a collection, following page tokens.
    pub(super) async fn list_documents(
        &self,
        auth: Option<&AuthSession>,
        collection: &str,
    ) -> Result<Vec<StoredDocument>, BackendError> {
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut url = self.documents_url(collection)?;
            {
                let mut query = url.query_pairs_mut();
                query.append_pair("pageSize", PAGE_SIZE);
                if let Some(token) = &page_token {
                    query.append_pair("pageToken", token);
                }
            }

            let response = self.request(reqwest::Method::GET, url, auth).send().await?;
            let body = Self::read_body(response).await?;
            let page: ListResponse = serde_json::from_str(&body)?;
            documents.extend(page.documents);

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        tracing::debug!(collection, count = documents.len(), "Listed documents");
        Ok(documents)
    }

    /// Documents of a top-level collection matching `filter`, in
    /// `order_by` order when given.
    pub(super) async fn run_query(
        &self,
        auth: Option<&AuthSession>,
        collection: &str,
        filter: &Filter,
        order_by: Option<OrderBy>,
    ) -> Result<Vec<StoredDocument>, BackendError> {
        let mut url = self.documents_url("")?;
        url.set_path(&format!("{}:runQuery", url.path()));

        let body = query_body(collection, filter, order_by);
        let response = self
            .request(reqwest::Method::POST, url, auth)
            .json(&body)
            .send()
            .await?;
        let text = Self::read_body(response).await?;
        let results: Vec<QueryResult> = serde_json::from_str(&text)?;

        Ok(results.into_iter().filter_map(|r| r.document).collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;

    use super::*;
    use crate::config::FirebaseConfig;

    fn client() -> FirebaseClient {
        FirebaseClient::new(&FirebaseConfig {
            project_id: "gamewar-dz".to_owned(),
            api_key: SecretString::from("AIzaTestKey"),
            storage_bucket: "gamewar-dz.appspot.com".to_owned(),
            functions_region: "europe-west1".to_owned(),
        })
    }

    #[test]
    fn test_documents_url() {
        let url = client().documents_url("users/u1/cart/items").unwrap();
        assert_eq!(
            url.as_str(),
            "https://firestore.googleapis.com/v1/projects/gamewar-dz/databases/(default)/documents/users/u1/cart/items?key=AIzaTestKey"
        );
    }

    #[test]
    fn test_document_id_from_name() {
        let doc: StoredDocument = serde_json::from_value(json!({
            "name": "projects/gamewar-dz/databases/(default)/documents/orders/Xy12",
            "createTime": "2025-01-01T00:00:00Z"
        }))
        .unwrap();
        assert_eq!(doc.id(), "Xy12");
        assert!(doc.fields.is_empty());
    }

    #[test]
    fn test_equality_filter_body() {
        let filter = Filter::equal("userId", "u1");
        assert_eq!(
            filter.to_json(),
            json!({"fieldFilter": {
                "field": {"fieldPath": "userId"},
                "op": "EQUAL",
                "value": {"stringValue": "u1"}
            }})
        );
    }

    #[test]
    fn test_query_body_with_order() {
        let filter = Filter::equal("createdBy", "s1");
        let body = query_body("products", &filter, Some(OrderBy::descending("createdAt")));
        assert_eq!(
            body["structuredQuery"]["orderBy"],
            json!([{"field": {"fieldPath": "createdAt"}, "direction": "DESCENDING"}])
        );
        assert_eq!(body["structuredQuery"]["from"], json!([{"collectionId": "products"}]));

        let unordered = query_body("orders", &filter, None);
        assert!(unordered["structuredQuery"].get("orderBy").is_none());
    }

    #[test]
    fn test_query_stream_skips_read_time_only_entries() {
        let results: Vec<QueryResult> = serde_json::from_value(json!([
            {"readTime": "2025-01-01T00:00:00Z"}
        ]))
        .unwrap();
        assert!(results.into_iter().all(|r| r.document.is_none()));
    }
}
