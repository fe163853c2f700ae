//! Media uploads to the storage bucket.

use serde::Deserialize;
use url::Url;

use super::FirebaseClient;
use crate::backend::{AuthSession, BackendError, Upload};

const STORAGE_API: &str = "https://firebasestorage.googleapis.com/v0/b";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    name: String,
    bucket: String,
    /// Comma separated when several tokens exist; the first one is used.
    #[serde(default)]
    download_tokens: Option<String>,
}

/// The public URL of an uploaded object.
fn download_url(bucket: &str, name: &str, token: Option<&str>) -> String {
    let mut url = format!(
        "{STORAGE_API}/{bucket}/o/{}?alt=media",
        urlencoding::encode(name)
    );
    if let Some(token) = token {
        url.push_str("&token=");
        url.push_str(token);
    }
    url
}

impl FirebaseClient {
    pub(super) async fn upload(
        &self,
        auth: &AuthSession,
        upload: &Upload,
    ) -> Result<String, BackendError> {
        let mut url = Url::parse(&format!("{STORAGE_API}/{}/o", self.inner.storage_bucket))
            .map_err(|e| BackendError::Api {
                status: 0,
                message: format!("invalid storage endpoint: {e}"),
            })?;
        url.query_pairs_mut()
            .append_pair("uploadType", "media")
            .append_pair("name", &upload.path);

        let response = self
            .inner
            .client
            .post(url)
            .header("Authorization", format!("Firebase {}", auth.id_token))
            .header("Content-Type", &upload.content_type)
            .body(upload.bytes.clone())
            .send()
            .await?;
        let body = Self::read_body(response).await?;
        let uploaded: UploadResponse = serde_json::from_str(&body)?;

        let token = uploaded
            .download_tokens
            .as_deref()
            .and_then(|tokens| tokens.split(',').next());
        tracing::info!(path = %uploaded.name, "Uploaded image");
        Ok(download_url(&uploaded.bucket, &uploaded.name, token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_download_url_encodes_object_path() {
        assert_eq!(
            download_url("gw.appspot.com", "products/u1/17_pad 1.png", Some("tok")),
            "https://firebasestorage.googleapis.com/v0/b/gw.appspot.com/o/products%2Fu1%2F17_pad%201.png?alt=media&token=tok"
        );
        assert!(download_url("b", "x.png", None).ends_with("?alt=media"));
    }
}
