//! Callable cloud functions.

use serde::Deserialize;
use serde_json::json;

use gamewar_core::OrderId;

use super::FirebaseClient;
use crate::backend::{AuthSession, BackendError};

/// Callable protocol answer: either `result` or `error`.
#[derive(Debug, Deserialize)]
struct CallableResponse<T> {
    result: Option<T>,
    error: Option<CallableError>,
}

#[derive(Debug, Deserialize)]
struct CallableError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InvoiceResult {
    pdf_url: String,
}

impl<T> CallableResponse<T> {
    fn into_result(self, name: &str) -> Result<T, BackendError> {
        if let Some(error) = self.error {
            return Err(match error.status.as_str() {
                "PERMISSION_DENIED" | "UNAUTHENTICATED" => BackendError::PermissionDenied(error.message),
                "NOT_FOUND" => BackendError::NotFound(error.message),
                _ => BackendError::Api {
                    status: 500,
                    message: format!("{name}: {} {}", error.status, error.message),
                },
            });
        }
        self.result.ok_or_else(|| BackendError::Api {
            status: 500,
            message: format!("{name}: no result in response"),
        })
    }
}

impl FirebaseClient {
    fn function_url(&self, name: &str) -> String {
        format!(
            "https://{}-{}.cloudfunctions.net/{name}",
            self.inner.functions_region, self.inner.project_id
        )
    }

    /// `generateInvoice({orderId}) -> {pdfUrl}`
    pub(super) async fn call_generate_invoice(
        &self,
        auth: &AuthSession,
        id: &OrderId,
    ) -> Result<String, BackendError> {
        let response = self
            .inner
            .client
            .post(self.function_url("generateInvoice"))
            .bearer_auth(&auth.id_token)
            .json(&json!({"data": {"orderId": id.as_str()}}))
            .send()
            .await?;

        // Callable errors come back with a JSON body and a non-2xx status.
        let status = response.status();
        let text = response.text().await?;
        let parsed: CallableResponse<InvoiceResult> = serde_json::from_str(&text).map_err(|e| {
            tracing::error!(status = %status, error = %e, "Unreadable generateInvoice response");
            BackendError::Parse(e)
        })?;
        let invoice = parsed.into_result("generateInvoice")?;

        tracing::info!(order_id = %id, "Invoice generated");
        Ok(invoice.pdf_url)
    }
}
