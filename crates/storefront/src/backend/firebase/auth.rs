//! Email/password accounts via Identity Toolkit and Secure Token.

use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use gamewar_core::UserId;

use super::FirebaseClient;
use crate::backend::{AuthSession, BackendError};

const IDENTITY_TOOLKIT: &str = "https://identitytoolkit.googleapis.com/v1";
const SECURE_TOKEN: &str = "https://securetoken.googleapis.com/v1/token";

/// Answer of `accounts:signInWithPassword` and `accounts:signUp`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    local_id: String,
    #[serde(default)]
    email: String,
    id_token: String,
    refresh_token: String,
    /// Seconds, as a string.
    expires_in: String,
}

/// Answer of the Secure Token endpoint (snake case, unlike the rest).
#[derive(Debug, Deserialize)]
struct TokenResponse {
    id_token: String,
    refresh_token: String,
    expires_in: String,
    user_id: String,
}

#[derive(Debug, Deserialize)]
struct AuthErrorEnvelope {
    error: AuthErrorBody,
}

#[derive(Debug, Deserialize)]
struct AuthErrorBody {
    message: String,
}

/// Map an auth service error code to a [`BackendError`].
///
/// Codes may carry a detail after a colon, e.g.
/// `WEAK_PASSWORD : Password should be at least 6 characters`.
fn map_auth_error(status: u16, message: &str) -> BackendError {
    let code = message.split(':').next().unwrap_or_default().trim();
    match code {
        "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" | "USER_DISABLED" => {
            BackendError::InvalidCredentials
        }
        "EMAIL_EXISTS" => BackendError::EmailExists,
        "WEAK_PASSWORD" => BackendError::WeakPassword,
        "INVALID_EMAIL" | "MISSING_EMAIL" => BackendError::InvalidEmail,
        "TOO_MANY_ATTEMPTS_TRY_LATER" => BackendError::TooManyAttempts,
        "TOKEN_EXPIRED" | "INVALID_REFRESH_TOKEN" | "USER_NOT_FOUND" => BackendError::SessionExpired,
        _ => BackendError::Api {
            status,
            message: message.to_owned(),
        },
    }
}

fn parse_expires_in(value: &str) -> i64 {
    // The service always answers 3600 today.
    value.parse().unwrap_or(3600)
}

impl FirebaseClient {
    async fn auth_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, BackendError> {
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            let message = serde_json::from_str::<AuthErrorEnvelope>(&text)
                .map_or_else(|_| text.clone(), |e| e.error.message);
            tracing::debug!(status = %status, code = %message, "Auth service refused request");
            return Err(map_auth_error(status.as_u16(), &message));
        }
        Ok(serde_json::from_str(&text)?)
    }

    async fn account_call(
        &self,
        method: &str,
        email: &str,
        password: &str,
    ) -> Result<AccountResponse, BackendError> {
        let url = self.endpoint(&format!("{IDENTITY_TOOLKIT}/accounts:{method}"))?;
        let response = self
            .inner
            .client
            .post(url)
            .json(&json!({
                "email": email,
                "password": password,
                "returnSecureToken": true,
            }))
            .send()
            .await?;
        Self::auth_response(response).await
    }

    pub(crate) async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, BackendError> {
        let account = self.account_call("signInWithPassword", email, password).await?;
        let email = if account.email.is_empty() {
            email.to_owned()
        } else {
            account.email
        };
        Ok(AuthSession::new(
            UserId::new(account.local_id),
            email,
            account.id_token,
            account.refresh_token,
            parse_expires_in(&account.expires_in),
            Utc::now(),
        ))
    }

    /// Create the account; the new account's tokens are discarded so the
    /// caller's own session is untouched.
    pub(crate) async fn create_account(&self, email: &str, password: &str) -> Result<UserId, BackendError> {
        let account = self.account_call("signUp", email, password).await?;
        Ok(UserId::new(account.local_id))
    }

    pub(crate) async fn refresh(&self, auth: &AuthSession) -> Result<AuthSession, BackendError> {
        let url = self.endpoint(SECURE_TOKEN)?;
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", auth.refresh_token.as_str()),
        ];
        let response = self.inner.client.post(url).form(&params).send().await?;
        let token: TokenResponse = Self::auth_response(response).await?;

        Ok(AuthSession::new(
            UserId::new(token.user_id),
            auth.email.clone(),
            token.id_token,
            token.refresh_token,
            parse_expires_in(&token.expires_in),
            Utc::now(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_auth_error_codes() {
        assert!(matches!(
            map_auth_error(400, "INVALID_LOGIN_CREDENTIALS"),
            BackendError::InvalidCredentials
        ));
        assert!(matches!(
            map_auth_error(400, "EMAIL_EXISTS"),
            BackendError::EmailExists
        ));
        assert!(matches!(
            map_auth_error(400, "WEAK_PASSWORD : Password should be at least 6 characters"),
            BackendError::WeakPassword
        ));
        assert!(matches!(
            map_auth_error(400, "TOKEN_EXPIRED"),
            BackendError::SessionExpired
        ));
        assert!(matches!(
            map_auth_error(500, "INTERNAL"),
            BackendError::Api { status: 500, .. }
        ));
    }

    #[test]
    fn test_account_response_shape() {
        let account: AccountResponse = serde_json::from_value(json!({
            "kind": "identitytoolkit#VerifyPasswordResponse",
            "localId": "abc",
            "email": "a@b.dz",
            "idToken": "t",
            "refreshToken": "r",
            "expiresIn": "3600",
            "registered": true
        }))
        .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(account.local_id, "abc");
        assert_eq!(parse_expires_in(&account.expires_in), 3600);
    }
}
