//! Email/password auth against the Identity Toolkit REST API.

use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use super::provider::{AuthProvider, AuthStateFeed};
use crate::config::StoreConnection;
use crate::domain::Identity;
use crate::errors::AuthError;

pub const IDENTITY_TOOLKIT_BASE: &str = "https://identitytoolkit.googleapis.com/v1";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PasswordResponse {
    local_id: String,
    email: String,
    id_token: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

/// Maps Identity Toolkit error codes to [`AuthError`].
fn map_error_code(code: &str) -> AuthError {
    let (head, detail) = match code.split_once(" : ") {
        Some((head, detail)) => (head.trim(), detail.trim()),
        None => (code.trim(), ""),
    };
    match head {
        "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" | "USER_DISABLED" => {
            AuthError::InvalidCredentials
        }
        "EMAIL_EXISTS" => AuthError::EmailInUse,
        "INVALID_EMAIL" => AuthError::MalformedEmail(detail.to_string()),
        "MISSING_PASSWORD" => AuthError::MissingPassword,
        "WEAK_PASSWORD" => AuthError::WeakPassword(detail.to_string()),
        other => AuthError::Provider(other.to_string()),
    }
}

pub struct IdentityToolkitProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    state: watch::Sender<Option<Identity>>,
    id_token: Mutex<Option<String>>,
}

impl IdentityToolkitProvider {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|err| {
                tracing::warn!(error = %err, "falling back to default HTTP client");
                reqwest::Client::new()
            });
        Self::with_client(client, api_key, base_url)
    }

    pub fn with_client(
        client: reqwest::Client,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        let (state, _rx) = watch::channel(None);
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            state,
            id_token: Mutex::new(None),
        }
    }

    pub fn from_connection(connection: &StoreConnection, timeout: Duration) -> Self {
        let base = connection
            .auth_base_url
            .clone()
            .unwrap_or_else(|| IDENTITY_TOOLKIT_BASE.to_string());
        Self::new(connection.api_key.clone(), base, timeout)
    }

    /// ID token of the current session, for authorizing store requests.
    pub fn id_token(&self) -> Option<String> {
        self.token().clone()
    }

    fn token(&self) -> MutexGuard<'_, Option<String>> {
        self.id_token
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn password_call(
        &self,
        method: &str,
        email: &str,
        password: &str,
    ) -> Result<Identity, AuthError> {
        let url = format!("{}/accounts:{}", self.base_url, method);
        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&PasswordRequest {
                email,
                password,
                return_secure_token: true,
            })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(match serde_json::from_str::<ErrorResponse>(&body) {
                Ok(parsed) => map_error_code(&parsed.error.message),
                Err(_) => AuthError::Provider(format!("HTTP {}", status.as_u16())),
            });
        }

        let parsed: PasswordResponse = serde_json::from_str(&body)
            .map_err(|err| AuthError::Provider(format!("unexpected response: {err}")))?;
        *self.token() = Some(parsed.id_token);
        let identity = Identity::authenticated(parsed.local_id, parsed.email);
        self.state.send_replace(Some(identity.clone()));
        tracing::info!(uid = %identity.uid, method, "identity toolkit sign-in succeeded");
        Ok(identity)
    }
}

#[async_trait]
impl AuthProvider for IdentityToolkitProvider {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        self.password_call("signInWithPassword", email, password).await
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        self.password_call("signUp", email, password).await
    }

    /// Token-based sessions end client-side; there is no server call.
    async fn sign_out(&self) -> Result<(), AuthError> {
        *self.token() = None;
        self.state.send_replace(None);
        Ok(())
    }

    fn subscribe(&self) -> AuthStateFeed {
        AuthStateFeed::new(self.state.subscribe())
    }
}
