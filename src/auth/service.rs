use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use super::credential::Credential;
use super::error::AuthError;

/// Remote authorization service: exchanges authorization codes and silently
/// refreshes access tokens.
#[async_trait]
pub trait TokenService: Send + Sync {
    /// Exchange a refresh credential for a new access token.
    async fn refresh(&self) -> Result<Credential, AuthError>;

    /// Exchange an authorization code captured from the login redirect.
    async fn exchange_code(&self, code: &str) -> Result<Credential, AuthError>;
}

/// HTTP client for the token backend that fronts the provider's OAuth
/// endpoints.
///
/// The backend answers `POST {base}/token` (code exchange) and
/// `POST {base}/refresh` with `{ access_token, expires_in, refresh_token? }`.
/// A refresh token returned by the backend is kept in memory only.
///
/// # Example
/// ```no_run
/// use songscan::auth::HttpTokenService;
///
/// let service = HttpTokenService::new("http://localhost:3000/api")
///     .with_redirect_uri("http://localhost:3000/api/callback");
/// ```
pub struct HttpTokenService {
    client: reqwest::Client,
    base_url: String,
    redirect_uri: Option<String>,
    refresh_token: Mutex<Option<String>>,
}

impl HttpTokenService {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            redirect_uri: None,
            refresh_token: Mutex::new(None),
        }
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn with_redirect_uri(mut self, redirect_uri: impl Into<String>) -> Self {
        self.redirect_uri = Some(redirect_uri.into());
        self
    }

    pub fn with_refresh_token(self, refresh_token: impl Into<String>) -> Self {
        self.remember_refresh_token(Some(refresh_token.into()));
        self
    }

    async fn post_token_request<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Credential, AuthError> {
        let resp = self
            .client
            .post(format!("{}{path}", self.base_url))
            .header("Accept", "application/json")
            .json(body)
            .send()
            .await?;
        let status = resp.status();
        if status.is_client_error() {
            return Err(AuthError::RefreshRejected {
                status: status.as_u16(),
            });
        }
        if status != StatusCode::OK {
            return Err(AuthError::InvalidResponse(format!(
                "Token request to {path} failed with status {status}"
            )));
        }
        let payload: TokenResponse = resp.json().await?;
        if payload.access_token.trim().is_empty() {
            return Err(AuthError::InvalidResponse(
                "Token response missing access_token".to_string(),
            ));
        }
        if payload.refresh_token.is_some() {
            self.remember_refresh_token(payload.refresh_token.clone());
        }
        Ok(Credential::expiring_in(payload.access_token, payload.expires_in))
    }

    fn remember_refresh_token(&self, token: Option<String>) {
        if let Ok(mut guard) = self.refresh_token.lock() {
            *guard = token;
        }
    }

    fn current_refresh_token(&self) -> Option<String> {
        self.refresh_token.lock().ok()?.clone()
    }
}

#[async_trait]
impl TokenService for HttpTokenService {
    async fn refresh(&self) -> Result<Credential, AuthError> {
        let body = RefreshRequest {
            refresh_token: self.current_refresh_token(),
        };
        let credential = self.post_token_request("/refresh", &body).await?;
        tracing::info!(expires_at = %credential.expires_at, "access token refreshed");
        Ok(credential)
    }

    async fn exchange_code(&self, code: &str) -> Result<Credential, AuthError> {
        let body = ExchangeRequest {
            code,
            redirect_uri: self.redirect_uri.as_deref(),
        };
        let credential = self.post_token_request("/token", &body).await?;
        tracing::info!(expires_at = %credential.expires_at, "authorization code exchanged");
        Ok(credential)
    }
}

#[derive(Debug, Serialize)]
struct RefreshRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
}

#[derive(Debug, Serialize)]
struct ExchangeRequest<'a> {
    code: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    redirect_uri: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
    #[serde(default)]
    refresh_token: Option<String>,
}
