//! Remote playback commands against the provider's Web API.

use std::sync::OnceLock;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::Serialize;

use crate::auth::Credential;
use crate::config::DEFAULT_API_BASE_URL;
use crate::device::DeviceId;
use crate::error::SongscanError;
use crate::scan::TrackRef;

static SHARED_CLIENT: OnceLock<reqwest::Client> = OnceLock::new();

/// Get (or create) the shared reqwest client.
pub fn shared_client() -> &'static reqwest::Client {
    SHARED_CLIENT.get_or_init(|| {
        reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new())
    })
}

fn bearer_headers(access_token: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if let Ok(val) = HeaderValue::from_str(&format!("Bearer {access_token}")) {
        headers.insert(AUTHORIZATION, val);
    }
    headers
}

/// Outbound playback commands. One call is one remote request; nothing is
/// de-duplicated or retried here.
#[async_trait]
pub trait PlaybackCommands: Send + Sync {
    async fn issue_play(
        &self,
        track: &TrackRef,
        device: &DeviceId,
        credential: &Credential,
    ) -> Result<(), SongscanError>;

    async fn pause(&self, device: &DeviceId, credential: &Credential)
        -> Result<(), SongscanError>;
}

#[derive(Serialize)]
struct PlayBody<'a> {
    uris: [&'a str; 1],
}

/// `reqwest`-backed [`PlaybackCommands`].
pub struct PlaybackClient {
    client: reqwest::Client,
    base_url: String,
}

impl Default for PlaybackClient {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackClient {
    pub fn new() -> Self {
        Self {
            client: shared_client().clone(),
            base_url: DEFAULT_API_BASE_URL.to_string(),
        }
    }

    /// Point the client at another API host (tests, proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    fn player_url(&self, action: &str) -> String {
        format!("{}/v1/me/player/{action}", self.base_url)
    }

    async fn put(
        &self,
        action: &str,
        device: &DeviceId,
        credential: &Credential,
        body: Option<&PlayBody<'_>>,
    ) -> Result<(), SongscanError> {
        if credential.is_stale() {
            return Err(crate::auth::AuthError::Expired.into());
        }
        let mut request = self
            .client
            .put(self.player_url(action))
            .headers(bearer_headers(&credential.access_token))
            .query(&[("device_id", device.as_str())]);
        request = match body {
            Some(body) => request.json(body),
            None => request.header(reqwest::header::CONTENT_LENGTH, 0),
        };

        let resp = request.send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        let text = resp.text().await.unwrap_or_default();
        Err(SongscanError::playback(status.as_u16(), text))
    }
}

#[async_trait]
impl PlaybackCommands for PlaybackClient {
    async fn issue_play(
        &self,
        track: &TrackRef,
        device: &DeviceId,
        credential: &Credential,
    ) -> Result<(), SongscanError> {
        let uri = track.uri();
        tracing::info!(%device, track = %uri, "issuing play command");
        let body = PlayBody {
            uris: [uri.as_str()],
        };
        self.put("play", device, credential, Some(&body)).await
    }

    async fn pause(
        &self,
        device: &DeviceId,
        credential: &Credential,
    ) -> Result<(), SongscanError> {
        tracing::debug!(%device, "pausing playback");
        self.put("pause", device, credential, None).await
    }
}
