//! Configuration (layered: builder overrides > env > defaults).

use std::path::PathBuf;

use bon::Builder;

use crate::auth::CredentialStoreConfig;
use crate::device::PlayerConfig;
use crate::error::SongscanError;
use crate::playback::TriggerPolicy;

pub const DEFAULT_API_BASE_URL: &str = "https://api.spotify.com";
pub const DEFAULT_ACCOUNTS_BASE_URL: &str = "https://accounts.spotify.com";
pub const DEFAULT_TOKEN_SERVICE_URL: &str = "http://localhost:3000/api";
pub const DEFAULT_REDIRECT_URI: &str = "http://localhost:3000/api/callback";
pub const DEFAULT_PLAYER_NAME: &str = "Blind Song Scanner";

/// Settings for a scan session.
///
/// Build explicitly with [`SongscanConfig::builder`] or load from the
/// environment with [`SongscanConfig::from_env`].
///
/// # Example
/// ```
/// use songscan::config::SongscanConfig;
/// use songscan::playback::TriggerPolicy;
///
/// let config = SongscanConfig::builder()
///     .client_id("my-client")
///     .trigger_policy(TriggerPolicy::Eager)
///     .build();
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Builder)]
pub struct SongscanConfig {
    /// OAuth client id registered with the provider.
    #[builder(into, default)]
    pub client_id: String,
    #[builder(into, default = DEFAULT_REDIRECT_URI.to_string())]
    pub redirect_uri: String,
    /// Web API root used for play and pause commands.
    #[builder(into, default = DEFAULT_API_BASE_URL.to_string())]
    pub api_base_url: String,
    #[builder(into, default = DEFAULT_ACCOUNTS_BASE_URL.to_string())]
    pub accounts_base_url: String,
    /// Backend handling code exchange and refresh.
    #[builder(into, default = DEFAULT_TOKEN_SERVICE_URL.to_string())]
    pub token_service_url: String,
    #[builder(default)]
    pub trigger_policy: TriggerPolicy,
    #[builder(into, default = CredentialStoreConfig::default_dir())]
    pub store_dir: PathBuf,
    #[builder(into, default = DEFAULT_PLAYER_NAME.to_string())]
    pub player_name: String,
    #[builder(default = 0.5)]
    pub volume: f32,
}

impl Default for SongscanConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl SongscanConfig {
    /// Load from environment variables, reading `.env` first when present.
    ///
    /// Unparsable values are logged and left at their defaults; call
    /// [`validate`](Self::validate) before use.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        let mut config = Self::default();

        let string_vars: [(&str, &mut String); 6] = [
            ("SPOTIFY_CLIENT_ID", &mut config.client_id),
            ("SPOTIFY_REDIRECT_URI", &mut config.redirect_uri),
            ("SONGSCAN_API_BASE_URL", &mut config.api_base_url),
            ("SONGSCAN_ACCOUNTS_URL", &mut config.accounts_base_url),
            ("SONGSCAN_TOKEN_SERVICE_URL", &mut config.token_service_url),
            ("SONGSCAN_PLAYER_NAME", &mut config.player_name),
        ];
        for (var, slot) in string_vars {
            if let Ok(value) = std::env::var(var) {
                *slot = value;
            }
        }

        if let Ok(dir) = std::env::var("SONGSCAN_STORE_DIR") {
            config.store_dir = PathBuf::from(dir);
        }
        if let Ok(raw) = std::env::var("SONGSCAN_TRIGGER_POLICY") {
            match raw.parse() {
                Ok(policy) => config.trigger_policy = policy,
                Err(_) => tracing::warn!(value = %raw, "unknown trigger policy, keeping default"),
            }
        }
        if let Ok(raw) = std::env::var("SONGSCAN_VOLUME") {
            match raw.parse() {
                Ok(volume) => config.volume = volume,
                Err(_) => tracing::warn!(value = %raw, "unparsable volume, keeping default"),
            }
        }

        config
    }

    /// Reject settings a session cannot run with.
    pub fn validate(&self) -> Result<(), SongscanError> {
        if self.client_id.trim().is_empty() {
            return Err(SongscanError::Configuration(
                "SPOTIFY_CLIENT_ID is not set".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.volume) {
            return Err(SongscanError::Configuration(format!(
                "volume must be within 0.0..=1.0, got {}",
                self.volume
            )));
        }
        Ok(())
    }

    pub fn store_config(&self) -> CredentialStoreConfig {
        CredentialStoreConfig::new(self.store_dir.clone())
    }

    /// Parameters for instantiating the host playback runtime.
    pub fn player_config(&self) -> PlayerConfig {
        PlayerConfig {
            name: self.player_name.clone(),
            volume: self.volume,
        }
    }
}
