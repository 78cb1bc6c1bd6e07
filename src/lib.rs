//! songscan: scan a track QR code, play it on a device.
//!
//! The crate is the orchestration core behind a scan-to-playback shell: the
//! access-token lifecycle, the playback-device handshake, the classifier for
//! decoded QR text, and the state machine that decides when a play command
//! goes out.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use songscan::prelude::*;
//!
//! # async fn example() -> songscan::error::Result<()> {
//! let config = SongscanConfig::from_env();
//! let tokens = TokenLifecycleManager::new(
//!     Arc::new(FileCredentialStore::new(config.store_config())),
//!     Arc::new(HttpTokenService::new(&config.token_service_url)),
//! );
//! tokens.ensure_valid_credential().await?;
//!
//! let device = DeviceHandshake::new(config.player_config());
//! let playback = PlaybackClient::new().with_base_url(&config.api_base_url);
//! let orchestrator = Orchestrator::new(Arc::new(tokens), Arc::new(playback), device.subscribe())
//!     .with_policy(config.trigger_policy);
//!
//! let session = SessionHandle::spawn(orchestrator);
//! session.request_scan().await?;
//! session.decoded("https://open.spotify.com/track/abc123").await?;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod config;
pub mod device;
pub mod error;
pub mod playback;
pub mod prelude;
pub mod scan;
pub mod session;

#[cfg(feature = "cli")]
pub mod cli;
