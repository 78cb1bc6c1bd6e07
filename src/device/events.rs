//! Events emitted by the host playback runtime.

use serde::{Deserialize, Serialize};

use super::handshake::DeviceId;

/// Named readiness and error events, as the host runtime reports them.
///
/// Only `Ready` and `NotReady` move the connection state; the error events
/// are logged and otherwise ignored.
///
/// ```
/// use songscan::device::DeviceEvent;
///
/// let event = DeviceEvent::from_json(r#"{"type":"ready","device_id":"d-1"}"#).unwrap();
/// assert!(matches!(event, DeviceEvent::Ready { .. }));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeviceEvent {
    Ready { device_id: DeviceId },
    NotReady { device_id: DeviceId },
    InitializationError { message: String },
    AuthenticationError { message: String },
    AccountError { message: String },
    PlaybackError { message: String },
}

impl DeviceEvent {
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Event name as the host runtime spells it.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ready { .. } => "ready",
            Self::NotReady { .. } => "not_ready",
            Self::InitializationError { .. } => "initialization_error",
            Self::AuthenticationError { .. } => "authentication_error",
            Self::AccountError { .. } => "account_error",
            Self::PlaybackError { .. } => "playback_error",
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::InitializationError { message }
            | Self::AuthenticationError { message }
            | Self::AccountError { message }
            | Self::PlaybackError { message } => Some(message),
            Self::Ready { .. } | Self::NotReady { .. } => None,
        }
    }
}
