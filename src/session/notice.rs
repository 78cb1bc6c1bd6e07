//! Non-fatal messages surfaced next to the orchestration state.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ErrorCategory, RecoverySuggestion, SongscanError};
use crate::scan::{ScanFailure, TrackRef};

/// Side-channel message for the UI shell. Notices never change state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notice {
    /// The play request failed; the user can tap again.
    PlaybackFailed {
        status: Option<u16>,
        message: String,
    },
    /// Playback is deferred until the device reports ready.
    DeviceUnavailable { reason: String },
    /// No usable credential; show the login affordance.
    Unauthenticated,
    ScanRejected { raw: String },
    ScanCapabilityFailure { failure: ScanFailure },
    /// A play request finished after the session moved on and was paused.
    StalePlaybackDiscarded { track: TrackRef },
}

impl Notice {
    /// Map a failed play or pause into the notice the user should see.
    pub fn from_error(err: &SongscanError) -> Self {
        match err {
            _ if err.category() == ErrorCategory::Unauthenticated => Self::Unauthenticated,
            SongscanError::PlaybackRequest { status, message } => Self::PlaybackFailed {
                status: *status,
                message: message.clone(),
            },
            other => Self::PlaybackFailed {
                status: None,
                message: other.to_string(),
            },
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::PlaybackFailed { .. } | Self::StalePlaybackDiscarded { .. } => {
                ErrorCategory::PlaybackRequestFailure
            }
            Self::DeviceUnavailable { .. } => ErrorCategory::DeviceUnavailable,
            Self::Unauthenticated => ErrorCategory::Unauthenticated,
            Self::ScanRejected { .. } => ErrorCategory::ScanRejected,
            Self::ScanCapabilityFailure { .. } => ErrorCategory::ScanCapabilityFailure,
        }
    }

    pub fn recovery_suggestion(&self) -> RecoverySuggestion {
        self.category().recovery_suggestion()
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PlaybackFailed {
                status: Some(status),
                message,
            } => write!(f, "playback failed ({status}): {message}"),
            Self::PlaybackFailed {
                status: None,
                message,
            } => write!(f, "playback failed: {message}"),
            Self::DeviceUnavailable { reason } => write!(f, "device unavailable: {reason}"),
            Self::Unauthenticated => f.write_str("not logged in"),
            Self::ScanRejected { raw } => write!(f, "not a track link: {raw:?}"),
            Self::ScanCapabilityFailure { failure } => {
                write!(f, "scanner failure ({}): {}", failure.kind, failure.message)
            }
            Self::StalePlaybackDiscarded { track } => {
                write!(f, "discarded late playback of {track}")
            }
        }
    }
}
