//! Unified error classification and recovery.

use serde::{Deserialize, Serialize};

/// Broad error category for routing recovery logic.
///
/// The first five categories are the runtime failure kinds a scan session can
/// hit; the rest cover setup problems outside a running session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Unauthenticated,
    ScanRejected,
    ScanCapabilityFailure,
    DeviceUnavailable,
    PlaybackRequestFailure,
    Configuration,
    Storage,
    Network,
    Unknown,
}

/// Suggested recovery action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoverySuggestion {
    /// Show the login affordance; the user must re-authenticate.
    Login,
    /// Offer the retry button, which restarts scanning.
    RetryScan,
    /// Keep scanning available and wait for the device to come back.
    WaitForDevice,
    /// Keep the play button enabled so the user can tap again.
    RetryPlay,
    CheckConfiguration,
    ContactSupport,
}

impl ErrorCategory {
    /// Whether the category changes the orchestration state (Scanning → Error).
    pub fn enters_error_state(self) -> bool {
        matches!(self, Self::ScanRejected | Self::ScanCapabilityFailure)
    }

    /// Suggest recovery actions for this category.
    pub fn recovery_suggestion(self) -> RecoverySuggestion {
        match self {
            Self::Unauthenticated => RecoverySuggestion::Login,
            Self::ScanRejected | Self::ScanCapabilityFailure => RecoverySuggestion::RetryScan,
            Self::DeviceUnavailable => RecoverySuggestion::WaitForDevice,
            Self::PlaybackRequestFailure | Self::Network => RecoverySuggestion::RetryPlay,
            Self::Configuration => RecoverySuggestion::CheckConfiguration,
            Self::Storage | Self::Unknown => RecoverySuggestion::ContactSupport,
        }
    }
}
