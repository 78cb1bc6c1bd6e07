//! Error types for songscan.
//!
//! Scan and device failures never surface as errors: the session reports them
//! as [`Notice`](crate::session::Notice)s, which share [`ErrorCategory`].

pub mod unified;

pub use unified::{ErrorCategory, RecoverySuggestion};

use thiserror::Error;

use crate::auth::AuthError;

/// Primary error type for all songscan operations.
#[derive(Error, Debug)]
pub enum SongscanError {
    #[error("Not authenticated: {0}")]
    Unauthenticated(#[from] AuthError),

    #[error("Playback request failed (status {status:?}): {message}")]
    PlaybackRequest {
        status: Option<u16>,
        message: String,
    },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl SongscanError {
    /// Create a playback failure from an HTTP status and response body.
    pub fn playback(status: u16, message: impl Into<String>) -> Self {
        Self::PlaybackRequest {
            status: Some(status),
            message: message.into(),
        }
    }

    /// Classify this error into a category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Unauthenticated(_) => ErrorCategory::Unauthenticated,
            Self::PlaybackRequest { status, .. } => match status {
                Some(401) => ErrorCategory::Unauthenticated,
                _ => ErrorCategory::PlaybackRequestFailure,
            },
            Self::Configuration(_) => ErrorCategory::Configuration,
            Self::Io(_) | Self::Serialization(_) => ErrorCategory::Storage,
            Self::Network(_) => ErrorCategory::Network,
            Self::InvalidState(_) => ErrorCategory::Unknown,
        }
    }

    /// Only a precondition failure escapes the session; everything else is
    /// handled by the component that owns it.
    pub fn is_fatal_to_session(&self) -> bool {
        self.category() == ErrorCategory::Unauthenticated
    }

    /// Suggest recovery actions.
    pub fn recovery_suggestion(&self) -> RecoverySuggestion {
        self.category().recovery_suggestion()
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, SongscanError>;
