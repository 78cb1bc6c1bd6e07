//! What the black-box scanner hands back for one attempt.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// How badly the scan capability failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ScanFailureKind {
    /// The capability itself is unavailable (no camera, permission denied).
    Hard,
    /// The decoder choked on a frame.
    Soft,
}

/// A fault reported by the scan capability rather than by classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanFailure {
    pub kind: ScanFailureKind,
    pub message: String,
}

impl ScanFailure {
    pub fn hard(message: impl Into<String>) -> Self {
        Self {
            kind: ScanFailureKind::Hard,
            message: message.into(),
        }
    }

    pub fn soft(message: impl Into<String>) -> Self {
        Self {
            kind: ScanFailureKind::Soft,
            message: message.into(),
        }
    }
}

/// One report from the scanner: decoded text or a failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScanReport {
    Decoded { text: String },
    Failed { failure: ScanFailure },
}
