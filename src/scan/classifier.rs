//! Decoded-text classification.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Canonical web link prefix for individual tracks.
pub const TRACK_LINK_PREFIX: &str = "https://open.spotify.com/track/";

const TRACK_URI_PREFIX: &str = "spotify:track:";

/// A playable track, identified by its catalog id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackRef {
    id: String,
}

impl TrackRef {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The `spotify:track:<id>` form sent to the playback API.
    pub fn uri(&self) -> String {
        format!("{TRACK_URI_PREFIX}{}", self.id)
    }
}

impl fmt::Display for TrackRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{TRACK_URI_PREFIX}{}", self.id)
    }
}

/// Result of classifying one decoded scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "track", rename_all = "snake_case")]
pub enum ScanOutcome {
    Track(TrackRef),
    Unrecognized,
}

impl ScanOutcome {
    pub fn track(&self) -> Option<&TrackRef> {
        match self {
            Self::Track(track) => Some(track),
            Self::Unrecognized => None,
        }
    }
}

fn track_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9]+$").expect("valid track id pattern"))
}

/// Classify decoded QR text. Pure and total.
///
/// Only links starting with [`TRACK_LINK_PREFIX`] are tracks; the path
/// segment after it is the id, and any query string or fragment is dropped.
///
/// ```
/// use songscan::scan::classify;
///
/// let outcome = classify("https://open.spotify.com/track/abc123?si=xyz");
/// assert_eq!(outcome.track().map(|t| t.uri()).as_deref(), Some("spotify:track:abc123"));
/// ```
pub fn classify(raw: &str) -> ScanOutcome {
    let Some(rest) = raw.trim().strip_prefix(TRACK_LINK_PREFIX) else {
        return ScanOutcome::Unrecognized;
    };
    let path = rest.split(['?', '#']).next().unwrap_or_default();
    let id = path.strip_suffix('/').unwrap_or(path);
    if !track_id_pattern().is_match(id) {
        return ScanOutcome::Unrecognized;
    }
    ScanOutcome::Track(TrackRef { id: id.to_string() })
}
