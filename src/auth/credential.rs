use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

// Lifetimes beyond a year are clamped.
const MAX_LIFETIME_SECS: u64 = 365 * 24 * 60 * 60;

/// Access token plus the instant it stops being valid.
///
/// # Example
/// ```
/// use songscan::auth::Credential;
/// use chrono::{Duration, Utc};
///
/// let credential = Credential::new("access", Utc::now() + Duration::minutes(5));
/// assert!(!credential.is_stale_at(Utc::now()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

impl Credential {
    pub fn new(access_token: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            access_token: access_token.into(),
            expires_at,
        }
    }

    /// Build a credential from an `expires_in` lifetime in seconds.
    pub fn expiring_in(access_token: impl Into<String>, expires_in_secs: u64) -> Self {
        let secs = expires_in_secs.min(MAX_LIFETIME_SECS) as i64;
        let lifetime = Duration::seconds(secs);
        Self::new(access_token, Utc::now() + lifetime)
    }

    /// Time left before expiry; zero or negative once stale.
    pub fn remaining_at(&self, now: DateTime<Utc>) -> Duration {
        self.expires_at - now
    }

    pub fn is_stale_at(&self, now: DateTime<Utc>) -> bool {
        self.remaining_at(now) <= Duration::zero()
    }

    pub fn is_stale(&self) -> bool {
        self.is_stale_at(Utc::now())
    }

    /// Expiry as epoch milliseconds, the persisted representation.
    pub fn expires_at_millis(&self) -> i64 {
        self.expires_at.timestamp_millis()
    }

    /// Parse a persisted epoch-milliseconds expiry.
    pub fn parse_expires_at(raw: &str) -> Option<DateTime<Utc>> {
        let millis: i64 = raw.trim().parse().ok()?;
        Utc.timestamp_millis_opt(millis).single()
    }
}
