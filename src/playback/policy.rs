use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// When a play command fires while the session is `Playing`.
///
/// Platforms that block autoplay without a user gesture need `Explicit`,
/// which is why it is the default.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum TriggerPolicy {
    /// Fire as soon as the session enters `Playing`.
    Eager,
    /// Fire only when the user taps play.
    #[default]
    Explicit,
}

impl TriggerPolicy {
    pub fn fires_on_entry(self) -> bool {
        matches!(self, Self::Eager)
    }

    /// A tap always fires, under either policy; under `Eager` it replays.
    pub fn fires_on_tap(self) -> bool {
        true
    }
}
