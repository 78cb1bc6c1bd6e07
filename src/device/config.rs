//! Host player configuration.

use serde::{Deserialize, Serialize};

/// Parameters the host playback runtime is instantiated with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Device name shown in the provider's device picker.
    pub name: String,
    pub volume: f32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            name: crate::config::DEFAULT_PLAYER_NAME.to_string(),
            volume: 0.5,
        }
    }
}
