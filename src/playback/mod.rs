//! Playback command issuer and trigger policy.

pub mod client;
pub mod policy;

pub use client::{shared_client, PlaybackClient, PlaybackCommands};
pub use policy::TriggerPolicy;
