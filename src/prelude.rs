//! Convenience re-exports for common use.

pub use crate::auth::{
    AuthState, Credential, CredentialSource, FileCredentialStore, HttpTokenService,
    TokenLifecycleManager,
};
pub use crate::config::SongscanConfig;
pub use crate::device::{DeviceEvent, DeviceHandshake, DeviceId, DeviceReadiness};
pub use crate::error::{Result, SongscanError};
pub use crate::playback::{PlaybackClient, PlaybackCommands, TriggerPolicy};
pub use crate::scan::{classify, ScanOutcome, TrackRef};
pub use crate::session::{Notice, OrchestrationState, Orchestrator, SessionHandle};
