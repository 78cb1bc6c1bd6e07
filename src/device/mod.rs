//! Playback device handshake.

pub mod config;
pub mod events;
pub mod handshake;

pub use config::PlayerConfig;
pub use events::DeviceEvent;
pub use handshake::{
    ConnectionState, DeviceHandle, DeviceHandshake, DeviceId, DeviceReadiness,
};
