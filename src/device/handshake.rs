//! Connect/ready exchange with the host playback runtime.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum::Display;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::WatchStream;

use super::config::PlayerConfig;
use super::events::DeviceEvent;

/// Identifier the host runtime assigns to this playback device.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for DeviceId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ConnectionState {
    Connecting,
    Ready,
    Offline,
}

/// Published handshake state. The device id is only present while `Ready`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceHandle {
    pub device_id: Option<DeviceId>,
    pub connection: ConnectionState,
    /// The host runtime is gone for good; nothing will become ready again.
    pub runtime_closed: bool,
}

impl DeviceHandle {
    fn connecting() -> Self {
        Self {
            device_id: None,
            connection: ConnectionState::Connecting,
            runtime_closed: false,
        }
    }

    /// Guard consulted before any playback command.
    pub fn readiness(&self) -> DeviceReadiness {
        match (&self.device_id, self.connection) {
            (Some(id), ConnectionState::Ready) => DeviceReadiness::Ready(id.clone()),
            _ if self.runtime_closed => DeviceReadiness::Closed,
            _ => DeviceReadiness::NotReadyYet,
        }
    }
}

/// Answer of the readiness guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceReadiness {
    Ready(DeviceId),
    /// Connecting or temporarily offline; commands should wait.
    NotReadyYet,
    /// The runtime shut down; commands will never be deliverable.
    Closed,
}

impl DeviceReadiness {
    pub fn device_id(&self) -> Option<&DeviceId> {
        match self {
            Self::Ready(id) => Some(id),
            Self::NotReadyYet | Self::Closed => None,
        }
    }
}

/// Owns the [`DeviceHandle`] for one playback-runtime instantiation.
///
/// Host events go in through [`apply`](Self::apply) (or a channel pumped by
/// [`spawn`](Self::spawn)); everyone else reads the handle through
/// [`subscribe`](Self::subscribe) or [`readiness`](Self::readiness).
pub struct DeviceHandshake {
    config: PlayerConfig,
    handle_tx: watch::Sender<DeviceHandle>,
}

impl DeviceHandshake {
    pub fn new(config: PlayerConfig) -> Self {
        let (handle_tx, _) = watch::channel(DeviceHandle::connecting());
        tracing::info!(player = %config.name, "connecting to playback runtime");
        Self { config, handle_tx }
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    pub fn handle(&self) -> DeviceHandle {
        self.handle_tx.borrow().clone()
    }

    pub fn readiness(&self) -> DeviceReadiness {
        self.handle_tx.borrow().readiness()
    }

    pub fn subscribe(&self) -> watch::Receiver<DeviceHandle> {
        self.handle_tx.subscribe()
    }

    /// Stream of handle updates, starting with the current one.
    pub fn stream(&self) -> WatchStream<DeviceHandle> {
        WatchStream::new(self.subscribe())
    }

    /// Apply one host event.
    pub fn apply(&self, event: &DeviceEvent) {
        match event {
            DeviceEvent::Ready { device_id } => {
                tracing::info!(%device_id, "playback device ready");
                self.publish(DeviceHandle {
                    device_id: Some(device_id.clone()),
                    connection: ConnectionState::Ready,
                    runtime_closed: false,
                });
            }
            DeviceEvent::NotReady { device_id } => {
                tracing::warn!(%device_id, "playback device went offline");
                self.publish(DeviceHandle {
                    device_id: None,
                    connection: ConnectionState::Offline,
                    runtime_closed: false,
                });
                // The host runtime reconnects on its own schedule.
                self.publish(DeviceHandle::connecting());
            }
            other => {
                tracing::warn!(
                    event = other.name(),
                    message = other.error_message().unwrap_or_default(),
                    "playback runtime reported an error"
                );
            }
        }
    }

    /// Mark the host runtime as gone.
    pub fn close(&self) {
        tracing::warn!("playback runtime closed");
        self.publish(DeviceHandle {
            device_id: None,
            connection: ConnectionState::Offline,
            runtime_closed: true,
        });
    }

    /// Pump host events from `events` until the sender side goes away, then
    /// mark the runtime closed.
    pub fn spawn(self: Arc<Self>, mut events: mpsc::Receiver<DeviceEvent>) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                self.apply(&event);
            }
            self.close();
        })
    }

    fn publish(&self, handle: DeviceHandle) {
        self.handle_tx.send_if_modified(|current| {
            if *current == handle {
                return false;
            }
            *current = handle;
            true
        });
    }
}
