#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use songscan::auth::{AuthError, Credential, TokenService};
use songscan::device::{DeviceEvent, DeviceHandshake, DeviceId, PlayerConfig};
use songscan::error::SongscanError;
use songscan::playback::PlaybackCommands;
use songscan::scan::TrackRef;
use tokio::sync::Semaphore;

pub fn credential_expiring_in(minutes: i64) -> Credential {
    Credential::new("access-token", Utc::now() + Duration::minutes(minutes))
}

/// Yield enough times for spawned tasks that are ready to run to finish.
pub async fn settle_tasks() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

// ---------------------------------------------------------------------------
// Token service fake
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum RefreshOutcome {
    Grant { expires_in_minutes: i64 },
    Reject { status: u16 },
}

pub struct FakeTokenService {
    refreshes: AtomicUsize,
    exchanges: Mutex<Vec<String>>,
    refresh_outcome: Mutex<RefreshOutcome>,
    exchange_ok: bool,
}

impl FakeTokenService {
    pub fn granting(expires_in_minutes: i64) -> Self {
        Self {
            refreshes: AtomicUsize::new(0),
            exchanges: Mutex::new(Vec::new()),
            refresh_outcome: Mutex::new(RefreshOutcome::Grant { expires_in_minutes }),
            exchange_ok: true,
        }
    }

    pub fn rejecting(status: u16) -> Self {
        Self {
            refreshes: AtomicUsize::new(0),
            exchanges: Mutex::new(Vec::new()),
            refresh_outcome: Mutex::new(RefreshOutcome::Reject { status }),
            exchange_ok: false,
        }
    }

    pub fn set_refresh_outcome(&self, outcome: RefreshOutcome) {
        *self.refresh_outcome.lock().expect("outcome lock poisoned") = outcome;
    }

    pub fn refresh_count(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }

    pub fn exchanged_codes(&self) -> Vec<String> {
        self.exchanges.lock().expect("exchange lock poisoned").clone()
    }
}

#[async_trait]
impl TokenService for FakeTokenService {
    async fn refresh(&self) -> Result<Credential, AuthError> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        let outcome = self
            .refresh_outcome
            .lock()
            .expect("outcome lock poisoned")
            .clone();
        match outcome {
            RefreshOutcome::Grant { expires_in_minutes } => Ok(Credential::new(
                format!("refreshed-{}", self.refresh_count()),
                Utc::now() + Duration::minutes(expires_in_minutes),
            )),
            RefreshOutcome::Reject { status } => Err(AuthError::RefreshRejected { status }),
        }
    }

    async fn exchange_code(&self, code: &str) -> Result<Credential, AuthError> {
        self.exchanges
            .lock()
            .expect("exchange lock poisoned")
            .push(code.to_string());
        if self.exchange_ok {
            Ok(Credential::new("exchanged", Utc::now() + Duration::hours(1)))
        } else {
            Err(AuthError::RefreshRejected { status: 400 })
        }
    }
}

// ---------------------------------------------------------------------------
// Playback fake
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackCall {
    Play { uri: String, device: String },
    Pause { device: String },
}

/// Records every command. Play calls can be held behind a gate to simulate a
/// slow network, and can be made to fail with a status.
#[derive(Default)]
pub struct RecordingPlayback {
    calls: Mutex<Vec<PlaybackCall>>,
    gate: Option<Arc<Semaphore>>,
    holds: Mutex<HashMap<String, Arc<Semaphore>>>,
    fail_status: Mutex<Option<u16>>,
}

impl RecordingPlayback {
    pub fn new() -> Self {
        Self::default()
    }

    /// Play calls block until [`release`](Self::release) is called.
    pub fn gated() -> Self {
        Self {
            gate: Some(Arc::new(Semaphore::new(0))),
            ..Self::default()
        }
    }

    /// Hold the next play of `uri` until a permit is added to the returned
    /// semaphore. Later plays of the same uri are not held.
    pub fn hold(&self, uri: &str) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        self.holds
            .lock()
            .expect("holds lock poisoned")
            .insert(uri.to_string(), gate.clone());
        gate
    }

    pub fn release(&self, plays: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(plays);
        }
    }

    pub fn fail_with(&self, status: u16) {
        *self.fail_status.lock().expect("status lock poisoned") = Some(status);
    }

    pub fn succeed(&self) {
        *self.fail_status.lock().expect("status lock poisoned") = None;
    }

    pub fn calls(&self) -> Vec<PlaybackCall> {
        self.calls.lock().expect("calls lock poisoned").clone()
    }

    pub fn plays(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, PlaybackCall::Play { .. }))
            .count()
    }

    pub fn pauses(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, PlaybackCall::Pause { .. }))
            .count()
    }
}

#[async_trait]
impl PlaybackCommands for RecordingPlayback {
    async fn issue_play(
        &self,
        track: &TrackRef,
        device: &DeviceId,
        _credential: &Credential,
    ) -> Result<(), SongscanError> {
        let uri = track.uri();
        self.calls
            .lock()
            .expect("calls lock poisoned")
            .push(PlaybackCall::Play {
                uri: uri.clone(),
                device: device.to_string(),
            });
        let hold = self.holds.lock().expect("holds lock poisoned").remove(&uri);
        if let Some(gate) = hold.as_ref().or(self.gate.as_ref()) {
            gate.acquire()
                .await
                .expect("gate closed")
                .forget();
        }
        let status = *self.fail_status.lock().expect("status lock poisoned");
        match status {
            Some(status) => Err(SongscanError::playback(status, "playback rejected")),
            None => Ok(()),
        }
    }

    async fn pause(
        &self,
        device: &DeviceId,
        _credential: &Credential,
    ) -> Result<(), SongscanError> {
        self.calls
            .lock()
            .expect("calls lock poisoned")
            .push(PlaybackCall::Pause {
                device: device.to_string(),
            });
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Device helpers
// ---------------------------------------------------------------------------

pub fn handshake() -> DeviceHandshake {
    DeviceHandshake::new(PlayerConfig::default())
}

pub fn ready(handshake: &DeviceHandshake, id: &str) {
    handshake.apply(&DeviceEvent::Ready {
        device_id: id.into(),
    });
}

pub fn not_ready(handshake: &DeviceHandshake, id: &str) {
    handshake.apply(&DeviceEvent::NotReady {
        device_id: id.into(),
    });
}
