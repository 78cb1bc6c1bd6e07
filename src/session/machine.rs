//! The session orchestrator: state, current track, deferred play and epoch.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, watch};
use uuid::Uuid;

use super::notice::Notice;
use super::runner::SessionCommand;
use super::state::{apply, Effect, OrchestrationState, SessionEvent};
use crate::auth::CredentialSource;
use crate::device::{DeviceHandle, DeviceId, DeviceReadiness};
use crate::error::SongscanError;
use crate::playback::{PlaybackCommands, TriggerPolicy};
use crate::scan::{classify, ScanOutcome, ScanReport, TrackRef};

const NOTICE_CAPACITY: usize = 32;

/// Result of a play request, tagged with the epoch it was issued under.
#[derive(Debug)]
pub struct PlayResponse {
    pub epoch: u64,
    pub track: TrackRef,
    pub device: DeviceId,
    pub result: Result<(), SongscanError>,
}

/// Owns one session's orchestration state and drives its side effects.
///
/// Collaborators are injected: a [`CredentialSource`] for the bearer token,
/// [`PlaybackCommands`] for the remote calls, and the device handshake's
/// watch receiver as the readiness guard.
///
/// Play requests run as spawned tasks and report back through an internal
/// channel. Every transition that pauses playback also bumps the epoch, so a
/// response that arrives after the user moved on is recognised as stale. Its
/// effect is undone with a pause, unless the device belongs to the current
/// track, in which case the current track is played again.
pub struct Orchestrator {
    session_id: Uuid,
    state: OrchestrationState,
    policy: TriggerPolicy,
    current_track: Option<TrackRef>,
    deferred_play: bool,
    epoch: u64,
    /// Device a play command last succeeded on in the current epoch.
    active_device: Option<DeviceId>,
    /// Devices with a play request outstanding in the current epoch.
    pending_plays: Vec<DeviceId>,
    in_flight: usize,

    credentials: Arc<dyn CredentialSource>,
    playback: Arc<dyn PlaybackCommands>,
    device: watch::Receiver<DeviceHandle>,

    state_tx: watch::Sender<OrchestrationState>,
    notice_tx: broadcast::Sender<Notice>,
    responses_tx: mpsc::UnboundedSender<PlayResponse>,
    responses_rx: mpsc::UnboundedReceiver<PlayResponse>,
}

impl Orchestrator {
    pub fn new(
        credentials: Arc<dyn CredentialSource>,
        playback: Arc<dyn PlaybackCommands>,
        device: watch::Receiver<DeviceHandle>,
    ) -> Self {
        let (state_tx, _) = watch::channel(OrchestrationState::Idle);
        let (notice_tx, _) = broadcast::channel(NOTICE_CAPACITY);
        let (responses_tx, responses_rx) = mpsc::unbounded_channel();
        Self {
            session_id: Uuid::new_v4(),
            state: OrchestrationState::Idle,
            policy: TriggerPolicy::default(),
            current_track: None,
            deferred_play: false,
            epoch: 0,
            active_device: None,
            pending_plays: Vec::new(),
            in_flight: 0,
            credentials,
            playback,
            device,
            state_tx,
            notice_tx,
            responses_tx,
            responses_rx,
        }
    }

    pub fn with_policy(mut self, policy: TriggerPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn state(&self) -> OrchestrationState {
        self.state
    }

    pub fn policy(&self) -> TriggerPolicy {
        self.policy
    }

    pub fn is_mid_flow(&self) -> bool {
        self.state.is_mid_flow()
    }

    pub fn current_track(&self) -> Option<&TrackRef> {
        self.current_track.as_ref()
    }

    pub fn has_deferred_play(&self) -> bool {
        self.deferred_play
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Whether the start screen should offer scanning; false while the
    /// playback device is still connecting.
    pub fn can_request_scan(&self) -> bool {
        self.state == OrchestrationState::Idle
            && matches!(self.readiness(), DeviceReadiness::Ready(_))
    }

    pub fn watch_state(&self) -> watch::Receiver<OrchestrationState> {
        self.state_tx.subscribe()
    }

    pub fn subscribe_notices(&self) -> broadcast::Receiver<Notice> {
        self.notice_tx.subscribe()
    }

    pub(crate) fn notice_sender(&self) -> broadcast::Sender<Notice> {
        self.notice_tx.clone()
    }

    fn readiness(&self) -> DeviceReadiness {
        self.device.borrow().readiness()
    }

    /// Feed one event through the transition table and run its effects.
    ///
    /// Returns the new state, or `None` if the event was not valid from the
    /// current state.
    pub async fn dispatch(&mut self, event: SessionEvent) -> Option<OrchestrationState> {
        let Some(transition) = apply(self.state, &event) else {
            tracing::debug!(state = %self.state, ?event, "event ignored");
            return None;
        };

        match &event {
            SessionEvent::ScanRequested => {
                if !matches!(self.readiness(), DeviceReadiness::Ready(_)) {
                    self.notify(Notice::DeviceUnavailable {
                        reason: "playback device is not ready yet".into(),
                    });
                }
            }
            SessionEvent::ScanFailed(failure) => {
                tracing::warn!(kind = %failure.kind, message = %failure.message, "scanner failure");
                self.notify(Notice::ScanCapabilityFailure {
                    failure: failure.clone(),
                });
            }
            _ => {}
        }

        let from = self.state;
        self.state = transition.to;
        tracing::info!(session = %self.session_id, %from, to = %self.state, "session transition");

        for effect in transition.effects {
            match effect {
                Effect::PausePlayback => self.leave_playback().await,
                Effect::TrackSelected(track) => self.select_track(track),
            }
        }

        self.state_tx.send_replace(self.state);
        Some(self.state)
    }

    /// Classify a scanner report and dispatch the resulting event.
    pub async fn report_scan(&mut self, report: ScanReport) -> Option<OrchestrationState> {
        let event = match report {
            ScanReport::Decoded { text } => {
                let outcome = classify(&text);
                if outcome == ScanOutcome::Unrecognized
                    && self.state == OrchestrationState::Scanning
                {
                    tracing::info!(raw = %text, "scan rejected");
                    self.notify(Notice::ScanRejected { raw: text });
                }
                SessionEvent::Scanned(outcome)
            }
            ScanReport::Failed { failure } => SessionEvent::ScanFailed(failure),
        };
        self.dispatch(event).await
    }

    /// User tapped play. Only meaningful while `Playing`.
    pub fn tap_play(&mut self) -> bool {
        if self.state != OrchestrationState::Playing || !self.policy.fires_on_tap() {
            tracing::debug!(state = %self.state, "play tap ignored");
            return false;
        }
        self.play_or_defer();
        true
    }

    /// Re-read the device handle after the handshake published a change.
    pub fn device_changed(&mut self) {
        let readiness = self.device.borrow_and_update().readiness();
        match readiness {
            DeviceReadiness::Ready(device) => {
                if self.deferred_play && self.state == OrchestrationState::Playing {
                    self.deferred_play = false;
                    tracing::info!(%device, "device ready, issuing deferred play");
                    self.fire_play(device);
                }
            }
            DeviceReadiness::NotReadyYet => {
                // Whatever was playing on the old device id is gone.
                self.active_device = None;
            }
            DeviceReadiness::Closed => self.device_lost("playback runtime closed"),
        }
    }

    /// The device will never become ready; a deferred play is dropped.
    fn device_lost(&mut self, reason: &str) {
        self.active_device = None;
        if self.deferred_play {
            self.deferred_play = false;
            tracing::info!(reason, "dropping deferred play");
            self.notify(Notice::DeviceUnavailable {
                reason: reason.into(),
            });
        }
    }

    /// Handle the outcome of a spawned play request.
    pub async fn handle_play_response(&mut self, response: PlayResponse) {
        self.in_flight = self.in_flight.saturating_sub(1);

        if response.epoch != self.epoch {
            match response.result {
                Ok(()) => self.undo_stale_play(response).await,
                Err(err) => {
                    tracing::debug!(
                        error = %err,
                        epoch = response.epoch,
                        "stale play failure discarded"
                    );
                }
            }
            return;
        }

        if let Some(index) = self.pending_plays.iter().position(|d| *d == response.device) {
            self.pending_plays.swap_remove(index);
        }
        match response.result {
            Ok(()) => {
                tracing::info!(
                    track = %response.track,
                    device = %response.device,
                    "playback started"
                );
                self.active_device = Some(response.device);
            }
            Err(err) => {
                tracing::warn!(error = %err, track = %response.track, "play command failed");
                self.notify(Notice::from_error(&err));
            }
        }
    }

    /// A play from an earlier epoch took effect on `response.device`.
    ///
    /// A current-epoch play still pending on that device will override it. If
    /// the current track already played there, it was just overridden and is
    /// played again. Otherwise nothing should be playing, so pause.
    async fn undo_stale_play(&mut self, response: PlayResponse) {
        let PlayResponse {
            epoch,
            track,
            device,
            ..
        } = response;
        if self.pending_plays.contains(&device) {
            tracing::debug!(%track, epoch, %device, "stale play succeeded, newer play pending");
        } else if self.active_device.as_ref() == Some(&device) {
            tracing::debug!(
                %track,
                epoch,
                %device,
                "stale play succeeded, restoring current track"
            );
            self.fire_play(device);
        } else {
            tracing::debug!(%track, epoch, current = self.epoch, "stale play succeeded, pausing");
            self.pause_on(&device).await;
        }
        self.notify(Notice::StalePlaybackDiscarded { track });
    }

    /// Wait for every in-flight play request to report back and handle it.
    pub async fn settle(&mut self) {
        while self.in_flight > 0 {
            let Some(response) = self.responses_rx.recv().await else {
                break;
            };
            self.handle_play_response(response).await;
        }
    }

    /// Drive the session from `inbox`, device updates, and play responses
    /// until shutdown. Returns the orchestrator for inspection.
    pub async fn run(mut self, mut inbox: mpsc::Receiver<SessionCommand>) -> Self {
        let mut device_open = true;
        // Ready may have been published before the loop started.
        self.device_changed();
        loop {
            tokio::select! {
                command = inbox.recv() => match command {
                    Some(SessionCommand::Shutdown) | None => break,
                    Some(command) => self.handle_command(command).await,
                },
                changed = self.device.changed(), if device_open => {
                    if changed.is_ok() {
                        self.device_changed();
                    } else {
                        tracing::warn!("device handshake dropped");
                        device_open = false;
                        self.device_lost("playback device handshake dropped");
                    }
                }
                Some(response) = self.responses_rx.recv() => {
                    self.handle_play_response(response).await;
                }
            }
        }
        tracing::info!(session = %self.session_id, state = %self.state, "session stopped");
        self
    }

    async fn handle_command(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::Event(event) => {
                self.dispatch(event).await;
            }
            SessionCommand::Scan(report) => {
                self.report_scan(report).await;
            }
            SessionCommand::TapPlay => {
                self.tap_play();
            }
            SessionCommand::Shutdown => {}
        }
    }

    fn select_track(&mut self, track: TrackRef) {
        self.current_track = Some(track);
        self.deferred_play = false;
        if self.policy.fires_on_entry() {
            self.play_or_defer();
        }
    }

    fn play_or_defer(&mut self) {
        match self.readiness() {
            DeviceReadiness::Ready(device) => self.fire_play(device),
            DeviceReadiness::NotReadyYet => {
                tracing::info!("device not ready, deferring play");
                self.deferred_play = true;
                self.notify(Notice::DeviceUnavailable {
                    reason: "waiting for the playback device".into(),
                });
            }
            DeviceReadiness::Closed => {
                self.notify(Notice::DeviceUnavailable {
                    reason: "playback runtime closed".into(),
                });
            }
        }
    }

    fn fire_play(&mut self, device: DeviceId) {
        let Some(track) = self.current_track.clone() else {
            return;
        };

        let credentials = Arc::clone(&self.credentials);
        let playback = Arc::clone(&self.playback);
        let responses = self.responses_tx.clone();
        let epoch = self.epoch;
        self.in_flight += 1;
        self.pending_plays.push(device.clone());
        tokio::spawn(async move {
            // A stale token is refreshed here, off the session loop.
            let result = match credentials.valid_credential().await {
                Ok(credential) => playback.issue_play(&track, &device, &credential).await,
                Err(err) => Err(err.into()),
            };
            let _ = responses.send(PlayResponse {
                epoch,
                track,
                device,
                result,
            });
        });
    }

    async fn leave_playback(&mut self) {
        self.epoch += 1;
        self.pending_plays.clear();
        self.deferred_play = false;
        self.current_track = None;
        if let Some(device) = self.active_device.take() {
            self.pause_on(&device).await;
        }
    }

    async fn pause_on(&mut self, device: &DeviceId) {
        let credential = match self.credentials.valid_credential().await {
            Ok(credential) => credential,
            Err(err) => {
                tracing::debug!(error = %err, %device, "no credential, skipping pause");
                return;
            }
        };
        if let Err(err) = self.playback.pause(device, &credential).await {
            tracing::warn!(error = %err, %device, "pause failed");
        }
    }

    fn notify(&self, notice: Notice) {
        // No subscribers is fine.
        let _ = self.notice_tx.send(notice);
    }
}
