//! Spawned session task and the handle the UI shell talks to.

use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;

use super::machine::Orchestrator;
use super::notice::Notice;
use super::state::{OrchestrationState, SessionEvent};
use crate::error::SongscanError;
use crate::scan::{ScanFailure, ScanReport};

const INBOX_CAPACITY: usize = 64;

/// Messages accepted by a running session.
#[derive(Debug, Clone)]
pub enum SessionCommand {
    Event(SessionEvent),
    Scan(ScanReport),
    TapPlay,
    Shutdown,
}

/// Handle to a session running on its own task.
///
/// ```no_run
/// # async fn demo(orchestrator: songscan::session::Orchestrator) -> songscan::error::Result<()> {
/// use songscan::session::SessionHandle;
///
/// let session = SessionHandle::spawn(orchestrator);
/// session.request_scan().await?;
/// session.decoded("https://open.spotify.com/track/abc123").await?;
/// session.tap_play().await?;
/// # Ok(())
/// # }
/// ```
pub struct SessionHandle {
    commands: mpsc::Sender<SessionCommand>,
    state: watch::Receiver<OrchestrationState>,
    notices: broadcast::Sender<Notice>,
    task: JoinHandle<Orchestrator>,
}

impl SessionHandle {
    pub fn spawn(orchestrator: Orchestrator) -> Self {
        let (commands, inbox) = mpsc::channel(INBOX_CAPACITY);
        let state = orchestrator.watch_state();
        let notices = orchestrator.notice_sender();
        let task = tokio::spawn(orchestrator.run(inbox));
        Self {
            commands,
            state,
            notices,
            task,
        }
    }

    pub fn state(&self) -> OrchestrationState {
        *self.state.borrow()
    }

    pub fn is_mid_flow(&self) -> bool {
        self.state().is_mid_flow()
    }

    pub fn watch_state(&self) -> watch::Receiver<OrchestrationState> {
        self.state.clone()
    }

    pub fn subscribe_notices(&self) -> broadcast::Receiver<Notice> {
        self.notices.subscribe()
    }

    pub async fn send(&self, command: SessionCommand) -> Result<(), SongscanError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| SongscanError::InvalidState("session has stopped".into()))
    }

    pub async fn request_scan(&self) -> Result<(), SongscanError> {
        self.send(SessionCommand::Event(SessionEvent::ScanRequested))
            .await
    }

    /// Hand over text decoded by the scanner.
    pub async fn decoded(&self, text: impl Into<String>) -> Result<(), SongscanError> {
        self.send(SessionCommand::Scan(ScanReport::Decoded { text: text.into() }))
            .await
    }

    pub async fn scan_failed(&self, failure: ScanFailure) -> Result<(), SongscanError> {
        self.send(SessionCommand::Scan(ScanReport::Failed { failure }))
            .await
    }

    pub async fn retry(&self) -> Result<(), SongscanError> {
        self.send(SessionCommand::Event(SessionEvent::RetryRequested))
            .await
    }

    pub async fn scan_again(&self) -> Result<(), SongscanError> {
        self.send(SessionCommand::Event(SessionEvent::ScanAgainRequested))
            .await
    }

    pub async fn dismiss(&self) -> Result<(), SongscanError> {
        self.send(SessionCommand::Event(SessionEvent::Dismissed))
            .await
    }

    /// External reset signal (e.g. the app returned to its start route).
    pub async fn reset(&self) -> Result<(), SongscanError> {
        self.send(SessionCommand::Event(SessionEvent::Reset)).await
    }

    pub async fn tap_play(&self) -> Result<(), SongscanError> {
        self.send(SessionCommand::TapPlay).await
    }

    /// Stop the session task and hand back the orchestrator.
    pub async fn shutdown(self) -> Result<Orchestrator, SongscanError> {
        // The loop also stops once every sender is gone.
        let _ = self.commands.send(SessionCommand::Shutdown).await;
        self.task
            .await
            .map_err(|err| SongscanError::InvalidState(format!("session task failed: {err}")))
    }
}
