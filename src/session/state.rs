//! Pure orchestration transition table.

use serde::{Deserialize, Serialize};
use strum::Display;

use crate::scan::{ScanFailure, ScanOutcome, TrackRef};

/// What the user is looking at. Exactly one per session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OrchestrationState {
    #[default]
    Idle,
    Scanning,
    Error,
    Playing,
}

impl OrchestrationState {
    /// True everywhere except the start screen.
    pub fn is_mid_flow(self) -> bool {
        !matches!(self, Self::Idle)
    }
}

/// Inputs to the transition table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    ScanRequested,
    Scanned(ScanOutcome),
    ScanFailed(ScanFailure),
    RetryRequested,
    ScanAgainRequested,
    Dismissed,
    Reset,
}

/// Side effects requested by a transition, carried out by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Stop whatever is playing before leaving the current screen.
    PausePlayback,
    /// A track was selected; whether a play command fires depends on the
    /// trigger policy and device readiness.
    TrackSelected(TrackRef),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub to: OrchestrationState,
    pub effects: Vec<Effect>,
}

impl Transition {
    fn to(state: OrchestrationState) -> Self {
        Self {
            to: state,
            effects: Vec::new(),
        }
    }

    fn with(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Look up `event` in the transition table.
///
/// Returns `None` when the event is not valid from `state`; callers treat
/// that as a no-op. A reset while already idle is such a no-op, so resetting
/// twice behaves like resetting once.
pub fn apply(state: OrchestrationState, event: &SessionEvent) -> Option<Transition> {
    use OrchestrationState::*;

    let transition = match (state, event) {
        (Idle, SessionEvent::ScanRequested) => Transition::to(Scanning),
        (Scanning, SessionEvent::Scanned(ScanOutcome::Track(track))) => {
            Transition::to(Playing).with(Effect::TrackSelected(track.clone()))
        }
        (Scanning, SessionEvent::Scanned(ScanOutcome::Unrecognized)) => Transition::to(Error),
        (Scanning, SessionEvent::ScanFailed(_)) => Transition::to(Error),
        (Error, SessionEvent::RetryRequested) => {
            Transition::to(Scanning).with(Effect::PausePlayback)
        }
        (Playing, SessionEvent::ScanAgainRequested) => {
            Transition::to(Scanning).with(Effect::PausePlayback)
        }
        (Playing, SessionEvent::Dismissed) => Transition::to(Idle).with(Effect::PausePlayback),
        (Idle, SessionEvent::Reset) => return None,
        (_, SessionEvent::Reset) => Transition::to(Idle).with(Effect::PausePlayback),
        _ => return None,
    };
    Some(transition)
}
