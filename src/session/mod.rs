//! Scan-to-playback orchestration.
//!
//! [`state::apply`] is the pure transition table; [`Orchestrator`] owns one
//! session's state and runs the effects; [`SessionHandle`] runs it on a task
//! fed by channels.

pub mod machine;
pub mod notice;
pub mod runner;
pub mod state;

pub use machine::{Orchestrator, PlayResponse};
pub use notice::Notice;
pub use runner::{SessionCommand, SessionHandle};
pub use state::{apply, Effect, OrchestrationState, SessionEvent, Transition};
