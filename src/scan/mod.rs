//! Scan classification and scanner reports.

pub mod classifier;
pub mod report;

pub use classifier::{classify, ScanOutcome, TrackRef, TRACK_LINK_PREFIX};
pub use report::{ScanFailure, ScanFailureKind, ScanReport};
