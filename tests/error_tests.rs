//! Error classification and recovery routing.

use songscan::auth::AuthError;
use songscan::error::{ErrorCategory, RecoverySuggestion, SongscanError};
use songscan::scan::ScanFailure;
use songscan::session::Notice;

#[test]
fn auth_errors_are_unauthenticated_and_fatal() {
    for err in [
        AuthError::NotLoggedIn,
        AuthError::Expired,
        AuthError::RefreshRejected { status: 400 },
        AuthError::Network("connection reset".into()),
    ] {
        let err = SongscanError::from(err);
        assert_eq!(err.category(), ErrorCategory::Unauthenticated);
        assert_eq!(err.recovery_suggestion(), RecoverySuggestion::Login);
        assert!(err.is_fatal_to_session());
    }
}

#[test]
fn scan_errors_enter_error_state_and_suggest_retry() {
    let rejected = Notice::ScanRejected {
        raw: "not a url".into(),
    };
    let broken = Notice::ScanCapabilityFailure {
        failure: ScanFailure::hard("no camera"),
    };

    assert_eq!(rejected.category(), ErrorCategory::ScanRejected);
    assert_eq!(broken.category(), ErrorCategory::ScanCapabilityFailure);
    for notice in [&rejected, &broken] {
        assert!(notice.category().enters_error_state());
        assert_eq!(notice.recovery_suggestion(), RecoverySuggestion::RetryScan);
    }
}

#[test]
fn device_and_playback_errors_leave_state_alone() {
    let device = Notice::DeviceUnavailable {
        reason: "connecting".into(),
    };
    assert_eq!(device.recovery_suggestion(), RecoverySuggestion::WaitForDevice);
    assert!(!device.category().enters_error_state());

    let play = SongscanError::playback(500, "oops");
    assert_eq!(play.category(), ErrorCategory::PlaybackRequestFailure);
    assert_eq!(play.recovery_suggestion(), RecoverySuggestion::RetryPlay);
    assert!(!play.category().enters_error_state());
    assert!(!play.is_fatal_to_session());
}

#[test]
fn unauthorized_playback_routes_to_login() {
    let err = SongscanError::playback(401, "The access token expired");
    assert_eq!(err.category(), ErrorCategory::Unauthenticated);
    assert_eq!(err.recovery_suggestion(), RecoverySuggestion::Login);
}

#[test]
fn setup_errors_map_to_their_categories() {
    let config = SongscanError::Configuration("missing client id".into());
    assert_eq!(config.category(), ErrorCategory::Configuration);
    assert_eq!(
        config.recovery_suggestion(),
        RecoverySuggestion::CheckConfiguration
    );

    let io = SongscanError::from(std::io::Error::other("disk full"));
    assert_eq!(io.category(), ErrorCategory::Storage);

    let state = SongscanError::InvalidState("session has stopped".into());
    assert_eq!(state.recovery_suggestion(), RecoverySuggestion::ContactSupport);
}

#[test]
fn categories_serialize_snake_case() {
    let json = serde_json::to_string(&ErrorCategory::PlaybackRequestFailure).unwrap();
    assert_eq!(json, "\"playback_request_failure\"");
}
