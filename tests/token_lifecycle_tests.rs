//! Token lifecycle tests on a paused clock: refresh scheduling, the single
//! pending timer, code exchange and failure handling.

mod support;

use std::sync::Arc;
use std::time::Duration;

use songscan::auth::{
    AuthError, AuthState, CredentialSource, CredentialStore, MemoryCredentialStore,
    TokenLifecycleManager,
};

use support::{credential_expiring_in, settle_tasks, FakeTokenService, RefreshOutcome};

fn manager(
    store: &Arc<MemoryCredentialStore>,
    service: &Arc<FakeTokenService>,
) -> TokenLifecycleManager {
    TokenLifecycleManager::new(store.clone(), service.clone())
}

#[tokio::test(start_paused = true)]
async fn valid_credential_is_returned_and_refreshed_once_at_expiry() {
    let credential = credential_expiring_in(5);
    let store = Arc::new(MemoryCredentialStore::with_credential(&credential));
    let service = Arc::new(FakeTokenService::granting(60));
    let manager = manager(&store, &service);

    let returned = manager.ensure_valid_credential().await.unwrap();
    assert_eq!(returned, credential);
    assert_eq!(manager.pending_refresh(), Some(credential.expires_at));
    assert_eq!(
        manager.auth_state(),
        AuthState::Authenticated {
            expires_at: credential.expires_at
        }
    );

    tokio::time::advance(Duration::from_secs(4 * 60)).await;
    settle_tasks().await;
    assert_eq!(service.refresh_count(), 0);

    tokio::time::advance(Duration::from_secs(61)).await;
    settle_tasks().await;
    assert_eq!(service.refresh_count(), 1);

    let stored = store.load_credential().unwrap().unwrap();
    assert_eq!(stored.access_token, "refreshed-1");
    assert_eq!(manager.pending_refresh(), Some(stored.expires_at));
}

#[tokio::test(start_paused = true)]
async fn rescheduling_leaves_exactly_one_pending_refresh() {
    let store = Arc::new(MemoryCredentialStore::new());
    let service = Arc::new(FakeTokenService::granting(60));
    let manager = manager(&store, &service);

    let first = credential_expiring_in(2).expires_at;
    let second = credential_expiring_in(10).expires_at;
    manager.schedule_refresh(first);
    manager.schedule_refresh(second);
    assert_eq!(manager.pending_refresh(), Some(second));

    // The superseded timer must not fire.
    tokio::time::advance(Duration::from_secs(3 * 60)).await;
    settle_tasks().await;
    assert_eq!(service.refresh_count(), 0);

    tokio::time::advance(Duration::from_secs(8 * 60)).await;
    settle_tasks().await;
    assert_eq!(service.refresh_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn scheduled_refresh_failure_goes_unauthenticated_without_retry() {
    let credential = credential_expiring_in(1);
    let store = Arc::new(MemoryCredentialStore::with_credential(&credential));
    let service = Arc::new(FakeTokenService::granting(60));
    service.set_refresh_outcome(RefreshOutcome::Reject { status: 401 });
    let manager = manager(&store, &service);
    let mut auth = manager.subscribe();

    manager.ensure_valid_credential().await.unwrap();
    auth.borrow_and_update();

    tokio::time::advance(Duration::from_secs(61)).await;
    settle_tasks().await;

    assert_eq!(service.refresh_count(), 1);
    assert!(auth.has_changed().unwrap());
    assert_eq!(*auth.borrow(), AuthState::Unauthenticated);
    assert!(store.load_credential().unwrap().is_none());
    assert!(manager.pending_refresh().is_none());
    assert!(manager.current_credential().is_none());

    tokio::time::advance(Duration::from_secs(60 * 60)).await;
    settle_tasks().await;
    assert_eq!(service.refresh_count(), 1);
}

#[tokio::test]
async fn expired_credential_waits_for_refresh() {
    let store = Arc::new(MemoryCredentialStore::with_credential(
        &credential_expiring_in(-1),
    ));
    let service = Arc::new(FakeTokenService::granting(60));
    let manager = manager(&store, &service);

    let credential = manager.ensure_valid_credential().await.unwrap();

    assert_eq!(service.refresh_count(), 1);
    assert!(!credential.is_stale());
    assert_eq!(manager.current_credential(), Some(credential));
}

#[tokio::test]
async fn pending_code_is_exchanged_then_cleared() {
    let store = Arc::new(MemoryCredentialStore::new());
    store.save_authorization_code("code-123").unwrap();
    let service = Arc::new(FakeTokenService::granting(60));
    let manager = manager(&store, &service);

    let credential = manager.ensure_valid_credential().await.unwrap();

    assert_eq!(credential.access_token, "exchanged");
    assert_eq!(service.exchanged_codes(), vec!["code-123".to_string()]);
    assert!(store.authorization_code().unwrap().is_none());
    assert_eq!(service.refresh_count(), 0);
    manager.cancel_pending_refresh();
}

#[tokio::test]
async fn failed_code_exchange_still_clears_code() {
    let store = Arc::new(MemoryCredentialStore::new());
    store.save_authorization_code("bad-code").unwrap();
    let service = Arc::new(FakeTokenService::rejecting(400));
    let manager = manager(&store, &service);

    let err = manager.ensure_valid_credential().await.unwrap_err();

    assert!(matches!(err, AuthError::NotLoggedIn));
    assert!(store.authorization_code().unwrap().is_none());
    assert_eq!(manager.auth_state(), AuthState::Unauthenticated);
}

#[tokio::test]
async fn logout_clears_everything() {
    let store = Arc::new(MemoryCredentialStore::with_credential(
        &credential_expiring_in(30),
    ));
    let service = Arc::new(FakeTokenService::granting(60));
    let manager = manager(&store, &service);
    manager.ensure_valid_credential().await.unwrap();

    manager.logout().unwrap();

    assert!(manager.pending_refresh().is_none());
    assert!(manager.current_credential().is_none());
    assert_eq!(manager.auth_state(), AuthState::Unauthenticated);
}
