//! Token lifecycle: startup validation, one-shot refresh scheduling, and the
//! observable authentication state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use super::credential::Credential;
use super::error::AuthError;
use super::service::TokenService;
use super::store::CredentialStore;

/// Authentication state observed by the shell to toggle the login affordance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    /// Startup has not checked the store yet.
    Unknown,
    Authenticated { expires_at: DateTime<Utc> },
    Unauthenticated,
}

/// Access to a usable credential.
///
/// Implementors never hand out a stale credential.
#[async_trait]
pub trait CredentialSource: Send + Sync {
    /// The stored credential if it is still valid. Never refreshes.
    fn current_credential(&self) -> Option<Credential>;

    /// A valid credential, refreshing a stale one first where the source can.
    ///
    /// Fails only when no valid credential can be produced, which callers
    /// report as unauthenticated.
    async fn valid_credential(&self) -> Result<Credential, AuthError> {
        self.current_credential().ok_or(AuthError::Expired)
    }
}

struct PendingRefresh {
    generation: u64,
    deadline: DateTime<Utc>,
    cancel: CancellationToken,
}

struct Inner {
    store: Arc<dyn CredentialStore>,
    service: Arc<dyn TokenService>,
    pending: Mutex<Option<PendingRefresh>>,
    generation: AtomicU64,
    state_tx: watch::Sender<AuthState>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        let pending = self
            .pending
            .get_mut()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(pending) = pending.take() {
            pending.cancel.cancel();
        }
    }
}

/// Owns the credential: the only writer of the stored token and the holder of
/// the single pending refresh timer.
///
/// Cloning is cheap; clones share the same schedule.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use songscan::auth::{FileCredentialStore, HttpTokenService, TokenLifecycleManager};
///
/// # async fn run() -> Result<(), songscan::auth::AuthError> {
/// let manager = TokenLifecycleManager::new(
///     Arc::new(FileCredentialStore::new_default()),
///     Arc::new(HttpTokenService::new("http://localhost:3000/api")),
/// );
/// let credential = manager.ensure_valid_credential().await?;
/// println!("token valid until {}", credential.expires_at);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct TokenLifecycleManager {
    inner: Arc<Inner>,
}

impl TokenLifecycleManager {
    pub fn new(store: Arc<dyn CredentialStore>, service: Arc<dyn TokenService>) -> Self {
        let (state_tx, _) = watch::channel(AuthState::Unknown);
        Self {
            inner: Arc::new(Inner {
                store,
                service,
                pending: Mutex::new(None),
                generation: AtomicU64::new(0),
                state_tx,
            }),
        }
    }

    /// Subscribe to authentication state changes.
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.inner.state_tx.subscribe()
    }

    pub fn auth_state(&self) -> AuthState {
        self.inner.state_tx.borrow().clone()
    }

    /// Return a valid credential or report the user as unauthenticated.
    ///
    /// A pending authorization code is exchanged first. An expired credential
    /// is refreshed before this returns, so callers awaiting it cannot act on
    /// a stale token. A valid credential gets a refresh scheduled at its
    /// expiry, replacing any earlier schedule.
    pub async fn ensure_valid_credential(&self) -> Result<Credential, AuthError> {
        match self.try_ensure_valid_credential().await {
            Ok(credential) => Ok(credential),
            Err(err) => {
                tracing::warn!(error = %err, "no valid credential");
                self.publish(AuthState::Unauthenticated);
                Err(err)
            }
        }
    }

    async fn try_ensure_valid_credential(&self) -> Result<Credential, AuthError> {
        self.exchange_pending_code().await?;

        let credential = self
            .inner
            .store
            .load_credential()?
            .ok_or(AuthError::NotLoggedIn)?;
        let remaining = credential.remaining_at(Utc::now());
        if credential.is_stale() {
            tracing::info!(
                expired_for_secs = -remaining.num_seconds(),
                "stored token expired, refreshing now"
            );
            return self.refresh_now().await;
        }

        tracing::debug!(remaining_secs = remaining.num_seconds(), "stored token valid");
        self.schedule_refresh(credential.expires_at);
        self.publish(AuthState::Authenticated {
            expires_at: credential.expires_at,
        });
        Ok(credential)
    }

    async fn exchange_pending_code(&self) -> Result<(), AuthError> {
        let Some(code) = self.inner.store.authorization_code()? else {
            return Ok(());
        };
        let result = self.inner.service.exchange_code(&code).await;
        // The code is single-use whatever the outcome.
        self.inner.store.clear_authorization_code()?;
        match result {
            Ok(credential) => self.inner.store.save_credential(&credential),
            Err(err) => {
                tracing::warn!(error = %err, "authorization code exchange failed");
                Ok(())
            }
        }
    }

    /// Refresh immediately, superseding any scheduled refresh.
    pub async fn refresh_now(&self) -> Result<Credential, AuthError> {
        self.cancel_pending_refresh();
        let generation = self.next_generation();
        let result = self.inner.service.refresh().await;
        self.apply_refresh_result(generation, result)
    }

    /// Schedule a one-shot refresh at `expires_at`, cancelling any pending one.
    ///
    /// The timer is a spawned task, so this must be called from within a
    /// Tokio runtime.
    pub fn schedule_refresh(&self, expires_at: DateTime<Utc>) {
        let generation = self.next_generation();
        let cancel = CancellationToken::new();
        let previous = self.pending().replace(PendingRefresh {
            generation,
            deadline: expires_at,
            cancel: cancel.clone(),
        });
        if let Some(previous) = previous {
            previous.cancel.cancel();
        }

        let delay = (expires_at - Utc::now()).to_std().unwrap_or_default();
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        tracing::debug!(%expires_at, delay_secs = delay.as_secs(), "refresh scheduled");

        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let manager = TokenLifecycleManager { inner };
            let result = manager.inner.service.refresh().await;
            if cancel.is_cancelled() {
                tracing::debug!(generation, "discarding superseded refresh result");
                return;
            }
            let _ = manager.apply_refresh_result(generation, result);
        });
    }

    /// Deadline of the outstanding refresh, if any.
    pub fn pending_refresh(&self) -> Option<DateTime<Utc>> {
        self.pending().as_ref().map(|pending| pending.deadline)
    }

    /// Cancel the outstanding refresh without touching the credential.
    pub fn cancel_pending_refresh(&self) {
        if let Some(pending) = self.pending().take() {
            pending.cancel.cancel();
        }
    }

    /// Drop the credential and the refresh schedule.
    pub fn logout(&self) -> Result<(), AuthError> {
        self.cancel_pending_refresh();
        self.inner.store.clear_credential()?;
        self.publish(AuthState::Unauthenticated);
        Ok(())
    }

    fn apply_refresh_result(
        &self,
        generation: u64,
        result: Result<Credential, AuthError>,
    ) -> Result<Credential, AuthError> {
        match result {
            Ok(credential) => {
                self.inner.store.save_credential(&credential)?;
                self.schedule_refresh(credential.expires_at);
                self.publish(AuthState::Authenticated {
                    expires_at: credential.expires_at,
                });
                Ok(credential)
            }
            Err(err) => {
                tracing::warn!(error = %err, "token refresh failed, login required");
                {
                    let mut pending = self.pending();
                    if pending.as_ref().map(|p| p.generation) == Some(generation) {
                        pending.take();
                    }
                }
                if let Err(clear_err) = self.inner.store.clear_credential() {
                    tracing::warn!(error = %clear_err, "failed to clear stale credential");
                }
                self.publish(AuthState::Unauthenticated);
                Err(err)
            }
        }
    }

    fn publish(&self, state: AuthState) {
        self.inner.state_tx.send_if_modified(|current| {
            if *current == state {
                return false;
            }
            *current = state;
            true
        });
    }

    fn next_generation(&self) -> u64 {
        self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn pending(&self) -> MutexGuard<'_, Option<PendingRefresh>> {
        self.inner
            .pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl CredentialSource for TokenLifecycleManager {
    fn current_credential(&self) -> Option<Credential> {
        match self.inner.store.load_credential() {
            Ok(Some(credential)) if !credential.is_stale() => Some(credential),
            Ok(_) => None,
            Err(err) => {
                tracing::warn!(error = %err, "failed to read credential");
                None
            }
        }
    }

    async fn valid_credential(&self) -> Result<Credential, AuthError> {
        if let Some(credential) = self.current_credential() {
            return Ok(credential);
        }
        // Also covers a scheduled refresh that has not landed yet.
        self.ensure_valid_credential().await
    }
}

#[async_trait]
impl CredentialSource for Credential {
    fn current_credential(&self) -> Option<Credential> {
        (!self.is_stale()).then(|| self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::store::MemoryCredentialStore;
    use chrono::Duration;
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct CountingService {
        refreshes: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl TokenService for CountingService {
        async fn refresh(&self) -> Result<Credential, AuthError> {
            self.refreshes.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(AuthError::RefreshRejected { status: 400 });
            }
            Ok(Credential::new("refreshed", Utc::now() + Duration::hours(1)))
        }

        async fn exchange_code(&self, _code: &str) -> Result<Credential, AuthError> {
            Err(AuthError::InvalidResponse("unused".into()))
        }
    }

    fn manager_with(
        credential: Option<Credential>,
        service: Arc<CountingService>,
    ) -> (Arc<MemoryCredentialStore>, TokenLifecycleManager) {
        let store = Arc::new(match credential {
            Some(c) => MemoryCredentialStore::with_credential(&c),
            None => MemoryCredentialStore::new(),
        });
        let manager = TokenLifecycleManager::new(store.clone(), service);
        (store, manager)
    }

    #[tokio::test]
    async fn missing_credential_reports_not_logged_in() {
        let service = Arc::new(CountingService::default());
        let (_store, manager) = manager_with(None, service.clone());

        let err = manager.ensure_valid_credential().await.unwrap_err();

        assert!(matches!(err, AuthError::NotLoggedIn));
        assert_eq!(manager.auth_state(), AuthState::Unauthenticated);
        assert!(manager.pending_refresh().is_none());
        assert_eq!(service.refreshes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn stale_credential_is_refreshed_before_returning() {
        let service = Arc::new(CountingService::default());
        let stale = Credential::new("old", Utc::now() - Duration::seconds(5));
        let (store, manager) = manager_with(Some(stale), service.clone());

        let credential = manager.ensure_valid_credential().await.unwrap();

        assert_eq!(credential.access_token, "refreshed");
        assert_eq!(service.refreshes.load(Ordering::SeqCst), 1);
        assert_eq!(
            store.load_credential().unwrap().unwrap().access_token,
            "refreshed"
        );
        assert_eq!(manager.pending_refresh(), Some(credential.expires_at));
    }

    #[tokio::test]
    async fn failed_refresh_clears_credential_and_does_not_retry() {
        let service = Arc::new(CountingService {
            fail: true,
            ..Default::default()
        });
        let stale = Credential::new("old", Utc::now() - Duration::seconds(5));
        let (store, manager) = manager_with(Some(stale), service.clone());

        let err = manager.ensure_valid_credential().await.unwrap_err();

        assert!(matches!(err, AuthError::RefreshRejected { status: 400 }));
        assert!(store.load_credential().unwrap().is_none());
        assert!(manager.pending_refresh().is_none());
        assert_eq!(manager.auth_state(), AuthState::Unauthenticated);
        assert_eq!(service.refreshes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn logout_cancels_schedule_and_clears_store() {
        let service = Arc::new(CountingService::default());
        let valid = Credential::new("t", Utc::now() + Duration::minutes(5));
        let (store, manager) = manager_with(Some(valid), service);

        manager.ensure_valid_credential().await.unwrap();
        assert!(manager.pending_refresh().is_some());

        manager.logout().unwrap();

        assert!(manager.pending_refresh().is_none());
        assert!(store.load_credential().unwrap().is_none());
        assert_eq!(manager.auth_state(), AuthState::Unauthenticated);
    }

    #[test]
    fn credential_source_hides_stale_credentials() {
        let stale = Credential::new("old", Utc::now() - Duration::seconds(1));
        assert!(stale.current_credential().is_none());

        let fresh = Credential::new("new", Utc::now() + Duration::seconds(60));
        assert_eq!(fresh.current_credential(), Some(fresh.clone()));
    }

    #[tokio::test]
    async fn valid_credential_refreshes_stale_token() {
        let service = Arc::new(CountingService::default());
        let stale = Credential::new("old", Utc::now() - Duration::seconds(1));
        let (_store, manager) = manager_with(Some(stale), service.clone());

        let credential = manager.valid_credential().await.unwrap();

        assert_eq!(credential.access_token, "refreshed");
        assert_eq!(service.refreshes.load(Ordering::SeqCst), 1);

        // Already valid: no second refresh.
        manager.valid_credential().await.unwrap();
        assert_eq!(service.refreshes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn stale_plain_credential_is_expired() {
        let stale = Credential::new("old", Utc::now() - Duration::seconds(1));
        assert!(matches!(
            stale.valid_credential().await,
            Err(AuthError::Expired)
        ));
    }
}
