//! Session tracking
//!
//! Knows whether someone is signed in to the remote mirror and tells a single
//! listener when that changes. The session itself is kept in the local cache
//! so it survives restarts.
//!
//! Only one listener exists at a time: subscribing again closes the previous
//! subscription, so reconfiguring the remote can never leave two handlers
//! reacting to the same transition.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::{Result, StoreError};
use crate::models::{AuthSession, UserIdentity};
use crate::remote::RemoteBackend;
use crate::storage::LocalCache;

/// A change in sign-in state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthTransition {
    SignedIn(UserIdentity),
    SignedOut,
}

/// Receiving half of the auth listener
///
/// Yields `None` once the tracker is dropped or a newer subscription
/// replaces this one.
#[derive(Debug)]
pub struct AuthSubscription {
    rx: mpsc::UnboundedReceiver<AuthTransition>,
}

impl AuthSubscription {
    /// Wait for the next transition
    pub async fn recv(&mut self) -> Option<AuthTransition> {
        self.rx.recv().await
    }

    /// Take a pending transition without waiting
    pub fn try_recv(&mut self) -> Option<AuthTransition> {
        self.rx.try_recv().ok()
    }
}

/// Tracks the signed-in identity for one remote client
pub struct SessionTracker {
    backend: Arc<dyn RemoteBackend>,
    cache: LocalCache,
    session: Mutex<Option<AuthSession>>,
    listener: Mutex<Option<mpsc::UnboundedSender<AuthTransition>>>,
}

impl SessionTracker {
    /// Create a tracker, restoring any session persisted in the cache
    pub fn new(backend: Arc<dyn RemoteBackend>, cache: LocalCache) -> Self {
        let session = cache.read_session();
        if session.is_some() {
            debug!("Restored persisted remote session");
        }

        Self {
            backend,
            cache,
            session: Mutex::new(session),
            listener: Mutex::new(None),
        }
    }

    /// The stored session, without checking it against the service
    pub fn session(&self) -> Option<AuthSession> {
        self.session.lock().clone()
    }

    /// Check the stored session with the remote service
    ///
    /// `NotAuthenticated` when there is no session or the service rejects it.
    /// Transport failures come back as `RemoteUnavailable`.
    pub async fn resolve(&self) -> Result<(AuthSession, UserIdentity)> {
        let session = self.session().ok_or(StoreError::NotAuthenticated)?;
        let user = self.backend.get_user(&session).await?;
        Ok((session, user))
    }

    /// The signed-in user, or `None` when the session can't be confirmed
    pub async fn current_user(&self) -> Option<UserIdentity> {
        match self.resolve().await {
            Ok((_, user)) => Some(user),
            Err(e) => {
                debug!("Session check failed: {}", e);
                None
            }
        }
    }

    /// Install the auth listener, replacing any previous one
    pub fn subscribe(&self) -> AuthSubscription {
        let (tx, rx) = mpsc::unbounded_channel();
        if self.listener.lock().replace(tx).is_some() {
            debug!("Replaced existing auth listener");
        }
        AuthSubscription { rx }
    }

    /// Remove the auth listener
    pub fn unsubscribe(&self) {
        self.listener.lock().take();
    }

    pub fn has_listener(&self) -> bool {
        self.listener
            .lock()
            .as_ref()
            .is_some_and(|tx| !tx.is_closed())
    }

    /// Sign in with email and password
    ///
    /// The session is persisted before the transition is announced.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<UserIdentity> {
        let session = self.backend.sign_in(email, password).await?;
        let user = session.user.clone();

        self.cache.write_session(&session)?;
        *self.session.lock() = Some(session);

        info!("Signed in as {}", user.email.as_deref().unwrap_or(&user.id));
        self.emit(AuthTransition::SignedIn(user.clone()));
        Ok(user)
    }

    /// Sign out, forgetting the local session even if the service can't be reached
    pub async fn sign_out(&self) -> Result<()> {
        let session = self.session.lock().take();

        if let Some(session) = session {
            if let Err(e) = self.backend.sign_out(&session).await {
                warn!("Remote sign-out failed, clearing local session anyway: {}", e);
            }
        }

        self.cache.clear_session()?;
        info!("Signed out");
        self.emit(AuthTransition::SignedOut);
        Ok(())
    }

    fn emit(&self, transition: AuthTransition) {
        let mut listener = self.listener.lock();
        if let Some(tx) = listener.as_ref() {
            if tx.send(transition).is_err() {
                debug!("Auth listener went away, dropping it");
                listener.take();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::fake::FakeBackend;
    use tempfile::TempDir;

    fn tracker(temp_dir: &TempDir, backend: Arc<FakeBackend>) -> SessionTracker {
        SessionTracker::new(backend, LocalCache::new(temp_dir.path()))
    }

    #[tokio::test]
    async fn test_signed_out_initially() {
        let temp_dir = TempDir::new().unwrap();
        let tracker = tracker(&temp_dir, Arc::new(FakeBackend::new()));

        assert!(tracker.session().is_none());
        assert!(tracker.current_user().await.is_none());
    }

    #[tokio::test]
    async fn test_sign_in_emits_and_persists() {
        let temp_dir = TempDir::new().unwrap();
        let backend = Arc::new(FakeBackend::new());
        let tracker = tracker(&temp_dir, backend.clone());
        let mut sub = tracker.subscribe();

        let user = tracker.sign_in("clerk@example.com", "pw").await.unwrap();

        assert_eq!(sub.try_recv(), Some(AuthTransition::SignedIn(user.clone())));
        assert_eq!(tracker.current_user().await, Some(user));
        assert!(LocalCache::new(temp_dir.path()).read_session().is_some());
    }

    #[tokio::test]
    async fn test_session_restored_from_cache() {
        let temp_dir = TempDir::new().unwrap();
        let backend = Arc::new(FakeBackend::new());
        let user = tracker(&temp_dir, backend.clone())
            .sign_in("clerk@example.com", "pw")
            .await
            .unwrap();

        let restored = tracker(&temp_dir, backend);
        assert_eq!(restored.current_user().await, Some(user));
    }

    #[tokio::test]
    async fn test_current_user_none_on_backend_error() {
        let temp_dir = TempDir::new().unwrap();
        let backend = Arc::new(FakeBackend::new());
        let tracker = tracker(&temp_dir, backend.clone());
        tracker.sign_in("clerk@example.com", "pw").await.unwrap();

        backend.set_offline(true);
        assert!(tracker.current_user().await.is_none());
    }

    #[tokio::test]
    async fn test_resolve_tells_offline_from_signed_out() {
        let temp_dir = TempDir::new().unwrap();
        let backend = Arc::new(FakeBackend::new());
        let tracker = tracker(&temp_dir, backend.clone());
        assert!(matches!(tracker.resolve().await, Err(StoreError::NotAuthenticated)));

        tracker.sign_in("clerk@example.com", "pw").await.unwrap();
        backend.set_offline(true);
        assert!(matches!(
            tracker.resolve().await,
            Err(StoreError::RemoteUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_sign_out_clears_even_when_offline() {
        let temp_dir = TempDir::new().unwrap();
        let backend = Arc::new(FakeBackend::new());
        let tracker = tracker(&temp_dir, backend.clone());
        tracker.sign_in("clerk@example.com", "pw").await.unwrap();
        let mut sub = tracker.subscribe();

        backend.set_offline(true);
        tracker.sign_out().await.unwrap();

        assert_eq!(sub.try_recv(), Some(AuthTransition::SignedOut));
        assert!(tracker.session().is_none());
        assert!(LocalCache::new(temp_dir.path()).read_session().is_none());
    }

    #[tokio::test]
    async fn test_resubscribe_closes_previous_listener() {
        let temp_dir = TempDir::new().unwrap();
        let tracker = tracker(&temp_dir, Arc::new(FakeBackend::new()));

        let mut first = tracker.subscribe();
        let mut second = tracker.subscribe();
        tracker.sign_in("clerk@example.com", "pw").await.unwrap();

        // the first subscription is closed and sees nothing
        assert_eq!(first.recv().await, None);
        assert!(matches!(second.try_recv(), Some(AuthTransition::SignedIn(_))));
        assert!(second.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_unsubscribe() {
        let temp_dir = TempDir::new().unwrap();
        let tracker = tracker(&temp_dir, Arc::new(FakeBackend::new()));

        let mut sub = tracker.subscribe();
        assert!(tracker.has_listener());

        tracker.unsubscribe();
        assert!(!tracker.has_listener());
        assert_eq!(sub.recv().await, None);
    }
}
