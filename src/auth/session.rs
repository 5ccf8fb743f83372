use super::store::{
    clear_stored_session, load_stored_session, save_stored_session, KeyringEntry, StoredSession,
};
use super::provider::{Identity, IdentityProvider, ProviderSession};
use crate::api::TokenSource;
use crate::error::{AuthError, GalleryError};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    SignedIn(Identity),
    SignedOut,
}

impl AuthState {
    pub fn is_signed_in(&self) -> bool {
        matches!(self, AuthState::SignedIn(_))
    }
}

/// Handle returned by [`SessionManager::subscribe`]. Dropping it unsubscribes.
pub struct AuthSubscription {
    rx: broadcast::Receiver<AuthState>,
    initial: Option<AuthState>,
}

impl AuthSubscription {
    /// The state at subscription time first, then every later transition.
    /// Returns `None` once the session manager is gone.
    pub async fn next(&mut self) -> Option<AuthState> {
        if let Some(initial) = self.initial.take() {
            return Some(initial);
        }
        loop {
            match self.rx.recv().await {
                Ok(state) => return Some(state),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "auth subscriber fell behind");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

#[derive(Default)]
struct SessionInner {
    identity: Option<Identity>,
    id_token: Option<String>,
    refresh_token: Option<String>,
}

/// Owns the signed-in user and their tokens. The only writer of session state.
pub struct SessionManager {
    provider: Arc<dyn IdentityProvider>,
    keyring: Arc<dyn KeyringEntry>,
    inner: RwLock<SessionInner>,
    events: broadcast::Sender<AuthState>,
}

impl SessionManager {
    pub fn new(provider: Arc<dyn IdentityProvider>, keyring: Arc<dyn KeyringEntry>) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            provider,
            keyring,
            inner: RwLock::new(SessionInner::default()),
            events,
        }
    }

    pub async fn subscribe(&self) -> AuthSubscription {
        // Subscribe before reading the state so no transition falls in between.
        let rx = self.events.subscribe();
        let initial = self.current_state().await;
        AuthSubscription {
            rx,
            initial: Some(initial),
        }
    }

    pub async fn current_state(&self) -> AuthState {
        match &self.inner.read().await.identity {
            Some(identity) => AuthState::SignedIn(identity.clone()),
            None => AuthState::SignedOut,
        }
    }

    pub async fn current_identity(&self) -> Option<Identity> {
        self.inner.read().await.identity.clone()
    }

    /// The last token obtained, without contacting the provider.
    pub async fn cached_token(&self) -> Option<String> {
        self.inner.read().await.id_token.clone()
    }

    /// Re-enters a session persisted by an earlier run. Returns whether a user is now signed in.
    pub async fn restore(&self) -> bool {
        let stored = match load_stored_session(self.keyring.as_ref()) {
            Ok(Some(stored)) => stored,
            Ok(None) => return false,
            Err(e) => {
                warn!(error = %e, "could not read stored session");
                return false;
            }
        };

        match self.provider.refresh(&stored.refresh_token).await {
            Ok(mut session) => {
                if session.identity.email.is_none() {
                    session.identity.email = stored.identity.email.clone();
                }
                if session.identity.display_name.is_none() {
                    session.identity.display_name = stored.identity.display_name.clone();
                }
                info!(uid = %session.identity.uid, "restored stored session");
                self.establish(session).await;
                true
            }
            Err(AuthError::Network(e)) => {
                warn!(error = %e, "could not reach the sign-in service, keeping stored session");
                false
            }
            Err(e) => {
                warn!(error = %e, "stored session is no longer valid");
                if let Err(e) = clear_stored_session(self.keyring.as_ref()) {
                    warn!(error = %e, "failed to clear stored session");
                }
                false
            }
        }
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let result = self.provider.sign_up(email.trim(), password).await;
        self.finish_credential_op("sign up", result).await
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let result = self.provider.sign_in(email.trim(), password).await;
        self.finish_credential_op("sign in", result).await
    }

    pub async fn sign_in_with_google(&self) -> Result<Identity, AuthError> {
        let result = self.provider.sign_in_with_google().await;
        self.finish_credential_op("Google sign in", result).await
    }

    /// Idempotent: signing out while signed out publishes nothing.
    pub async fn sign_out(&self) {
        let was_signed_in = {
            let mut inner = self.inner.write().await;
            let was = inner.identity.is_some();
            *inner = SessionInner::default();
            was
        };
        if let Err(e) = clear_stored_session(self.keyring.as_ref()) {
            warn!(error = %e, "failed to clear stored session");
        }
        if was_signed_in {
            info!("signed out");
            self.publish(AuthState::SignedOut);
        }
    }

    /// Forces a token refresh with the provider. `Ok(None)` means nobody is signed in.
    pub async fn get_token(&self) -> Result<Option<String>, AuthError> {
        let Some(refresh_token) = self.inner.read().await.refresh_token.clone() else {
            return Ok(None);
        };

        let session = self.provider.refresh(&refresh_token).await?;

        let mut inner = self.inner.write().await;
        if inner.refresh_token.as_deref() != Some(refresh_token.as_str()) {
            // Signed out (or switched user) while the refresh was in flight.
            return Ok(inner.id_token.clone());
        }
        let rotated = session.refresh_token != refresh_token;
        inner.id_token = Some(session.id_token.clone());
        inner.refresh_token = Some(session.refresh_token.clone());
        if rotated {
            if let Some(identity) = inner.identity.clone() {
                let stored = StoredSession {
                    identity,
                    refresh_token: session.refresh_token,
                };
                if let Err(e) = save_stored_session(self.keyring.as_ref(), &stored) {
                    warn!(error = %e, "failed to persist rotated refresh token");
                }
            }
        }
        Ok(Some(session.id_token))
    }

    async fn finish_credential_op(
        &self,
        op: &str,
        result: Result<ProviderSession, AuthError>,
    ) -> Result<Identity, AuthError> {
        match result {
            Ok(session) => {
                let identity = session.identity.clone();
                info!(op, uid = %identity.uid, "authentication succeeded");
                self.establish(session).await;
                Ok(identity)
            }
            Err(e) => {
                warn!(op, error = ?e, "authentication failed");
                Err(e)
            }
        }
    }

    async fn establish(&self, session: ProviderSession) {
        let stored = StoredSession {
            identity: session.identity.clone(),
            refresh_token: session.refresh_token.clone(),
        };
        {
            let mut inner = self.inner.write().await;
            inner.identity = Some(session.identity.clone());
            inner.id_token = Some(session.id_token);
            inner.refresh_token = Some(session.refresh_token);
        }
        if let Err(e) = save_stored_session(self.keyring.as_ref(), &stored) {
            warn!(error = %e, "failed to save session to keyring");
        }
        self.publish(AuthState::SignedIn(session.identity));
    }

    fn publish(&self, state: AuthState) {
        // No subscribers is fine.
        let _ = self.events.send(state);
    }
}

#[async_trait]
impl TokenSource for SessionManager {
    async fn fresh_token(&self) -> Result<Option<String>, GalleryError> {
        match self.get_token().await {
            Ok(token) => Ok(token),
            // A dropped connection is not a rejected session.
            Err(AuthError::Network(e)) => {
                warn!(error = %e, "token refresh could not reach the provider");
                Err(GalleryError::Network(e))
            }
            Err(e) => {
                warn!(error = %e, "token refresh rejected");
                Ok(None)
            }
        }
    }

    async fn expire_session(&self) {
        self.sign_out().await;
    }
}
