//! Authentication gateway for the Hearth identity provider
//!
//! The provider itself stays a managed service; this module wraps its HTTP
//! contract behind [`AuthProvider`] and layers session persistence plus an
//! observable auth-state channel on top.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

use crate::client::{ApiResponse, BaseClient};
use crate::error::{ErrorCode, HearthError, Result};
use crate::session::{SessionStore, SessionStoreConfig, StoredSession};

/// An authenticated session with the identity provider
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: String,
    pub email: String,
    pub display_name: Option<String>,
    pub id_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Token still valid, with a safety margin for in-flight requests
    pub fn is_fresh(&self) -> bool {
        self.expires_at > Utc::now() + Duration::seconds(60)
    }
}

impl From<StoredSession> for Session {
    fn from(stored: StoredSession) -> Self {
        Self {
            user_id: stored.user_id,
            email: stored.email,
            display_name: stored.display_name,
            id_token: stored.id_token,
            refresh_token: stored.refresh_token,
            expires_at: stored.expires_at,
        }
    }
}

impl From<&Session> for StoredSession {
    fn from(session: &Session) -> Self {
        let now = Utc::now();
        Self {
            user_id: session.user_id.clone(),
            email: session.email.clone(),
            display_name: session.display_name.clone(),
            id_token: session.id_token.clone(),
            refresh_token: session.refresh_token.clone(),
            expires_at: session.expires_at,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Serialize)]
struct CredentialsRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

#[derive(Debug, Serialize)]
struct UpdateProfileRequest<'a> {
    display_name: &'a str,
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    user_id: String,
    email: String,
    display_name: Option<String>,
    id_token: String,
    refresh_token: String,
    /// Access-token lifetime in seconds
    expires_in: i64,
}

impl AuthResponse {
    fn into_session(self) -> Session {
        Session {
            user_id: self.user_id,
            email: self.email,
            display_name: self.display_name,
            id_token: self.id_token,
            refresh_token: self.refresh_token,
            expires_at: Utc::now() + Duration::seconds(self.expires_in),
        }
    }
}

/// Capability seam over the identity provider
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session>;
    async fn sign_up(&self, email: &str, password: &str) -> Result<Session>;
    async fn update_display_name(&self, session: &Session, name: &str) -> Result<()>;
    async fn refresh(&self, session: &Session) -> Result<Session>;
}

/// HTTP implementation of [`AuthProvider`]
#[derive(Debug, Clone)]
pub struct IdentityClient {
    base: BaseClient,
}

impl IdentityClient {
    pub fn new(base: BaseClient) -> Self {
        Self { base }
    }

    async fn credentials_call(&self, endpoint: &str, email: &str, password: &str) -> Result<Session> {
        let request = CredentialsRequest { email, password };

        let response: ApiResponse<AuthResponse> =
            self.base.request(Method::POST, endpoint, Some(&request)).await?;

        let data = response
            .data
            .ok_or_else(|| HearthError::invalid_response("No data in authentication response"))?;

        Ok(data.into_session())
    }
}

#[async_trait]
impl AuthProvider for IdentityClient {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        self.credentials_call("/auth/sign-in", email, password).await
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<Session> {
        self.credentials_call("/auth/sign-up", email, password).await
    }

    async fn update_display_name(&self, session: &Session, name: &str) -> Result<()> {
        let request = UpdateProfileRequest { display_name: name };

        let _: ApiResponse<serde_json::Value> = self
            .base
            .request_with_bearer(Method::POST, "/auth/profile", Some(&request), &session.id_token)
            .await?;

        Ok(())
    }

    async fn refresh(&self, session: &Session) -> Result<Session> {
        let request = RefreshRequest {
            refresh_token: &session.refresh_token,
        };

        let response: ApiResponse<AuthResponse> = self
            .base
            .request(Method::POST, "/auth/refresh", Some(&request))
            .await?;

        let data = response
            .data
            .ok_or_else(|| HearthError::invalid_response("No data in refresh response"))?;

        Ok(data.into_session())
    }
}

/// Session lifecycle on top of an [`AuthProvider`]: persistence plus a watch
/// channel delivering the current session (or its absence) on every change.
pub struct AuthService<P: AuthProvider + ?Sized> {
    provider: Arc<P>,
    store: Mutex<SessionStore>,
    state_tx: watch::Sender<Option<Session>>,
}

impl<P: AuthProvider + ?Sized> AuthService<P> {
    pub fn new(provider: Arc<P>, store_config: SessionStoreConfig) -> Result<Self> {
        let store = SessionStore::new(store_config)?;
        let initial = store.get_session().map(Session::from);
        let (state_tx, _) = watch::channel(initial);

        Ok(Self {
            provider,
            store: Mutex::new(store),
            state_tx,
        })
    }

    /// Observe auth-state changes. The receiver sees the current session (or
    /// `None`) immediately and on every subsequent login/logout/refresh.
    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.state_tx.subscribe()
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Session> {
        let session = match self.provider.sign_in(email, password).await {
            Ok(session) => session,
            // Generic message; session state stays unchanged
            Err(HearthError::Authentication { .. }) | Err(HearthError::Api { .. }) => {
                return Err(HearthError::invalid_credentials())
            }
            Err(other) => return Err(other),
        };

        self.persist(&session)?;
        Ok(session)
    }

    pub async fn signup(&self, email: &str, password: &str, name: &str) -> Result<Session> {
        let mut session = self.provider.sign_up(email, password).await?;
        self.provider.update_display_name(&session, name).await?;
        session.display_name = Some(name.to_string());

        self.persist(&session)?;
        Ok(session)
    }

    pub fn logout(&self) -> Result<()> {
        self.store
            .lock()
            .expect("session store lock poisoned")
            .remove_session()?;
        let _ = self.state_tx.send(None);
        Ok(())
    }

    /// The current session, refreshed through the provider when stale.
    pub async fn current_session(&self) -> Result<Session> {
        let stored = self
            .store
            .lock()
            .expect("session store lock poisoned")
            .get_session()
            .ok_or_else(HearthError::session_not_found)?;

        let session = Session::from(stored);
        if session.is_fresh() {
            return Ok(session);
        }

        match self.provider.refresh(&session).await {
            Ok(refreshed) => {
                self.persist(&refreshed)?;
                Ok(refreshed)
            }
            Err(_) => Err(HearthError::Authentication {
                code: ErrorCode::SessionExpired,
                message: "Session expired. Run `hearth login` again.".to_string(),
            }),
        }
    }

    /// Whether a session is stored at all, and whether it is stale
    pub fn status(&self) -> (bool, bool, Option<String>) {
        let stored = self
            .store
            .lock()
            .expect("session store lock poisoned")
            .get_session();

        match stored {
            Some(s) => {
                let session = Session::from(s);
                let fresh = session.is_fresh();
                (true, !fresh, Some(session.email))
            }
            None => (false, false, None),
        }
    }

    fn persist(&self, session: &Session) -> Result<()> {
        self.store
            .lock()
            .expect("session store lock poisoned")
            .store_session(StoredSession::from(session))?;
        let _ = self.state_tx.send(Some(session.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::mocks::MockAuthProvider;
    use crate::tests::utils::test_helpers::create_temp_dir;

    fn service(provider: MockAuthProvider) -> (AuthService<MockAuthProvider>, tempfile::TempDir) {
        let dir = create_temp_dir();
        let config = SessionStoreConfig {
            enabled: true,
            storage_path: Some(dir.path().join("session.json")),
            obfuscation_key: None,
        };
        (AuthService::new(Arc::new(provider), config).unwrap(), dir)
    }

    #[tokio::test]
    async fn login_persists_session_and_notifies_observers() {
        let (service, _dir) = service(MockAuthProvider::new());
        let mut rx = service.subscribe();
        assert!(rx.borrow().is_none());

        let session = service.login("amira@example.com", "hunter22").await.unwrap();
        assert_eq!(session.email, "amira@example.com");

        rx.changed().await.unwrap();
        assert_eq!(
            rx.borrow().as_ref().map(|s| s.user_id.clone()),
            Some(session.user_id.clone())
        );

        let current = service.current_session().await.unwrap();
        assert_eq!(current.user_id, session.user_id);
    }

    #[tokio::test]
    async fn bad_credentials_surface_generic_error_and_leave_state_unchanged() {
        let (service, _dir) = service(MockAuthProvider::new().with_sign_in_failure());

        let err = service.login("amira@example.com", "wrong").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidCredentials);

        assert!(service.current_session().await.is_err());
        let (authenticated, _, _) = service.status();
        assert!(!authenticated);
    }

    #[tokio::test]
    async fn signup_sets_display_name() {
        let provider = MockAuthProvider::new();
        let names = provider.display_name_updates();
        let (service, _dir) = service(provider);

        let session = service
            .signup("rui@example.com", "hunter22", "Rui Costa")
            .await
            .unwrap();

        assert_eq!(session.display_name.as_deref(), Some("Rui Costa"));
        assert_eq!(names.lock().unwrap().as_slice(), ["Rui Costa".to_string()]);
    }

    #[tokio::test]
    async fn logout_clears_session_and_notifies() {
        let (service, _dir) = service(MockAuthProvider::new());
        service.login("amira@example.com", "hunter22").await.unwrap();

        let rx = service.subscribe();
        service.logout().unwrap();

        assert!(rx.borrow().is_none());
        assert!(matches!(
            service.current_session().await.unwrap_err().code(),
            ErrorCode::SessionNotFound
        ));
    }

    #[tokio::test]
    async fn stale_session_is_refreshed_through_the_provider() {
        let provider = MockAuthProvider::new().with_expired_tokens();
        let (service, _dir) = service(provider);

        // Stored session is already stale, so current_session must refresh.
        service.login("amira@example.com", "hunter22").await.unwrap();
        let refreshed = service.current_session().await.unwrap();
        assert!(refreshed.is_fresh());
    }
}
