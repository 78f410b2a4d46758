//! Process-wide session state and the controller that drives it.
//!
//! [`Session`] pairs the credential store with an observable
//! [`SessionState`]. Every write goes through one async mutex, so the store
//! and the in-memory state never disagree once a call returns.
//!
//! Each time the session is cleared its `epoch` is bumped. Logins and
//! refreshes capture the epoch when they start and only apply their result if
//! it is still current; a logout that lands in between wins.

use std::sync::Arc;

use tokio::sync::{watch, Mutex};

use tenantdesk_auth::{
    LoginCredentials, PasswordChange, RefreshedTokens, TokenPair, UserProfile,
};

use crate::credentials::{CredentialStore, StoreError, ACCESS_TOKEN, REFRESH_TOKEN, USER_INFO};
use crate::dto::{Ack, Data, LoginData};
use crate::endpoints::{CHANGE_PASSWORD, LOGIN, LOGOUT};
use crate::http::{ApiClient, Method};
use crate::ApiError;

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum SessionStatus {
    #[default]
    Unauthenticated,
    Authenticating,
    Authenticated,
    Refreshing,
}

/// Snapshot published to observers.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub status: SessionStatus,
    pub access_token: Option<String>,
    pub epoch: u64,
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }
}

impl core::fmt::Debug for SessionState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SessionState")
            .field("status", &self.status)
            .field("has_token", &self.access_token.is_some())
            .field("epoch", &self.epoch)
            .finish()
    }
}

/// Credential store + observable session state.
pub struct Session {
    store: Arc<dyn CredentialStore>,
    write: Mutex<()>,
    state: watch::Sender<SessionState>,
}

impl Session {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        let (state, _) = watch::channel(SessionState::default());
        Self {
            store,
            write: Mutex::new(()),
            state,
        }
    }

    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn access_token(&self) -> Option<String> {
        self.state.borrow().access_token.clone()
    }

    pub fn status(&self) -> SessionStatus {
        self.state.borrow().status
    }

    pub fn epoch(&self) -> u64 {
        self.state.borrow().epoch
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub async fn refresh_token(&self) -> Result<Option<String>, StoreError> {
        self.store.get(REFRESH_TOKEN).await
    }

    /// Cached login profile, if any.
    pub async fn profile(&self) -> Result<Option<UserProfile>, StoreError> {
        let Some(raw) = self.store.get(USER_INFO).await? else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| StoreError::Corrupt {
                key: USER_INFO.to_string(),
                reason: e.to_string(),
            })
    }

    /// Persist `tokens` and publish them, unconditionally.
    pub async fn set_session(&self, tokens: &TokenPair) -> Result<(), StoreError> {
        self.establish(tokens, None, None).await.map(|_| ())
    }

    /// Like [`Session::set_session`], but only while `epoch` is still current.
    /// Returns whether the tokens were applied.
    pub async fn set_session_if_current(
        &self,
        tokens: &TokenPair,
        profile: Option<&UserProfile>,
        epoch: u64,
    ) -> Result<bool, StoreError> {
        self.establish(tokens, profile, Some(epoch)).await
    }

    async fn establish(
        &self,
        tokens: &TokenPair,
        profile: Option<&UserProfile>,
        epoch: Option<u64>,
    ) -> Result<bool, StoreError> {
        let _guard = self.write.lock().await;
        if epoch.is_some_and(|e| e != self.epoch()) {
            return Ok(false);
        }

        let refresh_ttl = tokens.refresh_token_expiry.to_ttl();
        self.store
            .set(ACCESS_TOKEN, &tokens.access_token, tokens.access_token_expiry.to_ttl())
            .await?;
        self.store
            .set(REFRESH_TOKEN, &tokens.refresh_token, refresh_ttl)
            .await?;
        if let Some(profile) = profile {
            let raw = serde_json::to_string(profile).map_err(StoreError::backend)?;
            self.store.set(USER_INFO, &raw, refresh_ttl).await?;
        }

        let access_token = tokens.access_token.clone();
        self.state.send_modify(|s| {
            s.access_token = Some(access_token);
            s.status = SessionStatus::Authenticated;
        });
        Ok(true)
    }

    /// Apply a refresh result while `epoch` is still current.
    pub async fn apply_refresh(&self, tokens: &RefreshedTokens, epoch: u64) -> Result<bool, StoreError> {
        let _guard = self.write.lock().await;
        if self.epoch() != epoch {
            return Ok(false);
        }

        self.store
            .set(ACCESS_TOKEN, &tokens.access_token, tokens.access_token_expiry.to_ttl())
            .await?;
        if let Some((refresh_token, expiry)) = tokens.rotated() {
            self.store.set(REFRESH_TOKEN, refresh_token, expiry.to_ttl()).await?;
        }

        let access_token = tokens.access_token.clone();
        self.state.send_modify(|s| {
            s.access_token = Some(access_token);
            s.status = SessionStatus::Authenticated;
        });
        Ok(true)
    }

    /// Drop every credential and reset the state.
    pub async fn clear(&self) -> Result<(), StoreError> {
        let _guard = self.write.lock().await;
        self.store.purge().await?;
        self.reset();
        Ok(())
    }

    /// End the session begun at `epoch` after a failed refresh.
    ///
    /// With `purge`, persisted credentials go too; otherwise they are kept so
    /// a later bootstrap can resume. Returns false if the session had already
    /// moved on.
    pub async fn end(&self, epoch: u64, purge: bool) -> Result<bool, StoreError> {
        let _guard = self.write.lock().await;
        if self.epoch() != epoch {
            return Ok(false);
        }
        if purge {
            self.store.purge().await?;
        }
        self.reset();
        Ok(true)
    }

    /// Load the persisted access token into the state.
    pub async fn bootstrap(&self) -> Result<SessionState, StoreError> {
        let _guard = self.write.lock().await;
        let token = self.store.get(ACCESS_TOKEN).await?;
        self.state.send_modify(|s| {
            s.status = if token.is_some() {
                SessionStatus::Authenticated
            } else {
                SessionStatus::Unauthenticated
            };
            s.access_token = token;
        });
        Ok(self.snapshot())
    }

    /// Enter a transient status, unless the session moved past `epoch`.
    pub(crate) fn mark(&self, status: SessionStatus, epoch: u64) {
        self.state.send_if_modified(|s| {
            if s.epoch != epoch || s.status == status {
                return false;
            }
            s.status = status;
            true
        });
    }

    /// Leave a transient status: back to whatever the token says.
    pub(crate) fn settle(&self, epoch: u64) {
        self.state.send_if_modified(|s| {
            let status = if s.access_token.is_some() {
                SessionStatus::Authenticated
            } else {
                SessionStatus::Unauthenticated
            };
            if s.epoch != epoch || s.status == status {
                return false;
            }
            s.status = status;
            true
        });
    }

    fn reset(&self) {
        self.state.send_modify(|s| {
            s.access_token = None;
            s.status = SessionStatus::Unauthenticated;
            s.epoch += 1;
        });
    }
}

/// Result of a successful login, not yet applied to the session.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub tokens: TokenPair,
    pub profile: UserProfile,
    /// Session epoch observed when the login started.
    pub epoch: u64,
}

/// Login, logout and bootstrap over a shared [`Session`].
#[derive(Clone)]
pub struct SessionController {
    client: ApiClient,
}

impl SessionController {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn session(&self) -> &Arc<Session> {
        self.client.session()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.session().subscribe()
    }

    /// Exchange credentials for tokens and a profile. Nothing is persisted.
    pub async fn login(
        &self,
        credentials: &LoginCredentials,
        headers: &[(&str, &str)],
    ) -> Result<LoginOutcome, ApiError> {
        credentials.validate()?;

        let session = self.session();
        let epoch = session.epoch();
        session.mark(SessionStatus::Authenticating, epoch);

        let result = self.request_login(credentials, headers).await;
        match result {
            Ok(LoginData { tokens, profile }) => {
                tracing::info!(user_type = %profile.user_type, "login succeeded");
                Ok(LoginOutcome {
                    tokens,
                    profile,
                    epoch,
                })
            }
            Err(err) => {
                tracing::warn!(error = %err, "login failed");
                session.settle(epoch);
                Err(err)
            }
        }
    }

    async fn request_login(
        &self,
        credentials: &LoginCredentials,
        headers: &[(&str, &str)],
    ) -> Result<LoginData, ApiError> {
        let body = serde_json::to_value(credentials)
            .map_err(|e| ApiError::Validation(format!("invalid credentials: {e}")))?;
        let data: Data<LoginData> = self
            .client
            .request(Method::POST, LOGIN, None, Some(&body), headers)
            .await?;
        data.data
            .tokens
            .validate()
            .map_err(|e| ApiError::unexpected_shape(200, e))?;
        Ok(data.data)
    }

    /// Log in and apply the result, unless a logout superseded it meanwhile.
    pub async fn sign_in(&self, credentials: &LoginCredentials) -> Result<UserProfile, ApiError> {
        let outcome = self.login(credentials, &[]).await?;
        self.set_session(&outcome).await?;
        Ok(outcome.profile)
    }

    /// Apply a [`LoginOutcome`] obtained from [`SessionController::login`].
    ///
    /// Fails with `Auth("login superseded")` if the session was cleared after
    /// the login started; nothing is persisted in that case.
    pub async fn set_session(&self, outcome: &LoginOutcome) -> Result<(), ApiError> {
        let applied = self
            .session()
            .set_session_if_current(&outcome.tokens, Some(&outcome.profile), outcome.epoch)
            .await?;
        if !applied {
            tracing::info!("login result discarded: session was cleared while signing in");
            return Err(ApiError::Auth("login superseded".to_string()));
        }
        Ok(())
    }

    /// Drop a [`LoginOutcome`] without applying it, leaving `Authenticating`.
    pub fn discard(&self, outcome: LoginOutcome) {
        self.session().settle(outcome.epoch);
    }

    /// Confirmed logout: local state is only cleared once the server reports
    /// success.
    ///
    /// Without an access token there is nothing to revoke server-side, so no
    /// request is made. Local credentials are still purged and the epoch is
    /// bumped, which cancels a login still in flight and drops a refresh token
    /// kept after an unreachable refresh.
    pub async fn logout(&self) -> Result<(), ApiError> {
        let session = self.session();
        let Some(token) = session.access_token() else {
            session.clear().await?;
            tracing::debug!("logout without access token: cleared locally");
            return Ok(());
        };

        let ack: Ack = self
            .client
            .request(Method::DELETE, LOGOUT, Some(&token), None, &[])
            .await?;
        if !ack.is_confirmed() {
            tracing::warn!(code = ?ack.code, "logout not confirmed; keeping session");
            return Err(ApiError::Auth(
                ack.message
                    .unwrap_or_else(|| "logout was not confirmed by the server".to_string()),
            ));
        }

        session.clear().await?;
        tracing::info!("logged out");
        Ok(())
    }

    /// Initialize the state from persisted credentials (process start).
    pub async fn bootstrap_session(&self) -> Result<SessionState, ApiError> {
        let state = self.session().bootstrap().await?;
        tracing::debug!(?state, "session bootstrapped");
        Ok(state)
    }

    /// Change the password; on success the session is ended so the user signs
    /// in again with the new one.
    pub async fn change_password(&self, change: &PasswordChange) -> Result<(), ApiError> {
        let body = serde_json::to_value(change)
            .map_err(|e| ApiError::Validation(format!("invalid password change: {e}")))?;
        let ack: Ack = self
            .client
            .authed(Method::PUT, CHANGE_PASSWORD, Some(&body))
            .await?;
        if !ack.is_confirmed() {
            return Err(ack.into_error("Password change failed"));
        }
        self.logout().await
    }

    pub async fn profile(&self) -> Result<Option<UserProfile>, ApiError> {
        Ok(self.session().profile().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::MemoryCredentialStore;
    use tenantdesk_auth::ExpirySeconds;

    fn tokens(access: &str) -> TokenPair {
        TokenPair {
            access_token: access.into(),
            refresh_token: "refresh".into(),
            access_token_expiry: ExpirySeconds::new(300),
            refresh_token_expiry: ExpirySeconds::new(86_400),
        }
    }

    fn new_session() -> (Arc<MemoryCredentialStore>, Session) {
        let store = Arc::new(MemoryCredentialStore::new("acme.example.com"));
        let session = Session::new(store.clone());
        (store, session)
    }

    #[tokio::test]
    async fn set_session_updates_store_and_state_together() {
        let (store, session) = new_session();
        session.set_session(&tokens("a-1")).await.unwrap();

        assert_eq!(store.get(ACCESS_TOKEN).await.unwrap().as_deref(), Some("a-1"));
        assert_eq!(store.get(REFRESH_TOKEN).await.unwrap().as_deref(), Some("refresh"));
        let state = session.snapshot();
        assert_eq!(state.access_token.as_deref(), Some("a-1"));
        assert_eq!(state.status, SessionStatus::Authenticated);
    }

    #[tokio::test]
    async fn stale_epoch_is_not_applied() {
        let (store, session) = new_session();
        let epoch = session.epoch();
        session.clear().await.unwrap();

        let applied = session
            .set_session_if_current(&tokens("late"), None, epoch)
            .await
            .unwrap();
        assert!(!applied);
        assert!(store.get(ACCESS_TOKEN).await.unwrap().is_none());
        assert!(session.access_token().is_none());
    }

    #[tokio::test]
    async fn end_without_purge_keeps_refresh_token() {
        let (store, session) = new_session();
        session.set_session(&tokens("a-1")).await.unwrap();
        let epoch = session.epoch();

        assert!(session.end(epoch, false).await.unwrap());
        assert_eq!(session.status(), SessionStatus::Unauthenticated);
        assert_eq!(session.epoch(), epoch + 1);
        assert!(store.get(REFRESH_TOKEN).await.unwrap().is_some());

        // Already moved on.
        assert!(!session.end(epoch, true).await.unwrap());
        assert!(store.get(REFRESH_TOKEN).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn bootstrap_reads_persisted_token() {
        let (_store, session) = new_session();
        session.set_session(&tokens("persisted")).await.unwrap();

        let fresh = Session::new(session.store().clone());
        let state = fresh.bootstrap().await.unwrap();
        assert_eq!(state.access_token.as_deref(), Some("persisted"));
        assert_eq!(state.status, SessionStatus::Authenticated);

        let (_empty_store, empty) = new_session();
        assert_eq!(empty.bootstrap().await.unwrap().status, SessionStatus::Unauthenticated);
    }

    #[tokio::test]
    async fn refresh_keeps_refresh_token_unless_rotated() {
        let (store, session) = new_session();
        session.set_session(&tokens("a-1")).await.unwrap();

        let refreshed: RefreshedTokens =
            serde_json::from_str(r#"{"accessToken":"a-2","accessTokenExpiry":"300"}"#).unwrap();
        assert!(session.apply_refresh(&refreshed, session.epoch()).await.unwrap());
        assert_eq!(store.get(ACCESS_TOKEN).await.unwrap().as_deref(), Some("a-2"));
        assert_eq!(store.get(REFRESH_TOKEN).await.unwrap().as_deref(), Some("refresh"));
    }

    #[tokio::test]
    async fn observers_see_transient_states() {
        let (_store, session) = new_session();
        let mut rx = session.subscribe();
        let epoch = session.epoch();

        session.mark(SessionStatus::Authenticating, epoch);
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().status, SessionStatus::Authenticating);

        session.settle(epoch);
        assert_eq!(rx.borrow_and_update().status, SessionStatus::Unauthenticated);
    }

    #[test]
    fn debug_hides_token() {
        let state = SessionState {
            status: SessionStatus::Authenticated,
            access_token: Some("secret-token".into()),
            epoch: 3,
        };
        assert!(!format!("{state:?}").contains("secret-token"));
    }
}
