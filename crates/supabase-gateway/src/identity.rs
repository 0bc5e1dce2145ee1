//! Identity provider: Supabase GoTrue password auth with a persisted session.
//!
//! `GoTrueClient` owns the current session. It is kept in a [`SessionVault`],
//! refreshed when expired, and every change is broadcast as an [`AuthChange`]
//! to whoever called [`IdentityProvider::subscribe`].

use crate::error::{GatewayError, GatewayResult};
use crate::response::rejection;
use crate::types::{AuthChange, AuthChangeEvent, AuthResponse, Identity, Session};
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use session_vault::{PersistedSession, SessionVault};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

/// Capacity of the auth change channel.
const AUTH_CHANGE_CAPACITY: usize = 16;

/// Backend that owns identities and sessions.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Current session, if any. An expired session is refreshed first.
    async fn get_session(&self) -> GatewayResult<Option<Session>>;

    async fn sign_in_with_password(&self, email: &str, password: &str)
        -> GatewayResult<AuthResponse>;

    /// Create an identity. `metadata` is stored as the identity's user
    /// metadata (the profile trigger reads `username` from it).
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: serde_json::Value,
    ) -> GatewayResult<AuthResponse>;

    /// End the current session. The local session is gone afterwards even
    /// when the backend call fails.
    async fn sign_out(&self) -> GatewayResult<()>;

    /// Receive every subsequent session change.
    fn subscribe(&self) -> broadcast::Receiver<AuthChange>;
}

/// Retry behaviour for refreshing an expired session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshConfig {
    /// Maximum number of attempts.
    pub max_retries: u32,
    /// Initial delay between retries in milliseconds.
    pub initial_delay_ms: u64,
    /// Maximum delay between retries in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 500,
            max_delay_ms: 5000,
        }
    }
}

impl RefreshConfig {
    /// Calculate the delay for a given attempt number (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> std::time::Duration {
        let delay_ms = self
            .initial_delay_ms
            .saturating_mul(2u64.saturating_pow(attempt));
        std::time::Duration::from_millis(delay_ms.min(self.max_delay_ms))
    }
}

#[derive(Serialize)]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct SignUpRequest<'a> {
    email: &'a str,
    password: &'a str,
    data: &'a serde_json::Value,
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

/// GoTrue token grant response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: i64,
    #[serde(default)]
    expires_at: Option<i64>,
    user: Identity,
}

impl TokenResponse {
    fn into_session(self, now: DateTime<Utc>) -> Session {
        let expires_at = self
            .expires_at
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
            .unwrap_or_else(|| now + Duration::seconds(self.expires_in));
        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            user: self.user,
        }
    }
}

/// Sign-up answers with a full grant when email confirmation is off, and
/// with the bare user while confirmation is pending.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Granted(TokenResponse),
    Pending(Identity),
}

impl SignUpResponse {
    fn into_auth_response(self, now: DateTime<Utc>) -> AuthResponse {
        match self {
            SignUpResponse::Granted(token) => {
                let session = token.into_session(now);
                AuthResponse {
                    user: Some(session.user.clone()),
                    session: Some(session),
                }
            }
            SignUpResponse::Pending(user) => AuthResponse {
                user: Some(user),
                session: None,
            },
        }
    }
}

/// GoTrue client backed by a [`SessionVault`].
pub struct GoTrueClient {
    http_client: reqwest::Client,
    api_url: String,
    anon_key: String,
    vault: SessionVault,
    refresh_config: RefreshConfig,
    events: broadcast::Sender<AuthChange>,
    /// Serializes refreshes so one expired session is exchanged once.
    refresh_lock: Mutex<()>,
}

impl GoTrueClient {
    /// Create a client for the project at `api_url`.
    pub fn new(
        api_url: &str,
        anon_key: impl Into<String>,
        vault: SessionVault,
    ) -> GatewayResult<Self> {
        Self::with_refresh_config(api_url, anon_key, vault, RefreshConfig::default())
    }

    /// Create a client with custom refresh retry behaviour.
    pub fn with_refresh_config(
        api_url: &str,
        anon_key: impl Into<String>,
        vault: SessionVault,
        refresh_config: RefreshConfig,
    ) -> GatewayResult<Self> {
        let parsed = url::Url::parse(api_url)?;
        let (events, _) = broadcast::channel(AUTH_CHANGE_CAPACITY);
        Ok(Self {
            http_client: reqwest::Client::new(),
            api_url: parsed.as_str().trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
            vault,
            refresh_config,
            events,
            refresh_lock: Mutex::new(()),
        })
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.api_url, path)
    }

    fn emit(&self, event: AuthChangeEvent, session: Option<Session>) {
        debug!(event = ?event, "Broadcasting auth change");
        // No receivers is fine.
        let _ = self.events.send(AuthChange { event, session });
    }

    fn persist(&self, session: &Session) -> GatewayResult<()> {
        self.vault.store(&PersistedSession::from(session))?;
        Ok(())
    }

    async fn post_grant<B: Serialize + ?Sized>(
        &self,
        grant_type: &str,
        body: &B,
    ) -> GatewayResult<TokenResponse> {
        let response = self
            .http_client
            .post(self.auth_url("token"))
            .query(&[("grant_type", grant_type)])
            .header("apikey", &self.anon_key)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(rejection(response, grant_type).await);
        }

        Ok(response.json().await?)
    }

    /// Refresh the session with exponential backoff retry.
    async fn refresh_with_backoff(&self, stored: &PersistedSession) -> GatewayResult<Session> {
        let mut last_error = None;

        for attempt in 0..self.refresh_config.max_retries {
            match self
                .post_grant(
                    "refresh_token",
                    &RefreshRequest {
                        refresh_token: &stored.refresh_token,
                    },
                )
                .await
            {
                Ok(token) => {
                    let session = token.into_session(Utc::now());
                    self.persist(&session)?;
                    info!(user_id = %session.user.id, "Session refreshed");
                    return Ok(session);
                }
                Err(e) if e.is_transient() => {
                    last_error = Some(e);
                    if attempt + 1 < self.refresh_config.max_retries {
                        let delay = self.refresh_config.delay_for_attempt(attempt);
                        debug!(
                            attempt = attempt + 1,
                            max_retries = self.refresh_config.max_retries,
                            delay_ms = delay.as_millis() as u64,
                            "Refresh failed with transient error, retrying"
                        );
                        tokio::time::sleep(delay).await;
                    }
                }
                Err(e) => return Err(e),
            }
        }

        warn!(
            max_retries = self.refresh_config.max_retries,
            "Refresh failed after all attempts"
        );
        Err(last_error.unwrap_or_else(|| {
            GatewayError::UnexpectedResponse("refresh was never attempted".to_string())
        }))
    }
}

#[async_trait]
impl IdentityProvider for GoTrueClient {
    async fn get_session(&self) -> GatewayResult<Option<Session>> {
        let _guard = self.refresh_lock.lock().await;

        let stored = match self.vault.load()? {
            Some(stored) => stored,
            None => return Ok(None),
        };

        if !stored.is_expired() {
            return Ok(Some(stored.into()));
        }

        info!(user_id = %stored.user_id, "Stored session expired, refreshing");
        match self.refresh_with_backoff(&stored).await {
            Ok(session) => {
                self.emit(AuthChangeEvent::TokenRefreshed, Some(session.clone()));
                Ok(Some(session))
            }
            Err(e) if e.is_transient() => Err(e),
            Err(e) => {
                warn!(error = %e, "Refresh rejected, clearing stored session");
                self.vault.clear()?;
                self.emit(AuthChangeEvent::SignedOut, None);
                Ok(None)
            }
        }
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> GatewayResult<AuthResponse> {
        debug!(email = %email, "Attempting email/password sign-in");

        let token = self
            .post_grant("password", &PasswordRequest { email, password })
            .await?;
        let session = token.into_session(Utc::now());
        self.persist(&session)?;

        info!(user_id = %session.user.id, "Sign-in successful");
        self.emit(AuthChangeEvent::SignedIn, Some(session.clone()));

        Ok(AuthResponse {
            user: Some(session.user.clone()),
            session: Some(session),
        })
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: serde_json::Value,
    ) -> GatewayResult<AuthResponse> {
        debug!(email = %email, "Attempting sign-up");

        let response = self
            .http_client
            .post(self.auth_url("signup"))
            .header("apikey", &self.anon_key)
            .header("Content-Type", "application/json")
            .json(&SignUpRequest {
                email,
                password,
                data: &metadata,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(rejection(response, "signup").await);
        }

        let parsed: SignUpResponse = response.json().await?;
        let outcome = parsed.into_auth_response(Utc::now());

        match &outcome.session {
            Some(session) => {
                self.persist(session)?;
                info!(user_id = %session.user.id, "Sign-up successful");
                self.emit(AuthChangeEvent::SignedIn, Some(session.clone()));
            }
            None => info!(
                user_id = ?outcome.user.as_ref().map(|u| u.id.as_str()),
                "Sign-up pending email confirmation"
            ),
        }

        Ok(outcome)
    }

    async fn sign_out(&self) -> GatewayResult<()> {
        let mut storage_error = None;
        let stored = match self.vault.load() {
            Ok(stored) => stored,
            Err(e) => {
                warn!(error = %e, "Could not read stored session during sign-out");
                storage_error = Some(e);
                None
            }
        };
        if let Err(e) = self.vault.clear() {
            warn!(error = %e, "Could not clear stored session during sign-out");
            storage_error.get_or_insert(e);
        }

        let result = match stored {
            Some(stored) => {
                let response = self
                    .http_client
                    .post(self.auth_url("logout"))
                    .header("apikey", &self.anon_key)
                    .header("Authorization", format!("Bearer {}", stored.access_token))
                    .send()
                    .await;

                match response {
                    Ok(r) if r.status().is_success() => Ok(()),
                    // The backend already forgot this session.
                    Ok(r) if matches!(r.status().as_u16(), 401 | 403 | 404) => Ok(()),
                    Ok(r) => Err(rejection(r, "logout").await),
                    Err(e) => Err(e.into()),
                }
            }
            None => Ok(()),
        };

        info!("Signed out");
        self.emit(AuthChangeEvent::SignedOut, None);
        match storage_error {
            // A surviving stored session would sign the next run back in.
            Some(e) => Err(e.into()),
            None => result,
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthChange> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use session_vault::{MemoryStorage, SessionStorage, StorageError, StorageResult};

    /// Storage whose reads and deletes always fail.
    struct UnreadableStorage;

    impl SessionStorage for UnreadableStorage {
        fn set(&self, _key: &str, _value: &str) -> StorageResult<()> {
            Ok(())
        }

        fn get(&self, _key: &str) -> StorageResult<Option<String>> {
            Err(StorageError::Encoding("corrupt session file".to_string()))
        }

        fn delete(&self, _key: &str) -> StorageResult<bool> {
            Err(StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only",
            )))
        }
    }

    fn client_with(session: Option<PersistedSession>) -> GoTrueClient {
        let vault = SessionVault::new(Box::new(MemoryStorage::new()));
        if let Some(session) = session {
            vault.store(&session).unwrap();
        }
        GoTrueClient::new("https://xyz.supabase.co/", "anon", vault).unwrap()
    }

    fn stored(expires_at: DateTime<Utc>) -> PersistedSession {
        PersistedSession {
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            user_id: "user-1".to_string(),
            email: Some("a@b.com".to_string()),
            expires_at,
        }
    }

    #[test]
    fn test_invalid_url_is_rejected() {
        let vault = SessionVault::new(Box::new(MemoryStorage::new()));
        assert!(matches!(
            GoTrueClient::new("not a url", "anon", vault),
            Err(GatewayError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_auth_url() {
        let client = client_with(None);
        assert_eq!(
            client.auth_url("signup"),
            "https://xyz.supabase.co/auth/v1/signup"
        );
    }

    #[test]
    fn test_refresh_config_delay_exponential_backoff() {
        let config = RefreshConfig::default();
        assert_eq!(config.delay_for_attempt(0).as_millis(), 500);
        assert_eq!(config.delay_for_attempt(1).as_millis(), 1000);
        assert_eq!(config.delay_for_attempt(2).as_millis(), 2000);
        assert_eq!(config.delay_for_attempt(10).as_millis(), 5000);
    }

    #[test]
    fn test_token_response_prefers_absolute_expiry() {
        let token: TokenResponse = serde_json::from_str(
            r#"{"access_token":"a","refresh_token":"r","expires_in":3600,
                "expires_at":1700000000,"token_type":"bearer",
                "user":{"id":"u1","email":"a@b.com","aud":"authenticated"}}"#,
        )
        .unwrap();
        let session = token.into_session(Utc::now());
        assert_eq!(session.expires_at.timestamp(), 1_700_000_000);
        assert_eq!(session.user.id, "u1");
    }

    #[test]
    fn test_token_response_falls_back_to_expires_in() {
        let now = Utc::now();
        let token: TokenResponse = serde_json::from_str(
            r#"{"access_token":"a","refresh_token":"r","expires_in":60,"user":{"id":"u1"}}"#,
        )
        .unwrap();
        assert_eq!(token.into_session(now).expires_at, now + Duration::seconds(60));
    }

    #[test]
    fn test_sign_up_response_with_grant() {
        let parsed: SignUpResponse = serde_json::from_str(
            r#"{"access_token":"a","refresh_token":"r","expires_in":3600,
                "user":{"id":"u1","email":"a@b.com"}}"#,
        )
        .unwrap();
        let outcome = parsed.into_auth_response(Utc::now());
        assert_eq!(outcome.user.unwrap().id, "u1");
        assert!(outcome.session.is_some());
    }

    #[test]
    fn test_sign_up_response_pending_confirmation() {
        let parsed: SignUpResponse = serde_json::from_str(
            r#"{"id":"u1","email":"a@b.com","confirmation_sent_at":"2024-05-01T12:00:00Z"}"#,
        )
        .unwrap();
        let outcome = parsed.into_auth_response(Utc::now());
        assert_eq!(outcome.user.unwrap().email.as_deref(), Some("a@b.com"));
        assert!(outcome.session.is_none());
    }

    #[tokio::test]
    async fn test_get_session_without_stored_session() {
        let client = client_with(None);
        assert!(client.get_session().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_session_returns_live_session_without_refresh() {
        let client = client_with(Some(stored(Utc::now() + Duration::hours(1))));
        let session = client.get_session().await.unwrap().unwrap();
        assert_eq!(session.user_id(), "user-1");
        assert_eq!(session.access_token, "access");
    }

    #[tokio::test]
    async fn test_sign_out_without_session_broadcasts_signed_out() {
        let client = client_with(None);
        let mut changes = client.subscribe();

        client.sign_out().await.unwrap();

        let change = changes.recv().await.unwrap();
        assert_eq!(change.event, AuthChangeEvent::SignedOut);
        assert!(change.session.is_none());
    }

    #[tokio::test]
    async fn test_sign_out_storage_failure_still_broadcasts_then_errors() {
        let vault = SessionVault::new(Box::new(UnreadableStorage));
        let client = GoTrueClient::new("https://xyz.supabase.co/", "anon", vault).unwrap();
        let mut changes = client.subscribe();

        let result = client.sign_out().await;

        assert!(matches!(result, Err(GatewayError::Storage(_))));
        let change = changes.recv().await.unwrap();
        assert_eq!(change.event, AuthChangeEvent::SignedOut);
        assert!(change.session.is_none());
    }
}
