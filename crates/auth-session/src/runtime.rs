//! Application-facing auth runtime.
//!
//! One shared authority for initialize/sign-in/sign-up/sign-out and state
//! reads, so the CLI and the feed service see the same [`AuthState`].

use crate::listener::{AuthChangeListener, AuthSubscription};
use crate::provisioning::ProvisioningConfig;
use crate::reconciler::SessionReconciler;
use crate::state::{AuthState, AuthStateHolder};
use crate::AuthResult;
use std::sync::Arc;
use supabase_gateway::{IdentityProvider, Profile, ProfileStore, Session};
use tokio::sync::watch;
use tracing::{info, warn};

/// Shared auth runtime.
#[derive(Clone)]
pub struct AuthRuntime {
    reconciler: Arc<SessionReconciler>,
}

impl AuthRuntime {
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        profiles: Arc<dyn ProfileStore>,
        provisioning: ProvisioningConfig,
    ) -> Self {
        let state = Arc::new(AuthStateHolder::new());
        Self {
            reconciler: Arc::new(SessionReconciler::new(
                provider,
                profiles,
                state,
                provisioning,
            )),
        }
    }

    pub fn reconciler(&self) -> &Arc<SessionReconciler> {
        &self.reconciler
    }

    /// Reconcile whatever session the provider already holds.
    ///
    /// Never fails: any error leaves the client signed out.
    pub async fn initialize(&self) -> AuthState {
        let session = match self.reconciler.provider().get_session().await {
            Ok(session) => session,
            Err(e) => {
                warn!(error = %e, "Could not read stored session, starting signed out");
                return self.reconciler.reset().await;
            }
        };

        match self.reconciler.reconcile_existing_session(session).await {
            Ok(state) => {
                info!(
                    authenticated = state.is_authenticated(),
                    "Auth initialized"
                );
                state
            }
            Err(e) => {
                warn!(error = %e, "Initial reconcile failed, starting signed out");
                self.reconciler.reset().await
            }
        }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> AuthResult<AuthState> {
        self.reconciler.sign_in(email, password).await
    }

    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        username: &str,
    ) -> AuthResult<AuthState> {
        self.reconciler.sign_up(email, password, username).await
    }

    pub async fn sign_out(&self) -> AuthResult<AuthState> {
        self.reconciler.sign_out().await
    }

    pub async fn set_auth(&self, user: Option<Profile>, session: Option<Session>) -> AuthState {
        self.reconciler.set_auth(user, session).await
    }

    pub fn state(&self) -> AuthState {
        self.reconciler.state().snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.reconciler.state().subscribe()
    }

    /// Follow provider session changes until the returned subscription is
    /// dropped or unsubscribed.
    pub fn start_listening(&self) -> AuthSubscription {
        let changes = self.reconciler.provider().subscribe();
        AuthChangeListener::spawn(self.reconciler.clone(), changes)
    }

    /// Bearer token of the current session.
    pub fn access_token(&self) -> Option<String> {
        self.state().access_token().map(str::to_string)
    }
}
