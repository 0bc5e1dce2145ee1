//! Session reconciler.
//!
//! Turns raw identity provider outcomes into the canonical [`AuthState`].
//! Operations hold a single in-flight slot for their whole duration, so a
//! listener-driven reconcile can never interleave with a sign-up that is
//! still provisioning.

use crate::auth_fsm::{AuthPhase, PhaseInput, PhaseMachine};
use crate::provisioning::{
    provision_profile, ProvisioningConfig, ProvisioningOutcome, ProvisioningRequest,
};
use crate::state::{AuthState, AuthStateHolder};
use crate::{AuthError, AuthResult};
use parking_lot::Mutex;
use std::sync::Arc;
use supabase_gateway::{GatewayError, IdentityProvider, Profile, ProfileStore, Session};
use tracing::{debug, info, warn};

pub struct SessionReconciler {
    provider: Arc<dyn IdentityProvider>,
    profiles: Arc<dyn ProfileStore>,
    state: Arc<AuthStateHolder>,
    provisioning: ProvisioningConfig,
    machine: Mutex<PhaseMachine>,
    in_flight: tokio::sync::Mutex<()>,
}

impl SessionReconciler {
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        profiles: Arc<dyn ProfileStore>,
        state: Arc<AuthStateHolder>,
        provisioning: ProvisioningConfig,
    ) -> Self {
        Self {
            provider,
            profiles,
            state,
            provisioning,
            machine: Mutex::new(PhaseMachine::new()),
            in_flight: tokio::sync::Mutex::new(()),
        }
    }

    pub fn provider(&self) -> &Arc<dyn IdentityProvider> {
        &self.provider
    }

    pub fn state(&self) -> &Arc<AuthStateHolder> {
        &self.state
    }

    /// Current phase of the machine.
    pub fn phase(&self) -> AuthPhase {
        AuthPhase::from(self.machine.lock().state())
    }

    /// Transition the machine and publish the new phase.
    fn transition(&self, input: PhaseInput) -> AuthResult<AuthPhase> {
        let mut machine = self.machine.lock();
        let old_phase = AuthPhase::from(machine.state());

        machine.consume(&input).map_err(|_| {
            AuthError::InvalidStateTransition(format!(
                "Cannot apply {:?} in phase {:?}",
                input, old_phase
            ))
        })?;

        let new_phase = AuthPhase::from(machine.state());
        drop(machine);

        if old_phase != new_phase {
            debug!(old_phase = ?old_phase, new_phase = ?new_phase, "Auth phase transition");
        }
        self.state.set_phase(new_phase);
        Ok(new_phase)
    }

    /// Put the machine into `phase` without an input.
    fn force(&self, phase: AuthPhase) {
        *self.machine.lock() = PhaseMachine::from_state(phase.into());
        self.state.set_phase(phase);
    }

    /// Recover from an operation that was dropped mid-flight.
    ///
    /// Must be called with the in-flight slot held.
    fn settle_interrupted(&self) {
        let phase = self.phase();
        if !phase.is_transient() {
            return;
        }

        let snapshot = self.state.snapshot();
        let settled = if snapshot.is_authenticated() {
            AuthPhase::SignedIn
        } else {
            AuthPhase::SignedOut
        };
        warn!(phase = ?phase, settled = ?settled, "Previous auth operation was interrupted");
        self.force(settled);
        self.state.set_loading(false);
    }

    /// Undo a rejected attempt: restore the prior phase and stop loading.
    fn reject(&self, prior: AuthPhase, error: GatewayError) -> AuthError {
        self.force(prior);
        self.state.set_loading(false);
        AuthError::Provider(error)
    }

    async fn fetch_profile(&self, session: &Session) -> Option<Profile> {
        match self
            .profiles
            .select_by_id(session.user_id(), Some(&session.access_token))
            .await
        {
            Ok(Some(profile)) => Some(profile),
            Ok(None) => {
                warn!(user_id = %session.user_id(), "No profile for authenticated identity");
                None
            }
            Err(e) => {
                warn!(user_id = %session.user_id(), error = %e, "Profile fetch failed");
                None
            }
        }
    }

    /// Commit the session with its profile, or signed out when the profile
    /// is missing.
    async fn commit_with_profile(&self, session: Session) -> AuthResult<AuthState> {
        match self.fetch_profile(&session).await {
            Some(profile) => {
                self.transition(PhaseInput::ProfileFound)?;
                info!(user_id = %profile.id, username = %profile.username, "Signed in");
                Ok(self
                    .state
                    .commit(Some(profile), Some(session), AuthPhase::SignedIn))
            }
            None => {
                let phase = self.transition(PhaseInput::ProfileMissing)?;
                Ok(self.state.commit(None, None, phase))
            }
        }
    }

    /// Reconcile a session reported by the identity provider.
    ///
    /// Does not touch `is_loading` beyond the final commit.
    pub async fn reconcile_existing_session(
        &self,
        session: Option<Session>,
    ) -> AuthResult<AuthState> {
        let _slot = self.in_flight.lock().await;
        self.settle_interrupted();
        self.transition(PhaseInput::Reconcile)?;

        match session {
            Some(session) => {
                debug!(user_id = %session.user_id(), "Reconciling session");
                self.commit_with_profile(session).await
            }
            None => {
                let phase = self.transition(PhaseInput::ProfileMissing)?;
                Ok(self.state.commit(None, None, phase))
            }
        }
    }

    /// Password sign-in.
    ///
    /// A rejected sign-in leaves user and session as they were. A successful
    /// one without a readable profile ends signed out, not in an error.
    pub async fn sign_in(&self, email: &str, password: &str) -> AuthResult<AuthState> {
        let _slot = self.in_flight.lock().await;
        self.settle_interrupted();
        let prior = self.phase();
        self.transition(PhaseInput::SignIn)?;
        self.state.set_loading(true);

        let response = match self.provider.sign_in_with_password(email, password).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Sign-in rejected");
                return Err(self.reject(prior, e));
            }
        };

        match response.session {
            Some(session) => self.commit_with_profile(session).await,
            None => {
                warn!("Sign-in returned no session");
                let phase = self.transition(PhaseInput::ProfileMissing)?;
                Ok(self.state.commit(None, None, phase))
            }
        }
    }

    /// Create an account, then provision its profile.
    ///
    /// Failing to provision is reported through [`AuthPhase::Degraded`], not
    /// as an error.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        username: &str,
    ) -> AuthResult<AuthState> {
        let _slot = self.in_flight.lock().await;
        self.settle_interrupted();
        let prior = self.phase();
        self.transition(PhaseInput::SignUp)?;
        self.state.set_loading(true);

        let metadata = serde_json::json!({ "username": username });
        let response = match self.provider.sign_up(email, password, metadata).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Sign-up rejected");
                return Err(self.reject(prior, e));
            }
        };

        let identity = match response
            .user
            .clone()
            .or_else(|| response.session.as_ref().map(|s| s.user.clone()))
        {
            Some(identity) => identity,
            None => {
                return Err(self.reject(
                    prior,
                    GatewayError::UnexpectedResponse("sign-up returned no user".to_string()),
                ))
            }
        };

        self.transition(PhaseInput::Registered)?;
        let session = response.session;

        let outcome = provision_profile(
            self.profiles.as_ref(),
            &self.provisioning,
            ProvisioningRequest {
                identity: &identity,
                email,
                username,
                access_token: session.as_ref().map(|s| s.access_token.as_str()),
            },
        )
        .await;

        let profile = match outcome {
            ProvisioningOutcome::Found { profile, attempt } => {
                debug!(user_id = %identity.id, attempt, "Profile found after sign-up");
                profile
            }
            ProvisioningOutcome::Inserted(profile) => profile,
            ProvisioningOutcome::Failed => {
                let phase = self.transition(PhaseInput::ProvisioningFailed)?;
                warn!(
                    user_id = %identity.id,
                    "Signed up without a profile, staying signed out"
                );
                return Ok(self.state.commit(None, None, phase));
            }
        };

        match session {
            Some(session) => {
                self.transition(PhaseInput::ProfileFound)?;
                info!(user_id = %profile.id, username = %profile.username, "Signed up");
                Ok(self
                    .state
                    .commit(Some(profile), Some(session), AuthPhase::SignedIn))
            }
            None => {
                info!(user_id = %identity.id, "Signed up, awaiting email confirmation");
                let phase = self.transition(PhaseInput::ProfileMissing)?;
                Ok(self.state.commit(None, None, phase))
            }
        }
    }

    /// Sign out. The state is cleared even when the provider call fails;
    /// that error is returned afterwards.
    pub async fn sign_out(&self) -> AuthResult<AuthState> {
        let _slot = self.in_flight.lock().await;
        self.settle_interrupted();
        self.transition(PhaseInput::SignOut)?;

        let result = self.provider.sign_out().await;

        let phase = self.transition(PhaseInput::SignOutComplete)?;
        let state = self.state.commit(None, None, phase);

        match result {
            Ok(()) => {
                info!("Signed out");
                Ok(state)
            }
            Err(e) => {
                warn!(error = %e, "Provider sign-out failed, local state cleared anyway");
                Err(AuthError::Provider(e))
            }
        }
    }

    /// Commit a pair directly.
    pub async fn set_auth(&self, user: Option<Profile>, session: Option<Session>) -> AuthState {
        let _slot = self.in_flight.lock().await;
        let state = self.state.set_auth(user, session);
        self.force(state.phase);
        state
    }

    /// Commit signed out, whatever the machine was doing.
    pub async fn reset(&self) -> AuthState {
        let _slot = self.in_flight.lock().await;
        self.force(AuthPhase::SignedOut);
        self.state.clear()
    }
}
