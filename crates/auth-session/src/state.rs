//! Observable auth state.

use crate::auth_fsm::AuthPhase;
use supabase_gateway::{Profile, Session};
use tokio::sync::watch;
use tracing::warn;

/// Canonical authentication state.
///
/// Outside of a half-pair bug upstream, `user` and `session` are either both
/// present or both absent once `is_loading` is false.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthState {
    pub user: Option<Profile>,
    pub session: Option<Session>,
    pub is_loading: bool,
    pub phase: AuthPhase,
}

impl Default for AuthState {
    fn default() -> Self {
        Self {
            user: None,
            session: None,
            is_loading: true,
            phase: AuthPhase::Booting,
        }
    }
}

impl AuthState {
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some() && self.session.is_some()
    }

    pub fn access_token(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.access_token.as_str())
    }
}

/// Holds the current [`AuthState`] and notifies subscribers of every change.
pub struct AuthStateHolder {
    tx: watch::Sender<AuthState>,
}

impl Default for AuthStateHolder {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthStateHolder {
    /// Start in `(None, None, loading)`.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(AuthState::default());
        Self { tx }
    }

    pub fn snapshot(&self) -> AuthState {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.tx.subscribe()
    }

    /// Commit a user/session pair and end loading.
    pub fn set_auth(&self, user: Option<Profile>, session: Option<Session>) -> AuthState {
        let phase = if user.is_some() && session.is_some() {
            AuthPhase::SignedIn
        } else {
            AuthPhase::SignedOut
        };
        self.commit(user, session, phase)
    }

    pub fn set_loading(&self, is_loading: bool) {
        self.tx.send_if_modified(|state| {
            let changed = state.is_loading != is_loading;
            state.is_loading = is_loading;
            changed
        });
    }

    pub fn clear(&self) -> AuthState {
        self.commit(None, None, AuthPhase::SignedOut)
    }

    pub(crate) fn set_phase(&self, phase: AuthPhase) {
        self.tx.send_if_modified(|state| {
            let changed = state.phase != phase;
            state.phase = phase;
            changed
        });
    }

    /// The only place user and session are written.
    pub(crate) fn commit(
        &self,
        user: Option<Profile>,
        session: Option<Session>,
        phase: AuthPhase,
    ) -> AuthState {
        let (user, session, phase) = match (user, session) {
            (Some(user), Some(session)) => (Some(user), Some(session), phase),
            (None, None) => (None, None, phase),
            (user, session) => {
                warn!(
                    has_user = user.is_some(),
                    has_session = session.is_some(),
                    "Refusing half-authenticated state, committing signed out"
                );
                let phase = if phase == AuthPhase::SignedIn {
                    AuthPhase::SignedOut
                } else {
                    phase
                };
                (None, None, phase)
            }
        };

        let next = AuthState {
            user,
            session,
            is_loading: false,
            phase,
        };
        self.tx.send_replace(next.clone());
        next
    }
}
