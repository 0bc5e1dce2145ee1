//! Reconciler phase machine using rust-fsm.
//!
//! Every reconciler operation starts from a settled phase, walks through a
//! transient one, and lands on a settled phase again.
//!
//! ## State Diagram
//!
//! ```text
//! ┌─────────────────┐
//! │     Booting     │ (initial)
//! └────────┬────────┘
//!          │ Reconcile / SignIn / SignUp / SignOut
//!          ▼
//! ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐
//! │   Reconciling   │   │    SigningIn    │   │    SigningUp    │
//! └────────┬────────┘   └────────┬────────┘   └────────┬────────┘
//!          │                     │                     │ Registered
//!          │ ProfileFound        │ ProfileFound        ▼
//!          │ ProfileMissing      │ ProfileMissing  ┌─────────────────┐
//!          ▼                     ▼                 │  Provisioning   │
//!     SignedIn / SignedOut  SignedIn / SignedOut   └────────┬────────┘
//!                                                           │ ProfileFound / ProfileMissing
//!                                                           │ ProvisioningFailed
//!                                                           ▼
//!                                              SignedIn / SignedOut / Degraded
//!
//! SignedIn / SignedOut / Degraded ── SignOut ──► SigningOut ── SignOutComplete ──► SignedOut
//! ```
//!
//! A provider rejection does not have an input: the reconciler restores the
//! phase it held before the attempt.

use rust_fsm::*;
use serde::{Deserialize, Serialize};

state_machine! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub phase_machine(Booting)

    Booting => {
        Reconcile => Reconciling,
        SignIn => SigningIn,
        SignUp => SigningUp,
        SignOut => SigningOut
    },
    SignedOut => {
        Reconcile => Reconciling,
        SignIn => SigningIn,
        SignUp => SigningUp,
        SignOut => SigningOut
    },
    SignedIn => {
        Reconcile => Reconciling,
        SignIn => SigningIn,
        SignUp => SigningUp,
        SignOut => SigningOut
    },
    Degraded => {
        Reconcile => Reconciling,
        SignIn => SigningIn,
        SignUp => SigningUp,
        SignOut => SigningOut
    },
    Reconciling => {
        ProfileFound => SignedIn,
        ProfileMissing => SignedOut
    },
    SigningIn => {
        ProfileFound => SignedIn,
        ProfileMissing => SignedOut
    },
    SigningUp => {
        Registered => Provisioning
    },
    Provisioning => {
        ProfileFound => SignedIn,
        // Identity exists but has no session yet (email confirmation)
        ProfileMissing => SignedOut,
        ProvisioningFailed => Degraded
    },
    SigningOut => {
        SignOutComplete => SignedOut
    }
}

pub use phase_machine::Input as PhaseInput;
pub use phase_machine::State as PhaseMachineState;
pub use phase_machine::StateMachine as PhaseMachine;

/// Published reconciler phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthPhase {
    /// Nothing reconciled yet.
    Booting,
    /// Reconciling a session reported by the identity provider.
    Reconciling,
    SignedOut,
    SigningIn,
    SigningUp,
    /// Waiting for (or creating) the profile of a fresh sign-up.
    Provisioning,
    SignedIn,
    /// Sign-up succeeded but no profile could be provisioned.
    Degraded,
    SigningOut,
}

impl AuthPhase {
    /// Returns true while an operation is in flight.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AuthPhase::Reconciling
                | AuthPhase::SigningIn
                | AuthPhase::SigningUp
                | AuthPhase::Provisioning
                | AuthPhase::SigningOut
        )
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthPhase::SignedIn)
    }
}

impl From<&PhaseMachineState> for AuthPhase {
    fn from(state: &PhaseMachineState) -> Self {
        match state {
            PhaseMachineState::Booting => AuthPhase::Booting,
            PhaseMachineState::Reconciling => AuthPhase::Reconciling,
            PhaseMachineState::SignedOut => AuthPhase::SignedOut,
            PhaseMachineState::SigningIn => AuthPhase::SigningIn,
            PhaseMachineState::SigningUp => AuthPhase::SigningUp,
            PhaseMachineState::Provisioning => AuthPhase::Provisioning,
            PhaseMachineState::SignedIn => AuthPhase::SignedIn,
            PhaseMachineState::Degraded => AuthPhase::Degraded,
            PhaseMachineState::SigningOut => AuthPhase::SigningOut,
        }
    }
}

impl From<AuthPhase> for PhaseMachineState {
    fn from(phase: AuthPhase) -> Self {
        match phase {
            AuthPhase::Booting => PhaseMachineState::Booting,
            AuthPhase::Reconciling => PhaseMachineState::Reconciling,
            AuthPhase::SignedOut => PhaseMachineState::SignedOut,
            AuthPhase::SigningIn => PhaseMachineState::SigningIn,
            AuthPhase::SigningUp => PhaseMachineState::SigningUp,
            AuthPhase::Provisioning => PhaseMachineState::Provisioning,
            AuthPhase::SignedIn => PhaseMachineState::SignedIn,
            AuthPhase::Degraded => PhaseMachineState::Degraded,
            AuthPhase::SigningOut => PhaseMachineState::SigningOut,
        }
    }
}
