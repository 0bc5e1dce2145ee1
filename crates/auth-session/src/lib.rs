//! Authentication session lifecycle for the community feed.
//!
//! This crate provides:
//! - An observable [`AuthState`] holder
//! - The [`SessionReconciler`] that pairs identity sessions with profiles
//! - Post-sign-up profile provisioning with bounded polling
//! - A listener that reconciles provider session changes
//! - An explicit phase machine, published as [`AuthPhase`]

mod auth_fsm;
mod error;
mod listener;
mod provisioning;
mod reconciler;
mod runtime;
mod state;

#[cfg(test)]
mod tests;

pub use auth_fsm::phase_machine;
pub use auth_fsm::{AuthPhase, PhaseInput, PhaseMachine, PhaseMachineState};
pub use error::{AuthError, AuthResult};
pub use listener::{AuthChangeListener, AuthSubscription};
pub use provisioning::ProvisioningConfig;
pub use reconciler::SessionReconciler;
pub use runtime::AuthRuntime;
pub use state::{AuthState, AuthStateHolder};
