//! Login, signup, logout and status commands.

use super::{prompt, prompt_password};
use crate::app::App;
use crate::output::{self, OutputFormat};
use anyhow::{bail, Context};
use auth_session::{AuthPhase, AuthState};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// Printable snapshot of an [`AuthState`].
#[derive(Debug, Serialize)]
pub(super) struct AuthStatusView {
    authenticated: bool,
    loading: bool,
    phase: AuthPhase,
    user_id: Option<String>,
    username: Option<String>,
    email: Option<String>,
    expires_at: Option<DateTime<Utc>>,
}

impl From<&AuthState> for AuthStatusView {
    fn from(state: &AuthState) -> Self {
        Self {
            authenticated: state.is_authenticated(),
            loading: state.is_loading,
            phase: state.phase,
            user_id: state.user.as_ref().map(|u| u.id.clone()),
            username: state.user.as_ref().map(|u| u.username.clone()),
            email: state.user.as_ref().map(|u| u.email.clone()),
            expires_at: state.session.as_ref().map(|s| s.expires_at),
        }
    }
}

fn phase_label(phase: AuthPhase) -> &'static str {
    match phase {
        AuthPhase::Booting => "starting",
        AuthPhase::Reconciling => "restoring session",
        AuthPhase::SignedOut => "signed out",
        AuthPhase::SigningIn => "signing in",
        AuthPhase::SigningUp => "signing up",
        AuthPhase::Provisioning => "setting up profile",
        AuthPhase::SignedIn => "signed in",
        AuthPhase::Degraded => "signed up without profile",
        AuthPhase::SigningOut => "signing out",
    }
}

impl fmt::Display for AuthStatusView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", output::heading("Auth Status"))?;
        write!(f, "{}", output::row("State", phase_label(self.phase)))?;
        if let (Some(username), Some(email)) = (&self.username, &self.email) {
            write!(f, "\n{}", output::row("User", username))?;
            write!(f, "\n{}", output::row("Email", email))?;
        }
        if let Some(user_id) = &self.user_id {
            write!(f, "\n{}", output::row("User ID", user_id))?;
        }
        if let Some(expires_at) = &self.expires_at {
            let expires = expires_at.format("%Y-%m-%d %H:%M:%S UTC").to_string();
            write!(f, "\n{}", output::row("Session expires", &expires))?;
        }
        Ok(())
    }
}

/// Sign in with email and password.
pub async fn login(app: &App, format: &OutputFormat) -> anyhow::Result<()> {
    let current = app.auth.state();
    if let Some(user) = current.user.as_ref().filter(|_| current.is_authenticated()) {
        output::print_success(&format!("Already logged in as {}", user.username), format);
        return Ok(());
    }

    let email = prompt("Email")?;
    let password = prompt_password("Password")?;

    output::print_progress("Logging in...", format);
    let state = app
        .auth
        .sign_in(&email, &password)
        .await
        .context("Login failed")?;

    match state.user {
        Some(user) if state.session.is_some() => {
            output::print_success(&format!("Logged in as {}", user.username), format);
            Ok(())
        }
        _ => bail!(
            "Login failed: no profile exists for {}. Run `community-feed signup` to create one.",
            email
        ),
    }
}

/// Create an account and wait for its profile.
pub async fn signup(app: &App, format: &OutputFormat) -> anyhow::Result<()> {
    let email = prompt("Email")?;
    let username = prompt("Username")?;
    let password = prompt_password("Password")?;
    let confirm = prompt_password("Confirm password")?;
    if password != confirm {
        bail!("Passwords do not match");
    }

    output::print_progress("Creating account...", format);
    let state = app
        .auth
        .sign_up(&email, &password, &username)
        .await
        .context("Signup failed")?;

    let message = match (state.phase, &state.user) {
        (AuthPhase::SignedIn, Some(user)) => {
            format!("Account created. Logged in as {}", user.username)
        }
        (AuthPhase::Degraded, _) => "Account created, but the profile is not ready yet. \
             Try `community-feed login` in a moment."
            .to_string(),
        _ => "Account created. Confirm your email address, then run `community-feed login`."
            .to_string(),
    };
    output::print_success(&message, format);
    Ok(())
}

/// Sign out and forget the stored session.
pub async fn logout(app: &App, format: &OutputFormat) -> anyhow::Result<()> {
    let was_authenticated = app.auth.state().is_authenticated();

    app.auth
        .sign_out()
        .await
        .context("Signed out locally, but the server did not confirm")?;

    let message = if was_authenticated {
        "Logged out"
    } else {
        "Not logged in"
    };
    output::print_success(message, format);
    Ok(())
}

/// Show the current authentication state.
pub fn status(app: &App, format: &OutputFormat) -> anyhow::Result<()> {
    let view = AuthStatusView::from(&app.auth.state());
    output::print(&view, format);
    Ok(())
}
