//! Post-sign-up profile provisioning.
//!
//! The backend normally creates the profile from a trigger on the new
//! identity, but the row can lag behind the sign-up response. We give the
//! trigger a grace period, poll for the row, and insert it ourselves as a
//! last resort.

use feed_config::ProvisioningSettings;
use std::time::Duration;
use supabase_gateway::{Identity, NewProfile, Profile, ProfileStore};
use tracing::{debug, info, warn};

/// Provisioning timings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisioningConfig {
    /// Wait before the first lookup.
    pub grace_period: Duration,
    /// Lookups before falling back to an insert.
    pub max_attempts: u32,
    /// Wait after every lookup that misses, the last one included.
    pub backoff: Duration,
}

impl Default for ProvisioningConfig {
    fn default() -> Self {
        Self::from(&ProvisioningSettings::default())
    }
}

impl From<&ProvisioningSettings> for ProvisioningConfig {
    fn from(settings: &ProvisioningSettings) -> Self {
        Self {
            grace_period: Duration::from_millis(settings.grace_period_ms),
            max_attempts: settings.max_attempts,
            backoff: Duration::from_millis(settings.backoff_ms),
        }
    }
}

/// How a provisioning run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ProvisioningOutcome {
    /// The trigger created the row; found on lookup `attempt` (1-based).
    Found { profile: Profile, attempt: u32 },
    /// We inserted the row and read it back.
    Inserted(Profile),
    /// No profile exists and we could not create one.
    Failed,
}

/// Everything the run needs to know about the new account.
pub(crate) struct ProvisioningRequest<'a> {
    pub identity: &'a Identity,
    /// Email given to sign-up, used when the identity carries none.
    pub email: &'a str,
    pub username: &'a str,
    pub access_token: Option<&'a str>,
}

/// Wait for, or create, the profile of a freshly signed-up identity.
pub(crate) async fn provision_profile(
    store: &dyn ProfileStore,
    config: &ProvisioningConfig,
    request: ProvisioningRequest<'_>,
) -> ProvisioningOutcome {
    let user_id = request.identity.id.as_str();

    debug!(
        user_id = %user_id,
        grace_ms = config.grace_period.as_millis() as u64,
        "Waiting for profile trigger"
    );
    tokio::time::sleep(config.grace_period).await;

    for attempt in 1..=config.max_attempts {
        match store.select_by_id(user_id, request.access_token).await {
            Ok(Some(profile)) => {
                info!(user_id = %user_id, attempt, "Profile provisioned by trigger");
                return ProvisioningOutcome::Found { profile, attempt };
            }
            Ok(None) => debug!(user_id = %user_id, attempt, "Profile not there yet"),
            Err(e) => warn!(user_id = %user_id, attempt, error = %e, "Profile lookup failed"),
        }
        tokio::time::sleep(config.backoff).await;
    }

    let email = request
        .identity
        .email
        .clone()
        .unwrap_or_else(|| request.email.to_string());
    let new_profile = NewProfile {
        id: user_id.to_string(),
        email,
        username: request.username.to_string(),
    };

    info!(
        user_id = %user_id,
        attempts = config.max_attempts,
        "Profile still missing, inserting it"
    );
    if let Err(e) = store.insert(&new_profile, request.access_token).await {
        warn!(user_id = %user_id, error = %e, "Profile insert failed");
        return ProvisioningOutcome::Failed;
    }

    match store.select_by_id(user_id, request.access_token).await {
        Ok(Some(profile)) => ProvisioningOutcome::Inserted(profile),
        Ok(None) => {
            warn!(user_id = %user_id, "Inserted profile is not readable");
            ProvisioningOutcome::Failed
        }
        Err(e) => {
            warn!(user_id = %user_id, error = %e, "Profile re-fetch failed");
            ProvisioningOutcome::Failed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timings() {
        let config = ProvisioningConfig::default();
        assert_eq!(config.grace_period, Duration::from_millis(1000));
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.backoff, Duration::from_millis(500));
    }

    #[test]
    fn test_from_settings() {
        let settings = ProvisioningSettings {
            grace_period_ms: 10,
            max_attempts: 2,
            backoff_ms: 20,
        };
        let config = ProvisioningConfig::from(&settings);
        assert_eq!(config.grace_period, Duration::from_millis(10));
        assert_eq!(config.max_attempts, 2);
        assert_eq!(config.backoff, Duration::from_millis(20));
    }
}
