//! Profile store: the `profiles` table.

use crate::error::GatewayResult;
use crate::rest::{eq, SupabaseRestClient};
use crate::types::{NewProfile, Profile};
use async_trait::async_trait;

const PROFILES_TABLE: &str = "profiles";

/// Read/insert access to application profiles.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Fetch the profile whose id equals the identity id. `Ok(None)` when no
    /// row exists yet.
    async fn select_by_id(
        &self,
        id: &str,
        access_token: Option<&str>,
    ) -> GatewayResult<Option<Profile>>;

    /// Insert a profile row and return it as stored.
    async fn insert(&self, profile: &NewProfile, access_token: Option<&str>)
        -> GatewayResult<Profile>;
}

#[async_trait]
impl ProfileStore for SupabaseRestClient {
    async fn select_by_id(
        &self,
        id: &str,
        access_token: Option<&str>,
    ) -> GatewayResult<Option<Profile>> {
        let params = vec![
            ("select", "*".to_string()),
            ("id", eq(id)),
            ("limit", "1".to_string()),
        ];
        let rows: Vec<Profile> = self.select_rows(PROFILES_TABLE, &params, access_token).await?;
        Ok(rows.into_iter().next())
    }

    async fn insert(
        &self,
        profile: &NewProfile,
        access_token: Option<&str>,
    ) -> GatewayResult<Profile> {
        tracing::info!(user_id = %profile.id, "Inserting profile");
        let params = vec![("select", "*".to_string())];
        self.insert_row(PROFILES_TABLE, profile, &params, access_token).await
    }
}
