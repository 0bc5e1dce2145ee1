//! Wiring of the clients, auth runtime and feed service for one invocation.

use auth_session::{AuthRuntime, ProvisioningConfig};
use feed_config::{Config, Paths};
use feed_service::FeedService;
use session_vault::{FileStorage, SessionVault};
use std::sync::Arc;
use supabase_gateway::{GoTrueClient, SupabaseRestClient};
use tracing::info;

pub struct App {
    pub auth: AuthRuntime,
    pub feed: FeedService,
}

impl App {
    pub fn build(paths: &Paths, config: &Config) -> anyhow::Result<Self> {
        let api_url = config.supabase_url()?;
        let anon_key = config.supabase_anon_key.as_str();

        let vault = SessionVault::new(Box::new(FileStorage::new(paths.session_file())));
        let identity = Arc::new(GoTrueClient::new(api_url.as_str(), anon_key, vault)?);
        let rest = Arc::new(SupabaseRestClient::new(api_url.as_str(), anon_key));

        let auth = AuthRuntime::new(
            identity,
            rest.clone(),
            ProvisioningConfig::from(&config.provisioning),
        );
        let feed = FeedService::new(rest, auth.clone(), &config.feed);

        info!(api_url = %api_url, "Clients configured");
        Ok(Self { auth, feed })
    }
}
