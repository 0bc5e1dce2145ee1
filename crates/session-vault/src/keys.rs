//! Storage key constants.

/// Keys under which the auth session is persisted.
pub struct StorageKeys;

impl StorageKeys {
    /// GoTrue access token
    pub const ACCESS_TOKEN: &'static str = "supabase_access_token";

    /// GoTrue refresh token
    pub const REFRESH_TOKEN: &'static str = "supabase_refresh_token";

    /// Session metadata (JSON)
    pub const SESSION_META: &'static str = "supabase_session_meta";

    /// Every key owned by the session.
    pub const SESSION_KEYS: [&'static str; 3] =
        [Self::ACCESS_TOKEN, Self::REFRESH_TOKEN, Self::SESSION_META];
}
