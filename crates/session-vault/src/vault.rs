//! High-level API for the persisted session.

use crate::{SessionStorage, StorageError, StorageKeys, StorageResult};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A session is treated as expired this many seconds before its real expiry.
pub const EXPIRY_LEEWAY_SECS: i64 = 60;

/// Session metadata stored next to the tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SessionMeta {
    user_id: String,
    #[serde(default)]
    email: Option<String>,
    expires_at: DateTime<Utc>,
}

/// Everything needed to restore a session on the next start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedSession {
    pub access_token: String,
    pub refresh_token: String,
    pub user_id: String,
    pub email: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl PersistedSession {
    /// Whether the access token is expired, or will be within the leeway.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - now < Duration::seconds(EXPIRY_LEEWAY_SECS)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

/// Reads and writes the persisted session through a [`SessionStorage`].
pub struct SessionVault {
    storage: Box<dyn SessionStorage>,
}

impl SessionVault {
    /// Create a new vault with the given storage backend
    pub fn new(storage: Box<dyn SessionStorage>) -> Self {
        Self { storage }
    }

    /// Store a complete session (tokens + metadata).
    pub fn store(&self, session: &PersistedSession) -> StorageResult<()> {
        let meta = SessionMeta {
            user_id: session.user_id.clone(),
            email: session.email.clone(),
            expires_at: session.expires_at,
        };
        let meta_json =
            serde_json::to_string(&meta).map_err(|e| StorageError::Encoding(e.to_string()))?;

        self.storage
            .set(StorageKeys::ACCESS_TOKEN, &session.access_token)?;
        self.storage
            .set(StorageKeys::REFRESH_TOKEN, &session.refresh_token)?;
        self.storage.set(StorageKeys::SESSION_META, &meta_json)?;

        tracing::debug!(user_id = %session.user_id, "Session stored");
        Ok(())
    }

    /// Load the stored session.
    ///
    /// A partially stored session (a token without metadata, or unreadable
    /// metadata) is cleared and reported as absent.
    pub fn load(&self) -> StorageResult<Option<PersistedSession>> {
        let access_token = self.storage.get(StorageKeys::ACCESS_TOKEN)?;
        let refresh_token = self.storage.get(StorageKeys::REFRESH_TOKEN)?;
        let meta_json = self.storage.get(StorageKeys::SESSION_META)?;

        let (access_token, refresh_token, meta_json) = match (access_token, refresh_token, meta_json)
        {
            (Some(a), Some(r), Some(m)) => (a, r, m),
            (None, None, None) => return Ok(None),
            _ => {
                tracing::warn!("Stored session is incomplete, clearing it");
                self.clear()?;
                return Ok(None);
            }
        };

        let meta: SessionMeta = match serde_json::from_str(&meta_json) {
            Ok(meta) => meta,
            Err(error) => {
                tracing::warn!(error = %error, "Stored session metadata is unreadable, clearing it");
                self.clear()?;
                return Ok(None);
            }
        };

        Ok(Some(PersistedSession {
            access_token,
            refresh_token,
            user_id: meta.user_id,
            email: meta.email,
            expires_at: meta.expires_at,
        }))
    }

    /// Whether any session tokens are stored.
    pub fn has_session(&self) -> StorageResult<bool> {
        self.storage.has(StorageKeys::ACCESS_TOKEN)
    }

    /// Remove every session key.
    pub fn clear(&self) -> StorageResult<()> {
        for key in StorageKeys::SESSION_KEYS {
            self.storage.delete(key)?;
        }
        tracing::debug!("Session cleared");
        Ok(())
    }
}
