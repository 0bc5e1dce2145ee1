//! Persisted auth session for the community feed client.
//!
//! The identity provider keeps its current session here between runs, the
//! same job device storage does for the mobile client:
//! - **File**: one owner-only JSON file under the client's base directory
//! - **Memory**: nothing survives the process

mod file;
mod keys;
mod memory;
mod traits;
mod vault;

pub use file::FileStorage;
pub use keys::StorageKeys;
pub use memory::MemoryStorage;
pub use traits::SessionStorage;
pub use vault::{PersistedSession, SessionVault, EXPIRY_LEEWAY_SECS};

use thiserror::Error;

/// Error type for storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Encoding/decoding error
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
