//! Key/value configuration store for the REST endpoint, the API credential
//! and the signed-in session.
//!
//! Two backends are provided:
//! - [`MemoryConfStore`]: process-local, used by tests and one-shot runs
//! - [`FileConfStore`]: a JSON object on disk, rewritten atomically

mod file;
mod keys;
mod manager;
mod memory;
mod traits;

pub use file::FileConfStore;
pub use keys::ConfKeys;
pub use manager::ConfManager;
pub use memory::MemoryConfStore;
pub use traits::ConfStore;

use std::sync::Arc;
use thiserror::Error;
use vitals_config_and_utils::Paths;

/// Error type for config store operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// The backing file could not be read or written.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The backing file is not a JSON object of strings.
    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Encoding(err.to_string())
    }
}

/// Result type for config store operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Open the file-backed store at [`Paths::conf_store_file`] and wrap it.
pub fn create_conf_manager(paths: &Paths) -> StorageResult<ConfManager> {
    let store = FileConfStore::open(paths.conf_store_file())?;
    Ok(ConfManager::new(Arc::new(store)))
}
