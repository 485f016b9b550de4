use thiserror::Error;

/// Header resolution failures.
///
/// Cloned to every caller joined on the same resolution.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HeaderError {
    #[error("Configuration missing: {0}")]
    ConfigMissing(&'static str),

    /// The stored credential decodes to a privileged role.
    #[error("Refusing to send credential with role {role}")]
    ForbiddenCredential { role: String },

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<conf_storage::StorageError> for HeaderError {
    fn from(err: conf_storage::StorageError) -> Self {
        HeaderError::Storage(err.to_string())
    }
}
