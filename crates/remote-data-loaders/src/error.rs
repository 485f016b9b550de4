//! Loader error types.

use conf_storage::StorageError;
use resilient_request::RequestError;
use thiserror::Error;

/// Errors from REST reads.
///
/// Cloned out to every caller joined on a single-flight load.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoaderError {
    #[error(transparent)]
    Request(#[from] RequestError),

    /// A non-auth error response, returned by the server as-is.
    #[error("HTTP {status} reading {table}: {message}")]
    Status {
        table: String,
        status: u16,
        message: String,
    },

    #[error("Failed to decode {table} rows: {reason}")]
    Decode { table: String, reason: String },

    #[error("No {0} found")]
    NotFound(&'static str),

    #[error("Configuration missing: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid REST endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl LoaderError {
    /// Returns true if retrying later may succeed without user action.
    pub fn is_transient(&self) -> bool {
        match self {
            LoaderError::Request(e) => e.is_transient(),
            LoaderError::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

impl From<StorageError> for LoaderError {
    fn from(err: StorageError) -> Self {
        LoaderError::Storage(err.to_string())
    }
}

/// Result type alias using LoaderError.
pub type LoaderResult<T> = Result<T, LoaderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_transient() {
        let err = LoaderError::Status {
            table: "measurements".into(),
            status: 503,
            message: "unavailable".into(),
        };
        assert!(err.is_transient());

        let err: LoaderError = RequestError::AuthRequired { status: 401 }.into();
        assert!(!err.is_transient());
        assert_eq!(err.to_string(), "Authentication required (HTTP 401)");

        assert!(!LoaderError::NotFound("client profile").is_transient());
    }
}
