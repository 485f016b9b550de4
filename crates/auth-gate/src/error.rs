//! Authentication error types.

use thiserror::Error;

/// Authentication error type.
#[derive(Error, Debug)]
pub enum AuthError {
    /// A decision wait was cancelled by its abort signal.
    #[error("Wait for auth decision aborted")]
    Aborted,

    /// Endpoint or credential missing from the config store
    #[error("Configuration missing: {0}")]
    ConfigMissing(&'static str),

    /// The probe endpoint answered with a status we cannot interpret.
    #[error("Unexpected status from session endpoint: {0}")]
    UnexpectedStatus(u16),

    /// A token could not be decoded as a JWT.
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    /// Invalid state transition in the auth FSM
    #[error("Invalid auth state transition: {0}")]
    InvalidStateTransition(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(#[from] conf_storage::StorageError),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Timeout error
    #[error("Operation timed out")]
    Timeout,
}

impl AuthError {
    /// Returns true if this error is transient and the operation can be retried.
    pub fn is_transient(&self) -> bool {
        match self {
            AuthError::Timeout => true,
            AuthError::UnexpectedStatus(status) => *status >= 500,
            AuthError::Http(e) => {
                if e.is_connect() || e.is_timeout() {
                    return true;
                }
                if let Some(status) = e.status() {
                    return status.is_server_error();
                }
                false
            }
            _ => false,
        }
    }
}

/// Result type alias using AuthError.
pub type AuthResult<T> = Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_transient_timeout() {
        assert!(AuthError::Timeout.is_transient());
    }

    #[test]
    fn test_is_transient_server_error_status() {
        assert!(AuthError::UnexpectedStatus(503).is_transient());
        assert!(!AuthError::UnexpectedStatus(418).is_transient());
    }

    #[test]
    fn test_is_not_transient_aborted() {
        assert!(!AuthError::Aborted.is_transient());
    }

    #[test]
    fn test_is_not_transient_config_missing() {
        assert!(!AuthError::ConfigMissing("rest endpoint").is_transient());
    }
}
