//! Request error types.

use thiserror::Error;
use token_header_cache::HeaderError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    /// No usable session, or the server rejected it twice.
    #[error("Authentication required (HTTP {status})")]
    AuthRequired { status: u16 },

    /// Every attempt timed out or failed in transport.
    #[error("Network failure after {attempts} attempt(s): {reason}")]
    NetworkTransient { attempts: u32, reason: String },

    #[error("Configuration missing: {0}")]
    ConfigMissing(&'static str),

    #[error("Refusing to send credential with role {role}")]
    ForbiddenCredential { role: String },

    /// The config store could not be read.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl RequestError {
    /// Status carried by auth failures.
    pub fn status(&self) -> Option<u16> {
        match self {
            RequestError::AuthRequired { status } => Some(*status),
            _ => None,
        }
    }

    /// Returns true if retrying later may succeed without user action.
    pub fn is_transient(&self) -> bool {
        matches!(self, RequestError::NetworkTransient { .. })
    }

    /// Terminal errors need the user to sign in or fix configuration.
    pub fn requires_login(&self) -> bool {
        matches!(
            self,
            RequestError::AuthRequired { .. }
                | RequestError::ConfigMissing(_)
                | RequestError::ForbiddenCredential { .. }
        )
    }
}

impl From<HeaderError> for RequestError {
    fn from(err: HeaderError) -> Self {
        match err {
            HeaderError::ConfigMissing(key) => RequestError::ConfigMissing(key),
            HeaderError::ForbiddenCredential { role } => RequestError::ForbiddenCredential { role },
            HeaderError::Storage(message) => RequestError::Storage(message),
        }
    }
}

/// Result type alias using RequestError.
pub type RequestResult<T> = Result<T, RequestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_only_on_auth_required() {
        assert_eq!(RequestError::AuthRequired { status: 403 }.status(), Some(403));
        assert_eq!(RequestError::ConfigMissing("rest endpoint").status(), None);
    }

    #[test]
    fn test_is_transient() {
        let err = RequestError::NetworkTransient {
            attempts: 2,
            reason: "timed out".into(),
        };
        assert!(err.is_transient());
        assert!(!err.requires_login());
        assert!(!RequestError::AuthRequired { status: 401 }.is_transient());
    }

    #[test]
    fn test_header_error_mapping() {
        let err: RequestError = HeaderError::ForbiddenCredential {
            role: "service_role".into(),
        }
        .into();
        assert!(err.requires_login());
        assert!(matches!(err, RequestError::ForbiddenCredential { .. }));

        let err: RequestError = HeaderError::Storage("disk".into()).into();
        assert!(!err.requires_login());
    }
}
