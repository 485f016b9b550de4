use std::fmt;

/// Headers attached to every authenticated REST call.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthHeaders {
    api_key: String,
    access_token: String,
}

impl AuthHeaders {
    pub const API_KEY: &'static str = "apikey";
    pub const AUTHORIZATION: &'static str = "Authorization";

    pub fn new(api_key: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            access_token: access_token.into(),
        }
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn authorization(&self) -> String {
        format!("Bearer {}", self.access_token)
    }

    /// Header name/value pairs in the order they are sent.
    pub fn pairs(&self) -> [(&'static str, String); 2] {
        [
            (Self::API_KEY, self.api_key.clone()),
            (Self::AUTHORIZATION, self.authorization()),
        ]
    }
}

// Tokens stay out of logs.
impl fmt::Debug for AuthHeaders {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthHeaders")
            .field("api_key", &"<redacted>")
            .field("access_token", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pairs() {
        let headers = AuthHeaders::new("anon-key", "jwt");
        let pairs = headers.pairs();
        assert_eq!(pairs[0], ("apikey", "anon-key".to_string()));
        assert_eq!(pairs[1], ("Authorization", "Bearer jwt".to_string()));
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let rendered = format!("{:?}", AuthHeaders::new("secret-key", "secret-jwt"));
        assert!(!rendered.contains("secret"));
    }
}
