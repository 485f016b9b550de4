//! Config store key constants.

/// Keys used by the sync layer
pub struct ConfKeys;

impl ConfKeys {
    /// Base URL of the REST backend, without trailing slash
    pub const REST_ENDPOINT: &'static str = "rest_endpoint";

    /// Public API credential sent as `apikey`
    pub const BEARER_CREDENTIAL: &'static str = "bearer_credential";

    /// Access token of the signed-in user
    pub const SESSION_ACCESS_TOKEN: &'static str = "session_access_token";

    pub const SESSION_USER_ID: &'static str = "session_user_id";
}
