//! HTTP session probe against the auth backend's `/auth/v1/user` endpoint.

use crate::{AuthError, AuthResult, Session, SessionProbe};
use async_trait::async_trait;
use conf_storage::ConfManager;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
struct UserResponse {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

/// Verifies the stored session token with the server.
pub struct SupabaseSessionProbe {
    conf: ConfManager,
    http_client: Client,
}

impl SupabaseSessionProbe {
    pub fn new(conf: ConfManager) -> Self {
        Self::with_client(conf, Client::new())
    }

    pub fn with_client(conf: ConfManager, http_client: Client) -> Self {
        Self { conf, http_client }
    }
}

#[async_trait]
impl SessionProbe for SupabaseSessionProbe {
    async fn probe(&self) -> AuthResult<Option<Session>> {
        let Some(access_token) = self.conf.session_access_token()? else {
            debug!("No stored session");
            return Ok(None);
        };
        let endpoint = self
            .conf
            .rest_endpoint()?
            .ok_or(AuthError::ConfigMissing("rest endpoint"))?;
        let api_key = self
            .conf
            .bearer_credential()?
            .ok_or(AuthError::ConfigMissing("bearer credential"))?;

        let user_url = format!("{}/auth/v1/user", endpoint);
        debug!(url = %user_url, "Verifying session with server");

        let response = self
            .http_client
            .get(&user_url)
            .header("apikey", &api_key)
            .header("Authorization", format!("Bearer {}", access_token))
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            warn!(status = %status, "Server rejected session, clearing it");
            self.conf.clear_session()?;
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "Session verification failed");
            return Err(AuthError::UnexpectedStatus(status.as_u16()));
        }

        let user: UserResponse = response.json().await?;
        debug!(user_id = %user.id, "Session verified with server");

        Ok(Some(Session {
            access_token,
            user_id: Some(user.id),
            email: user.email,
        }))
    }
}
