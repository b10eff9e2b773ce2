//! Session bootstrap against the OpenAI Realtime sessions endpoint.
//!
//! One POST per call exchanges the long-lived API key for an ephemeral client
//! secret. The secret authorizes the upstream WebSocket and nothing else.

use reqwest::Client;
use tracing::{debug, info};

use super::messages::{SessionRequest, SessionResponse};
use crate::core::realtime::base::{
    EphemeralCredential, RealtimeConfig, RealtimeError, RealtimeResult,
};

/// Issues ephemeral credentials for upstream realtime sessions.
#[derive(Debug, Clone)]
pub struct SessionBootstrapper {
    client: Client,
    config: RealtimeConfig,
}

impl SessionBootstrapper {
    /// Create a bootstrapper sharing the given HTTP client.
    pub fn new(client: Client, config: RealtimeConfig) -> Self {
        Self { client, config }
    }

    /// Perform the bootstrap request.
    ///
    /// Any non-success status, transport failure, timeout or unusable response
    /// body is returned as an error; the caller must not open the upstream
    /// stream in that case.
    pub async fn create_session(&self) -> RealtimeResult<EphemeralCredential> {
        if self.config.api_key.is_empty() {
            return Err(RealtimeError::AuthenticationFailed(
                "API key is required".to_string(),
            ));
        }

        let body = SessionRequest {
            model: &self.config.model,
            voice: &self.config.voice,
        };

        debug!(
            url = %self.config.session_url,
            model = %self.config.model,
            voice = %self.config.voice,
            "Requesting realtime session"
        );

        let response = self
            .client
            .post(&self.config.session_url)
            .bearer_auth(&self.config.api_key)
            .timeout(self.config.bootstrap_timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RealtimeError::Timeout(format!(
                        "session bootstrap exceeded {:?}",
                        self.config.bootstrap_timeout
                    ))
                } else {
                    RealtimeError::ConnectionFailed(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RealtimeError::BootstrapRejected {
                status: status.as_u16(),
                body,
            });
        }

        let session: SessionResponse = response
            .json()
            .await
            .map_err(|e| RealtimeError::SerializationError(e.to_string()))?;

        if session.client_secret.value.is_empty() {
            return Err(RealtimeError::AuthenticationFailed(
                "session response carried an empty client secret".to_string(),
            ));
        }

        info!(
            session_id = ?session.id,
            expires_at = ?session.client_secret.expires_at,
            "Realtime session bootstrapped"
        );

        Ok(EphemeralCredential::new(
            session.client_secret.value,
            session.client_secret.expires_at,
        ))
    }
}
