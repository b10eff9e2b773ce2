//! Base types shared by the upstream realtime components.
//!
//! The session bootstrapper and the upstream connector both work from a
//! [`RealtimeConfig`] snapshot taken from the server configuration, and report
//! failures through [`RealtimeError`].

use std::fmt;
use std::time::Duration;

use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::config::ServerConfig;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur while setting up the upstream side of a call.
#[derive(Debug, Error)]
pub enum RealtimeError {
    /// The session endpoint answered with a non-success status
    #[error("Session bootstrap rejected with status {status}: {body}")]
    BootstrapRejected { status: u16, body: String },

    /// Connection to the provider failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// WebSocket error
    #[error("WebSocket error: {0}")]
    WebSocketError(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Operation timeout
    #[error("Operation timed out: {0}")]
    Timeout(String),
}

/// Result type for realtime operations.
pub type RealtimeResult<T> = Result<T, RealtimeError>;

// =============================================================================
// Configuration
// =============================================================================

/// Upstream settings needed to bootstrap and open one realtime session.
#[derive(Clone)]
pub struct RealtimeConfig {
    /// Long-lived API key used only for the bootstrap request
    pub api_key: String,
    /// Model identifier, e.g. `gpt-4o-realtime-preview`
    pub model: String,
    /// Voice used for audio output
    pub voice: String,
    /// HTTPS endpoint issuing ephemeral session credentials
    pub session_url: String,
    /// WSS endpoint of the realtime stream (without query string)
    pub realtime_url: String,
    pub bootstrap_timeout: Duration,
    pub connect_timeout: Duration,
}

impl RealtimeConfig {
    /// Snapshot the upstream settings from the server configuration.
    pub fn from_server_config(config: &ServerConfig) -> Self {
        Self {
            api_key: config.openai_api_key.clone().unwrap_or_default(),
            model: config.realtime_model.clone(),
            voice: config.realtime_voice.clone(),
            session_url: config.session_url.clone(),
            realtime_url: config.realtime_url.clone(),
            bootstrap_timeout: Duration::from_secs(config.bootstrap_timeout_seconds),
            connect_timeout: Duration::from_secs(config.connect_timeout_seconds),
        }
    }
}

impl fmt::Debug for RealtimeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RealtimeConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("voice", &self.voice)
            .field("session_url", &self.session_url)
            .field("realtime_url", &self.realtime_url)
            .field("bootstrap_timeout", &self.bootstrap_timeout)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

impl Drop for RealtimeConfig {
    fn drop(&mut self) {
        self.api_key.zeroize();
    }
}

// =============================================================================
// Ephemeral Credential
// =============================================================================

/// Short-lived credential authorizing exactly one upstream stream.
///
/// The secret is wiped from memory when the value is dropped and never shows
/// up in `Debug` output.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct EphemeralCredential {
    value: String,
    #[zeroize(skip)]
    expires_at: Option<i64>,
}

impl EphemeralCredential {
    pub fn new(value: impl Into<String>, expires_at: Option<i64>) -> Self {
        Self {
            value: value.into(),
            expires_at,
        }
    }

    /// The bearer token value.
    pub fn secret(&self) -> &str {
        &self.value
    }

    /// Unix timestamp after which the credential is no longer accepted, if known.
    pub fn expires_at(&self) -> Option<i64> {
        self.expires_at
    }
}

impl fmt::Debug for EphemeralCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EphemeralCredential")
            .field("value", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_debug_is_redacted() {
        let credential = EphemeralCredential::new("ek_secret_value", Some(1_700_000_000));
        let printed = format!("{:?}", credential);
        assert!(!printed.contains("ek_secret_value"));
        assert!(printed.contains("<redacted>"));
        assert_eq!(credential.secret(), "ek_secret_value");
        assert_eq!(credential.expires_at(), Some(1_700_000_000));
    }

    #[test]
    fn test_bootstrap_rejected_display() {
        let err = RealtimeError::BootstrapRejected {
            status: 401,
            body: "invalid key".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Session bootstrap rejected with status 401: invalid key"
        );
    }
}
