//! Configuration module for the call relay
//!
//! This module handles server configuration from various sources: .env files, YAML files,
//! and environment variables. Priority: YAML > ENV vars > .env values > defaults.
//!
//! # Modules
//! - `yaml`: YAML configuration file loading
//! - `env`: Environment variable loading
//! - `merge`: Merging YAML and environment configurations
//! - `validation`: Configuration validation logic
//!
//! # Example
//! ```rust,no_run
//! use waav_call_relay::config::ServerConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = ServerConfig::from_env()?;
//!
//! // Load from YAML file with environment variable overrides
//! let config_path = PathBuf::from("config.yaml");
//! let config = ServerConfig::from_file(&config_path)?;
//!
//! println!("Server listening on {}", config.address());
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::time::Duration;

use crate::core::realtime::OpenAIRealtimeVoice;

mod env;
mod merge;
mod validation;
mod yaml;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 10;
/// About 20 seconds of 20 ms telephony frames
pub const DEFAULT_PENDING_FRAME_LIMIT: usize = 1024;
/// About 20 minutes of 20 ms telephony frames
pub const MAX_PENDING_FRAME_LIMIT: usize = 65_536;
pub const DEFAULT_MAX_CONNECTIONS_PER_IP: u32 = 100;

/// TLS configuration for HTTPS and WSS
#[derive(Debug, Clone)]
pub struct TlsConfig {
    /// Path to the TLS certificate file (PEM format)
    pub cert_path: PathBuf,
    /// Path to the TLS private key file (PEM format)
    pub key_path: PathBuf,
}

/// Server configuration
///
/// Contains all configuration needed to run the relay, including:
/// - Server settings (host, port, TLS)
/// - Upstream realtime settings (API key, model, voice, endpoints)
/// - Function handler endpoint
/// - Timeouts for the outbound calls made while a call is set up or running
/// - Security settings (connection limits)
#[derive(Clone)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,

    // TLS configuration (optional)
    pub tls: Option<TlsConfig>,

    // Upstream realtime settings
    /// Long-lived OpenAI API key, only ever sent to the session endpoint
    pub openai_api_key: Option<String>,
    pub realtime_model: String,
    pub realtime_voice: String,
    /// Endpoint issuing ephemeral session credentials
    pub session_url: String,
    /// Realtime WebSocket endpoint, without the `model` query parameter
    pub realtime_url: String,

    // Function calls
    /// Where function-call events are posted. Calls are abandoned when unset.
    pub function_handler_url: Option<String>,

    // Timeouts
    pub bootstrap_timeout_seconds: u64,
    pub connect_timeout_seconds: u64,
    pub function_call_timeout_seconds: u64,

    /// Caller frames held while the upstream stream is being opened
    pub pending_frame_limit: usize,

    // Connection limits
    /// Maximum concurrent WebSocket connections
    /// Default: None (unlimited)
    pub max_websocket_connections: Option<usize>,
    /// Maximum connections per IP address
    /// Default: 100
    pub max_connections_per_ip: u32,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("tls", &self.tls)
            .field(
                "openai_api_key",
                &self.openai_api_key.as_ref().map(|_| "<redacted>"),
            )
            .field("realtime_model", &self.realtime_model)
            .field("realtime_voice", &self.realtime_voice)
            .field("session_url", &self.session_url)
            .field("realtime_url", &self.realtime_url)
            .field("function_handler_url", &self.function_handler_url)
            .field("bootstrap_timeout_seconds", &self.bootstrap_timeout_seconds)
            .field("connect_timeout_seconds", &self.connect_timeout_seconds)
            .field(
                "function_call_timeout_seconds",
                &self.function_call_timeout_seconds,
            )
            .field("pending_frame_limit", &self.pending_frame_limit)
            .field("max_websocket_connections", &self.max_websocket_connections)
            .field("max_connections_per_ip", &self.max_connections_per_ip)
            .finish()
    }
}

/// Zeroize the API key when ServerConfig is dropped.
impl Drop for ServerConfig {
    fn drop(&mut self) {
        use zeroize::Zeroize;

        if let Some(ref mut key) = self.openai_api_key {
            key.zeroize();
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables and defaults
    ///
    /// # Errors
    /// Returns an error if an environment variable has an invalid format or
    /// the resulting configuration fails validation.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let config = merge::merge_config(None)?;
        validation::validate_config(&config)?;
        warn_on_unknown_voice(&config);
        Ok(config)
    }

    /// Load configuration from a YAML file with environment variable base
    ///
    /// Priority order (highest to lowest):
    /// 1. YAML file values
    /// 2. Environment variables (actual ENV vars override .env values)
    /// 3. .env file values
    /// 4. Default values
    ///
    /// After loading and merging, performs validation on the final configuration.
    ///
    /// # Errors
    /// Returns an error if:
    /// - The YAML file cannot be read or is malformed
    /// - Environment variables have invalid formats
    /// - Configuration validation fails
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        // .env is loaded in main.rs, so by now it is part of the environment
        let yaml_config = yaml::YamlConfig::from_file(path)?;

        let config = merge::merge_config(Some(yaml_config))?;
        validation::validate_config(&config)?;
        warn_on_unknown_voice(&config);
        Ok(config)
    }

    /// Get the server address as a string
    ///
    /// Returns the address in the format "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if TLS is enabled
    ///
    /// Returns true if TLS configuration is present
    pub fn is_tls_enabled(&self) -> bool {
        self.tls.is_some()
    }

    /// Check if a function handler endpoint is configured
    pub fn has_function_handler(&self) -> bool {
        self.function_handler_url.is_some()
    }

    pub fn function_call_timeout(&self) -> Duration {
        Duration::from_secs(self.function_call_timeout_seconds)
    }
}

fn warn_on_unknown_voice(config: &ServerConfig) {
    if OpenAIRealtimeVoice::parse(&config.realtime_voice).is_none() {
        tracing::warn!(
            voice = %config.realtime_voice,
            "Unrecognized realtime voice, passing it through unchanged"
        );
    }
}
