use serde::Deserialize;
use std::path::PathBuf;

/// Complete YAML configuration structure
///
/// All fields are optional to allow partial configuration. Values present here
/// override the environment.
///
/// # Example YAML structure
/// ```yaml
/// server:
///   host: "0.0.0.0"
///   port: 8080
///   tls:
///     enabled: true
///     cert_path: "/etc/relay/cert.pem"
///     key_path: "/etc/relay/key.pem"
///
/// providers:
///   openai_api_key: "sk-..."
///
/// realtime:
///   model: "gpt-4o-realtime-preview"
///   voice: "alloy"
///   session_url: "https://api.openai.com/v1/realtime/sessions"
///   url: "wss://api.openai.com/v1/realtime"
///
/// function_handler:
///   url: "https://hooks.example.com/ai"
///   timeout_seconds: 10
///
/// timeouts:
///   bootstrap_seconds: 10
///   connect_seconds: 10
///
/// relay:
///   pending_frame_limit: 1024
///
/// security:
///   max_websocket_connections: 1000
///   max_connections_per_ip: 100
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub server: Option<ServerYaml>,
    pub providers: Option<ProvidersYaml>,
    pub realtime: Option<RealtimeYaml>,
    pub function_handler: Option<FunctionHandlerYaml>,
    pub timeouts: Option<TimeoutsYaml>,
    pub relay: Option<RelayYaml>,
    pub security: Option<SecurityYaml>,
}

/// Server configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServerYaml {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub tls: Option<TlsYaml>,
}

/// TLS configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TlsYaml {
    pub enabled: Option<bool>,
    pub cert_path: Option<PathBuf>,
    pub key_path: Option<PathBuf>,
}

/// Provider API keys from YAML
#[derive(Clone, Deserialize, Default)]
#[serde(default)]
pub struct ProvidersYaml {
    pub openai_api_key: Option<String>,
}

impl std::fmt::Debug for ProvidersYaml {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProvidersYaml")
            .field(
                "openai_api_key",
                &self.openai_api_key.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

/// Upstream realtime settings from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RealtimeYaml {
    pub model: Option<String>,
    pub voice: Option<String>,
    pub session_url: Option<String>,
    pub url: Option<String>,
}

/// Function handler settings from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct FunctionHandlerYaml {
    pub url: Option<String>,
    pub timeout_seconds: Option<u64>,
}

/// Setup timeouts from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TimeoutsYaml {
    pub bootstrap_seconds: Option<u64>,
    pub connect_seconds: Option<u64>,
}

/// Relay tuning from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RelayYaml {
    pub pending_frame_limit: Option<usize>,
}

/// Security configuration from YAML
///
/// # Example YAML structure
/// ```yaml
/// security:
///   max_websocket_connections: 1000
///   max_connections_per_ip: 100
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SecurityYaml {
    pub max_websocket_connections: Option<usize>,
    pub max_connections_per_ip: Option<u32>,
}

impl YamlConfig {
    /// Load YAML configuration from a file
    ///
    /// # Errors
    /// Returns an error if:
    /// - The file cannot be read
    /// - The YAML is malformed
    /// - Required fields have invalid types
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {e}", path.display()))?;

        let config: YamlConfig = serde_yaml::from_str(&contents)
            .map_err(|e| format!("Failed to parse YAML config: {e}"))?;

        Ok(config)
    }
}
