//! Merging environment and YAML configuration.

use super::env::EnvConfig;
use super::validation;
use super::yaml::YamlConfig;
use super::{
    DEFAULT_HOST, DEFAULT_MAX_CONNECTIONS_PER_IP, DEFAULT_PENDING_FRAME_LIMIT, DEFAULT_PORT,
    DEFAULT_TIMEOUT_SECONDS, ServerConfig, TlsConfig,
};
use crate::core::realtime::{
    DEFAULT_REALTIME_MODEL, OPENAI_REALTIME_SESSIONS_URL, OPENAI_REALTIME_URL,
    OpenAIRealtimeVoice,
};

/// Build the final configuration: YAML values win over the environment,
/// the environment wins over defaults.
pub fn merge_config(yaml: Option<YamlConfig>) -> Result<ServerConfig, Box<dyn std::error::Error>> {
    let env = EnvConfig::from_env()?;
    let yaml = yaml.unwrap_or_default();

    let server = yaml.server.unwrap_or_default();
    let tls_yaml = server.tls.unwrap_or_default();
    let providers = yaml.providers.unwrap_or_default();
    let realtime = yaml.realtime.unwrap_or_default();
    let handler = yaml.function_handler.unwrap_or_default();
    let timeouts = yaml.timeouts.unwrap_or_default();
    let relay = yaml.relay.unwrap_or_default();
    let security = yaml.security.unwrap_or_default();

    let tls_enabled = tls_yaml.enabled.or(env.tls_enabled).unwrap_or(false);
    let tls = if tls_enabled {
        let (cert_path, key_path) = validation::validate_tls_paths(
            tls_yaml.cert_path.or(env.tls_cert_path),
            tls_yaml.key_path.or(env.tls_key_path),
        )?;
        Some(TlsConfig {
            cert_path,
            key_path,
        })
    } else {
        None
    };

    Ok(ServerConfig {
        host: server.host.or(env.host).unwrap_or_else(|| DEFAULT_HOST.to_string()),
        port: server.port.or(env.port).unwrap_or(DEFAULT_PORT),
        tls,
        openai_api_key: providers.openai_api_key.or(env.openai_api_key),
        realtime_model: realtime
            .model
            .or(env.realtime_model)
            .unwrap_or_else(|| DEFAULT_REALTIME_MODEL.to_string()),
        realtime_voice: realtime
            .voice
            .or(env.realtime_voice)
            .unwrap_or_else(|| OpenAIRealtimeVoice::default().as_str().to_string()),
        session_url: realtime
            .session_url
            .or(env.session_url)
            .unwrap_or_else(|| OPENAI_REALTIME_SESSIONS_URL.to_string()),
        realtime_url: realtime
            .url
            .or(env.realtime_url)
            .unwrap_or_else(|| OPENAI_REALTIME_URL.to_string()),
        function_handler_url: handler
            .url
            .or(env.function_handler_url)
            .filter(|url| !url.trim().is_empty()),
        bootstrap_timeout_seconds: timeouts
            .bootstrap_seconds
            .or(env.bootstrap_timeout_seconds)
            .unwrap_or(DEFAULT_TIMEOUT_SECONDS),
        connect_timeout_seconds: timeouts
            .connect_seconds
            .or(env.connect_timeout_seconds)
            .unwrap_or(DEFAULT_TIMEOUT_SECONDS),
        function_call_timeout_seconds: handler
            .timeout_seconds
            .or(env.function_call_timeout_seconds)
            .unwrap_or(DEFAULT_TIMEOUT_SECONDS),
        pending_frame_limit: relay
            .pending_frame_limit
            .or(env.pending_frame_limit)
            .unwrap_or(DEFAULT_PENDING_FRAME_LIMIT),
        max_websocket_connections: security
            .max_websocket_connections
            .or(env.max_websocket_connections),
        max_connections_per_ip: security
            .max_connections_per_ip
            .or(env.max_connections_per_ip)
            .unwrap_or(DEFAULT_MAX_CONNECTIONS_PER_IP),
    })
}
