//! Configuration validation logic.

use std::path::PathBuf;

use url::Url;

use super::{MAX_PENDING_FRAME_LIMIT, ServerConfig};

/// Run every check against a merged configuration
pub fn validate_config(config: &ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    validate_api_key(&config.openai_api_key)?;
    validate_url("session URL", &config.session_url, &["http", "https"])?;
    validate_url("realtime URL", &config.realtime_url, &["ws", "wss"])?;
    if let Some(url) = &config.function_handler_url {
        validate_url("function handler URL", url, &["http", "https"])?;
    }
    validate_timeouts(config)?;
    validate_pending_frame_limit(config.pending_frame_limit)?;
    validate_connection_limits(config)?;
    Ok(())
}

/// The long-lived API key must be present
pub fn validate_api_key(api_key: &Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    match api_key {
        Some(key) if !key.trim().is_empty() => Ok(()),
        _ => Err("OPENAI_API_KEY is required (set it in the environment or providers.openai_api_key)".into()),
    }
}

/// Parse a URL and check its scheme
pub fn validate_url(
    name: &str,
    value: &str,
    schemes: &[&str],
) -> Result<(), Box<dyn std::error::Error>> {
    let url = Url::parse(value).map_err(|e| format!("Invalid {name} '{value}': {e}"))?;
    if !schemes.contains(&url.scheme()) {
        return Err(format!(
            "Invalid {name} '{value}': scheme must be one of {}",
            schemes.join(", ")
        )
        .into());
    }
    Ok(())
}

pub fn validate_timeouts(config: &ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    for (name, value) in [
        ("bootstrap timeout", config.bootstrap_timeout_seconds),
        ("upstream connect timeout", config.connect_timeout_seconds),
        ("function call timeout", config.function_call_timeout_seconds),
    ] {
        if value == 0 {
            return Err(format!("The {name} must be greater than zero seconds").into());
        }
    }
    Ok(())
}

/// The limit sizes a per-call channel, so it must stay within a sane range
pub fn validate_pending_frame_limit(limit: usize) -> Result<(), Box<dyn std::error::Error>> {
    if limit == 0 {
        return Err("The pending frame limit must be greater than zero".into());
    }
    if limit > MAX_PENDING_FRAME_LIMIT {
        return Err(format!(
            "The pending frame limit must not exceed {MAX_PENDING_FRAME_LIMIT} frames (got {limit})"
        )
        .into());
    }
    Ok(())
}

pub fn validate_connection_limits(config: &ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    if config.max_websocket_connections == Some(0) {
        return Err("MAX_WEBSOCKET_CONNECTIONS must be greater than zero when set".into());
    }
    if config.max_connections_per_ip == 0 {
        return Err("MAX_CONNECTIONS_PER_IP must be greater than zero".into());
    }
    Ok(())
}

/// Both TLS paths are required once TLS is enabled
pub fn validate_tls_paths(
    cert_path: Option<PathBuf>,
    key_path: Option<PathBuf>,
) -> Result<(PathBuf, PathBuf), Box<dyn std::error::Error>> {
    match (cert_path, key_path) {
        (Some(cert), Some(key)) => Ok((cert, key)),
        (None, _) => Err("TLS is enabled but no certificate path is set (TLS_CERT_PATH)".into()),
        (_, None) => Err("TLS is enabled but no private key path is set (TLS_KEY_PATH)".into()),
    }
}
