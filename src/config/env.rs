//! Environment variable loading.
//!
//! Every value is optional here; defaults are applied in `merge` so that YAML
//! can still override anything the environment leaves unset.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Values read from the environment
#[derive(Debug, Default)]
pub struct EnvConfig {
    pub host: Option<String>,
    pub port: Option<u16>,

    pub tls_enabled: Option<bool>,
    pub tls_cert_path: Option<PathBuf>,
    pub tls_key_path: Option<PathBuf>,

    pub openai_api_key: Option<String>,
    pub realtime_model: Option<String>,
    pub realtime_voice: Option<String>,
    pub session_url: Option<String>,
    pub realtime_url: Option<String>,

    pub function_handler_url: Option<String>,

    pub bootstrap_timeout_seconds: Option<u64>,
    pub connect_timeout_seconds: Option<u64>,
    pub function_call_timeout_seconds: Option<u64>,
    pub pending_frame_limit: Option<usize>,

    pub max_websocket_connections: Option<usize>,
    pub max_connections_per_ip: Option<u32>,
}

impl EnvConfig {
    /// Read all supported variables from the process environment
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self {
            host: env_string("HOST"),
            port: env_parse("PORT")?,
            tls_enabled: env_bool("TLS_ENABLED")?,
            tls_cert_path: env_string("TLS_CERT_PATH").map(PathBuf::from),
            tls_key_path: env_string("TLS_KEY_PATH").map(PathBuf::from),
            openai_api_key: env_string("OPENAI_API_KEY"),
            realtime_model: env_string("OPENAI_REALTIME_MODEL"),
            realtime_voice: env_string("OPENAI_REALTIME_VOICE"),
            session_url: env_string("OPENAI_SESSION_URL"),
            realtime_url: env_string("OPENAI_REALTIME_URL"),
            function_handler_url: env_string("FUNCTION_HANDLER_URL"),
            bootstrap_timeout_seconds: env_parse("SESSION_BOOTSTRAP_TIMEOUT_SECONDS")?,
            connect_timeout_seconds: env_parse("UPSTREAM_CONNECT_TIMEOUT_SECONDS")?,
            function_call_timeout_seconds: env_parse("FUNCTION_CALL_TIMEOUT_SECONDS")?,
            pending_frame_limit: env_parse("PENDING_FRAME_LIMIT")?,
            max_websocket_connections: env_parse("MAX_WEBSOCKET_CONNECTIONS")?,
            max_connections_per_ip: env_parse("MAX_CONNECTIONS_PER_IP")?,
        })
    }
}

/// Non-empty, trimmed value of a variable
fn env_string(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse<T>(name: &str) -> Result<Option<T>, Box<dyn std::error::Error>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env_string(name) {
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|e| format!("Invalid {name} value '{raw}': {e}").into()),
        None => Ok(None),
    }
}

fn env_bool(name: &str) -> Result<Option<bool>, Box<dyn std::error::Error>> {
    match env_string(name) {
        Some(raw) => match raw.to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(Some(true)),
            "false" | "0" | "no" | "off" => Ok(Some(false)),
            _ => Err(format!("Invalid {name} value '{raw}': expected true or false").into()),
        },
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::cleanup_env_vars;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_empty_environment() {
        cleanup_env_vars();
        let config = EnvConfig::from_env().unwrap();
        assert!(config.host.is_none());
        assert!(config.port.is_none());
        assert!(config.openai_api_key.is_none());
        assert!(config.tls_enabled.is_none());
    }

    #[test]
    #[serial]
    fn test_reads_all_variables() {
        cleanup_env_vars();
        unsafe {
            env::set_var("HOST", "127.0.0.1");
            env::set_var("PORT", "5050");
            env::set_var("TLS_ENABLED", "yes");
            env::set_var("TLS_CERT_PATH", "/etc/relay/cert.pem");
            env::set_var("TLS_KEY_PATH", "/etc/relay/key.pem");
            env::set_var("OPENAI_API_KEY", "  sk-padded  ");
            env::set_var("OPENAI_REALTIME_MODEL", "gpt-realtime");
            env::set_var("FUNCTION_HANDLER_URL", "https://hooks.example.com/fn");
            env::set_var("FUNCTION_CALL_TIMEOUT_SECONDS", "4");
            env::set_var("PENDING_FRAME_LIMIT", "64");
            env::set_var("MAX_WEBSOCKET_CONNECTIONS", "500");
            env::set_var("MAX_CONNECTIONS_PER_IP", "5");
        }

        let config = EnvConfig::from_env().unwrap();
        assert_eq!(config.host.as_deref(), Some("127.0.0.1"));
        assert_eq!(config.port, Some(5050));
        assert_eq!(config.tls_enabled, Some(true));
        assert_eq!(
            config.tls_cert_path,
            Some(PathBuf::from("/etc/relay/cert.pem"))
        );
        assert_eq!(config.openai_api_key.as_deref(), Some("sk-padded"));
        assert_eq!(config.realtime_model.as_deref(), Some("gpt-realtime"));
        assert_eq!(
            config.function_handler_url.as_deref(),
            Some("https://hooks.example.com/fn")
        );
        assert_eq!(config.function_call_timeout_seconds, Some(4));
        assert_eq!(config.pending_frame_limit, Some(64));
        assert_eq!(config.max_websocket_connections, Some(500));
        assert_eq!(config.max_connections_per_ip, Some(5));

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_invalid_port() {
        cleanup_env_vars();
        unsafe {
            env::set_var("PORT", "not-a-port");
        }

        let err = EnvConfig::from_env().unwrap_err();
        assert!(err.to_string().contains("PORT"));

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_invalid_bool() {
        cleanup_env_vars();
        unsafe {
            env::set_var("TLS_ENABLED", "maybe");
        }

        assert!(EnvConfig::from_env().is_err());

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_blank_values_are_unset() {
        cleanup_env_vars();
        unsafe {
            env::set_var("FUNCTION_HANDLER_URL", "   ");
        }

        assert!(EnvConfig::from_env().unwrap().function_handler_url.is_none());

        cleanup_env_vars();
    }
}
