//! OpenAI Realtime API stream connector.
//!
//! # API Reference
//!
//! - Endpoint: `wss://api.openai.com/v1/realtime?model=<model>`
//! - Protocol: WebSocket with JSON events
//! - Authorization: `Bearer <ephemeral client secret>`

use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{HeaderValue, header::AUTHORIZATION};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite};
use url::Url;

use crate::core::realtime::base::{
    EphemeralCredential, RealtimeConfig, RealtimeError, RealtimeResult,
};

/// An open upstream realtime stream.
pub type RealtimeStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Opens upstream realtime streams.
#[derive(Debug, Clone)]
pub struct RealtimeConnector {
    config: RealtimeConfig,
}

impl RealtimeConnector {
    pub fn new(config: RealtimeConfig) -> Self {
        Self { config }
    }

    /// Build the WebSocket URL with model parameter.
    pub fn build_ws_url(&self) -> RealtimeResult<Url> {
        let mut url = Url::parse(&self.config.realtime_url).map_err(|e| {
            RealtimeError::InvalidConfiguration(format!(
                "invalid realtime URL '{}': {}",
                self.config.realtime_url, e
            ))
        })?;
        url.query_pairs_mut().append_pair("model", &self.config.model);
        Ok(url)
    }

    /// Open the stream, authorizing with the ephemeral credential.
    ///
    /// Bounded by the configured connect timeout; never retried.
    pub async fn connect(&self, credential: &EphemeralCredential) -> RealtimeResult<RealtimeStream> {
        let url = self.build_ws_url()?;

        let mut request = url
            .as_str()
            .into_client_request()
            .map_err(|e| RealtimeError::ConnectionFailed(e.to_string()))?;

        let bearer = HeaderValue::from_str(&format!("Bearer {}", credential.secret()))
            .map_err(|_| {
                RealtimeError::AuthenticationFailed(
                    "credential is not a valid header value".to_string(),
                )
            })?;
        request.headers_mut().insert(AUTHORIZATION, bearer);

        let connect = connect_async(request);
        let (stream, response) = tokio::time::timeout(self.config.connect_timeout, connect)
            .await
            .map_err(|_| {
                RealtimeError::Timeout(format!(
                    "upstream connect exceeded {:?}",
                    self.config.connect_timeout
                ))
            })?
            .map_err(|e| match e {
                tungstenite::Error::Http(response)
                    if response.status().as_u16() == 401 || response.status().as_u16() == 403 =>
                {
                    RealtimeError::AuthenticationFailed(format!(
                        "upstream refused credential with status {}",
                        response.status()
                    ))
                }
                e @ (tungstenite::Error::Http(_)
                | tungstenite::Error::Io(_)
                | tungstenite::Error::Tls(_)) => RealtimeError::ConnectionFailed(e.to_string()),
                other => RealtimeError::WebSocketError(other.to_string()),
            })?;

        tracing::info!(
            status = %response.status(),
            model = %self.config.model,
            "Connected to OpenAI Realtime API"
        );

        Ok(stream)
    }
}
