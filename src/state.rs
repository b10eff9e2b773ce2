//! Shared application state.

use std::net::IpAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashMap;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::config::ServerConfig;
use crate::core::realtime::{RealtimeConfig, RealtimeConnector, SessionBootstrapper};
use crate::core::relay::{FunctionCallHandler, HttpFunctionCallHandler};

/// Why a new WebSocket connection was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConnectionLimitError {
    #[error("global WebSocket connection limit reached")]
    GlobalLimitReached,
    #[error("per-IP WebSocket connection limit reached")]
    PerIpLimitReached,
}

/// State shared by every call session.
///
/// Built once at startup and handed to the router behind an `Arc`; nothing in
/// here changes after construction apart from the connection counters.
pub struct AppState {
    pub config: ServerConfig,
    pub bootstrapper: SessionBootstrapper,
    pub connector: RealtimeConnector,
    /// `None` when no function handler URL is configured
    pub function_handler: Option<Arc<dyn FunctionCallHandler>>,
    /// Cancelled on server shutdown; every session holds a child token
    pub shutdown: CancellationToken,

    ws_connections: AtomicUsize,
    ip_connections: DashMap<IpAddr, u32>,
}

impl AppState {
    /// Build the shared state from a validated configuration.
    pub fn new(config: ServerConfig) -> Result<Arc<Self>, reqwest::Error> {
        // One pooled client for bootstrap and function-call requests
        let http_client = reqwest::Client::builder()
            .pool_idle_timeout(std::time::Duration::from_secs(90))
            .build()?;

        let realtime_config = RealtimeConfig::from_server_config(&config);
        let bootstrapper = SessionBootstrapper::new(http_client.clone(), realtime_config.clone());
        let connector = RealtimeConnector::new(realtime_config);

        let function_handler = config.function_handler_url.as_ref().map(|url| {
            Arc::new(HttpFunctionCallHandler::new(
                http_client.clone(),
                url.clone(),
                config.function_call_timeout(),
            )) as Arc<dyn FunctionCallHandler>
        });

        if function_handler.is_none() {
            tracing::warn!("FUNCTION_HANDLER_URL is not set; function calls will be abandoned");
        }

        Ok(Arc::new(Self {
            config,
            bootstrapper,
            connector,
            function_handler,
            shutdown: CancellationToken::new(),
            ws_connections: AtomicUsize::new(0),
            ip_connections: DashMap::new(),
        }))
    }

    /// Reserve a WebSocket connection slot for `ip`.
    ///
    /// Checks the global limit first, then the per-IP limit.
    pub fn try_acquire_connection(&self, ip: IpAddr) -> Result<(), ConnectionLimitError> {
        match self.config.max_websocket_connections {
            Some(max) => {
                self.ws_connections
                    .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |count| {
                        (count < max).then_some(count + 1)
                    })
                    .map_err(|_| ConnectionLimitError::GlobalLimitReached)?;
            }
            None => {
                self.ws_connections.fetch_add(1, Ordering::SeqCst);
            }
        }

        let mut per_ip = self.ip_connections.entry(ip).or_insert(0);
        if *per_ip >= self.config.max_connections_per_ip {
            drop(per_ip);
            self.ws_connections.fetch_sub(1, Ordering::SeqCst);
            return Err(ConnectionLimitError::PerIpLimitReached);
        }
        *per_ip += 1;
        Ok(())
    }

    /// Give back a slot taken with [`try_acquire_connection`](Self::try_acquire_connection).
    pub fn release_connection(&self, ip: IpAddr) {
        let _ = self
            .ws_connections
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |count| {
                count.checked_sub(1)
            });

        if let Some(mut per_ip) = self.ip_connections.get_mut(&ip) {
            *per_ip = per_ip.saturating_sub(1);
        }
        self.ip_connections.remove_if(&ip, |_, count| *count == 0);
    }

    pub fn ws_connection_count(&self) -> usize {
        self.ws_connections.load(Ordering::SeqCst)
    }

    pub fn ip_connection_count(&self, ip: &IpAddr) -> u32 {
        self.ip_connections.get(ip).map(|c| *c).unwrap_or(0)
    }
}

/// A reserved connection slot, released when the last clone is dropped.
///
/// The connection-limit middleware puts one into the request extensions; the
/// relay handler moves it into the call task so the slot lives exactly as
/// long as the call.
#[derive(Debug)]
pub struct ConnectionSlot {
    state: Arc<AppState>,
    ip: IpAddr,
}

impl ConnectionSlot {
    /// Take a slot for `ip`, or report which limit was hit.
    pub fn acquire(state: &Arc<AppState>, ip: IpAddr) -> Result<Self, ConnectionLimitError> {
        state.try_acquire_connection(ip)?;
        Ok(Self {
            state: state.clone(),
            ip,
        })
    }

    pub fn ip(&self) -> IpAddr {
        self.ip
    }
}

impl Drop for ConnectionSlot {
    fn drop(&mut self) {
        self.state.release_connection(self.ip);
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("function_handler", &self.function_handler.is_some())
            .field("ws_connections", &self.ws_connection_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::test_config;
    use std::net::Ipv4Addr;

    fn state_with_limits(global: Option<usize>, per_ip: u32) -> Arc<AppState> {
        let mut config = test_config();
        config.max_websocket_connections = global;
        config.max_connections_per_ip = per_ip;
        AppState::new(config).unwrap()
    }

    #[tokio::test]
    async fn test_connection_tracking_basic() {
        let state = state_with_limits(Some(10), 3);
        let ip: IpAddr = Ipv4Addr::new(192, 168, 1, 100).into();

        assert_eq!(state.ws_connection_count(), 0);
        assert_eq!(state.ip_connection_count(&ip), 0);

        for expected in 1..=3 {
            assert!(state.try_acquire_connection(ip).is_ok());
            assert_eq!(state.ws_connection_count(), expected);
            assert_eq!(state.ip_connection_count(&ip), expected as u32);
        }

        // Fourth connection should be rejected (per-IP limit)
        assert_eq!(
            state.try_acquire_connection(ip),
            Err(ConnectionLimitError::PerIpLimitReached)
        );
        assert_eq!(state.ws_connection_count(), 3);

        state.release_connection(ip);
        assert_eq!(state.ws_connection_count(), 2);
        assert_eq!(state.ip_connection_count(&ip), 2);

        assert!(state.try_acquire_connection(ip).is_ok());
        assert_eq!(state.ws_connection_count(), 3);
    }

    #[tokio::test]
    async fn test_global_connection_limit() {
        let state = state_with_limits(Some(5), 10);

        let ips: Vec<IpAddr> = (1..=6)
            .map(|i| Ipv4Addr::new(192, 168, 1, i).into())
            .collect();

        for ip in &ips[0..5] {
            assert!(state.try_acquire_connection(*ip).is_ok());
        }
        assert_eq!(state.ws_connection_count(), 5);

        assert_eq!(
            state.try_acquire_connection(ips[5]),
            Err(ConnectionLimitError::GlobalLimitReached)
        );
        assert_eq!(state.ip_connection_count(&ips[5]), 0);

        state.release_connection(ips[0]);
        assert!(state.try_acquire_connection(ips[5]).is_ok());
    }

    #[tokio::test]
    async fn test_unlimited_global_connections() {
        let state = state_with_limits(None, 1000);
        let ip: IpAddr = Ipv4Addr::LOCALHOST.into();
        for _ in 0..200 {
            assert!(state.try_acquire_connection(ip).is_ok());
        }
        assert_eq!(state.ws_connection_count(), 200);
    }

    #[tokio::test]
    async fn test_release_never_underflows() {
        let state = state_with_limits(Some(2), 2);
        let ip: IpAddr = Ipv4Addr::LOCALHOST.into();
        state.release_connection(ip);
        assert_eq!(state.ws_connection_count(), 0);
        assert_eq!(state.ip_connection_count(&ip), 0);
    }

    #[tokio::test]
    async fn test_slot_released_on_drop() {
        let state = state_with_limits(Some(1), 1);
        let ip: IpAddr = Ipv4Addr::new(10, 0, 0, 1).into();

        let slot = ConnectionSlot::acquire(&state, ip).unwrap();
        assert_eq!(slot.ip(), ip);
        assert_eq!(
            ConnectionSlot::acquire(&state, ip).unwrap_err(),
            ConnectionLimitError::GlobalLimitReached
        );

        drop(slot);
        assert_eq!(state.ws_connection_count(), 0);
        assert!(ConnectionSlot::acquire(&state, ip).is_ok());
    }

    #[tokio::test]
    async fn test_function_handler_follows_config() {
        assert!(AppState::new(test_config()).unwrap().function_handler.is_none());

        let mut config = test_config();
        config.function_handler_url = Some("https://hooks.example.com/fn".to_string());
        assert!(AppState::new(config).unwrap().function_handler.is_some());
    }
}
