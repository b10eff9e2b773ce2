//! Connection limit middleware for WebSocket connections
//!
//! This module provides middleware to enforce connection limits:
//! - Global maximum WebSocket connections
//! - Per-IP connection limits
//!
//! # Example
//!
//! ```ignore
//! use axum::Router;
//! use waav_call_relay::middleware::connection_limit_middleware;
//!
//! let app = Router::new()
//!     .route("/", get(relay_handler))
//!     .layer(axum::middleware::from_fn_with_state(
//!         state.clone(),
//!         connection_limit_middleware,
//!     ));
//! ```

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode, header::UPGRADE},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use crate::state::{AppState, ConnectionLimitError, ConnectionSlot};

/// Extension type to carry the client IP through to the handler
#[derive(Clone, Copy, Debug)]
pub struct ClientIp(pub IpAddr);

/// Middleware that enforces connection limits for WebSocket connections.
///
/// This middleware:
/// 1. Checks if the global WebSocket connection limit has been reached
/// 2. Checks if the per-IP connection limit has been reached
/// 3. Returns 503 Service Unavailable if global limit is exceeded
/// 4. Returns 429 Too Many Requests if per-IP limit is exceeded
/// 5. Injects `ClientIp` and an `Arc<ConnectionSlot>` so the slot is held
///    for as long as the handler keeps it
///
/// The middleware only applies to WebSocket upgrade requests (detected by the
/// Upgrade header). Non-WebSocket requests pass through without limit checks.
pub async fn connection_limit_middleware(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    if !is_websocket_upgrade(&request) {
        return next.run(request).await;
    }

    let client_ip = addr.ip();

    match ConnectionSlot::acquire(&state, client_ip) {
        Ok(slot) => {
            request.extensions_mut().insert(ClientIp(client_ip));
            request.extensions_mut().insert(Arc::new(slot));
            next.run(request).await
        }
        Err(ConnectionLimitError::GlobalLimitReached) => {
            tracing::warn!(
                ip = %client_ip,
                "Rejecting connection: global limit reached"
            );
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "Server at capacity. Please try again later.",
            )
                .into_response()
        }
        Err(ConnectionLimitError::PerIpLimitReached) => {
            tracing::warn!(
                ip = %client_ip,
                "Rejecting connection: per-IP limit reached"
            );
            (
                StatusCode::TOO_MANY_REQUESTS,
                "Too many connections from your IP address.",
            )
                .into_response()
        }
    }
}

fn is_websocket_upgrade(request: &Request<Body>) -> bool {
    request
        .headers()
        .get(UPGRADE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.eq_ignore_ascii_case("websocket"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::test_config;
    use axum::{Extension, Router, routing::get};
    use std::net::Ipv4Addr;
    use tower::ServiceExt;

    fn app(state: Arc<AppState>) -> Router {
        Router::new()
            .route(
                "/",
                get(|slot: Option<Extension<Arc<ConnectionSlot>>>| async move {
                    match slot {
                        Some(Extension(slot)) => format!("slot {}", slot.ip()),
                        None => "no slot".to_string(),
                    }
                }),
            )
            .layer(axum::middleware::from_fn_with_state(
                state,
                connection_limit_middleware,
            ))
    }

    fn request(upgrade: bool, ip: Ipv4Addr) -> Request<Body> {
        let mut builder = Request::builder().uri("/");
        if upgrade {
            builder = builder
                .header("connection", "upgrade")
                .header("upgrade", "websocket");
        }
        let mut request = builder.body(Body::empty()).unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from((ip, 40000))));
        request
    }

    fn limited_state(global: Option<usize>, per_ip: u32) -> Arc<AppState> {
        let mut config = test_config();
        config.max_websocket_connections = global;
        config.max_connections_per_ip = per_ip;
        AppState::new(config).unwrap()
    }

    #[test]
    fn test_connection_limit_error_debug() {
        assert_eq!(
            format!("{:?}", ConnectionLimitError::GlobalLimitReached),
            "GlobalLimitReached"
        );
        assert_eq!(
            format!("{:?}", ConnectionLimitError::PerIpLimitReached),
            "PerIpLimitReached"
        );
    }

    #[tokio::test]
    async fn test_plain_requests_bypass_limits() {
        let state = limited_state(Some(1), 1);
        let ip = Ipv4Addr::new(10, 0, 0, 1);
        state.try_acquire_connection(ip.into()).unwrap();

        let response = app(state.clone()).oneshot(request(false, ip)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(state.ws_connection_count(), 1);
    }

    #[tokio::test]
    async fn test_slot_released_after_request() {
        let state = limited_state(Some(1), 1);
        let ip = Ipv4Addr::new(10, 0, 0, 2);

        let response = app(state.clone()).oneshot(request(true, ip)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        // The test handler does not keep the slot
        assert_eq!(state.ws_connection_count(), 0);
    }

    #[tokio::test]
    async fn test_global_limit_returns_503() {
        let state = limited_state(Some(1), 10);
        state
            .try_acquire_connection(Ipv4Addr::new(10, 0, 0, 9).into())
            .unwrap();

        let response = app(state)
            .oneshot(request(true, Ipv4Addr::new(10, 0, 0, 3)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_per_ip_limit_returns_429() {
        let state = limited_state(None, 1);
        let ip = Ipv4Addr::new(10, 0, 0, 4);
        state.try_acquire_connection(ip.into()).unwrap();

        let response = app(state).oneshot(request(true, ip)).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }
}
