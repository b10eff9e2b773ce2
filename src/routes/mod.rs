pub mod api;
pub mod relay;

use std::sync::Arc;

use axum::{Router, middleware};
use http::HeaderValue;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::middleware::connection_limit_middleware;
use crate::state::AppState;

/// Assemble the full application router
///
/// Layer order (outer to inner) on the relay route:
/// security headers -> connection_limit -> handler
///
/// The router must be served with
/// `into_make_service_with_connect_info::<SocketAddr>()` so the connection
/// limit middleware can see the peer address.
pub fn create_app_router(state: Arc<AppState>) -> Router {
    let relay_routes = relay::create_relay_router().layer(middleware::from_fn_with_state(
        state.clone(),
        connection_limit_middleware,
    ));

    let security_headers = tower::ServiceBuilder::new()
        .layer(SetResponseHeaderLayer::overriding(
            http::header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            http::header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ));

    api::create_api_router()
        .merge(relay_routes)
        .with_state(state)
        .layer(security_headers)
}
